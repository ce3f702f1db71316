//! Configuration for the query core
//! Handles validator limits and translation settings

use crate::translate::TranslateSettings;
use crate::validation::ValidatorConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure for the query engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Validator resource-safety limits
    pub validator: ValidatorConfig,
    /// Translation settings
    pub translate: TranslateSettings,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables and defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = EngineConfig::default();

        if let Ok(depth) = std::env::var("QUERY_MAX_FILTER_DEPTH") {
            config.validator.max_filter_depth =
                depth.parse().context("Invalid QUERY_MAX_FILTER_DEPTH")?;
        }

        if let Ok(aggregations) = std::env::var("QUERY_MAX_AGGREGATIONS") {
            config.validator.max_aggregations = aggregations
                .parse()
                .context("Invalid QUERY_MAX_AGGREGATIONS")?;
        }

        if let Ok(size) = std::env::var("QUERY_MAX_RESULT_SIZE") {
            config.validator.max_result_size =
                size.parse().context("Invalid QUERY_MAX_RESULT_SIZE")?;
        }

        if let Ok(fields) = std::env::var("QUERY_MAX_SELECT_FIELDS") {
            config.validator.max_select_fields =
                fields.parse().context("Invalid QUERY_MAX_SELECT_FIELDS")?;
        }

        if let Ok(fields) = std::env::var("QUERY_MAX_SORT_FIELDS") {
            config.validator.max_sort_fields =
                fields.parse().context("Invalid QUERY_MAX_SORT_FIELDS")?;
        }

        if let Ok(mappings) = std::env::var("QUERY_VALIDATE_FIELD_MAPPINGS") {
            config.validator.validate_field_mappings = mappings
                .parse()
                .context("Invalid QUERY_VALIDATE_FIELD_MAPPINGS")?;
        }

        if let Ok(field) = std::env::var("QUERY_TIMESTAMP_FIELD") {
            config.translate.timestamp_field = field;
        }

        if let Ok(field) = std::env::var("QUERY_TENANT_FIELD") {
            config.translate.tenant_field = field;
        }

        if let Ok(size) = std::env::var("QUERY_DEFAULT_PAGE_SIZE") {
            config.translate.default_page_size =
                size.parse().context("Invalid QUERY_DEFAULT_PAGE_SIZE")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.validator.max_filter_depth == 0 {
            return Err(anyhow::anyhow!("Max filter depth cannot be 0"));
        }

        if self.validator.max_result_size == 0 {
            return Err(anyhow::anyhow!("Max result size cannot be 0"));
        }

        if self.validator.max_select_fields == 0 {
            return Err(anyhow::anyhow!("Max select fields cannot be 0"));
        }

        if self.translate.default_page_size == 0 {
            return Err(anyhow::anyhow!("Default page size cannot be 0"));
        }

        if self.translate.default_page_size > self.validator.max_result_size {
            return Err(anyhow::anyhow!(
                "Default page size cannot exceed max result size"
            ));
        }

        if self.translate.timestamp_field.is_empty() {
            return Err(anyhow::anyhow!("Timestamp field cannot be empty"));
        }

        if self.translate.tenant_field.is_empty() {
            return Err(anyhow::anyhow!("Tenant field cannot be empty"));
        }

        Ok(())
    }
}
