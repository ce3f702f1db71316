//! Canonical field schema for normalized security events
//! Explicit field paths plus wildcard prefixes covering schemaless subtrees

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Storage type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Keyword,
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Ip,
    Object,
}

/// Metadata for an explicitly registered field path.
///
/// Wildcard-covered paths have no metadata; only explicit entries do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Storage type of the field
    pub kind: FieldKind,
    /// Human-readable description for schema listings
    pub description: String,
    /// Whether the field may carry nested structure
    pub allow_nested: bool,
}

/// Immutable dictionary of valid field paths.
///
/// Paths are dot-rooted jq-style strings (".actor.user.name"). Lookups
/// normalize a missing leading dot before comparison; matching is
/// case-sensitive and no other normalization is applied. A schema is built
/// once at process start and is safe for unbounded concurrent reads.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    fields: BTreeMap<String, FieldInfo>,
    wildcard_prefixes: Vec<String>,
}

/// Prepends the leading dot when the caller supplied a dot-less path.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.starts_with('.') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!(".{path}"))
    }
}

/// Returns the syntax violation for a dot-rooted field path, if any.
pub fn path_syntax_error(path: &str) -> Option<&'static str> {
    if path.is_empty() {
        return Some("path is empty");
    }
    if !path.starts_with('.') {
        return Some("path must be dot-rooted");
    }
    if path.contains("..") {
        return Some("path contains an empty segment");
    }
    if path.len() > 1 && path.ends_with('.') {
        return Some("path has a dangling trailing dot");
    }
    None
}

impl FieldSchema {
    pub fn builder() -> FieldSchemaBuilder {
        FieldSchemaBuilder::default()
    }

    /// True when the path is an explicit catalog entry or extends one of
    /// the configured wildcard prefixes.
    pub fn is_valid_field(&self, path: &str) -> bool {
        if path.is_empty() || path.contains("..") {
            return false;
        }
        let normalized = normalize_path(path);
        if normalized.len() > 1 && normalized.ends_with('.') {
            return false;
        }
        if self.fields.contains_key(normalized.as_ref()) {
            return true;
        }
        self.wildcard_prefixes
            .iter()
            .any(|prefix| normalized.starts_with(prefix.as_str()) && normalized.len() > prefix.len())
    }

    /// Explicit-table lookup only; wildcard matches carry no metadata.
    pub fn field_info(&self, path: &str) -> Option<&FieldInfo> {
        self.fields.get(normalize_path(path).as_ref())
    }

    /// Returns the invalid subset of the given paths, normalized to their
    /// leading-dot form. Order follows the input.
    pub fn validate_fields<'a, I>(&self, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths
            .into_iter()
            .filter(|path| !self.is_valid_field(path))
            .map(|path| normalize_path(path).into_owned())
            .collect()
    }

    /// All explicit field paths, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn wildcard_prefixes(&self) -> &[String] {
        &self.wildcard_prefixes
    }

    /// Near-miss catalog entries for an unknown path, used to enrich
    /// unknown-field diagnostics.
    pub fn suggest(&self, path: &str) -> Vec<String> {
        let needle = normalize_path(path);
        let body = needle.trim_start_matches('.');
        if body.is_empty() {
            return Vec::new();
        }
        let mut out: Vec<String> = self
            .fields
            .keys()
            .filter(|k| k.contains(body) || body.contains(k.trim_start_matches('.')))
            .cloned()
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

/// Builder for test schemas and schema versioning.
#[derive(Debug, Default)]
pub struct FieldSchemaBuilder {
    fields: BTreeMap<String, FieldInfo>,
    wildcard_prefixes: Vec<String>,
}

impl FieldSchemaBuilder {
    pub fn field(self, path: &str, kind: FieldKind, description: &str) -> Self {
        self.insert(path, kind, description, false)
    }

    pub fn nested_field(self, path: &str, kind: FieldKind, description: &str) -> Self {
        self.insert(path, kind, description, true)
    }

    fn insert(mut self, path: &str, kind: FieldKind, description: &str, allow_nested: bool) -> Self {
        self.fields.insert(
            normalize_path(path).into_owned(),
            FieldInfo {
                kind,
                description: description.to_string(),
                allow_nested,
            },
        );
        self
    }

    /// Registers a wildcard prefix; any strictly longer path beginning
    /// with it is valid.
    pub fn wildcard(mut self, prefix: &str) -> Self {
        self.wildcard_prefixes.push(normalize_path(prefix).into_owned());
        self
    }

    pub fn build(self) -> FieldSchema {
        FieldSchema {
            fields: self.fields,
            wildcard_prefixes: self.wildcard_prefixes,
        }
    }
}

static DEFAULT_SCHEMA: Lazy<Arc<FieldSchema>> = Lazy::new(|| {
    use FieldKind::*;
    Arc::new(
        FieldSchema::builder()
            // Event classification
            .field(".class_uid", Integer, "OCSF class identifier")
            .field(".category_uid", Integer, "OCSF category identifier")
            .field(".activity_id", Integer, "Activity within the event class")
            .field(".type_uid", Integer, "Class and activity combined")
            .field(".severity_id", Integer, "Normalized severity level")
            .field(".severity", Keyword, "Severity label")
            .field(".status", Keyword, "Event outcome status")
            .field(".status_code", Keyword, "Vendor status code")
            // Core envelope
            .field(".time", Timestamp, "Event occurrence time")
            .field(".message", Text, "Human-readable event summary")
            .field(".tenant_id", Keyword, "Tenant isolation key")
            .field(".raw_data", Text, "Original log line")
            // Network endpoints
            .field(".src_endpoint.ip", Ip, "Source address")
            .field(".src_endpoint.port", Integer, "Source port")
            .field(".src_endpoint.hostname", Keyword, "Source hostname")
            .field(".dst_endpoint.ip", Ip, "Destination address")
            .field(".dst_endpoint.port", Integer, "Destination port")
            .field(".dst_endpoint.hostname", Keyword, "Destination hostname")
            .field(".connection_info.protocol_name", Keyword, "Transport protocol")
            .field(".connection_info.direction", Keyword, "Traffic direction")
            // Device
            .field(".device.hostname", Keyword, "Reporting device hostname")
            .field(".device.ip", Ip, "Reporting device address")
            .field(".device.type", Keyword, "Reporting device type")
            // Process activity
            .field(".process.name", Keyword, "Process image name")
            .field(".process.pid", Integer, "Process identifier")
            .field(".process.cmd_line", Text, "Process command line")
            .field(".process.parent_process.name", Keyword, "Parent image name")
            // File activity
            .field(".file.name", Keyword, "File name")
            .field(".file.path", Keyword, "Full file path")
            .field(".file.size", Integer, "File size in bytes")
            // HTTP activity
            .field(".http_request.method", Keyword, "HTTP method")
            .field(".http_request.url.path", Keyword, "Request path")
            .field(".http_request.user_agent", Text, "Client user agent")
            .field(".http_response.code", Integer, "HTTP status code")
            // Rule/detection context
            .field(".rule.uid", Keyword, "Matching rule identifier")
            .field(".rule.name", Keyword, "Matching rule name")
            // Dynamically-mapped subtrees
            .nested_field(".metadata", Object, "Producer metadata")
            .nested_field(".unmapped", Object, "Fields without a canonical mapping")
            .wildcard(".actor.user.")
            .wildcard(".metadata.")
            .wildcard(".unmapped.")
            .wildcard(".enrichments.")
            .build(),
    )
});

/// Shared default catalog for the canonical event schema.
pub fn default_schema() -> Arc<FieldSchema> {
    Arc::clone(&DEFAULT_SCHEMA)
}
