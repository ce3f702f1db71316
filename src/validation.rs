//! Query validation: structural, resource-safety, and schema checks
//! Pure functions of the query, the configured limits, and the field schema

use crate::dto::{
    Aggregation, AggregationType, CompoundKind, FilterExpr, FilterOperator, FilterValue, Query,
    ScalarValue, SearchRequest, TimeRangeDef,
};
use crate::error::QueryError;
use crate::fields::{collect_query_fields, is_virtual_field, DEFAULT_VIRTUAL_FIELDS};
use crate::schema::{default_schema, normalize_path, path_syntax_error, FieldSchema};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, warn};

/// Grammar for relative time windows ("15m", "24h", "7d")
const RELATIVE_DURATION_PATTERN: &str = r"^\d+(m|h|d)$";

/// Maximum free-text query length on the flat request path
const MAX_QUERY_LENGTH: usize = 1024;

/// Resource-safety limits applied by the query validator.
///
/// The limits are the system's resource-safety mechanism: a malicious or
/// malformed query cannot force unbounded recursion or unbounded output
/// size because validation rejects it before translation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    /// Maximum aggregations, counted cumulatively over the whole tree
    pub max_aggregations: usize,
    /// Maximum result size without cursor pagination
    pub max_result_size: u32,
    /// Maximum filter nesting depth
    pub max_filter_depth: usize,
    /// Maximum selected field paths
    pub max_select_fields: usize,
    /// Maximum sort fields
    pub max_sort_fields: usize,
    /// Check collected field references against the schema
    pub validate_field_mappings: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_aggregations: 10,
            max_result_size: 10_000,
            max_filter_depth: 10,
            max_select_fields: 100,
            max_sort_fields: 10,
            validate_field_mappings: true,
        }
    }
}

impl ValidatorConfig {
    /// Variant for contexts where schema validation is delegated elsewhere.
    pub fn without_field_validation() -> Self {
        Self {
            validate_field_mappings: false,
            ..Self::default()
        }
    }
}

/// Proof of validation.
///
/// The translator accepts no other IR input, so an unvalidated query can
/// never reach translation.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedQuery<'a> {
    query: &'a Query,
}

impl<'a> ValidatedQuery<'a> {
    pub fn query(&self) -> &'a Query {
        self.query
    }
}

impl Deref for ValidatedQuery<'_> {
    type Target = Query;

    fn deref(&self) -> &Query {
        self.query
    }
}

/// Validator for canonical queries and flat search requests.
pub struct QueryValidator {
    config: ValidatorConfig,
    schema: Arc<FieldSchema>,
    duration_regex: Regex,
}

impl QueryValidator {
    pub fn new(config: ValidatorConfig, schema: Arc<FieldSchema>) -> Result<Self> {
        let duration_regex = Regex::new(RELATIVE_DURATION_PATTERN)
            .context("Failed to compile relative duration regex")?;
        Ok(Self {
            config,
            schema,
            duration_regex,
        })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validates a canonical query.
    ///
    /// Returns the first violation encountered while walking select →
    /// filter → time range → aggregations → sort → pagination, except the
    /// schema-field check, which runs first and reports all unknown paths
    /// at once.
    pub fn validate<'a>(&self, query: &'a Query) -> Result<ValidatedQuery<'a>, QueryError> {
        if self.config.validate_field_mappings {
            self.check_field_mappings(query)?;
        }
        self.check_select(query)?;
        if let Some(filter) = &query.filter {
            self.check_filter(filter, 0)?;
        }
        if let Some(range) = &query.time_range {
            self.check_time_range(range)?;
        }
        self.check_aggregations(&query.aggregations)?;
        self.check_sort(query)?;
        self.check_pagination(query)?;
        debug!(
            select = query.select.len(),
            aggregations = query.aggregations.len(),
            "query validated"
        );
        Ok(ValidatedQuery { query })
    }

    /// Guardrails for the flat request path.
    pub fn validate_request(&self, request: &SearchRequest) -> Result<(), QueryError> {
        if let Some(query) = &request.query {
            if query.len() > MAX_QUERY_LENGTH {
                return Err(QueryError::Structural(format!(
                    "query string too long: {} characters (max: {MAX_QUERY_LENGTH})",
                    query.len()
                )));
            }
        }
        if let Some(range) = &request.time_range {
            self.check_time_range(range)?;
        }
        if request.sort.len() > self.config.max_sort_fields {
            return Err(QueryError::LimitExceeded {
                what: "sort fields",
                limit: self.config.max_sort_fields,
                actual: request.sort.len(),
            });
        }
        if let Some(limit) = request.limit {
            let has_cursor = request.search_after.as_ref().is_some_and(|c| !c.is_empty());
            if limit > self.config.max_result_size && !has_cursor {
                return Err(QueryError::Pagination(format!(
                    "limit {limit} exceeds {}; use cursor pagination",
                    self.config.max_result_size
                )));
            }
        }
        Ok(())
    }

    /// Aggregated schema check: every field reference across select,
    /// filter, aggregations, and sort, all unknown paths reported together.
    fn check_field_mappings(&self, query: &Query) -> Result<(), QueryError> {
        let unknown: Vec<String> = collect_query_fields(query)
            .into_iter()
            .filter(|path| !is_virtual_field(path, DEFAULT_VIRTUAL_FIELDS))
            .filter(|path| !self.schema.is_valid_field(path))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        let mut suggestions: Vec<String> = unknown
            .iter()
            .flat_map(|path| self.schema.suggest(path))
            .collect();
        suggestions.sort();
        suggestions.dedup();
        warn!(fields = ?unknown, "query references unknown fields");
        Err(QueryError::UnknownFields {
            fields: unknown,
            suggestions,
        })
    }

    fn check_select(&self, query: &Query) -> Result<(), QueryError> {
        if query.select.len() > self.config.max_select_fields {
            return Err(QueryError::LimitExceeded {
                what: "select fields",
                limit: self.config.max_select_fields,
                actual: query.select.len(),
            });
        }
        for (i, path) in query.select.iter().enumerate() {
            if let Some(reason) = path_syntax_error(path) {
                return Err(QueryError::Structural(format!(
                    "select[{i}]: {reason} ({path:?})"
                )));
            }
        }
        Ok(())
    }

    fn check_filter(&self, node: &FilterExpr, depth: usize) -> Result<(), QueryError> {
        if depth > self.config.max_filter_depth {
            return Err(QueryError::LimitExceeded {
                what: "filter depth",
                limit: self.config.max_filter_depth,
                actual: depth,
            });
        }
        match node {
            FilterExpr::Simple {
                field,
                operator,
                value,
            } => self.check_simple(field, *operator, value.as_ref(), depth),
            FilterExpr::Compound { kind, children } => {
                match kind {
                    CompoundKind::And | CompoundKind::Or => {
                        if children.is_empty() {
                            return Err(QueryError::Structural(format!(
                                "{kind} filter at depth {depth} has no children"
                            )));
                        }
                    }
                    CompoundKind::Not => {
                        if children.len() != 1 {
                            return Err(QueryError::Structural(format!(
                                "not filter at depth {depth} requires exactly one child, got {}",
                                children.len()
                            )));
                        }
                    }
                }
                for child in children {
                    self.check_filter(child, depth + 1)?;
                }
                Ok(())
            }
        }
    }

    fn check_simple(
        &self,
        field: &str,
        operator: FilterOperator,
        value: Option<&FilterValue>,
        depth: usize,
    ) -> Result<(), QueryError> {
        let normalized = normalize_path(field);
        if let Some(reason) = path_syntax_error(&normalized) {
            return Err(QueryError::Structural(format!(
                "filter field at depth {depth}: {reason} ({field:?})"
            )));
        }
        if operator == FilterOperator::Exists {
            // Optional value selects exists vs. not-exists semantics
            if let Some(v) = value {
                if !matches!(v, FilterValue::Bool(_)) {
                    return Err(QueryError::OperatorValueMismatch {
                        operator: operator.to_string(),
                        reason: format!("requires a boolean value (field {normalized})"),
                    });
                }
            }
            return Ok(());
        }
        let Some(value) = value else {
            return Err(QueryError::OperatorValueMismatch {
                operator: operator.to_string(),
                reason: format!("requires a value (field {normalized})"),
            });
        };
        match operator {
            FilterOperator::In => {
                if !matches!(value, FilterValue::Array(_)) {
                    return Err(QueryError::OperatorValueMismatch {
                        operator: operator.to_string(),
                        reason: format!("requires an array value (field {normalized})"),
                    });
                }
            }
            FilterOperator::Regex => {
                let pattern = scalar_string(value).ok_or_else(|| {
                    QueryError::OperatorValueMismatch {
                        operator: operator.to_string(),
                        reason: format!("requires a string pattern (field {normalized})"),
                    }
                })?;
                Regex::new(pattern).map_err(|e| QueryError::OperatorValueMismatch {
                    operator: operator.to_string(),
                    reason: format!("pattern does not compile: {e}"),
                })?;
            }
            FilterOperator::Cidr => {
                let cidr = scalar_string(value).ok_or_else(|| {
                    QueryError::OperatorValueMismatch {
                        operator: operator.to_string(),
                        reason: format!("requires a CIDR string (field {normalized})"),
                    }
                })?;
                if !cidr.contains('/') {
                    return Err(QueryError::OperatorValueMismatch {
                        operator: operator.to_string(),
                        reason: format!("requires CIDR notation with a '/' ({cidr:?})"),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn check_time_range(&self, range: &TimeRangeDef) -> Result<(), QueryError> {
        let has_absolute = range.start.is_some() || range.end.is_some();
        match (&range.last, has_absolute) {
            (Some(_), true) => Err(QueryError::TimeRange(
                "specify either absolute bounds or a relative duration, not both".to_string(),
            )),
            (None, false) => Err(QueryError::TimeRange(
                "requires absolute bounds or a relative duration".to_string(),
            )),
            (Some(last), false) => {
                if self.duration_regex.is_match(last) {
                    Ok(())
                } else {
                    Err(QueryError::TimeRange(format!(
                        "invalid duration {last:?} (expected a count of minutes, hours, or days such as \"15m\")"
                    )))
                }
            }
            (None, true) => {
                if let (Some(start), Some(end)) = (range.start, range.end) {
                    if start > end {
                        return Err(QueryError::TimeRange(format!(
                            "start {start} is after end {end}"
                        )));
                    }
                }
                Ok(())
            }
        }
    }

    fn check_aggregations(&self, aggregations: &[Aggregation]) -> Result<(), QueryError> {
        // Cumulative over the whole tree: nesting does not raise the ceiling
        let total = count_aggregations(aggregations);
        if total > self.config.max_aggregations {
            return Err(QueryError::LimitExceeded {
                what: "aggregations",
                limit: self.config.max_aggregations,
                actual: total,
            });
        }
        self.check_aggregation_list(aggregations, "aggregations")
    }

    fn check_aggregation_list(
        &self,
        aggregations: &[Aggregation],
        context: &str,
    ) -> Result<(), QueryError> {
        for (i, agg) in aggregations.iter().enumerate() {
            let at = format!("{context}[{i}]");
            if agg.name.is_empty() {
                return Err(QueryError::Structural(format!("{at}: name is empty")));
            }
            if let Some(field) = &agg.field {
                let normalized = normalize_path(field);
                if let Some(reason) = path_syntax_error(&normalized) {
                    return Err(QueryError::Structural(format!(
                        "{at}: {reason} ({field:?})"
                    )));
                }
            }
            match agg.agg_type {
                AggregationType::Terms => {
                    if agg.field.is_none() {
                        return Err(QueryError::Structural(format!(
                            "{at}: terms requires a field"
                        )));
                    }
                    match agg.size {
                        Some(size) if size > 0 => {}
                        Some(_) => {
                            return Err(QueryError::Structural(format!(
                                "{at}: terms size must be positive"
                            )))
                        }
                        None => {
                            return Err(QueryError::Structural(format!(
                                "{at}: terms requires a size"
                            )))
                        }
                    }
                }
                AggregationType::DateHistogram => {
                    if agg.field.is_none() {
                        return Err(QueryError::Structural(format!(
                            "{at}: date_histogram requires a field"
                        )));
                    }
                    if agg.interval.as_deref().unwrap_or("").is_empty() {
                        return Err(QueryError::Structural(format!(
                            "{at}: date_histogram requires an interval"
                        )));
                    }
                }
                _ => {}
            }
            if !agg.aggregations.is_empty() {
                self.check_aggregation_list(&agg.aggregations, &at)?;
            }
        }
        Ok(())
    }

    fn check_sort(&self, query: &Query) -> Result<(), QueryError> {
        if query.sort.len() > self.config.max_sort_fields {
            return Err(QueryError::LimitExceeded {
                what: "sort fields",
                limit: self.config.max_sort_fields,
                actual: query.sort.len(),
            });
        }
        for (i, spec) in query.sort.iter().enumerate() {
            let normalized = normalize_path(&spec.field);
            if let Some(reason) = path_syntax_error(&normalized) {
                return Err(QueryError::Structural(format!(
                    "sort[{i}]: {reason} ({:?})",
                    spec.field
                )));
            }
        }
        Ok(())
    }

    fn check_pagination(&self, query: &Query) -> Result<(), QueryError> {
        let has_cursor = query.cursor.as_ref().is_some_and(|c| !c.is_empty());
        if let Some(limit) = query.limit {
            if limit > self.config.max_result_size && !has_cursor {
                return Err(QueryError::Pagination(format!(
                    "limit {limit} exceeds {}; use cursor pagination",
                    self.config.max_result_size
                )));
            }
        }
        if query.offset > 0 && has_cursor {
            return Err(QueryError::Pagination(
                "offset and cursor are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default(), default_schema())
            .expect("Failed to create query validator")
    }
}

fn count_aggregations(aggregations: &[Aggregation]) -> usize {
    aggregations
        .iter()
        .map(|agg| 1 + count_aggregations(&agg.aggregations))
        .sum()
}

fn scalar_string(value: &FilterValue) -> Option<&str> {
    match value {
        FilterValue::Scalar(ScalarValue::String(s)) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{SortOrder, SortSpec};
    use serde_json::json;

    fn validator() -> QueryValidator {
        QueryValidator::default()
    }

    fn simple(field: &str, operator: FilterOperator, value: FilterValue) -> FilterExpr {
        FilterExpr::simple(field, operator, value)
    }

    fn eq_filter() -> FilterExpr {
        simple(".class_uid", FilterOperator::Eq, FilterValue::int(3002))
    }

    /// Wraps the filter in `levels` nested and-nodes.
    fn nested(levels: usize) -> FilterExpr {
        let mut expr = eq_filter();
        for _ in 0..levels {
            expr = FilterExpr::and(vec![expr]);
        }
        expr
    }

    #[test]
    fn empty_query_validates() {
        assert!(validator().validate(&Query::default()).is_ok());
    }

    #[test]
    fn known_field_filter_validates() {
        let query = Query {
            filter: Some(eq_filter()),
            ..Default::default()
        };
        assert!(validator().validate(&query).is_ok());
    }

    #[test]
    fn unknown_fields_are_reported_together() {
        let query = Query {
            select: vec![".bogus_field".to_string()],
            filter: Some(simple(
                ".also_bogus",
                FilterOperator::Eq,
                FilterValue::int(1),
            )),
            ..Default::default()
        };
        match validator().validate(&query) {
            Err(QueryError::UnknownFields { fields, .. }) => {
                assert_eq!(fields, vec![".also_bogus".to_string(), ".bogus_field".to_string()]);
            }
            other => panic!("expected UnknownFields, got {other:?}"),
        }
    }

    #[test]
    fn wildcard_covered_field_validates() {
        let query = Query {
            filter: Some(simple(
                ".actor.user.name",
                FilterOperator::Eq,
                FilterValue::string("admin"),
            )),
            ..Default::default()
        };
        assert!(validator().validate(&query).is_ok());

        let query = Query {
            filter: Some(simple(
                ".actor.invalid",
                FilterOperator::Eq,
                FilterValue::string("admin"),
            )),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&query),
            Err(QueryError::UnknownFields { .. })
        ));
    }

    #[test]
    fn filter_depth_boundary_is_inclusive() {
        let at_limit = Query {
            filter: Some(nested(10)),
            ..Default::default()
        };
        assert!(validator().validate(&at_limit).is_ok());

        let over_limit = Query {
            filter: Some(nested(11)),
            ..Default::default()
        };
        match validator().validate(&over_limit) {
            Err(QueryError::LimitExceeded { what, .. }) => assert_eq!(what, "filter depth"),
            other => panic!("expected depth error, got {other:?}"),
        }
    }

    #[test]
    fn compound_child_counts() {
        let empty_and = Query {
            filter: Some(FilterExpr::and(Vec::new())),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&empty_and),
            Err(QueryError::Structural(_))
        ));

        let two_child_not = Query {
            filter: Some(FilterExpr::Compound {
                kind: CompoundKind::Not,
                children: vec![eq_filter(), eq_filter()],
            }),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&two_child_not),
            Err(QueryError::Structural(_))
        ));
    }

    #[test]
    fn operator_value_shapes() {
        let missing_value = Query {
            filter: Some(FilterExpr::Simple {
                field: ".status".to_string(),
                operator: FilterOperator::Eq,
                value: None,
            }),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&missing_value),
            Err(QueryError::OperatorValueMismatch { .. })
        ));

        let scalar_in = Query {
            filter: Some(simple(".status", FilterOperator::In, FilterValue::string("x"))),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&scalar_in),
            Err(QueryError::OperatorValueMismatch { .. })
        ));

        let bad_regex = Query {
            filter: Some(simple(
                ".message",
                FilterOperator::Regex,
                FilterValue::string("(unclosed"),
            )),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&bad_regex),
            Err(QueryError::OperatorValueMismatch { .. })
        ));

        let bare_ip_cidr = Query {
            filter: Some(simple(
                ".src_endpoint.ip",
                FilterOperator::Cidr,
                FilterValue::string("10.0.0.1"),
            )),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&bare_ip_cidr),
            Err(QueryError::OperatorValueMismatch { .. })
        ));

        let exists_bool = Query {
            filter: Some(simple(
                ".process.name",
                FilterOperator::Exists,
                FilterValue::Bool(true),
            )),
            ..Default::default()
        };
        assert!(validator().validate(&exists_bool).is_ok());

        let exists_string = Query {
            filter: Some(simple(
                ".process.name",
                FilterOperator::Exists,
                FilterValue::string("yes"),
            )),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&exists_string),
            Err(QueryError::OperatorValueMismatch { .. })
        ));
    }

    #[test]
    fn time_range_variants() {
        let both = Query {
            time_range: Some(TimeRangeDef {
                start: Some(chrono::Utc::now()),
                end: None,
                last: Some("15m".to_string()),
            }),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&both),
            Err(QueryError::TimeRange(_))
        ));

        let neither = Query {
            time_range: Some(TimeRangeDef::default()),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&neither),
            Err(QueryError::TimeRange(_))
        ));

        let relative = Query {
            time_range: Some(TimeRangeDef::last("24h")),
            ..Default::default()
        };
        assert!(validator().validate(&relative).is_ok());

        let bad_grammar = Query {
            time_range: Some(TimeRangeDef::last("24x")),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&bad_grammar),
            Err(QueryError::TimeRange(_))
        ));

        let start = chrono::Utc::now();
        let inverted = Query {
            time_range: Some(TimeRangeDef::absolute(
                start,
                start - chrono::Duration::hours(1),
            )),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&inverted),
            Err(QueryError::TimeRange(_))
        ));
    }

    #[test]
    fn aggregation_limit_is_cumulative() {
        let leaf = |name: &str| Aggregation {
            agg_type: AggregationType::Avg,
            name: name.to_string(),
            field: Some(".severity_id".to_string()),
            size: None,
            interval: None,
            aggregations: Vec::new(),
        };
        let nested_metrics: Vec<Aggregation> = (0..6).map(|i| leaf(&format!("m{i}"))).collect();
        let query = Query {
            aggregations: (0..5)
                .map(|i| Aggregation {
                    agg_type: AggregationType::Terms,
                    name: format!("t{i}"),
                    field: Some(".status".to_string()),
                    size: Some(10),
                    interval: None,
                    aggregations: if i == 0 { nested_metrics.clone() } else { Vec::new() },
                })
                .collect(),
            ..Default::default()
        };
        // 5 top-level + 6 nested = 11 > 10, even though each level is under the limit
        match validator().validate(&query) {
            Err(QueryError::LimitExceeded { what, actual, .. }) => {
                assert_eq!(what, "aggregations");
                assert_eq!(actual, 11);
            }
            other => panic!("expected aggregation limit error, got {other:?}"),
        }
    }

    #[test]
    fn aggregation_requirements() {
        let terms_no_size = Query {
            aggregations: vec![Aggregation {
                agg_type: AggregationType::Terms,
                name: "by_status".to_string(),
                field: Some(".status".to_string()),
                size: None,
                interval: None,
                aggregations: Vec::new(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&terms_no_size),
            Err(QueryError::Structural(_))
        ));

        let histogram_no_interval = Query {
            aggregations: vec![Aggregation {
                agg_type: AggregationType::DateHistogram,
                name: "over_time".to_string(),
                field: Some(".time".to_string()),
                size: None,
                interval: None,
                aggregations: Vec::new(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&histogram_no_interval),
            Err(QueryError::Structural(_))
        ));
    }

    #[test]
    fn pagination_rules() {
        let over_limit = Query {
            limit: Some(20_000),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&over_limit),
            Err(QueryError::Pagination(_))
        ));

        let over_limit_with_cursor = Query {
            limit: Some(20_000),
            cursor: Some(vec![json!(1_700_000_000)]),
            ..Default::default()
        };
        assert!(validator().validate(&over_limit_with_cursor).is_ok());

        let offset_and_cursor = Query {
            offset: 10,
            cursor: Some(vec![json!(1_700_000_000)]),
            ..Default::default()
        };
        assert!(matches!(
            validator().validate(&offset_and_cursor),
            Err(QueryError::Pagination(_))
        ));
    }

    #[test]
    fn select_limit_and_syntax() {
        let config = ValidatorConfig {
            max_select_fields: 2,
            ..Default::default()
        };
        let validator = QueryValidator::new(config, default_schema()).unwrap();
        let too_many = Query {
            select: vec![".time".into(), ".message".into(), ".status".into()],
            ..Default::default()
        };
        assert!(matches!(
            validator.validate(&too_many),
            Err(QueryError::LimitExceeded { .. })
        ));

        // Syntax check fires even when schema validation is delegated
        let validator = QueryValidator::new(
            ValidatorConfig::without_field_validation(),
            default_schema(),
        )
        .unwrap();
        let dangling = Query {
            select: vec![".time.".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            validator.validate(&dangling),
            Err(QueryError::Structural(_))
        ));

        let dotless = Query {
            select: vec!["time".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            validator.validate(&dotless),
            Err(QueryError::Structural(_))
        ));
    }

    #[test]
    fn schema_validation_can_be_disabled() {
        let validator = QueryValidator::new(
            ValidatorConfig::without_field_validation(),
            default_schema(),
        )
        .unwrap();
        let query = Query {
            filter: Some(simple(
                ".not_in_schema",
                FilterOperator::Eq,
                FilterValue::int(1),
            )),
            ..Default::default()
        };
        assert!(validator.validate(&query).is_ok());
    }

    #[test]
    fn virtual_fields_skip_schema_lookup() {
        let query = Query {
            sort: vec![SortSpec::new("event_count", SortOrder::Desc)],
            ..Default::default()
        };
        assert!(validator().validate(&query).is_ok());
    }

    #[test]
    fn flat_request_guardrails() {
        let validator = validator();
        let long_query = SearchRequest {
            query: Some("x".repeat(MAX_QUERY_LENGTH + 1)),
            ..Default::default()
        };
        assert!(validator.validate_request(&long_query).is_err());

        let ok = SearchRequest {
            query: Some("failed login".to_string()),
            time_range: Some(TimeRangeDef::last("15m")),
            ..Default::default()
        };
        assert!(validator.validate_request(&ok).is_ok());
    }
}
