//! Data model for the query core
//! Canonical query IR, the flat search request, and the async job envelopes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Canonical query intermediate representation.
///
/// Every query source (UI builder, text-query parser, raw JSON decode) is
/// translated into this structure before validation and execution. The
/// value is immutable once validated; neither validation nor translation
/// mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Query {
    /// Field paths projected into each returned event
    pub select: Vec<String>,

    /// Filter tree applied to the event stream
    pub filter: Option<FilterExpr>,

    /// Time window restricting the search
    pub time_range: Option<TimeRangeDef>,

    /// Aggregations computed over the matching events
    pub aggregations: Vec<Aggregation>,

    /// Sort specs applied in order
    pub sort: Vec<SortSpec>,

    /// Maximum number of events to return
    pub limit: Option<u32>,

    /// Offset-based pagination, mutually exclusive with cursor
    pub offset: u32,

    /// search_after tuple from the last hit of the previous page
    pub cursor: Option<Vec<serde_json::Value>>,
}

/// Filter tree node.
///
/// A node is exactly one of the two shapes: a leaf comparison on a single
/// field, or a compound combining child filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterExpr {
    /// Compound node combining child filters
    Compound {
        kind: CompoundKind,
        children: Vec<FilterExpr>,
    },

    /// Leaf comparison on a single field
    Simple {
        field: String,
        operator: FilterOperator,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<FilterValue>,
    },
}

impl FilterExpr {
    pub fn simple(field: &str, operator: FilterOperator, value: FilterValue) -> Self {
        FilterExpr::Simple {
            field: field.to_string(),
            operator,
            value: Some(value),
        }
    }

    pub fn and(children: Vec<FilterExpr>) -> Self {
        FilterExpr::Compound {
            kind: CompoundKind::And,
            children,
        }
    }

    pub fn or(children: Vec<FilterExpr>) -> Self {
        FilterExpr::Compound {
            kind: CompoundKind::Or,
            children,
        }
    }

    pub fn not(child: FilterExpr) -> Self {
        FilterExpr::Compound {
            kind: CompoundKind::Not,
            children: vec![child],
        }
    }
}

/// Compound filter connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundKind {
    And,
    Or,
    Not,
}

impl CompoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompoundKind::And => "and",
            CompoundKind::Or => "or",
            CompoundKind::Not => "not",
        }
    }
}

impl fmt::Display for CompoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompoundKind {
    type Err = crate::error::QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(CompoundKind::And),
            "or" => Ok(CompoundKind::Or),
            "not" => Ok(CompoundKind::Not),
            other => Err(crate::error::QueryError::UnsupportedCompound(
                other.to_string(),
            )),
        }
    }
}

/// Comparison operator of a simple filter node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    Exists,
    Cidr,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::In => "in",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::Regex => "regex",
            FilterOperator::Exists => "exists",
            FilterOperator::Cidr => "cidr",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FilterOperator {
    type Err = crate::error::QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(FilterOperator::Eq),
            "ne" => Ok(FilterOperator::Ne),
            "gt" => Ok(FilterOperator::Gt),
            "gte" => Ok(FilterOperator::Gte),
            "lt" => Ok(FilterOperator::Lt),
            "lte" => Ok(FilterOperator::Lte),
            "in" => Ok(FilterOperator::In),
            "contains" => Ok(FilterOperator::Contains),
            "startsWith" => Ok(FilterOperator::StartsWith),
            "endsWith" => Ok(FilterOperator::EndsWith),
            "regex" => Ok(FilterOperator::Regex),
            "exists" => Ok(FilterOperator::Exists),
            "cidr" => Ok(FilterOperator::Cidr),
            other => Err(crate::error::QueryError::UnsupportedOperator(
                other.to_string(),
            )),
        }
    }
}

/// Filter comparison value, decoded once at the JSON boundary.
///
/// Everything downstream of the validator can assume one of these three
/// shapes; raw JSON is never re-inspected per operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Scalar(ScalarValue),
    Array(Vec<ScalarValue>),
}

impl FilterValue {
    pub fn string(value: &str) -> Self {
        FilterValue::Scalar(ScalarValue::String(value.to_string()))
    }

    pub fn int(value: i64) -> Self {
        FilterValue::Scalar(ScalarValue::Int(value))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FilterValue::Bool(b) => serde_json::Value::Bool(*b),
            FilterValue::Scalar(s) => s.to_json(),
            FilterValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(ScalarValue::to_json).collect())
            }
        }
    }
}

/// Single comparison value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    String(String),
    Int(i64),
    Float(f64),
}

impl ScalarValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScalarValue::String(s) => serde_json::Value::String(s.clone()),
            ScalarValue::Int(i) => serde_json::Value::from(*i),
            ScalarValue::Float(f) => serde_json::Value::from(*f),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::String(s) => f.write_str(s),
            ScalarValue::Int(i) => write!(f, "{i}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Query time window.
///
/// Exactly one of the absolute bounds or the relative duration may be
/// present; the validator enforces the invariant. A nil time range is
/// unrestricted and always valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeRangeDef {
    /// Absolute window start, inclusive
    pub start: Option<DateTime<Utc>>,

    /// Absolute window end, inclusive
    pub end: Option<DateTime<Utc>>,

    /// Relative window ending now, e.g. "15m", "24h", "7d"
    pub last: Option<String>,
}

impl TimeRangeDef {
    pub fn last(duration: &str) -> Self {
        TimeRangeDef {
            last: Some(duration.to_string()),
            ..Default::default()
        }
    }

    pub fn absolute(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TimeRangeDef {
            start: Some(start),
            end: Some(end),
            last: None,
        }
    }
}

/// Aggregation request, possibly nested.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    /// Aggregation type
    #[serde(rename = "type")]
    pub agg_type: AggregationType,

    /// Result key for this aggregation
    pub name: String,

    /// Field path the aggregation runs over
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Bucket count for terms aggregations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    /// Bucket interval for date histograms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    /// Nested aggregations computed per bucket
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<Aggregation>,
}

/// Supported aggregation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    Terms,
    DateHistogram,
    Avg,
    Sum,
    Min,
    Max,
    Stats,
    Cardinality,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Terms => "terms",
            AggregationType::DateHistogram => "date_histogram",
            AggregationType::Avg => "avg",
            AggregationType::Sum => "sum",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::Stats => "stats",
            AggregationType::Cardinality => "cardinality",
        }
    }

    /// Bucket aggregations may carry nested aggregations; metrics may not.
    pub fn is_bucket(&self) -> bool {
        matches!(self, AggregationType::Terms | AggregationType::DateHistogram)
    }
}

impl std::str::FromStr for AggregationType {
    type Err = crate::error::QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terms" => Ok(AggregationType::Terms),
            "date_histogram" => Ok(AggregationType::DateHistogram),
            "avg" => Ok(AggregationType::Avg),
            "sum" => Ok(AggregationType::Sum),
            "min" => Ok(AggregationType::Min),
            "max" => Ok(AggregationType::Max),
            "stats" => Ok(AggregationType::Stats),
            "cardinality" => Ok(AggregationType::Cardinality),
            other => Err(crate::error::QueryError::UnsupportedAggregation(
                other.to_string(),
            )),
        }
    }
}

/// Sort field configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    /// Field path to sort by
    pub field: String,

    /// Sort direction
    #[serde(default)]
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: &str, order: SortOrder) -> Self {
        SortSpec {
            field: field.to_string(),
            order,
        }
    }
}

/// Sort direction enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Asc
    }
}

/// Flat search request used by simple keyword search and async job callers.
///
/// This shape stays a strict subset of what the job envelopes can express;
/// see [`SearchJobRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    /// Free-text query string
    pub query: Option<String>,

    /// Tenant identifier; always lowered into a filter clause when present
    pub tenant_id: Option<String>,

    /// Time window restricting the search
    pub time_range: Option<TimeRangeDef>,

    /// Sort specs applied in order
    pub sort: Vec<SortSpec>,

    /// search_after tuple from the previous page, passed through verbatim
    pub search_after: Option<Vec<serde_json::Value>>,

    /// Page size
    pub limit: Option<u32>,

    /// Fields projected onto each returned hit
    pub include_fields: Option<Vec<String>>,

    /// Named aggregations keyed by result name
    pub aggregations: HashMap<String, FlatAggregation>,
}

/// Aggregation entry on the flat request path.
///
/// The type is a free string here; unknown types are dropped during
/// translation rather than erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatAggregation {
    /// Aggregation type name
    #[serde(rename = "type")]
    pub agg_type: String,

    /// Field the aggregation runs over
    pub field: String,

    /// Bucket count for terms aggregations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    /// Bucket interval for date histograms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    /// Extra engine options passed through verbatim
    #[serde(flatten)]
    pub options: HashMap<String, serde_json::Value>,
}

impl FlatAggregation {
    pub fn terms(field: &str, size: Option<u32>) -> Self {
        FlatAggregation {
            agg_type: "terms".to_string(),
            field: field.to_string(),
            size,
            interval: None,
            options: HashMap::new(),
        }
    }

    pub fn date_histogram(field: &str, interval: Option<&str>) -> Self {
        FlatAggregation {
            agg_type: "date_histogram".to_string(),
            field: field.to_string(),
            size: None,
            interval: interval.map(String::from),
            options: HashMap::new(),
        }
    }
}

/// Async search job envelope consumed from the pub/sub transport.
///
/// Envelope keys are snake_case on the wire, unlike the camelCase IR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchJobRequest {
    /// Correlation identifier for the job
    pub job_id: String,

    /// Free-text query string
    pub query: String,

    /// Time window restricting the search
    pub time_range: Option<TimeRangeDef>,

    /// Group-by field for correlation jobs
    pub aggregation_key: Option<String>,

    /// Minimum bucket count for a correlation match
    pub threshold: Option<u64>,
}

/// Async search job outcome published back to the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchJobResult {
    pub success: bool,
    pub total_hits: u64,
    pub events: Vec<serde_json::Value>,
    pub matches: Vec<serde_json::Value>,
}

impl From<SearchJobRequest> for SearchRequest {
    fn from(job: SearchJobRequest) -> Self {
        let mut aggregations = HashMap::new();
        if let Some(key) = job.aggregation_key {
            aggregations.insert("group_by".to_string(), FlatAggregation::terms(&key, None));
        }
        SearchRequest {
            query: Some(job.query).filter(|q| !q.is_empty()),
            time_range: job.time_range,
            aggregations,
            ..Default::default()
        }
    }
}

/// One page of post-processed search hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// Projected hit documents
    pub events: Vec<serde_json::Value>,

    /// Total hit count reported by the engine, passed through verbatim
    pub total: u64,

    /// search_after tuple for the next page, when the page came back full
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Vec<serde_json::Value>>,

    /// Aggregation buckets reported by the engine, passed through verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_expr_decodes_to_exactly_one_variant() {
        let simple: FilterExpr = serde_json::from_value(json!({
            "field": ".class_uid",
            "operator": "eq",
            "value": 3002
        }))
        .unwrap();
        assert!(matches!(simple, FilterExpr::Simple { .. }));

        let compound: FilterExpr = serde_json::from_value(json!({
            "kind": "and",
            "children": [
                {"field": ".severity_id", "operator": "gte", "value": 3},
                {"field": ".status", "operator": "eq", "value": "failure"}
            ]
        }))
        .unwrap();
        match compound {
            FilterExpr::Compound { kind, children } => {
                assert_eq!(kind, CompoundKind::And);
                assert_eq!(children.len(), 2);
            }
            FilterExpr::Simple { .. } => panic!("expected compound"),
        }
    }

    #[test]
    fn filter_values_decode_into_closed_shapes() {
        let v: FilterValue = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(v, FilterValue::Bool(true));

        let v: FilterValue = serde_json::from_value(json!(3002)).unwrap();
        assert_eq!(v, FilterValue::Scalar(ScalarValue::Int(3002)));

        let v: FilterValue = serde_json::from_value(json!("admin")).unwrap();
        assert_eq!(v, FilterValue::string("admin"));

        let v: FilterValue = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(
            v,
            FilterValue::Array(vec![
                ScalarValue::String("a".to_string()),
                ScalarValue::String("b".to_string())
            ])
        );
    }

    #[test]
    fn query_wire_shape_is_camel_case() {
        let query: Query = serde_json::from_value(json!({
            "select": [".time", ".message"],
            "timeRange": {"last": "15m"},
            "sort": [{"field": ".time", "order": "desc"}],
            "limit": 50
        }))
        .unwrap();
        assert_eq!(query.select.len(), 2);
        assert_eq!(query.time_range.unwrap().last.as_deref(), Some("15m"));
        assert_eq!(query.sort[0].order, SortOrder::Desc);
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn sort_order_defaults_to_asc() {
        let spec: SortSpec = serde_json::from_value(json!({"field": ".time"})).unwrap();
        assert_eq!(spec.order, SortOrder::Asc);
    }

    #[test]
    fn operator_and_aggregation_names_parse() {
        assert_eq!("startsWith".parse::<FilterOperator>().unwrap(), FilterOperator::StartsWith);
        assert!(matches!(
            "between".parse::<FilterOperator>(),
            Err(crate::error::QueryError::UnsupportedOperator(op)) if op == "between"
        ));
        assert_eq!(
            "date_histogram".parse::<AggregationType>().unwrap(),
            AggregationType::DateHistogram
        );
        assert!(matches!(
            "percentiles".parse::<AggregationType>(),
            Err(crate::error::QueryError::UnsupportedAggregation(_))
        ));
        assert_eq!("not".parse::<CompoundKind>().unwrap(), CompoundKind::Not);
        assert!(matches!(
            "xor".parse::<CompoundKind>(),
            Err(crate::error::QueryError::UnsupportedCompound(_))
        ));
    }

    #[test]
    fn job_envelope_keys_are_snake_case() {
        let job: SearchJobRequest = serde_json::from_value(json!({
            "job_id": "job-1",
            "query": "failed login",
            "time_range": {"last": "1h"},
            "aggregation_key": ".actor.user.name",
            "threshold": 5
        }))
        .unwrap();
        assert_eq!(job.job_id, "job-1");
        assert_eq!(job.threshold, Some(5));

        let result = SearchJobResult {
            success: true,
            total_hits: 3,
            events: Vec::new(),
            matches: Vec::new(),
        };
        let rendered = serde_json::to_value(&result).unwrap();
        assert_eq!(rendered["total_hits"], json!(3));
    }

    #[test]
    fn job_request_converts_to_flat_request() {
        let job = SearchJobRequest {
            job_id: "job-1".to_string(),
            query: "failed login".to_string(),
            time_range: Some(TimeRangeDef::last("1h")),
            aggregation_key: Some(".actor.user.name".to_string()),
            threshold: Some(5),
        };
        let request = SearchRequest::from(job);
        assert_eq!(request.query.as_deref(), Some("failed login"));
        assert!(request.time_range.is_some());
        let agg = request.aggregations.get("group_by").unwrap();
        assert_eq!(agg.agg_type, "terms");
        assert_eq!(agg.field, ".actor.user.name");
    }
}
