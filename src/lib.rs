//! Query core for the SIEM event-analytics platform
//!
//! Raw logs are normalized into a canonical event schema, stored, and
//! searched through a structured query interface. This crate is the shared
//! query compiler behind that interface: the canonical query IR, its
//! field-schema validator, and its lowering into OpenSearch-style query
//! documents. Validation and translation are pure transforms over immutable
//! inputs; the configured structural limits bound CPU cost, so the core is
//! safe for unbounded concurrent use from request handlers.

pub mod config;
pub mod dto;
pub mod error;
pub mod fields;
pub mod schema;
pub mod translate;
pub mod validation;

pub use config::EngineConfig;
pub use dto::{
    Aggregation, AggregationType, CompoundKind, FilterExpr, FilterOperator, FilterValue,
    FlatAggregation, Query, ScalarValue, SearchJobRequest, SearchJobResult, SearchPage,
    SearchRequest, SortOrder, SortSpec, TimeRangeDef,
};
pub use error::QueryError;
pub use fields::{
    collect_filter_fields, collect_query_fields, validate_rule_fields, FilterNode, InvalidField,
    RuleFilter, RuleQuery, RuleStep, DEFAULT_VIRTUAL_FIELDS,
};
pub use schema::{default_schema, FieldInfo, FieldKind, FieldSchema, FieldSchemaBuilder};
pub use translate::{QueryTranslator, TranslateSettings};
pub use validation::{QueryValidator, ValidatedQuery, ValidatorConfig};
