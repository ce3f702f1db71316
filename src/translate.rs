//! Query lowering into OpenSearch query-DSL documents
//! Pure and stateless; assumes validated input and performs no I/O.

use crate::dto::{
    Aggregation, AggregationType, CompoundKind, FilterExpr, FilterOperator, FilterValue,
    FlatAggregation, ScalarValue, SearchPage, SearchRequest, SortSpec, TimeRangeDef,
};
use crate::validation::ValidatedQuery;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::warn;

/// Settings shaping the translated documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslateSettings {
    /// Canonical event timestamp field
    pub timestamp_field: String,
    /// Tenant isolation field
    pub tenant_field: String,
    /// Page size when the request does not specify one
    pub default_page_size: u32,
}

impl Default for TranslateSettings {
    fn default() -> Self {
        Self {
            timestamp_field: ".time".to_string(),
            tenant_field: ".tenant_id".to_string(),
            default_page_size: 100,
        }
    }
}

/// Translator from the query core's shapes into engine query documents.
pub struct QueryTranslator {
    settings: TranslateSettings,
}

/// IR paths are dot-rooted; the engine addresses fields without the root dot.
fn engine_field(path: &str) -> &str {
    path.strip_prefix('.').unwrap_or(path)
}

impl QueryTranslator {
    pub fn new(settings: TranslateSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TranslateSettings {
        &self.settings
    }

    /// Lowers a flat search request into an engine query document.
    pub fn translate_request(&self, request: &SearchRequest) -> Value {
        let mut must: Vec<Value> = Vec::new();
        let mut filter: Vec<Value> = Vec::new();

        if let Some(query) = &request.query {
            let trimmed = query.trim();
            if !trimmed.is_empty() && trimmed != "*" {
                must.push(json!({"query_string": {"query": trimmed}}));
            }
        }
        // Tenant isolation is a mandatory boundary, never user-overridable
        if let Some(tenant) = &request.tenant_id {
            filter.push(self.tenant_clause(tenant));
        }
        if let Some(range) = &request.time_range {
            if let Some(clause) = self.time_range_clause(range) {
                filter.push(clause);
            }
        }

        let mut body = Map::new();
        body.insert("query".to_string(), bool_or_match_all(must, filter));
        body.insert(
            "size".to_string(),
            json!(request.limit.unwrap_or(self.settings.default_page_size)),
        );
        if !request.sort.is_empty() {
            body.insert("sort".to_string(), sort_specs(&request.sort));
        }
        if let Some(after) = &request.search_after {
            if !after.is_empty() {
                body.insert("search_after".to_string(), json!(after));
            }
        }
        let aggs = self.flat_aggregations(&request.aggregations);
        if !aggs.is_empty() {
            body.insert("aggs".to_string(), Value::Object(aggs));
        }
        Value::Object(body)
    }

    /// Lowers a validated canonical query into an engine query document.
    ///
    /// Assumes the query passed validation; constructs it cannot represent
    /// are dropped silently rather than re-checked here.
    pub fn translate_query(&self, validated: &ValidatedQuery<'_>, tenant_id: Option<&str>) -> Value {
        let query = validated.query();
        let must: Vec<Value> = Vec::new();
        let mut filter: Vec<Value> = Vec::new();

        if let Some(tenant) = tenant_id {
            filter.push(self.tenant_clause(tenant));
        }
        if let Some(range) = &query.time_range {
            if let Some(clause) = self.time_range_clause(range) {
                filter.push(clause);
            }
        }
        if let Some(expr) = &query.filter {
            filter.push(filter_clause(expr));
        }

        let mut body = Map::new();
        body.insert("query".to_string(), bool_or_match_all(must, filter));
        body.insert(
            "size".to_string(),
            json!(query.limit.unwrap_or(self.settings.default_page_size)),
        );
        if query.offset > 0 {
            body.insert("from".to_string(), json!(query.offset));
        }
        if let Some(cursor) = &query.cursor {
            if !cursor.is_empty() {
                body.insert("search_after".to_string(), json!(cursor));
            }
        }
        if !query.select.is_empty() {
            let includes: Vec<&str> = query.select.iter().map(|p| engine_field(p)).collect();
            body.insert("_source".to_string(), json!(includes));
        }
        if !query.sort.is_empty() {
            body.insert("sort".to_string(), sort_specs(&query.sort));
        }
        let aggs = ir_aggregations(&query.aggregations);
        if !aggs.is_empty() {
            body.insert("aggs".to_string(), Value::Object(aggs));
        }
        Value::Object(body)
    }

    /// Post-processes a page of raw engine hits.
    ///
    /// Projection keeps exactly the requested keys present on each hit;
    /// missing keys are dropped, never synthesized. The next cursor is the
    /// last hit's sort tuple, produced only when the page came back full
    /// (a "maybe more" heuristic, not authoritative).
    pub fn process_hits(
        &self,
        hits: &[Value],
        include_fields: Option<&[String]>,
        limit: u32,
        total: u64,
        aggregations: Option<Value>,
    ) -> SearchPage {
        let events = hits
            .iter()
            .map(|hit| project(source_of(hit), include_fields))
            .collect();
        let next_cursor = if !hits.is_empty() && hits.len() as u32 == limit {
            hits.last()
                .and_then(|hit| hit.get("sort"))
                .and_then(Value::as_array)
                .cloned()
        } else {
            None
        };
        SearchPage {
            events,
            total,
            next_cursor,
            aggregations,
        }
    }

    fn tenant_clause(&self, tenant: &str) -> Value {
        let field = engine_field(&self.settings.tenant_field);
        json!({"term": {field: tenant}})
    }

    /// Inclusive bounds on the canonical timestamp field. Relative windows
    /// lower to engine-side date math so translation needs no clock.
    fn time_range_clause(&self, range: &TimeRangeDef) -> Option<Value> {
        let mut bounds = Map::new();
        if let Some(last) = &range.last {
            bounds.insert("gte".to_string(), json!(format!("now-{last}")));
        } else {
            if let Some(start) = range.start {
                bounds.insert("gte".to_string(), json!(start.timestamp()));
            }
            if let Some(end) = range.end {
                bounds.insert("lte".to_string(), json!(end.timestamp()));
            }
        }
        if bounds.is_empty() {
            return None;
        }
        let field = engine_field(&self.settings.timestamp_field);
        Some(json!({"range": {field: bounds}}))
    }

    fn flat_aggregations(&self, aggregations: &HashMap<String, FlatAggregation>) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, agg) in aggregations {
            match flat_aggregation(agg) {
                Some(doc) => {
                    out.insert(name.clone(), doc);
                }
                None => {
                    warn!(name = %name, agg_type = %agg.agg_type, "dropping unsupported aggregation type");
                }
            }
        }
        out
    }
}

fn bool_or_match_all(must: Vec<Value>, filter: Vec<Value>) -> Value {
    if must.is_empty() && filter.is_empty() {
        return json!({"match_all": {}});
    }
    let mut clauses = Map::new();
    if !must.is_empty() {
        clauses.insert("must".to_string(), Value::Array(must));
    }
    if !filter.is_empty() {
        clauses.insert("filter".to_string(), Value::Array(filter));
    }
    json!({"bool": clauses})
}

fn sort_specs(sort: &[SortSpec]) -> Value {
    Value::Array(
        sort.iter()
            .map(|spec| {
                let field = engine_field(&spec.field);
                json!({field: {"order": spec.order.as_str()}})
            })
            .collect(),
    )
}

fn filter_clause(expr: &FilterExpr) -> Value {
    match expr {
        FilterExpr::Compound { kind, children } => {
            let lowered: Vec<Value> = children.iter().map(filter_clause).collect();
            match kind {
                CompoundKind::And => json!({"bool": {"filter": lowered}}),
                CompoundKind::Or => json!({"bool": {"should": lowered, "minimum_should_match": 1}}),
                CompoundKind::Not => json!({"bool": {"must_not": lowered}}),
            }
        }
        FilterExpr::Simple {
            field,
            operator,
            value,
        } => simple_clause(field, *operator, value.as_ref()),
    }
}

fn simple_clause(field: &str, operator: FilterOperator, value: Option<&FilterValue>) -> Value {
    let field = engine_field(field);
    match operator {
        FilterOperator::Eq => json!({"term": {field: value_json(value)}}),
        FilterOperator::Ne => json!({"bool": {"must_not": [{"term": {field: value_json(value)}}]}}),
        FilterOperator::Gt => json!({"range": {field: {"gt": value_json(value)}}}),
        FilterOperator::Gte => json!({"range": {field: {"gte": value_json(value)}}}),
        FilterOperator::Lt => json!({"range": {field: {"lt": value_json(value)}}}),
        FilterOperator::Lte => json!({"range": {field: {"lte": value_json(value)}}}),
        FilterOperator::In => json!({"terms": {field: value_json(value)}}),
        FilterOperator::Contains => json!({"wildcard": {field: format!("*{}*", scalar_text(value))}}),
        FilterOperator::StartsWith => json!({"prefix": {field: scalar_text(value)}}),
        FilterOperator::EndsWith => json!({"wildcard": {field: format!("*{}", scalar_text(value))}}),
        FilterOperator::Regex => json!({"regexp": {field: scalar_text(value)}}),
        FilterOperator::Exists => match value {
            Some(FilterValue::Bool(false)) => {
                json!({"bool": {"must_not": [{"exists": {"field": field}}]}})
            }
            _ => json!({"exists": {"field": field}}),
        },
        // The engine matches CIDR notation directly on ip fields
        FilterOperator::Cidr => json!({"term": {field: scalar_text(value)}}),
    }
}

fn value_json(value: Option<&FilterValue>) -> Value {
    value.map(FilterValue::to_json).unwrap_or(Value::Null)
}

fn scalar_text(value: Option<&FilterValue>) -> String {
    match value {
        Some(FilterValue::Scalar(scalar)) => scalar.to_string(),
        Some(FilterValue::Bool(b)) => b.to_string(),
        Some(FilterValue::Array(items)) => items
            .iter()
            .map(ScalarValue::to_string)
            .collect::<Vec<_>>()
            .join(","),
        None => String::new(),
    }
}

fn flat_aggregation(agg: &FlatAggregation) -> Option<Value> {
    let agg_type: AggregationType = agg.agg_type.parse().ok()?;
    let field = engine_field(&agg.field);
    match agg_type {
        AggregationType::Terms => {
            let mut body = Map::new();
            body.insert("field".to_string(), json!(field));
            let size = match agg.size {
                Some(size) if size > 0 => size,
                _ => 10,
            };
            body.insert("size".to_string(), json!(size));
            for (key, value) in &agg.options {
                body.insert(key.clone(), value.clone());
            }
            Some(json!({"terms": body}))
        }
        AggregationType::DateHistogram => {
            let mut body = Map::new();
            body.insert("field".to_string(), json!(field));
            let interval = agg
                .interval
                .as_deref()
                .filter(|i| !i.is_empty())
                .unwrap_or("1h");
            body.insert("fixed_interval".to_string(), json!(interval));
            for (key, value) in &agg.options {
                if key != "interval" {
                    body.insert(key.clone(), value.clone());
                }
            }
            Some(json!({"date_histogram": body}))
        }
        _ => {
            let kind = agg_type.as_str();
            Some(json!({kind: {"field": field}}))
        }
    }
}

fn ir_aggregations(aggregations: &[Aggregation]) -> Map<String, Value> {
    let mut out = Map::new();
    for agg in aggregations {
        if let Some(doc) = ir_aggregation(agg) {
            out.insert(agg.name.clone(), doc);
        }
    }
    out
}

fn ir_aggregation(agg: &Aggregation) -> Option<Value> {
    let field = engine_field(agg.field.as_deref()?);
    let inner = match agg.agg_type {
        AggregationType::Terms => {
            let size = match agg.size {
                Some(size) if size > 0 => size,
                _ => 10,
            };
            json!({"field": field, "size": size})
        }
        AggregationType::DateHistogram => {
            let interval = agg
                .interval
                .as_deref()
                .filter(|i| !i.is_empty())
                .unwrap_or("1h");
            json!({"field": field, "fixed_interval": interval})
        }
        _ => json!({"field": field}),
    };
    let mut outer = Map::new();
    outer.insert(agg.agg_type.as_str().to_string(), inner);
    if agg.agg_type.is_bucket() && !agg.aggregations.is_empty() {
        let nested = ir_aggregations(&agg.aggregations);
        if !nested.is_empty() {
            outer.insert("aggs".to_string(), Value::Object(nested));
        }
    }
    Some(Value::Object(outer))
}

fn source_of(hit: &Value) -> &Value {
    hit.get("_source").unwrap_or(hit)
}

fn project(doc: &Value, include_fields: Option<&[String]>) -> Value {
    match (doc.as_object(), include_fields) {
        (Some(obj), Some(fields)) => {
            let mut out = Map::new();
            for field in fields {
                let key = engine_field(field);
                if let Some(value) = obj.get(key) {
                    out.insert(key.to_string(), value.clone());
                }
            }
            Value::Object(out)
        }
        _ => doc.clone(),
    }
}

impl Default for QueryTranslator {
    fn default() -> Self {
        Self::new(TranslateSettings::default())
    }
}
