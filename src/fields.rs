//! Field reference collection over filter trees
//! One generic walker serves the canonical FilterExpr and the loose
//! detection-rule filter shape.

use crate::dto::{Aggregation, FilterExpr, Query};
use crate::schema::{normalize_path, FieldSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Virtual fields produced at query evaluation time rather than stored on
/// the underlying events; exempt from schema lookup.
pub const DEFAULT_VIRTUAL_FIELDS: &[&str] = &[
    "event_count",
    "distinct_count",
    "count",
    "sum",
    "avg",
    "min",
    "max",
];

/// Tree capability shared by every filter shape.
///
/// A node is simple when it names a field, compound when it has children;
/// the walker never needs to know the concrete shape.
pub trait FilterNode {
    /// Field referenced by a simple node.
    fn simple_field(&self) -> Option<&str>;

    /// Children of a compound node.
    fn children(&self) -> Vec<&Self>;
}

impl FilterNode for FilterExpr {
    fn simple_field(&self) -> Option<&str> {
        match self {
            FilterExpr::Simple { field, .. } => Some(field),
            FilterExpr::Compound { .. } => None,
        }
    }

    fn children(&self) -> Vec<&Self> {
        match self {
            FilterExpr::Simple { .. } => Vec::new(),
            FilterExpr::Compound { children, .. } => children.iter().collect(),
        }
    }
}

/// Loosely-shaped filter node from a detection-rule document.
///
/// Rule filters predate the canonical IR; any combination of the fields
/// may be present, and grouping is expressed through `conditions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleFilter {
    pub field: Option<String>,
    pub operator: Option<String>,
    pub value: Option<serde_json::Value>,
    pub conditions: Vec<RuleFilter>,
}

impl FilterNode for RuleFilter {
    fn simple_field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    fn children(&self) -> Vec<&Self> {
        self.conditions.iter().collect()
    }
}

/// Detection-rule query document, as stored by the rule subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleQuery {
    /// Filter tree applied to the event stream
    pub filter: Option<RuleFilter>,
    /// Group-by clauses for threshold rules
    pub group_by: Vec<String>,
    /// Distinct-count field for cardinality rules
    pub distinct_of: Option<String>,
    /// Ordered steps for sequence rules
    pub sequence: Option<Vec<RuleStep>>,
    /// Result column ordering; entries are conventionally dot-less
    pub fields_order: Vec<String>,
}

/// One step of a sequence rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleStep {
    pub filter: Option<RuleFilter>,
}

/// A schema violation found in a detection-rule document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidField {
    /// Normalized field path that failed schema lookup
    pub path: String,
    /// Where in the document the reference appears
    pub location: String,
}

/// Collects the deduplicated set of field paths referenced anywhere in a
/// filter tree, normalized to their leading-dot form.
pub fn collect_filter_fields<N: FilterNode + ?Sized>(node: &N) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    walk(node, &mut out);
    out
}

fn walk<N: FilterNode + ?Sized>(node: &N, out: &mut BTreeSet<String>) {
    if let Some(field) = node.simple_field() {
        out.insert(normalize_path(field).into_owned());
    }
    for child in node.children() {
        walk(child, out);
    }
}

/// Collects every field path a canonical query references across select,
/// filter, aggregations, and sort.
pub fn collect_query_fields(query: &Query) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for path in &query.select {
        out.insert(normalize_path(path).into_owned());
    }
    if let Some(filter) = &query.filter {
        walk(filter, &mut out);
    }
    collect_aggregation_fields(&query.aggregations, &mut out);
    for spec in &query.sort {
        out.insert(normalize_path(&spec.field).into_owned());
    }
    out
}

fn collect_aggregation_fields(aggregations: &[Aggregation], out: &mut BTreeSet<String>) {
    for agg in aggregations {
        if let Some(field) = &agg.field {
            out.insert(normalize_path(field).into_owned());
        }
        collect_aggregation_fields(&agg.aggregations, out);
    }
}

/// Validates every field reference in a detection-rule document against
/// the schema, collecting **all** violations rather than stopping at the
/// first. Virtual fields in the allow-list are exempt from lookup.
pub fn validate_rule_fields(
    rule: &RuleQuery,
    schema: &FieldSchema,
    virtual_fields: &[&str],
) -> Vec<InvalidField> {
    let mut out = Vec::new();
    if let Some(filter) = &rule.filter {
        for path in collect_filter_fields(filter) {
            check_field(&path, "filter", schema, virtual_fields, &mut out);
        }
    }
    for (i, field) in rule.group_by.iter().enumerate() {
        let path = normalize_path(field);
        check_field(&path, &format!("group_by[{i}]"), schema, virtual_fields, &mut out);
    }
    if let Some(field) = &rule.distinct_of {
        let path = normalize_path(field);
        check_field(&path, "distinct_of", schema, virtual_fields, &mut out);
    }
    if let Some(steps) = &rule.sequence {
        for (i, step) in steps.iter().enumerate() {
            if let Some(filter) = &step.filter {
                for path in collect_filter_fields(filter) {
                    check_field(&path, &format!("sequence[{i}]"), schema, virtual_fields, &mut out);
                }
            }
        }
    }
    for (i, field) in rule.fields_order.iter().enumerate() {
        let path = normalize_path(field);
        check_field(&path, &format!("fields_order[{i}]"), schema, virtual_fields, &mut out);
    }
    out
}

/// True when the path names a virtual field from the allow-list.
pub fn is_virtual_field(path: &str, virtual_fields: &[&str]) -> bool {
    virtual_fields.contains(&path.trim_start_matches('.'))
}

fn check_field(
    path: &str,
    location: &str,
    schema: &FieldSchema,
    virtual_fields: &[&str],
    out: &mut Vec<InvalidField>,
) {
    if is_virtual_field(path, virtual_fields) {
        return;
    }
    if !schema.is_valid_field(path) {
        out.push(InvalidField {
            path: path.to_string(),
            location: location.to_string(),
        });
    }
}
