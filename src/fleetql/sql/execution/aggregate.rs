//! Grouping and aggregation.
//!
//! Partitions filtered rows by the stringified GROUP BY key (first
//! appearance defines group output order), computes COUNT/SUM/AVG/MIN/MAX
//! per group, merges group-by values and other selected fields from each
//! group's first row, and applies HAVING. Aggregates without GROUP BY
//! collapse to a single summary row.

use crate::fleetql::sql::ast::{AggregateFunc, AggregateFunction, Query};
use crate::fleetql::sql::execution::expression::ConditionEvaluator;
use crate::fleetql::sql::execution::types::{FieldValue, Record};
use std::collections::HashMap;

/// Separator between group-key components.
const GROUP_KEY_SEPARATOR: &str = "|";

/// Stateless grouping/aggregation over in-memory record sets.
pub struct AggregateProcessor;

impl AggregateProcessor {
    /// Apply the query's aggregation to the retained rows. Returns the
    /// summarized rows and the output column list.
    pub fn apply(rows: Vec<Record>, query: &Query) -> (Vec<Record>, Vec<String>) {
        if query.group_by.is_empty() && !query.aggregates.is_empty() {
            let summary = compute_aggregates(&rows, &query.aggregates);
            return (vec![summary], output_fields(query));
        }

        if !query.group_by.is_empty() {
            return apply_group_by(rows, query);
        }

        let fields = query.fields.clone();
        (rows, fields)
    }
}

fn apply_group_by(rows: Vec<Record>, query: &Query) -> (Vec<Record>, Vec<String>) {
    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    let mut group_order: Vec<String> = Vec::new();

    for row in rows {
        let key = group_key(&row, &query.group_by);
        if !groups.contains_key(&key) {
            group_order.push(key.clone());
        }
        groups.entry(key).or_default().push(row);
    }

    let mut output = Vec::with_capacity(group_order.len());
    for key in &group_order {
        let group_rows = &groups[key];
        let first = &group_rows[0];
        let mut row = Record::new();

        // Group-by values come from the group's first row
        for field in &query.group_by {
            row.insert(field.clone(), first.resolve(field));
        }

        let aggregated = compute_aggregates(group_rows, &query.aggregates);
        for (alias, value) in aggregated.fields {
            row.insert(alias, value);
        }

        // Other selected fields also come from the first row
        for field in &query.fields {
            if !row.fields.contains_key(field) {
                row.insert(field.clone(), first.resolve(field));
            }
        }

        output.push(row);
    }

    if let Some(having) = &query.having {
        output.retain(|row| ConditionEvaluator::eval_group(having, row));
    }

    (output, output_fields(query))
}

fn group_key(row: &Record, group_by: &[String]) -> String {
    group_by
        .iter()
        .map(|field| row.resolve(field).to_string())
        .collect::<Vec<_>>()
        .join(GROUP_KEY_SEPARATOR)
}

fn compute_aggregates(rows: &[Record], aggregates: &[AggregateFunc]) -> Record {
    let mut result = Record::new();

    for agg in aggregates {
        let value = match agg.function {
            AggregateFunction::Count => {
                if agg.field == "*" {
                    FieldValue::Integer(rows.len() as i64)
                } else {
                    let count = rows
                        .iter()
                        .filter(|row| !row.resolve(&agg.field).is_null())
                        .count();
                    FieldValue::Integer(count as i64)
                }
            }
            AggregateFunction::Sum => {
                let sum: f64 = rows
                    .iter()
                    .map(|row| row.resolve(&agg.field).as_f64().unwrap_or(0.0))
                    .sum();
                FieldValue::Float(sum)
            }
            AggregateFunction::Avg => {
                let values: Vec<f64> = numeric_values(rows, &agg.field);
                if values.is_empty() {
                    FieldValue::Float(0.0)
                } else {
                    let avg = values.iter().sum::<f64>() / values.len() as f64;
                    FieldValue::Float((avg * 100.0).round() / 100.0)
                }
            }
            AggregateFunction::Min => numeric_values(rows, &agg.field)
                .into_iter()
                .fold(None::<f64>, |acc, v| {
                    Some(acc.map_or(v, |m| m.min(v)))
                })
                .map_or(FieldValue::Null, FieldValue::Float),
            AggregateFunction::Max => numeric_values(rows, &agg.field)
                .into_iter()
                .fold(None::<f64>, |acc, v| {
                    Some(acc.map_or(v, |m| m.max(v)))
                })
                .map_or(FieldValue::Null, FieldValue::Float),
        };
        result.insert(agg.alias.clone(), value);
    }

    result
}

/// Numeric candidates for AVG/MIN/MAX: null and non-numeric values are
/// excluded from the candidate set (and from AVG's denominator).
fn numeric_values(rows: &[Record], field: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.resolve(field).as_f64())
        .collect()
}

/// Output column list: group-by fields, selected fields, then aggregate
/// aliases, de-duplicated in first-occurrence order.
pub fn output_fields(query: &Query) -> Vec<String> {
    let mut fields = Vec::new();
    fields.extend(query.group_by.iter().cloned());
    fields.extend(query.fields.iter().cloned());
    fields.extend(query.aggregates.iter().map(|agg| agg.alias.clone()));

    let mut seen = std::collections::HashSet::new();
    fields
        .into_iter()
        .filter(|f| !f.is_empty() && seen.insert(f.clone()))
        .collect()
}
