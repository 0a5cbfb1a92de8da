/*!
# Query Execution Engine

Orchestrates the fixed execution order of a query:

1. resolve field aliases once, on the engine's own copy of the AST
2. resolve `IN`-subqueries in the WHERE tree into concrete value sets
3. fetch rows (joins fetch every participating resource concurrently) and
   flatten raw documents into rows via the schema's extraction paths
4. WHERE filter
5. GROUP BY / aggregation, then HAVING
6. DISTINCT
7. ORDER BY (stable, multi-key, numeric-first comparison)
8. OFFSET then LIMIT

The engine owns no data: records come from the [`RowFetcher`], definitions
from the [`SchemaProvider`], both shared behind `Arc` and safe across
concurrent executions. A fetch failure for any participating resource aborts
the whole query.
*/

use crate::fleetql::datasource::{FetchScope, RowFetcher};
use crate::fleetql::schema::{FieldDefinition, FieldType, ResourceDefinition, SchemaProvider};
use crate::fleetql::sql::ast::{Condition, ConditionGroup, Query};
use crate::fleetql::sql::error::{SqlError, SqlResult};
use crate::fleetql::sql::execution::aggregate::AggregateProcessor;
use crate::fleetql::sql::execution::expression::ConditionEvaluator;
use crate::fleetql::sql::execution::join::JoinProcessor;
use crate::fleetql::sql::execution::types::{FieldValue, Record};
use crate::fleetql::sql::execution::utils::quantity::{parse_cpu_millicores, parse_memory_mib};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use log::debug;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Separator between DISTINCT key components.
const DISTINCT_KEY_SEPARATOR: &str = "|";

/// Final rows and the resolved output column list of one execution.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub rows: Vec<Record>,
    pub columns: Vec<String>,
}

/// Executes parsed queries against a schema and a row fetcher.
pub struct QueryEngine {
    schema: Arc<dyn SchemaProvider>,
    fetcher: Arc<dyn RowFetcher>,
}

impl QueryEngine {
    pub fn new(schema: Arc<dyn SchemaProvider>, fetcher: Arc<dyn RowFetcher>) -> Self {
        QueryEngine { schema, fetcher }
    }

    /// Execute a query. The engine works on its own resolved copy, so the
    /// same parsed query can be executed repeatedly or concurrently.
    pub async fn execute(&self, query: &Query) -> SqlResult<QueryOutput> {
        self.execute_owned(query.clone()).await
    }

    fn execute_boxed(&self, query: Query) -> BoxFuture<'_, SqlResult<QueryOutput>> {
        self.execute_owned(query).boxed()
    }

    async fn execute_owned(&self, mut query: Query) -> SqlResult<QueryOutput> {
        let resource = self.schema.definition(&query.resource).ok_or_else(|| {
            SqlError::schema_error("resource not found in schema", &query.resource)
        })?;

        // Alias resolution happens exactly once; from here on every field
        // reference in the AST is canonical.
        resolve_query_aliases(&mut query, resource);
        self.resolve_subqueries(&mut query).await?;

        if query.joins.is_empty() {
            self.execute_plain(&query, resource).await
        } else {
            self.execute_join(&query, resource).await
        }
    }

    /// Resolve every `IN`-subquery in the WHERE tree into its value set: the
    /// subquery runs through the engine and its first output column becomes
    /// the membership set.
    async fn resolve_subqueries(&self, query: &mut Query) -> SqlResult<()> {
        let Some(conditions) = query.conditions.as_mut() else {
            return Ok(());
        };

        let mut pending = Vec::new();
        collect_subquery_conditions(conditions, &mut pending);

        for condition in pending {
            let subquery = condition
                .subquery
                .as_deref()
                .cloned()
                .unwrap_or_default();
            let output = self.execute_boxed(subquery).await?;

            let mut values = HashSet::new();
            if let Some(column) = output.columns.first() {
                for row in &output.rows {
                    values.insert(row.resolve(column).to_string());
                }
            }
            debug!(
                "resolved subquery for field '{}' to {} value(s)",
                condition.field,
                values.len()
            );
            condition.resolved_set = Some(values);
        }
        Ok(())
    }

    async fn execute_plain(
        &self,
        query: &Query,
        resource: &ResourceDefinition,
    ) -> SqlResult<QueryOutput> {
        let scope = FetchScope::namespaced(&query.scope);
        let raw = self
            .fetcher
            .fetch(resource, &scope)
            .await
            .map_err(|err| SqlError::fetch_error(&resource.name, err.to_string()))?;
        debug!("fetched {} row(s) from '{}'", raw.len(), resource.name);

        // Every schema field is extracted, not only the selected ones:
        // WHERE and aggregation may reference unselected fields, and the
        // scope field takes part in filtering even when not projected.
        let mut rows = Vec::with_capacity(raw.len());
        for item in &raw {
            let row = extract_row(item, resource);
            if let Some(conditions) = &query.conditions {
                if !ConditionEvaluator::eval_group(conditions, &row) {
                    continue;
                }
            }
            rows.push(row);
        }
        debug!("{} row(s) after WHERE filter", rows.len());

        let columns = resolve_projection(query, resource);
        Ok(finish_pipeline(rows, columns, query))
    }

    async fn execute_join(
        &self,
        query: &Query,
        resource: &ResourceDefinition,
    ) -> SqlResult<QueryOutput> {
        let primary_prefix = query
            .resource_alias
            .clone()
            .unwrap_or_else(|| query.resource.clone());

        // Every participating resource, with the prefix its fields carry in
        // merged rows
        let mut targets: Vec<(&ResourceDefinition, String)> =
            vec![(resource, primary_prefix.clone())];
        for join in &query.joins {
            let def = self.schema.definition(&join.resource).ok_or_else(|| {
                SqlError::schema_error("resource not found in schema", &join.resource)
            })?;
            targets.push((def, join.prefix().to_string()));
        }

        // Independent pure reads: fetch all sides concurrently. Row order
        // within each branch is preserved as returned.
        let scope = FetchScope::namespaced(&query.scope);
        let fetches = targets.iter().map(|(def, prefix)| {
            let scope = scope.clone();
            async move {
                let raw = self
                    .fetcher
                    .fetch(def, &scope)
                    .await
                    .map_err(|err| SqlError::fetch_error(&def.name, err.to_string()))?;
                Ok::<_, SqlError>(project_prefixed_rows(&raw, def, prefix))
            }
        });
        let mut sides = try_join_all(fetches).await?;

        let mut results = sides.remove(0);
        for (join, side) in query.joins.iter().zip(sides.iter()) {
            results = JoinProcessor::perform_join(&results, side, join);
            debug!(
                "{} row(s) after {:?} join with '{}'",
                results.len(),
                join.join_type,
                join.resource
            );
        }

        if let Some(conditions) = &query.conditions {
            results.retain(|row| ConditionEvaluator::eval_group(conditions, row));
        }

        let columns = resolve_join_projection(query, &targets);
        Ok(finish_pipeline(results, columns, query))
    }
}

/// Aggregation, DISTINCT, ORDER BY, and pagination - the tail shared by the
/// plain and join paths.
fn finish_pipeline(mut rows: Vec<Record>, mut columns: Vec<String>, query: &Query) -> QueryOutput {
    if !query.aggregates.is_empty() || !query.group_by.is_empty() {
        let (aggregated, fields) = AggregateProcessor::apply(rows, query);
        rows = aggregated;
        columns = fields;
    }

    if query.distinct {
        rows = apply_distinct(rows, &columns);
    }

    if !query.order_by.is_empty() {
        sort_records(&mut rows, query);
    }

    let rows = apply_limit_offset(rows, query.limit, query.offset);
    QueryOutput { rows, columns }
}

/// Resolve all field aliases to canonical names, in place, across selected
/// fields, WHERE, ORDER BY, GROUP BY, and HAVING.
fn resolve_query_aliases(query: &mut Query, resource: &ResourceDefinition) {
    for field in &mut query.fields {
        *field = resource.resolve_field_alias(field);
    }
    if let Some(conditions) = &mut query.conditions {
        resolve_condition_aliases(conditions, resource);
    }
    for ob in &mut query.order_by {
        ob.field = resource.resolve_field_alias(&ob.field);
    }
    for gb in &mut query.group_by {
        *gb = resource.resolve_field_alias(gb);
    }
    if let Some(having) = &mut query.having {
        resolve_condition_aliases(having, resource);
    }
}

fn resolve_condition_aliases(group: &mut ConditionGroup, resource: &ResourceDefinition) {
    for condition in &mut group.conditions {
        condition.field = resource.resolve_field_alias(&condition.field);
    }
    for sub in &mut group.sub_groups {
        resolve_condition_aliases(sub, resource);
    }
}

fn collect_subquery_conditions<'a>(
    group: &'a mut ConditionGroup,
    out: &mut Vec<&'a mut Condition>,
) {
    for condition in &mut group.conditions {
        if condition.subquery.is_some() && condition.resolved_set.is_none() {
            out.push(condition);
        }
    }
    for sub in &mut group.sub_groups {
        collect_subquery_conditions(sub, out);
    }
}

/// Flatten one raw document into a row holding every schema field.
fn extract_row(item: &Record, resource: &ResourceDefinition) -> Record {
    let mut row = Record::new();
    for (name, field) in &resource.fields {
        row.insert(name.clone(), extract_field(item, field));
    }
    row
}

/// Walk a field's dotted extraction path through the nested document. A
/// `[*]` suffix on a segment selects the whole value at that key (typically
/// a list). Quantity-typed fields are coerced to numbers.
fn extract_field(item: &Record, field: &FieldDefinition) -> FieldValue {
    let path = if field.path.is_empty() {
        &field.name
    } else {
        &field.path
    };

    let mut current: Option<FieldValue> = None;
    for part in path.split('.') {
        let (key, whole_value) = match part.strip_suffix("[*]") {
            Some(stripped) => (stripped, true),
            None => (part, false),
        };

        let next = match &current {
            None => item.get(key).cloned(),
            Some(FieldValue::Map(map)) => map.get(key).cloned(),
            Some(_) => None,
        };

        match next {
            Some(value) => {
                if whole_value {
                    return coerce_quantity(value, field.field_type);
                }
                current = Some(value);
            }
            None => return FieldValue::Null,
        }
    }

    coerce_quantity(current.unwrap_or(FieldValue::Null), field.field_type)
}

fn coerce_quantity(value: FieldValue, field_type: FieldType) -> FieldValue {
    let converted = match (&value, field_type) {
        (FieldValue::String(s), FieldType::CpuQuantity) => parse_cpu_millicores(s),
        (FieldValue::String(s), FieldType::MemoryQuantity) => parse_memory_mib(s),
        _ => return value,
    };
    match converted {
        Some(number) => FieldValue::Integer(number),
        None => value,
    }
}

/// Project raw documents into rows carrying both `prefix.field` and bare
/// `field` keys, the shape the join processor and output columns expect.
fn project_prefixed_rows(
    raw: &[Record],
    resource: &ResourceDefinition,
    prefix: &str,
) -> Vec<Record> {
    raw.iter()
        .map(|item| {
            let mut row = Record::new();
            for (name, field) in &resource.fields {
                let value = extract_field(item, field);
                row.insert(format!("{}.{}", prefix, name), value.clone());
                row.insert(name.clone(), value);
            }
            row
        })
        .collect()
}

/// Output columns of a plain query: the selected fields, with the `*`
/// sentinel expanded to the schema's default projection (else all fields,
/// sorted).
fn resolve_projection(query: &Query, resource: &ResourceDefinition) -> Vec<String> {
    if query.fields.is_empty() || (query.fields.len() == 1 && query.fields[0] == "*") {
        return resource.projection_fields();
    }
    query.fields.clone()
}

/// Output columns of a join query: `*` expands to `prefix.field` names for
/// every involved resource.
fn resolve_join_projection(query: &Query, targets: &[(&ResourceDefinition, String)]) -> Vec<String> {
    if !(query.fields.len() == 1 && query.fields[0] == "*") {
        return query.fields.clone();
    }

    let mut columns = Vec::new();
    for (def, prefix) in targets {
        for field in def.projection_fields() {
            columns.push(format!("{}.{}", prefix, field));
        }
    }
    columns
}

/// Keep the first occurrence of each distinct projected tuple, preserving
/// input order. Applying this twice is equivalent to applying it once.
pub fn apply_distinct(rows: Vec<Record>, columns: &[String]) -> Vec<Record> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let key = columns
                .iter()
                .map(|c| row.resolve(c).to_string())
                .collect::<Vec<_>>()
                .join(DISTINCT_KEY_SEPARATOR);
            seen.insert(key)
        })
        .collect()
}

/// Stable multi-key sort; each key compares numerically when both sides
/// parse as numbers, lexicographically otherwise.
fn sort_records(rows: &mut [Record], query: &Query) {
    rows.sort_by(|a, b| {
        for order in &query.order_by {
            let va = a.resolve(&order.field).to_string();
            let vb = b.resolve(&order.field).to_string();

            let ordering = match (va.parse::<f64>(), vb.parse::<f64>()) {
                (Ok(na), Ok(nb)) => na.partial_cmp(&nb).unwrap_or(Ordering::Equal),
                _ => va.cmp(&vb),
            };
            let ordering = if order.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Apply OFFSET then LIMIT. Non-positive values are no-ops; an offset at or
/// beyond the row count yields an empty result.
pub fn apply_limit_offset(rows: Vec<Record>, limit: i64, offset: i64) -> Vec<Record> {
    if limit <= 0 && offset <= 0 {
        return rows;
    }

    let start = offset.max(0) as usize;
    if start >= rows.len() {
        return Vec::new();
    }

    let take = if limit > 0 {
        limit as usize
    } else {
        usize::MAX
    };
    rows.into_iter().skip(start).take(take).collect()
}
