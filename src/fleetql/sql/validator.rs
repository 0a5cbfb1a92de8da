/*!
# Semantic Validation

Schema-aware validation of parsed queries. The validator checks, in order:
resource existence, selected fields, WHERE fields (recursing into condition
groups and subqueries), JOIN targets, ORDER BY, GROUP BY, aggregate targets,
DISTINCT compatibility, aggregation consistency, and HAVING usage. The first
violation wins; diagnostics are not accumulated.

Unknown resources and fields come back with up to three "did you mean"
suggestions, ranked by case-insensitive Levenshtein distance over every
candidate name and alias in the relevant scope.
*/

use crate::fleetql::schema::{ResourceDefinition, SchemaProvider};
use crate::fleetql::sql::ast::{AggregateFunc, ConditionGroup, OrderByField, Query};
use crate::fleetql::sql::error::{SqlError, SqlResult};
use std::sync::Arc;

/// Maximum edit distance for a suggestion candidate.
const SUGGESTION_DISTANCE: usize = 3;
/// Maximum number of suggestions returned with an error.
const SUGGESTION_LIMIT: usize = 3;

/// Validates queries against a schema.
pub struct QueryValidator {
    schema: Arc<dyn SchemaProvider>,
}

impl QueryValidator {
    pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
        QueryValidator { schema }
    }

    /// Validate a parsed query. Returns the first violation found.
    pub fn validate(&self, query: &Query) -> SqlResult<()> {
        self.validate_resource(&query.resource)?;

        let resource = self
            .schema
            .definition(&query.resource)
            .ok_or_else(|| {
                SqlError::validation_error(format!("Resource '{}' not found", query.resource))
            })?;

        self.validate_fields(resource, &query.fields)?;

        if let Some(conditions) = &query.conditions {
            self.validate_condition_group(resource, conditions)?;
        }

        for join in &query.joins {
            self.validate_resource(&join.resource).map_err(|err| {
                prefix_validation_error("JOIN validation failed: ", err)
            })?;
        }

        self.validate_order_by(resource, &query.order_by, &query.aggregates, &query.fields)?;
        self.validate_group_by(resource, &query.group_by)?;
        self.validate_aggregates(resource, &query.aggregates)?;
        self.validate_distinct(query)?;
        self.validate_aggregation_consistency(resource, query)?;

        if let Some(having) = &query.having {
            self.validate_having(resource, having, query)?;
        }

        Ok(())
    }

    fn validate_resource(&self, name: &str) -> SqlResult<()> {
        if name.is_empty() {
            return Err(SqlError::validation_error("Resource name is required"));
        }
        if self.schema.resource_exists(name) {
            return Ok(());
        }
        Err(SqlError::validation_error_with_suggestions(
            format!("Resource '{}' not found", name),
            self.similar_resources(name),
        ))
    }

    fn validate_fields(&self, resource: &ResourceDefinition, fields: &[String]) -> SqlResult<()> {
        // Empty or bare "*" means "use the default projection"
        if fields.is_empty() || (fields.len() == 1 && fields[0] == "*") {
            return Ok(());
        }

        for field in fields {
            if is_aggregate_token(field) {
                continue;
            }
            self.check_field(resource, field, None)?;
        }
        Ok(())
    }

    /// Check that a field resolves to a schema field, allowing dotted
    /// sub-map access on Map-typed fields. `clause` names the clause for the
    /// error message.
    fn check_field(
        &self,
        resource: &ResourceDefinition,
        field: &str,
        clause: Option<&str>,
    ) -> SqlResult<()> {
        let canonical = resource.resolve_field_alias(field);
        if resource.fields.contains_key(&canonical)
            || resource.map_sub_field(&canonical).is_some()
        {
            return Ok(());
        }
        let message = match clause {
            Some(clause) => format!(
                "Field '{}' in {} clause not found in resource '{}'",
                field, clause, resource.name
            ),
            None => format!(
                "Field '{}' not found in resource '{}'",
                field, resource.name
            ),
        };
        Err(SqlError::validation_error_with_suggestions(
            message,
            self.similar_fields(resource, field),
        ))
    }

    fn validate_condition_group(
        &self,
        resource: &ResourceDefinition,
        group: &ConditionGroup,
    ) -> SqlResult<()> {
        for condition in &group.conditions {
            // A subquery condition validates its own resource instead of a
            // field of the outer resource
            if let Some(subquery) = &condition.subquery {
                self.validate_resource(&subquery.resource).map_err(|err| {
                    prefix_validation_error("subquery validation failed: ", err)
                })?;
                continue;
            }
            self.check_field(resource, &condition.field, Some("WHERE"))?;
        }
        for sub in &group.sub_groups {
            self.validate_condition_group(resource, sub)?;
        }
        Ok(())
    }

    fn validate_order_by(
        &self,
        resource: &ResourceDefinition,
        order_by: &[OrderByField],
        aggregates: &[AggregateFunc],
        fields: &[String],
    ) -> SqlResult<()> {
        for ob in order_by {
            if is_aggregate_token(&ob.field) {
                continue;
            }

            // Aggregate alias in use
            if aggregates.iter().any(|agg| agg.alias == ob.field) {
                continue;
            }

            // A selected field, compared through alias normalization
            let canonical = resource.resolve_field_alias(&ob.field);
            if fields
                .iter()
                .any(|f| f == &ob.field || resource.resolve_field_alias(f) == canonical)
            {
                continue;
            }

            self.check_field(resource, &ob.field, Some("ORDER BY"))?;
        }
        Ok(())
    }

    fn validate_group_by(
        &self,
        resource: &ResourceDefinition,
        group_by: &[String],
    ) -> SqlResult<()> {
        for field in group_by {
            self.check_field(resource, field, Some("GROUP BY"))?;
        }
        Ok(())
    }

    fn validate_aggregates(
        &self,
        resource: &ResourceDefinition,
        aggregates: &[AggregateFunc],
    ) -> SqlResult<()> {
        for agg in aggregates {
            if agg.field.is_empty() || agg.field == "*" {
                continue;
            }
            let canonical = resource.resolve_field_alias(&agg.field);
            if !resource.fields.contains_key(&canonical) {
                return Err(SqlError::validation_error_with_suggestions(
                    format!(
                        "Field '{}' in {}() aggregation not found in resource '{}'",
                        agg.field,
                        agg.function.as_str(),
                        resource.name
                    ),
                    self.similar_fields(resource, &agg.field),
                ));
            }
        }
        Ok(())
    }

    fn validate_distinct(&self, query: &Query) -> SqlResult<()> {
        if !query.distinct {
            return Ok(());
        }
        if !query.aggregates.is_empty() {
            return Err(SqlError::validation_error(
                "DISTINCT cannot be used with aggregate functions",
            ));
        }
        if !query.group_by.is_empty() {
            return Err(SqlError::validation_error(
                "DISTINCT cannot be used with GROUP BY clause",
            ));
        }
        Ok(())
    }

    fn validate_aggregation_consistency(
        &self,
        resource: &ResourceDefinition,
        query: &Query,
    ) -> SqlResult<()> {
        let has_aggregates = !query.aggregates.is_empty();
        let has_group_by = !query.group_by.is_empty();

        // Aggregates without GROUP BY collapse to one row, so every selected
        // field must itself be an aggregate
        if has_aggregates && !has_group_by {
            for field in &query.fields {
                if field == "*" {
                    return Err(SqlError::validation_error(
                        "Cannot use '*' with aggregate functions without GROUP BY",
                    ));
                }
                if !is_aggregate_token(field) {
                    return Err(SqlError::validation_error(format!(
                        "Field '{}' must appear in GROUP BY or be an aggregate function",
                        field
                    )));
                }
            }
        }

        if has_group_by {
            for field in &query.fields {
                if field == "*" {
                    return Err(SqlError::validation_error(
                        "Cannot use '*' with GROUP BY clause",
                    ));
                }
                if is_aggregate_token(field) {
                    continue;
                }
                let canonical = resource.resolve_field_alias(field);
                let grouped = query
                    .group_by
                    .iter()
                    .any(|gb| resource.resolve_field_alias(gb) == canonical);
                if !grouped {
                    return Err(SqlError::validation_error(format!(
                        "Field '{}' must appear in GROUP BY or be an aggregate function",
                        field
                    )));
                }
            }
        }

        if query.having.is_some() && !has_group_by && !has_aggregates {
            return Err(SqlError::validation_error(
                "HAVING clause requires GROUP BY or aggregate functions",
            ));
        }

        Ok(())
    }

    fn validate_having(
        &self,
        resource: &ResourceDefinition,
        having: &ConditionGroup,
        query: &Query,
    ) -> SqlResult<()> {
        if query.group_by.is_empty() && query.aggregates.is_empty() {
            return Err(SqlError::validation_error(
                "HAVING clause requires GROUP BY or aggregate functions",
            ));
        }
        self.validate_having_group(resource, having, query)
    }

    fn validate_having_group(
        &self,
        resource: &ResourceDefinition,
        group: &ConditionGroup,
        query: &Query,
    ) -> SqlResult<()> {
        for condition in &group.conditions {
            if is_aggregate_token(&condition.field) {
                continue;
            }

            let canonical = resource.resolve_field_alias(&condition.field);
            let grouped = query
                .group_by
                .iter()
                .any(|gb| resource.resolve_field_alias(gb) == canonical);
            if !grouped {
                return Err(SqlError::validation_error(format!(
                    "Field '{}' in HAVING clause must be in GROUP BY or be an aggregate function",
                    condition.field
                )));
            }

            self.check_field(resource, &condition.field, Some("HAVING"))?;
        }
        for sub in &group.sub_groups {
            self.validate_having_group(resource, sub, query)?;
        }
        Ok(())
    }

    fn similar_resources(&self, name: &str) -> Vec<String> {
        let mut candidates = Vec::new();
        for def in self.schema.resources() {
            push_candidate(&mut candidates, name, &def.name);
            for alias in &def.aliases {
                push_candidate(&mut candidates, name, alias);
            }
        }
        rank_candidates(candidates)
    }

    fn similar_fields(&self, resource: &ResourceDefinition, name: &str) -> Vec<String> {
        let mut field_names: Vec<&String> = resource.fields.keys().collect();
        // Deterministic enumeration order keeps tie-breaking stable
        field_names.sort();

        let mut candidates = Vec::new();
        for field_name in field_names {
            push_candidate(&mut candidates, name, field_name);
            for alias in &resource.fields[field_name].aliases {
                push_candidate(&mut candidates, name, alias);
            }
        }
        rank_candidates(candidates)
    }
}

/// Is the token one of the aggregate-function spellings the parser leaves in
/// a field position (`COUNT`, `SUM.field`, `AVG(...)`), case-insensitively?
pub fn is_aggregate_token(field: &str) -> bool {
    let upper = field.to_ascii_uppercase();
    ["COUNT", "SUM", "AVG", "MIN", "MAX"].iter().any(|agg| {
        upper == *agg
            || upper.starts_with(&format!("{}.", agg))
            || upper.starts_with(&format!("{}(", agg))
    })
}

fn prefix_validation_error(prefix: &str, err: SqlError) -> SqlError {
    match err {
        SqlError::ValidationError {
            message,
            suggestions,
        } => SqlError::ValidationError {
            message: format!("{}{}", prefix, message),
            suggestions,
        },
        other => other,
    }
}

fn push_candidate(candidates: &mut Vec<(usize, String)>, input: &str, candidate: &str) {
    let distance = levenshtein_distance(
        &input.to_ascii_lowercase(),
        &candidate.to_ascii_lowercase(),
    );
    if distance <= SUGGESTION_DISTANCE {
        candidates.push((distance, candidate.to_string()));
    }
}

fn rank_candidates(mut candidates: Vec<(usize, String)>) -> Vec<String> {
    // Stable sort: ties keep enumeration order
    candidates.sort_by_key(|(distance, _)| *distance);
    candidates
        .into_iter()
        .take(SUGGESTION_LIMIT)
        .map(|(_, name)| name)
        .collect()
}

/// Classic dynamic-programming Levenshtein edit distance.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::levenshtein_distance;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("pod", "pod"), 0);
        assert_eq!(levenshtein_distance("pod", "pods"), 1);
        assert_eq!(levenshtein_distance("podz", "pods"), 1);
        assert_eq!(levenshtein_distance("deployment", "deplyment"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
    }
}
