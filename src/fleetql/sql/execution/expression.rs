//! Condition evaluation.
//!
//! Pure predicate evaluation over one [`Record`] at a time, shared by WHERE
//! and HAVING. Equality, LIKE, and IN compare through string coercion so
//! numeric and textual values behave uniformly; the ordering operators try
//! numeric comparison first and fall back to lexicographic order.

use crate::fleetql::sql::ast::{Condition, ConditionGroup, ConditionOperator, LogicalOperator};
use crate::fleetql::sql::execution::types::Record;
use regex::Regex;
use std::cmp::Ordering;

/// Evaluates condition trees against records.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate a condition group against a record.
    ///
    /// AND groups require every direct condition and nested group to hold;
    /// an empty AND group is vacuously true. OR groups short-circuit on the
    /// first true child; an empty OR group also evaluates true.
    pub fn eval_group(group: &ConditionGroup, record: &Record) -> bool {
        match group.operator {
            LogicalOperator::And => {
                group
                    .conditions
                    .iter()
                    .all(|c| Self::eval_condition(c, record))
                    && group
                        .sub_groups
                        .iter()
                        .all(|g| Self::eval_group(g, record))
            }
            LogicalOperator::Or => {
                if group.conditions.is_empty() && group.sub_groups.is_empty() {
                    return true;
                }
                group
                    .conditions
                    .iter()
                    .any(|c| Self::eval_condition(c, record))
                    || group
                        .sub_groups
                        .iter()
                        .any(|g| Self::eval_group(g, record))
            }
        }
    }

    /// Evaluate one atomic condition against a record.
    pub fn eval_condition(condition: &Condition, record: &Record) -> bool {
        let value = record.resolve(&condition.field);
        let value_str = value.to_string();

        match condition.operator {
            ConditionOperator::Equal => value_str == condition.value,
            ConditionOperator::NotEqual => value_str != condition.value,
            ConditionOperator::Like => Self::like_match(&condition.value, &value_str),
            ConditionOperator::NotLike => !Self::like_match(&condition.value, &value_str),
            ConditionOperator::In => Self::in_match(condition, &value_str),
            ConditionOperator::NotIn => !Self::in_match(condition, &value_str),
            ConditionOperator::GreaterThan => {
                Self::compare_values(&value_str, &condition.value) == Ordering::Greater
            }
            ConditionOperator::LessThan => {
                Self::compare_values(&value_str, &condition.value) == Ordering::Less
            }
            ConditionOperator::GreaterEqual => {
                Self::compare_values(&value_str, &condition.value) != Ordering::Less
            }
            ConditionOperator::LessEqual => {
                Self::compare_values(&value_str, &condition.value) != Ordering::Greater
            }
        }
    }

    /// SQL LIKE: `%` matches any sequence, `_` any single character.
    /// The match is case-insensitive and anchored to the full value.
    fn like_match(pattern: &str, value: &str) -> bool {
        let mut regex_pattern = String::with_capacity(pattern.len() + 8);
        regex_pattern.push_str("(?i)^");
        for ch in pattern.chars() {
            match ch {
                '%' => regex_pattern.push_str(".*"),
                '_' => regex_pattern.push('.'),
                c => regex_pattern.push_str(&regex::escape(&c.to_string())),
            }
        }
        regex_pattern.push('$');
        match Regex::new(&regex_pattern) {
            Ok(re) => re.is_match(value),
            Err(_) => false,
        }
    }

    /// IN membership: against the engine-resolved subquery value set when the
    /// condition carries a subquery, otherwise against the literal list.
    fn in_match(condition: &Condition, value_str: &str) -> bool {
        if condition.subquery.is_some() {
            return condition
                .resolved_set
                .as_ref()
                .is_some_and(|set| set.contains(value_str));
        }

        condition
            .value
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .any(|item| item.trim().trim_matches(|c| c == '\'' || c == '"') == value_str)
    }

    /// Numeric comparison when both sides parse as numbers, lexicographic
    /// otherwise.
    fn compare_values(a: &str, b: &str) -> Ordering {
        if let (Ok(na), Ok(nb)) = (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
            return na.partial_cmp(&nb).unwrap_or(Ordering::Equal);
        }
        a.cmp(b)
    }
}
