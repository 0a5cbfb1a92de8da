/*!
# Query Abstract Syntax Tree (AST)

This module defines the AST for fleetql queries. A [`Query`] is produced once
by the parser, optionally checked by the validator, and then consumed by the
execution engine. Nodes are plain data: evaluation lives in the execution
module, schema knowledge in the validator.

## Example Queries

```sql
-- Simple selection with filtering
name,status FROM pod WHERE namespace=default AND status=Running

-- Grouped aggregation
namespace, COUNT(*) AS total FROM pod GROUP BY namespace HAVING total > 5

-- Cross-resource join
pod.name, svc.name FROM pod LEFT JOIN service svc ON name = selector
```

The leading `SELECT` keyword is optional so that queries stay shell-safe;
the `EQ/NE/GT/GE/LT/LE` operator synonyms exist for the same reason.
*/

use std::collections::HashSet;

/// Field name the parser treats as the query scope (namespace) when it
/// appears in a direct equality condition.
pub const SCOPE_FIELD: &str = "namespace";
/// Short alias accepted for [`SCOPE_FIELD`] at parse time.
pub const SCOPE_FIELD_ALIAS: &str = "ns";
/// Scope value selecting every namespace.
pub const SCOPE_ALL: &str = "*";

/// Root AST node for a parsed query.
///
/// `fields` holds the selected non-aggregate field names; the single-element
/// sentinel `["*"]` means "project the schema's default fields if any, else
/// all fields". Aggregate expressions are split out into `aggregates`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Selected plain fields (`["*"]` sentinel for "default projection")
    pub fields: Vec<String>,
    /// Aggregate expressions from the field list
    pub aggregates: Vec<AggregateFunc>,
    /// Primary resource name (lowercased)
    pub resource: String,
    /// Optional alias for the primary resource (e.g. "p" in "FROM pod p")
    pub resource_alias: Option<String>,
    /// Scope the fetch layer should query; seeded from a `namespace`/`ns`
    /// equality in the WHERE tree, `"default"` otherwise
    pub scope: String,
    /// WHERE predicate tree
    pub conditions: Option<ConditionGroup>,
    /// JOIN clauses, applied in order
    pub joins: Vec<JoinClause>,
    /// GROUP BY field names
    pub group_by: Vec<String>,
    /// HAVING predicate tree, applied to aggregated rows
    pub having: Option<ConditionGroup>,
    /// ORDER BY specs in priority order
    pub order_by: Vec<OrderByField>,
    /// LIMIT row count; non-positive means "no limit"
    pub limit: i64,
    /// OFFSET row count; non-positive means "no offset"
    pub offset: i64,
    /// DISTINCT toggle
    pub distinct: bool,
    /// Set when the user omitted the field list entirely
    pub use_default_fields: bool,
}

/// Comparison operator of an atomic [`Condition`].
///
/// The shell-safe word synonyms (`EQ`, `NE`, `GT`, `GE`, `LT`, `LE`) are
/// normalized to these symbolic forms at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    Like,
    NotLike,
    In,
    NotIn,
}

impl Default for ConditionOperator {
    fn default() -> Self {
        ConditionOperator::Equal
    }
}

impl ConditionOperator {
    /// The operator as it appears in query text.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equal => "=",
            ConditionOperator::NotEqual => "!=",
            ConditionOperator::GreaterThan => ">",
            ConditionOperator::LessThan => "<",
            ConditionOperator::GreaterEqual => ">=",
            ConditionOperator::LessEqual => "<=",
            ConditionOperator::Like => "LIKE",
            ConditionOperator::NotLike => "NOT LIKE",
            ConditionOperator::In => "IN",
            ConditionOperator::NotIn => "NOT IN",
        }
    }
}

/// Logical combinator of a [`ConditionGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// An atomic predicate: `field op value`.
///
/// For `IN`/`NOT IN` the value is either a comma-joined literal list, or a
/// nested subquery. A subquery condition is inert until the execution engine
/// fills `resolved_set` with the subquery's first-column values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    /// Literal operand with surrounding quotes stripped; for literal `IN`
    /// lists the elements are joined with `,`
    pub value: String,
    /// Nested query for `IN (FROM ...)` membership tests
    pub subquery: Option<Box<Query>>,
    /// Value set the engine resolved the subquery to, prior to evaluation
    pub resolved_set: Option<HashSet<String>>,
}

/// A recursive AND/OR tree of predicates.
///
/// Leaves are [`Condition`]s; internal nodes combine their conditions and
/// nested groups with the group's logical operator. An empty AND group is
/// vacuously true; an empty OR group also evaluates true (the parser never
/// produces one, so programmatic trees keep "no constraints = pass").
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    pub operator: LogicalOperator,
    pub conditions: Vec<Condition>,
    pub sub_groups: Vec<ConditionGroup>,
}

impl ConditionGroup {
    /// An empty (vacuously true) AND group.
    pub fn empty() -> Self {
        ConditionGroup {
            operator: LogicalOperator::And,
            conditions: Vec::new(),
            sub_groups: Vec::new(),
        }
    }
}

/// Join type of a [`JoinClause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Only rows matching on both sides
    Inner,
    /// Every left row; join fields absent on misses
    Left,
    /// Every right row; symmetric to LEFT
    Right,
}

/// One equality pair of a join's ON clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub left_field: String,
    pub right_field: String,
}

/// A JOIN against another resource.
///
/// The ON clause is a non-empty ordered list of equality conditions, ANDed
/// together into the join key.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    /// Joined resource name (lowercased)
    pub resource: String,
    /// Optional alias used as the field prefix in merged rows
    pub alias: Option<String>,
    pub conditions: Vec<JoinCondition>,
}

impl JoinClause {
    /// Field prefix for rows of this join's resource: the alias when one was
    /// given, the resource name otherwise.
    pub fn prefix(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.resource)
    }
}

/// Aggregate function kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Parse a function name case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateFunction::Count),
            "SUM" => Some(AggregateFunction::Sum),
            "AVG" => Some(AggregateFunction::Avg),
            "MIN" => Some(AggregateFunction::Min),
            "MAX" => Some(AggregateFunction::Max),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

/// An aggregate expression from the field list.
///
/// Three surface syntaxes produce this node: `COUNT(*) AS total`,
/// `COUNT.status AS total`, and bare `COUNT AS total`. A missing alias is
/// synthesized as `lower(func)` for `*` targets, `lower(func)_field`
/// otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFunc {
    pub function: AggregateFunction,
    /// Target field, `"*"` for whole-row aggregates
    pub field: String,
    /// Output column name
    pub alias: String,
}

impl AggregateFunc {
    /// Build an aggregate, synthesizing the default alias when none is given.
    pub fn new(function: AggregateFunction, field: String, alias: Option<String>) -> Self {
        let alias = alias.unwrap_or_else(|| {
            let func = function.as_str().to_ascii_lowercase();
            if field == "*" {
                func
            } else {
                format!("{}_{}", func, field)
            }
        });
        AggregateFunc {
            function,
            field,
            alias,
        }
    }
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByField {
    pub field: String,
    pub descending: bool,
}
