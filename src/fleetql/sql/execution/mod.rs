//! Query execution: value types, condition evaluation, hash joins,
//! aggregation, and the orchestrating engine.

pub mod aggregate;
pub mod engine;
pub mod expression;
pub mod join;
pub mod types;
pub mod utils;

pub use aggregate::AggregateProcessor;
pub use engine::{apply_distinct, apply_limit_offset, QueryEngine, QueryOutput};
pub use expression::ConditionEvaluator;
pub use join::JoinProcessor;
pub use types::{FieldValue, Record};
