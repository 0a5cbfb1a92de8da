//! # fleetql
//!
//! A shell-safe, SQL-like query engine for infrastructure inventory. fleetql
//! lets operators filter, join, group, aggregate, sort, and paginate
//! collections of semi-structured records (cluster objects, fleet metadata)
//! without standing up a database.
//!
//! ## Features
//!
//! - **Compact query language**: `name,status FROM pod WHERE namespace=default`
//!   with optional `SELECT`, shell-safe operator synonyms (`GT`, `LE`, `NE`, ...),
//!   `LIKE` pattern matching, and `IN (...)` lists or subqueries
//! - **Schema-aware validation**: unknown resources and fields fail fast with
//!   ranked "did you mean" suggestions
//! - **Relational operations**: hash joins (INNER/LEFT/RIGHT), GROUP BY with
//!   COUNT/SUM/AVG/MIN/MAX, HAVING, DISTINCT, ORDER BY, LIMIT/OFFSET
//! - **Pluggable backends**: records are fetched through an async [`RowFetcher`]
//!   trait; schemas come from a [`SchemaProvider`] built in code or from YAML
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fleetql::{MemoryFetcher, QueryEngine, QueryParser, QueryValidator, SchemaRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = Arc::new(SchemaRegistry::from_yaml_file("schema/pods.yaml")?);
//!     let fetcher = Arc::new(MemoryFetcher::new());
//!
//!     let parser = QueryParser::new();
//!     let query = parser.parse("name,status FROM pod WHERE status=Running ORDER BY name")?;
//!
//!     QueryValidator::new(schema.clone()).validate(&query)?;
//!
//!     let engine = QueryEngine::new(schema, fetcher);
//!     let output = engine.execute(&query).await?;
//!     for row in &output.rows {
//!         println!("{:?}", row);
//!     }
//!     Ok(())
//! }
//! ```

pub mod fleetql;

// Re-export main API at crate root for easy access
pub use fleetql::datasource::{FetchError, FetchScope, MemoryFetcher, RowFetcher};
pub use fleetql::schema::{
    FieldDefinition, FieldType, ResourceDefinition, SchemaProvider, SchemaRegistry,
};
pub use fleetql::sql::ast::Query;
pub use fleetql::sql::execution::{FieldValue, QueryEngine, QueryOutput, Record};
pub use fleetql::sql::parser::QueryParser;
pub use fleetql::sql::validator::QueryValidator;
pub use fleetql::sql::{SqlError, SqlResult};
