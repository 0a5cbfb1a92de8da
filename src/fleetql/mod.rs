// fleetql module tree
// sql: query language core (parser, AST, validation, execution)
// schema: resource/field definitions consumed by the validator and engine
// datasource: row-fetching boundary the engine reads records through

pub mod datasource;
pub mod schema;
pub mod sql;
