/*!
# Data Sources

The fetch boundary between the query engine and whatever actually stores the
inventory. The engine only ever reads records through [`RowFetcher`]; a real
deployment implements it against its backend API, and [`MemoryFetcher`]
serves tests and embedded use.

Fetchers return raw nested documents; the engine flattens them into rows by
walking each schema field's extraction path. A fetch failure aborts the whole
query with no partial results.
*/

use crate::fleetql::schema::ResourceDefinition;
use crate::fleetql::sql::ast::SCOPE_ALL;
use crate::fleetql::sql::execution::types::{FieldValue, Record};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

/// Error from a backend fetch. One error per fetch call; the engine wraps it
/// with the resource name.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        FetchError {
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FetchError {}

/// The namespace scope of a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchScope {
    pub namespace: String,
}

impl FetchScope {
    /// Scope over one namespace, or all of them for `"*"`/empty.
    pub fn namespaced(namespace: impl Into<String>) -> Self {
        FetchScope {
            namespace: namespace.into(),
        }
    }

    /// Scope over every namespace.
    pub fn all() -> Self {
        FetchScope {
            namespace: SCOPE_ALL.to_string(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.namespace == SCOPE_ALL || self.namespace.is_empty()
    }
}

/// Asynchronous record source for one resource at a time.
///
/// Implementations must return records in a stable order; the engine's
/// DISTINCT and GROUP BY tie-breaking rules depend on it. Fetches issued for
/// one query are independent pure reads, so the engine may run them
/// concurrently.
#[async_trait]
pub trait RowFetcher: Send + Sync {
    /// Fetch the raw records of `resource` within `scope`.
    async fn fetch(
        &self,
        resource: &ResourceDefinition,
        scope: &FetchScope,
    ) -> Result<Vec<Record>, FetchError>;
}

/// In-memory [`RowFetcher`] over JSON-shaped documents.
///
/// Intended for tests and embedded use: seed it with documents per resource
/// and namespace, and it behaves like a (very small) backend, including the
/// scope filter.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    records: HashMap<String, Vec<StoredRecord>>,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    namespace: String,
    record: Record,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        MemoryFetcher::default()
    }

    /// Store a record for a resource under a namespace.
    pub fn insert(&mut self, resource: &str, namespace: &str, record: Record) {
        self.records
            .entry(resource.to_string())
            .or_default()
            .push(StoredRecord {
                namespace: namespace.to_string(),
                record,
            });
    }

    /// Store a JSON document for a resource under a namespace. The document
    /// must be a JSON object.
    pub fn insert_json(
        &mut self,
        resource: &str,
        namespace: &str,
        document: serde_json::Value,
    ) -> Result<(), FetchError> {
        match FieldValue::from_json(document) {
            FieldValue::Map(fields) => {
                self.insert(resource, namespace, Record { fields });
                Ok(())
            }
            _ => Err(FetchError::new("document must be a JSON object")),
        }
    }
}

#[async_trait]
impl RowFetcher for MemoryFetcher {
    async fn fetch(
        &self,
        resource: &ResourceDefinition,
        scope: &FetchScope,
    ) -> Result<Vec<Record>, FetchError> {
        let Some(stored) = self.records.get(&resource.name) else {
            return Ok(Vec::new());
        };
        Ok(stored
            .iter()
            .filter(|s| scope.is_all() || s.namespace == scope.namespace)
            .map(|s| s.record.clone())
            .collect())
    }
}
