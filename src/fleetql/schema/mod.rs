/*!
# Resource Schemas

Definitions of the resources a deployment can query: canonical field names,
per-field aliases and value types, extraction paths into the raw documents a
backend returns, and the default projection shown when a query omits its
field list.

The registry is an explicitly constructed object shared behind an `Arc`;
there is no process-wide singleton. Definitions are registered in code or
loaded from YAML (see [`loader`]).
*/

pub mod loader;

use serde::Deserialize;
use std::collections::HashMap;

pub use loader::SchemaConfigError;

/// Value type tag of a schema field.
///
/// Most comparisons are value-driven, but two behaviors key off the tag:
/// `Map` fields permit dotted sub-field access (`labels.app`), and the
/// quantity types coerce backend strings like `"250m"` or `"1Gi"` to numbers
/// during extraction so ordering comparisons work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    #[default]
    String,
    Int,
    Time,
    List,
    Map,
    /// CPU quantity, extracted as millicores
    CpuQuantity,
    /// Memory quantity, extracted as MiB
    MemoryQuantity,
}

/// One queryable field of a resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldDefinition {
    #[serde(default)]
    pub name: String,
    /// Short names accepted anywhere the field can be referenced
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Dotted path into the raw document; a trailing `[*]` segment selects
    /// the whole list value (e.g. `spec.containers[*].image`)
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
}

/// A queryable resource: its names, fields, and default projection.
#[derive(Debug, Clone, Default)]
pub struct ResourceDefinition {
    pub name: String,
    pub aliases: Vec<String>,
    /// Fields shown when the query omits its field list
    pub default_fields: Vec<String>,
    pub fields: HashMap<String, FieldDefinition>,
}

impl ResourceDefinition {
    /// Resolve a field alias (e.g. `ns`) to its canonical name
    /// (`namespace`). Canonical names pass through; unknown names are
    /// returned unchanged so the validator can report them.
    pub fn resolve_field_alias(&self, name: &str) -> String {
        if self.fields.contains_key(name) {
            return name.to_string();
        }
        for (canonical, field) in &self.fields {
            if field.aliases.iter().any(|a| a == name) {
                return canonical.clone();
            }
        }
        name.to_string()
    }

    /// Check whether `name` is a dotted sub-field of a Map-typed field,
    /// returning the base field and the sub-key (`labels.app` ->
    /// (`labels` definition, `app`)).
    pub fn map_sub_field<'s, 'n>(
        &'s self,
        name: &'n str,
    ) -> Option<(&'s FieldDefinition, &'n str)> {
        let (base, sub) = name.split_once('.')?;
        let field = self.fields.get(base)?;
        if field.field_type == FieldType::Map && !sub.is_empty() {
            Some((field, sub))
        } else {
            None
        }
    }

    /// Field names of the default projection, falling back to all fields
    /// sorted by name when no default is declared.
    pub fn projection_fields(&self) -> Vec<String> {
        if !self.default_fields.is_empty() {
            return self.default_fields.clone();
        }
        let mut names: Vec<String> = self.fields.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Source of resource definitions for the validator and the engine.
///
/// Implementations must be cheap to share (`Arc<dyn SchemaProvider>`) and
/// read-only for the lifetime of a query execution.
pub trait SchemaProvider: Send + Sync {
    /// Does a resource with this name or alias exist?
    fn resource_exists(&self, name: &str) -> bool;

    /// Resolve a resource alias to its canonical name; unknown names are
    /// returned unchanged.
    fn resolve_resource_alias(&self, name: &str) -> String;

    /// Definition for a resource, by canonical name or alias.
    fn definition(&self, name: &str) -> Option<&ResourceDefinition>;

    /// Every registered definition, one entry per resource.
    fn resources(&self) -> Vec<&ResourceDefinition>;
}

/// In-memory schema registry.
///
/// ```rust
/// use fleetql::{FieldDefinition, ResourceDefinition, SchemaRegistry, SchemaProvider};
///
/// let mut registry = SchemaRegistry::new();
/// registry.register(ResourceDefinition {
///     name: "pod".to_string(),
///     aliases: vec!["pods".to_string(), "po".to_string()],
///     default_fields: vec!["name".to_string(), "status".to_string()],
///     fields: [
///         ("name".to_string(), FieldDefinition { name: "name".to_string(), ..Default::default() }),
///         ("status".to_string(), FieldDefinition { name: "status".to_string(), ..Default::default() }),
///     ].into_iter().collect(),
/// });
/// assert!(registry.resource_exists("po"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    definitions: HashMap<String, ResourceDefinition>,
    /// alias -> canonical name
    aliases: HashMap<String, String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    /// Register a definition under its name and every alias. Re-registering
    /// a name replaces the previous definition.
    pub fn register(&mut self, definition: ResourceDefinition) {
        for alias in &definition.aliases {
            self.aliases.insert(alias.clone(), definition.name.clone());
        }
        self.definitions
            .insert(definition.name.clone(), definition);
    }
}

impl SchemaProvider for SchemaRegistry {
    fn resource_exists(&self, name: &str) -> bool {
        self.definitions.contains_key(name) || self.aliases.contains_key(name)
    }

    fn resolve_resource_alias(&self, name: &str) -> String {
        if self.definitions.contains_key(name) {
            return name.to_string();
        }
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    fn definition(&self, name: &str) -> Option<&ResourceDefinition> {
        if let Some(def) = self.definitions.get(name) {
            return Some(def);
        }
        self.aliases
            .get(name)
            .and_then(|canonical| self.definitions.get(canonical))
    }

    fn resources(&self) -> Vec<&ResourceDefinition> {
        let mut defs: Vec<&ResourceDefinition> = self.definitions.values().collect();
        // Deterministic enumeration order keeps suggestion ranking stable
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}
