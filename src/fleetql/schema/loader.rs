//! YAML schema-definition loading.
//!
//! Resource definitions can ship as YAML documents so that deployments add
//! queryable resources without recompiling:
//!
//! ```yaml
//! name: pod
//! aliases: [pods, po]
//! default_fields: [name, status, ip]
//! fields:
//!   name:
//!     path: metadata.name
//!   namespace:
//!     path: metadata.namespace
//!     aliases: [ns]
//!   cpu-req:
//!     path: spec.containers[*].resources.requests.cpu
//!     type: cpu-quantity
//!   labels:
//!     path: metadata.labels
//!     type: map
//! ```
//!
//! A file holds one resource definition; [`SchemaRegistry::load_yaml_dir`]
//! loads every `.yaml`/`.yml` file in a directory.

use crate::fleetql::schema::{FieldDefinition, ResourceDefinition, SchemaRegistry};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from schema-definition loading.
#[derive(Error, Debug)]
pub enum SchemaConfigError {
    #[error("failed to read schema file {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to parse schema YAML: {error}")]
    Parse {
        #[source]
        error: serde_yaml::Error,
    },

    #[error("invalid schema definition: {message}")]
    Invalid { message: String },
}

/// On-disk shape of a resource definition.
#[derive(Debug, Deserialize)]
struct ResourceDocument {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    default_fields: Vec<String>,
    #[serde(default)]
    fields: HashMap<String, FieldDefinition>,
}

impl SchemaRegistry {
    /// Build a registry from a single YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<SchemaRegistry, SchemaConfigError> {
        let mut registry = SchemaRegistry::new();
        registry.load_yaml_str(yaml)?;
        Ok(registry)
    }

    /// Build a registry from a single YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<SchemaRegistry, SchemaConfigError> {
        let mut registry = SchemaRegistry::new();
        registry.load_yaml_file(path)?;
        Ok(registry)
    }

    /// Parse one YAML document and register the resource it defines.
    pub fn load_yaml_str(&mut self, yaml: &str) -> Result<(), SchemaConfigError> {
        let document: ResourceDocument =
            serde_yaml::from_str(yaml).map_err(|error| SchemaConfigError::Parse { error })?;
        self.register(definition_from_document(document)?);
        Ok(())
    }

    /// Load one YAML file and register the resource it defines.
    pub fn load_yaml_file(&mut self, path: impl AsRef<Path>) -> Result<(), SchemaConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|error| SchemaConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        self.load_yaml_str(&content)
    }

    /// Load every `.yaml`/`.yml` file in a directory.
    pub fn load_yaml_dir(&mut self, dir: impl AsRef<Path>) -> Result<(), SchemaConfigError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|error| SchemaConfigError::Io {
            path: dir.to_path_buf(),
            error,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();
        for path in paths {
            self.load_yaml_file(&path)?;
        }
        Ok(())
    }
}

fn definition_from_document(
    document: ResourceDocument,
) -> Result<ResourceDefinition, SchemaConfigError> {
    if document.name.is_empty() {
        return Err(SchemaConfigError::Invalid {
            message: "resource definition must have a name".to_string(),
        });
    }
    if document.fields.is_empty() {
        return Err(SchemaConfigError::Invalid {
            message: format!("resource '{}' defines no fields", document.name),
        });
    }

    let fields = document
        .fields
        .into_iter()
        .map(|(name, mut field)| {
            field.name = name.clone();
            (name, field)
        })
        .collect();

    Ok(ResourceDefinition {
        name: document.name,
        aliases: document.aliases,
        default_fields: document.default_fields,
        fields,
    })
}
