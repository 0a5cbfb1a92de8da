/*!
# Query Error Handling

Errors for parsing, validation, and execution. All operations in the query
core return errors as values; nothing in this crate panics on malformed input.

Error categories:

- **Parse errors**: malformed query text, with the character position where
  tokenization or parsing failed when one is known
- **Validation errors**: semantic violations against the schema, carrying up
  to three ranked "did you mean" suggestions
- **Schema errors**: a resource definition the engine needed is missing
- **Fetch errors**: a backend fetch failed; the error names the resource and
  aborts the whole query with no partial results
- **Execution errors**: runtime failures inside the pipeline itself
*/

use std::fmt;

/// Error type for all query-core operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlError {
    /// Malformed query text. No partial AST is ever returned.
    ParseError {
        message: String,
        /// Character position in the query text, when known
        position: Option<usize>,
    },

    /// Semantic violation found by the validator. The first violation wins;
    /// the validator does not accumulate diagnostics.
    ValidationError {
        message: String,
        /// Candidate identifiers ranked by ascending edit distance
        suggestions: Vec<String>,
    },

    /// A resource definition required during execution was not in the schema.
    SchemaError { message: String, resource: String },

    /// A backend fetch failed. Wraps the fetch layer's error with the
    /// offending resource name.
    FetchError { resource: String, message: String },

    /// Runtime failure inside the execution pipeline.
    ExecutionError { message: String },
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlError::ParseError { message, position } => {
                if let Some(pos) = position {
                    write!(f, "parse error at position {}: {}", pos, message)
                } else {
                    write!(f, "parse error: {}", message)
                }
            }
            SqlError::ValidationError {
                message,
                suggestions,
            } => {
                write!(f, "{}", message)?;
                match suggestions.len() {
                    0 => Ok(()),
                    1 => write!(f, "\nDid you mean: {}?", suggestions[0]),
                    _ => {
                        write!(f, "\nDid you mean one of these?")?;
                        for sug in suggestions {
                            write!(f, "\n  - {}", sug)?;
                        }
                        Ok(())
                    }
                }
            }
            SqlError::SchemaError { message, resource } => {
                write!(f, "schema error for '{}': {}", resource, message)
            }
            SqlError::FetchError { resource, message } => {
                write!(f, "failed to fetch '{}': {}", resource, message)
            }
            SqlError::ExecutionError { message } => {
                write!(f, "execution error: {}", message)
            }
        }
    }
}

impl std::error::Error for SqlError {}

impl SqlError {
    /// Create a parse error with an optional text position.
    pub fn parse_error(message: impl Into<String>, position: Option<usize>) -> Self {
        SqlError::ParseError {
            message: message.into(),
            position,
        }
    }

    /// Create a validation error without suggestions.
    pub fn validation_error(message: impl Into<String>) -> Self {
        SqlError::ValidationError {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// Create a validation error carrying ranked suggestions.
    pub fn validation_error_with_suggestions(
        message: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        SqlError::ValidationError {
            message: message.into(),
            suggestions,
        }
    }

    /// Create a schema error for a resource.
    pub fn schema_error(message: impl Into<String>, resource: impl Into<String>) -> Self {
        SqlError::SchemaError {
            message: message.into(),
            resource: resource.into(),
        }
    }

    /// Create a fetch error wrapping a backend failure.
    pub fn fetch_error(resource: impl Into<String>, message: impl Into<String>) -> Self {
        SqlError::FetchError {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create an execution error.
    pub fn execution_error(message: impl Into<String>) -> Self {
        SqlError::ExecutionError {
            message: message.into(),
        }
    }
}

/// Result type for query-core operations.
pub type SqlResult<T> = Result<T, SqlError>;
