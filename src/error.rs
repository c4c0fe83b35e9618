//! Error types for vjson.
//!
//! Two kinds of failure exist: a value that does not conform to a schema
//! ([`ValidationError`]) and a schema description that is itself malformed
//! ([`SchemaError`]). The first is recoverable and expected in normal
//! operation; the second is a programming error in schema authoring and
//! should be fixed rather than handled.

use std::fmt;
use thiserror::Error;

/// Result type alias using the vjson [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vjson operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The value does not conform to the schema.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The schema description is malformed.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Validation failure with the aggregated, path-qualified explanation.
///
/// The explanation is rooted at the name the caller supplied for the value
/// (`"object"` by default), so a failure deep inside a document reads like
/// `object['items'][2]['price'] (value:'x') is not of type 'float'`.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The full explanation text.
    pub message: String,
    /// Root name the value was validated under.
    pub path: Option<String>,
}

impl ValidationError {
    /// Create a new validation error from an explanation.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    /// Set the root name the value was validated under.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Malformed schema description.
#[derive(Debug, Clone)]
pub struct SchemaError {
    /// Error message.
    pub message: String,
    /// Constructor or combinator the mistake was detected in.
    pub origin: Option<String>,
}

impl SchemaError {
    /// Create a new schema error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: None,
        }
    }

    /// Set the constructor or combinator the mistake was detected in.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref origin) = self.origin {
            write!(f, " (in {})", origin)?;
        }

        Ok(())
    }
}

impl std::error::Error for SchemaError {}
