//! # vjson
//!
//! Declarative validation of JSON-like values.
//!
//! Schemas are ordinary Rust values: a literal matches itself, a type
//! matches its instances, and lists and dicts describe their elements and
//! entries. Combinators build richer schemas out of simpler ones, and a
//! validation failure explains itself with the path to the offending value.
//!
//! ## Features
//!
//! - Schemas built from plain values: literals, types, sequences, mappings
//! - Boolean combinators (`union`, `intersect`, `complement`) and
//!   conditionals (`ifthen`, `cond`)
//! - Strict or lax handling of unexpected dict keys
//! - Recursive schemas through [`Recursive`] handles and [`shared`] subtrees
//! - One-time compilation into an immutable program, shareable across threads
//! - Leaf validators for intervals, sizes, regular expressions, filename
//!   patterns, emails, URLs, IP addresses, and dates
//!
//! ## Example
//!
//! ```rust
//! use vjson::{dict, ellipsis, seq, validate, Schema, Ty, Value};
//!
//! let book = dict([
//!     ("title", Schema::from(Ty::Str)),
//!     ("authors", seq([Schema::from(Ty::Str), ellipsis()])),
//!     ("year", Schema::from(Ty::Int)),
//! ]);
//!
//! let good = Value::from(serde_json::json!({
//!     "title": "Foundation",
//!     "authors": ["Isaac Asimov"],
//!     "year": 1951,
//! }));
//! assert!(validate(&book, &good).is_ok());
//!
//! let bad = Value::from(serde_json::json!({
//!     "title": "Foundation",
//!     "authors": ["Isaac Asimov"],
//!     "year": "1951",
//! }));
//! assert_eq!(
//!     validate(&book, &bad).unwrap_err().to_string(),
//!     "validation error: object['year'] (value:'1951') is not of type 'int'",
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod compiler;
mod engine;
mod error;
mod mapping;
mod schema;
mod sequence;
mod value;

pub mod checks;

pub use compiler::compile;
pub use engine::{
    is_valid, validate, validate_with, CompiledSchema, Options, Substitutions,
};
pub use error::{Error, Result, SchemaError, ValidationError};
pub use schema::{
    anything, at_least_one_of, at_most_one_of, check, complement, cond, dict, ellipsis,
    ifthen, ifthen_else, intersect, keys, lax, nothing, one_of, predicate, quote, seq,
    set_label, set_name, set_name_with_reason, set_of, shared, strict, union, Check,
    MapKey, Predicate, Recursive, Schema,
};
pub use value::{Ty, Value};

/// Version of the vjson library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
