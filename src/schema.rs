//! Schema descriptions.
//!
//! A [`Schema`] is the user-authored, uncompiled description of acceptable
//! values: type tags, literals, predicates, containers, and combinators.
//! Descriptions are plain immutable values; building one never fails.
//! Mistakes like an empty union or a misplaced repeat marker are reported
//! by [`compile`](crate::compile) as [`SchemaError`](crate::SchemaError)s.
//!
//! Construction goes through the free functions in this module (`union`,
//! `dict`, `seq`, `quote`, ...) together with `From` conversions for type
//! tags and literals:
//!
//! ```
//! use vjson::{dict, seq, ellipsis, Schema, Ty};
//!
//! let book = dict([
//!     ("title", Schema::from(Ty::Str)),
//!     ("authors", seq([Schema::from(Ty::Str), ellipsis()])),
//!     ("year", Schema::from(Ty::Int)),
//! ]);
//! ```

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::engine::CompiledSchema;
use crate::error::SchemaError;
use crate::value::{Ty, Value};

/// Capability interface for external leaf validators.
///
/// Implementors plug into schemas via [`check`] and are treated by the
/// engine as opaque leaves: the engine calls [`Check::check`] with the value
/// and the path the value sits at, and uses the returned text verbatim as
/// the failure explanation (empty string means pass). [`Check::name`] is the
/// display name other combinators may use when wrapping the check.
pub trait Check: Send + Sync {
    /// Display name used in failure explanations.
    fn name(&self) -> &str;

    /// Check `value`, which sits at `path` in the document being validated.
    ///
    /// Returns the empty string when the value conforms, the full failure
    /// explanation otherwise.
    fn check(&self, value: &Value, path: &str) -> String;
}

/// A named predicate over values.
///
/// The closure returns `Ok(true)` to accept, `Ok(false)` to reject with the
/// standard wrong-type message, and `Err(reason)` to reject with the reason
/// appended. Errors never unwind through the engine.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    func: Arc<dyn Fn(&Value) -> std::result::Result<bool, String> + Send + Sync>,
}

impl Predicate {
    /// Create a predicate with a display name.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<bool, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// The display name used in failure explanations.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn eval(&self, value: &Value) -> std::result::Result<bool, String> {
        (self.func)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An external [`Check`] wrapped for inclusion in a schema.
#[derive(Clone)]
pub struct ExternalCheck(pub(crate) Arc<dyn Check>);

impl fmt::Debug for ExternalCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExternalCheck({})", self.0.name())
    }
}

/// A handle for self-referential schemas.
///
/// Declare the handle first, use it (via `From<Recursive>`) inside a larger
/// schema, then [`define`](Recursive::define) it once. Compiling a schema
/// that reaches an undefined handle is a schema error.
///
/// ```
/// use vjson::{dict, Recursive, Schema, Ty};
///
/// let tree = Recursive::new();
/// tree.define(dict([
///     ("value", Schema::from(Ty::Int)),
///     ("left?", Schema::from(tree.clone())),
///     ("right?", Schema::from(tree.clone())),
/// ]))
/// .unwrap();
/// ```
#[derive(Clone)]
pub struct Recursive {
    cell: Arc<OnceCell<Schema>>,
}

impl Recursive {
    /// Create an undefined handle.
    pub fn new() -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Install the definition. Fails if the handle is already defined.
    pub fn define(&self, schema: impl Into<Schema>) -> std::result::Result<(), SchemaError> {
        self.cell
            .set(schema.into())
            .map_err(|_| SchemaError::new("recursive schema defined twice").with_origin("recursive"))
    }

    pub(crate) fn get(&self) -> Option<&Schema> {
        self.cell.get()
    }

    /// Stable identity of the handle, used by the compiler's registry.
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.cell) as usize
    }
}

impl Default for Recursive {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Recursive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cell.get().is_some() {
            f.write_str("Recursive(defined)")
        } else {
            f.write_str("Recursive(undefined)")
        }
    }
}

/// A key position in a mapping schema.
///
/// Constant keys name an exact entry and may be optional; pattern keys match
/// any present key accepted by their schema and are inherently optional.
#[derive(Debug, Clone)]
pub enum MapKey {
    /// An exact string key.
    Const {
        /// The key text.
        key: String,
        /// Whether the key may be absent.
        optional: bool,
    },
    /// A schema matched against candidate keys.
    Pattern(Box<Schema>),
}

impl MapKey {
    /// A required constant key (no suffix interpretation).
    pub fn required(key: impl Into<String>) -> Self {
        MapKey::Const {
            key: key.into(),
            optional: false,
        }
    }

    /// An optional constant key (no suffix interpretation).
    pub fn optional(key: impl Into<String>) -> Self {
        MapKey::Const {
            key: key.into(),
            optional: true,
        }
    }

    /// A pattern key.
    pub fn pattern(schema: impl Into<Schema>) -> Self {
        MapKey::Pattern(Box::new(schema.into()))
    }
}

/// Canonize a string key: a trailing `?` marks the key optional, and the
/// escape `\?` yields a required key whose literal last character is `?`.
impl From<&str> for MapKey {
    fn from(key: &str) -> Self {
        if let Some(stem) = key.strip_suffix("\\?") {
            MapKey::required(format!("{}?", stem))
        } else if let Some(stem) = key.strip_suffix('?') {
            MapKey::optional(stem)
        } else {
            MapKey::required(key)
        }
    }
}

impl From<String> for MapKey {
    fn from(key: String) -> Self {
        MapKey::from(key.as_str())
    }
}

/// A schema description.
///
/// Variants map one-to-one onto the compiled node forms; see the crate
/// documentation for the semantics of each. Most code builds schemas with
/// the constructor functions rather than naming variants directly.
#[derive(Debug, Clone)]
pub enum Schema {
    /// Type-membership check.
    Type(Ty),
    /// Literal equality (floats with a non-zero fractional part compare
    /// with tolerance).
    Literal(Value),
    /// Literal equality with interpretation suppressed and floats exact.
    Quote(Value),
    /// Named predicate.
    Predicate(Predicate),
    /// External check implementation.
    Check(ExternalCheck),
    /// Fixed-arity sequence; a trailing [`Schema::Ellipsis`] makes the
    /// element before it repeatable zero or more times.
    Sequence(Vec<Schema>),
    /// The repeat marker. Only meaningful as the last element of a
    /// [`Schema::Sequence`].
    Ellipsis,
    /// Ordered mapping entries.
    Mapping(Vec<(MapKey, Schema)>),
    /// Set whose every element must match one of the member schemas.
    SetOf(Vec<Schema>),
    /// Accept if any alternative accepts.
    Union(Vec<Schema>),
    /// Accept if every part accepts.
    Intersect(Vec<Schema>),
    /// Accept if the inner schema rejects.
    Complement(Box<Schema>),
    /// Force lax key handling below this point.
    Lax(Box<Schema>),
    /// Force strict key handling below this point.
    Strict(Box<Schema>),
    /// Replace the inner schema's failure with a wrong-type message under
    /// `name`; with `reason` set, the inner explanation is appended.
    Named {
        /// The wrapped schema.
        schema: Box<Schema>,
        /// Display name reported on failure.
        name: String,
        /// Whether to append the inner explanation.
        reason: bool,
    },
    /// Conditional: values matching `cond` must match `then`; others must
    /// match `otherwise` when present and pass vacuously when not.
    IfThen {
        /// The guard schema.
        cond: Box<Schema>,
        /// Checked when the guard matches.
        then: Box<Schema>,
        /// Checked when the guard does not match.
        otherwise: Option<Box<Schema>>,
    },
    /// First matching guard selects its branch; no match passes vacuously.
    CondChain(Vec<(Schema, Schema)>),
    /// Pass-through unless the substitution table carries one of the
    /// labels, in which case the substituted schema is checked instead.
    Labeled {
        /// The wrapped schema.
        schema: Box<Schema>,
        /// Labels the substitution table is consulted for.
        labels: Vec<String>,
    },
    /// The value must be a dict with exactly one of the keys present.
    OneOf(Vec<String>),
    /// The value must be a dict with at least one of the keys present.
    AtLeastOneOf(Vec<String>),
    /// The value must be a dict with at most one of the keys present.
    AtMostOneOf(Vec<String>),
    /// The value must be a dict containing every key.
    HasKeys(Vec<String>),
    /// An already-compiled program, embedded as-is.
    Compiled(CompiledSchema),
    /// Shared subtree with stable identity; compiled once per program.
    Shared(Arc<Schema>),
    /// Reference to a [`Recursive`] handle.
    Deferred(Recursive),
}

impl From<Ty> for Schema {
    fn from(t: Ty) -> Self {
        Schema::Type(t)
    }
}

impl From<Value> for Schema {
    fn from(v: Value) -> Self {
        Schema::Literal(v)
    }
}

impl From<bool> for Schema {
    fn from(b: bool) -> Self {
        Schema::Literal(Value::Bool(b))
    }
}

impl From<i64> for Schema {
    fn from(i: i64) -> Self {
        Schema::Literal(Value::Int(i))
    }
}

impl From<i32> for Schema {
    fn from(i: i32) -> Self {
        Schema::Literal(Value::Int(i64::from(i)))
    }
}

impl From<f64> for Schema {
    fn from(f: f64) -> Self {
        Schema::Literal(Value::Float(f))
    }
}

impl From<&str> for Schema {
    fn from(s: &str) -> Self {
        Schema::Literal(Value::Str(s.to_string()))
    }
}

impl From<String> for Schema {
    fn from(s: String) -> Self {
        Schema::Literal(Value::Str(s))
    }
}

impl From<Predicate> for Schema {
    fn from(p: Predicate) -> Self {
        Schema::Predicate(p)
    }
}

impl From<Recursive> for Schema {
    fn from(r: Recursive) -> Self {
        Schema::Deferred(r)
    }
}

impl From<CompiledSchema> for Schema {
    fn from(c: CompiledSchema) -> Self {
        Schema::Compiled(c)
    }
}

/// Accept when any alternative accepts; failures of all alternatives are
/// joined with `" and "`.
pub fn union<I>(alternatives: I) -> Schema
where
    I: IntoIterator<Item = Schema>,
{
    Schema::Union(alternatives.into_iter().collect())
}

/// Accept when every part accepts; the first failure is reported.
pub fn intersect<I>(parts: I) -> Schema
where
    I: IntoIterator<Item = Schema>,
{
    Schema::Intersect(parts.into_iter().collect())
}

/// Accept when the inner schema rejects.
pub fn complement(schema: impl Into<Schema>) -> Schema {
    Schema::Complement(Box::new(schema.into()))
}

/// Force lax key handling (unknown dict keys pass) below this point.
pub fn lax(schema: impl Into<Schema>) -> Schema {
    Schema::Lax(Box::new(schema.into()))
}

/// Force strict key handling (unknown dict keys fail) below this point.
pub fn strict(schema: impl Into<Schema>) -> Schema {
    Schema::Strict(Box::new(schema.into()))
}

/// Match the literal value itself, suppressing schema interpretation.
///
/// Quoting matters for values that would otherwise be read as schemas:
/// `quote` of a dict matches that exact dict, not objects conforming to it,
/// and quoted floats compare exactly instead of with tolerance.
pub fn quote(value: impl Into<Value>) -> Schema {
    Schema::Quote(value.into())
}

/// Report failures of the inner schema as `is not of type '<name>'`.
pub fn set_name(schema: impl Into<Schema>, name: impl Into<String>) -> Schema {
    Schema::Named {
        schema: Box::new(schema.into()),
        name: name.into(),
        reason: false,
    }
}

/// Like [`set_name`], but append the inner schema's own explanation.
pub fn set_name_with_reason(schema: impl Into<Schema>, name: impl Into<String>) -> Schema {
    Schema::Named {
        schema: Box::new(schema.into()),
        name: name.into(),
        reason: true,
    }
}

/// Values matching `cond` must match `then`; all others pass.
///
/// Guard matching ignores strictness: a dict with keys beyond the
/// guard's still matches it.
pub fn ifthen(cond: impl Into<Schema>, then: impl Into<Schema>) -> Schema {
    Schema::IfThen {
        cond: Box::new(cond.into()),
        then: Box::new(then.into()),
        otherwise: None,
    }
}

/// Values matching `cond` must match `then`; all others must match
/// `otherwise`.
pub fn ifthen_else(
    cond: impl Into<Schema>,
    then: impl Into<Schema>,
    otherwise: impl Into<Schema>,
) -> Schema {
    Schema::IfThen {
        cond: Box::new(cond.into()),
        then: Box::new(then.into()),
        otherwise: Some(Box::new(otherwise.into())),
    }
}

/// First matching guard selects its branch; with no matching guard the
/// value passes. Guards match laxly, and a guard of `Ty::Anything`
/// acts as a default branch.
pub fn cond<I>(branches: I) -> Schema
where
    I: IntoIterator<Item = (Schema, Schema)>,
{
    Schema::CondChain(branches.into_iter().collect())
}

/// Attach substitution labels to a schema.
///
/// Validation consults the substitution table for the labels; when exactly
/// one is registered, the registered schema is checked in place of this one.
pub fn set_label<I, S>(schema: impl Into<Schema>, labels: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Schema::Labeled {
        schema: Box::new(schema.into()),
        labels: labels.into_iter().map(Into::into).collect(),
    }
}

/// The value must be a dict with exactly one of the keys present.
pub fn one_of<I, S>(keys: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Schema::OneOf(keys.into_iter().map(Into::into).collect())
}

/// The value must be a dict with at least one of the keys present.
pub fn at_least_one_of<I, S>(keys: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Schema::AtLeastOneOf(keys.into_iter().map(Into::into).collect())
}

/// The value must be a dict with at most one of the keys present.
pub fn at_most_one_of<I, S>(keys: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Schema::AtMostOneOf(keys.into_iter().map(Into::into).collect())
}

/// The value must be a dict containing every named key.
pub fn keys<I, S>(names: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Schema::HasKeys(names.into_iter().map(Into::into).collect())
}

/// An ordered sequence schema. End with [`ellipsis`] to make the element
/// before it repeat zero or more times.
pub fn seq<I>(elements: I) -> Schema
where
    I: IntoIterator<Item = Schema>,
{
    Schema::Sequence(elements.into_iter().collect())
}

/// The sequence repeat marker.
pub fn ellipsis() -> Schema {
    Schema::Ellipsis
}

/// A mapping schema from `(key, value-schema)` entries. String keys follow
/// the `?` suffix convention of [`MapKey`]; pattern keys go through
/// [`MapKey::pattern`].
pub fn dict<I, K>(entries: I) -> Schema
where
    I: IntoIterator<Item = (K, Schema)>,
    K: Into<MapKey>,
{
    Schema::Mapping(
        entries
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect(),
    )
}

/// A set schema: the value must be a set and every element must match one
/// of the member schemas. With no member schemas only the empty set passes.
pub fn set_of<I>(members: I) -> Schema
where
    I: IntoIterator<Item = Schema>,
{
    Schema::SetOf(members.into_iter().collect())
}

/// A named predicate schema.
pub fn predicate<F>(name: impl Into<String>, func: F) -> Schema
where
    F: Fn(&Value) -> std::result::Result<bool, String> + Send + Sync + 'static,
{
    Schema::Predicate(Predicate::new(name, func))
}

/// Wrap an external [`Check`] implementation as a schema.
pub fn check<C: Check + 'static>(check: C) -> Schema {
    Schema::Check(ExternalCheck(Arc::new(check)))
}

/// Share a subtree so the compiler emits it once per program. Sharing also
/// gives the subtree a stable identity, which self-referential schemas rely
/// on.
pub fn shared(schema: impl Into<Schema>) -> Schema {
    Schema::Shared(Arc::new(schema.into()))
}

/// The schema every value matches.
pub fn anything() -> Schema {
    Schema::Type(Ty::Anything)
}

/// The schema no value matches.
pub fn nothing() -> Schema {
    Schema::Type(Ty::Nothing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_canonization() {
        match MapKey::from("a?") {
            MapKey::Const { key, optional } => {
                assert_eq!(key, "a");
                assert!(optional);
            }
            _ => panic!("expected const key"),
        }
        match MapKey::from("a\\?") {
            MapKey::Const { key, optional } => {
                assert_eq!(key, "a?");
                assert!(!optional);
            }
            _ => panic!("expected const key"),
        }
        match MapKey::from("a") {
            MapKey::Const { key, optional } => {
                assert_eq!(key, "a");
                assert!(!optional);
            }
            _ => panic!("expected const key"),
        }
        match MapKey::from("?") {
            MapKey::Const { key, optional } => {
                assert_eq!(key, "");
                assert!(optional);
            }
            _ => panic!("expected const key"),
        }
    }

    #[test]
    fn test_recursive_define_twice() {
        let r = Recursive::new();
        assert!(r.define(Schema::from(Ty::Int)).is_ok());
        assert!(r.define(Schema::from(Ty::Str)).is_err());
    }

    #[test]
    fn test_predicate_eval() {
        let p = Predicate::new("is_even", |v| match v {
            Value::Int(i) => Ok(i % 2 == 0),
            _ => Err("not an integer".to_string()),
        });
        assert_eq!(p.eval(&Value::Int(2)), Ok(true));
        assert_eq!(p.eval(&Value::Int(3)), Ok(false));
        assert!(p.eval(&Value::Null).is_err());
        assert_eq!(p.name(), "is_even");
    }

    #[test]
    fn test_literal_conversions() {
        assert!(matches!(
            Schema::from(3.5),
            Schema::Literal(Value::Float(_))
        ));
        assert!(matches!(
            Schema::from("x"),
            Schema::Literal(Value::Str(_))
        ));
        assert!(matches!(Schema::from(Ty::Int), Schema::Type(Ty::Int)));
    }
}
