//! The JSON-like value model.
//!
//! [`Value`] is the runtime representation of data being validated: the six
//! JSON kinds plus a set kind, with dictionaries preserving insertion order.
//! [`Ty`] is the corresponding family of type tags used by type-check
//! schemas. Numeric equality and ordering are mixed-mode: an `Int` compares
//! equal to a `Float` holding the same mathematical value.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

/// A JSON-like value.
///
/// `Dict` preserves insertion order. `Set` is kept as a plain vector;
/// equality between sets is order-insensitive mutual containment, which is
/// the only set operation validation needs.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A double-precision float.
    Float(f64),
    /// A text string.
    Str(String),
    /// An ordered list.
    List(Vec<Value>),
    /// An order-preserving string-keyed dictionary.
    Dict(IndexMap<String, Value>),
    /// An unordered collection of values.
    Set(Vec<Value>),
}

/// Type tags for type-membership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ty {
    /// Matches `Value::Null` only.
    Null,
    /// Matches booleans.
    Bool,
    /// Matches integers.
    Int,
    /// Matches floats, and also integers (integral values are acceptable
    /// wherever a float is expected).
    Float,
    /// Matches strings.
    Str,
    /// Matches lists.
    List,
    /// Matches dictionaries.
    Dict,
    /// Matches sets.
    Set,
    /// Matches integers and floats.
    Number,
    /// Matches every value.
    Anything,
    /// Matches no value.
    Nothing,
}

impl Ty {
    /// The display name used in failure explanations.
    pub fn name(&self) -> &'static str {
        match self {
            Ty::Null => "null",
            Ty::Bool => "bool",
            Ty::Int => "int",
            Ty::Float => "float",
            Ty::Str => "str",
            Ty::List => "list",
            Ty::Dict => "dict",
            Ty::Set => "set",
            Ty::Number => "number",
            Ty::Anything => "anything",
            Ty::Nothing => "nothing",
        }
    }

    /// Whether the value is a member of this type.
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            Ty::Null => matches!(value, Value::Null),
            Ty::Bool => matches!(value, Value::Bool(_)),
            Ty::Int => matches!(value, Value::Int(_)),
            Ty::Float => matches!(value, Value::Int(_) | Value::Float(_)),
            Ty::Str => matches!(value, Value::Str(_)),
            Ty::List => matches!(value, Value::List(_)),
            Ty::Dict => matches!(value, Value::Dict(_)),
            Ty::Set => matches!(value, Value::Set(_)),
            Ty::Number => matches!(value, Value::Int(_) | Value::Float(_)),
            Ty::Anything => true,
            Ty::Nothing => false,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compare an integer against a float without losing precision.
///
/// Promotion through `as f64` is not usable here: integers above 2^53 would
/// spuriously compare equal to their rounded float neighbours. Instead the
/// float is truncated into the integer domain, which is exact for every
/// float inside the i64 range.
fn cmp_int_float(i: i64, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f >= 9_223_372_036_854_775_808.0 {
        return Some(Ordering::Less);
    }
    if f < -9_223_372_036_854_775_808.0 {
        return Some(Ordering::Greater);
    }
    let t = f.trunc() as i64;
    Some(match i.cmp(&t) {
        Ordering::Equal => {
            if f > t as f64 {
                Ordering::Less
            } else if f < t as f64 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        ord => ord,
    })
}

impl Value {
    /// The type tag of this value.
    pub fn ty(&self) -> Ty {
        match self {
            Value::Null => Ty::Null,
            Value::Bool(_) => Ty::Bool,
            Value::Int(_) => Ty::Int,
            Value::Float(_) => Ty::Float,
            Value::Str(_) => Ty::Str,
            Value::List(_) => Ty::List,
            Value::Dict(_) => Ty::Dict,
            Value::Set(_) => Ty::Set,
        }
    }

    /// The display name of this value's type.
    pub fn type_name(&self) -> &'static str {
        self.ty().name()
    }

    /// The length of this value, if it has one.
    ///
    /// Strings measure in characters, containers in elements. Scalars have
    /// no length.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Dict(entries) => Some(entries.len()),
            Value::Set(items) => Some(items.len()),
            _ => None,
        }
    }

    /// Order this value against another, when an order exists.
    ///
    /// Integers, floats, and their mixtures order numerically; strings order
    /// lexicographically. Everything else, including NaN, is incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => cmp_int_float(*a, *b),
            (Value::Float(a), Value::Int(b)) => cmp_int_float(*b, *a).map(Ordering::reverse),
            (Value::Str(a), Value::Str(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        }
    }

    /// Value rendering for failure messages, truncated when long.
    ///
    /// Renderings under 120 characters are used whole. Longer ones keep the
    /// first 99 characters followed by a truncation marker; container
    /// renderings are re-closed with their closing bracket, and string
    /// renderings are quoted after truncation so the marker sits inside the
    /// quotes.
    pub fn shown(&self) -> String {
        match self {
            Value::Str(s) => quote_str(&truncate(s, false)),
            other => {
                let rendered = other.to_string();
                truncate(&rendered, true)
            }
        }
    }

    /// Numeric view of this value, promoting integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convenience accessor for dictionaries.
    pub fn as_dict(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Convenience accessor for lists.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convenience accessor for strings.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

fn truncate(rendered: &str, reclose: bool) -> String {
    let count = rendered.chars().count();
    if count < 120 {
        return rendered.to_string();
    }
    let mut out: String = rendered.chars().take(99).collect();
    out.push_str("...[TRUNCATED]...");
    if reclose {
        if let Some(last) = rendered.chars().last() {
            if matches!(last, ']' | '}' | ')') {
                out.push(last);
            }
        }
    }
    out
}

/// Whether two floats are close in the `max(rel, abs)` tolerance sense:
/// `|a - b| <= max(rel_tol * max(|a|, |b|), abs_tol)`.
pub(crate) fn is_close(a: f64, b: f64, rel_tol: f64, abs_tol: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= (rel_tol * a.abs().max(b.abs())).max(abs_tol)
}

pub(crate) fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Float rendering that keeps integral values visibly float (`1.0`, not
/// `1`).
pub(crate) fn float_repr(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

impl fmt::Display for Value {
    /// Source-form rendering: strings quoted, containers recursive, floats
    /// always carrying a decimal point so `1` and `1.0` stay distinct.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&float_repr(*x)),
            Value::Str(s) => f.write_str(&quote_str(s)),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Dict(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", quote_str(key), value)?;
                }
                f.write_str("}")
            }
            Value::Set(items) => {
                if items.is_empty() {
                    return f.write_str("set()");
                }
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) => cmp_int_float(*a, *b) == Some(Ordering::Equal),
            (Value::Float(a), Value::Int(b)) => cmp_int_float(*b, *a) == Some(Ordering::Equal),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).map(|w| v == w).unwrap_or(false))
            }
            (Value::Set(a), Value::Set(b)) => {
                a.iter().all(|x| b.contains(x)) && b.iter().all(|y| a.contains(y))
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Dict(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mixed_numeric_equality() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Float(2.0), Value::Int(2));
        assert_ne!(Value::Int(1), Value::Float(1.5));
        assert_ne!(Value::Int(1), Value::Str("1".to_string()));
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_large_int_float_equality_is_exact() {
        let big = (1_i64 << 53) + 1;
        assert_ne!(Value::Int(big), Value::Float((1_i64 << 53) as f64));
        assert_eq!(Value::Int(1_i64 << 53), Value::Float((1_i64 << 53) as f64));
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let a = Value::Set(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::Set(vec![Value::Int(2), Value::Int(1)]);
        let c = Value::Set(vec![Value::Int(1)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_compare() {
        assert_eq!(
            Value::Int(1).compare(&Value::Float(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Float(2.5).compare(&Value::Int(2)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Str("a".to_string()).compare(&Value::Str("b".to_string())),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Str("a".to_string()).compare(&Value::Int(1)), None);
        assert_eq!(Value::Float(f64::NAN).compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_float_membership_accepts_int() {
        assert!(Ty::Float.admits(&Value::Int(3)));
        assert!(!Ty::Int.admits(&Value::Float(3.0)));
        assert!(Ty::Number.admits(&Value::Float(3.5)));
        assert!(Ty::Anything.admits(&Value::Null));
        assert!(!Ty::Nothing.admits(&Value::Null));
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(2.94).to_string(), "2.94");
        assert_eq!(Value::Str("a'b".to_string()).to_string(), "'a\\'b'");
        let list = Value::List(vec![Value::Int(1), Value::Str("a".to_string())]);
        assert_eq!(list.to_string(), "[1, 'a']");
        assert_eq!(Value::Set(vec![]).to_string(), "set()");
    }

    #[test]
    fn test_shown_truncates_long_strings() {
        let long = "a".repeat(200);
        let shown = Value::Str(long).shown();
        assert!(shown.contains("TRUNCATED"));
        assert!(shown.starts_with('\''));
        assert!(shown.ends_with("...'"));
        let short = Value::Str("abc".to_string()).shown();
        assert_eq!(short, "'abc'");
    }

    #[test]
    fn test_shown_recloses_containers() {
        let long_list = Value::List((0..100).map(Value::Int).collect());
        let shown = long_list.shown();
        assert!(shown.contains("TRUNCATED"));
        assert!(shown.ends_with("...]"));
    }

    #[test]
    fn test_length() {
        assert_eq!(Value::Str("abc".to_string()).length(), Some(3));
        assert_eq!(Value::List(vec![Value::Null]).length(), Some(1));
        assert_eq!(Value::Int(3).length(), None);
    }

    #[test]
    fn test_from_json() {
        let v = Value::from(json!({"a": 1, "b": [1.5, "x", null], "c": true}));
        let dict = v.as_dict().unwrap();
        assert_eq!(dict["a"], Value::Int(1));
        assert_eq!(
            dict["b"],
            Value::List(vec![
                Value::Float(1.5),
                Value::Str("x".to_string()),
                Value::Null
            ])
        );
        assert_eq!(dict["c"], Value::Bool(true));
    }
}
