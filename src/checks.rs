//! Leaf domain validators.
//!
//! Everything in this module sits outside the engine proper: each validator
//! is an ordinary [`Check`] implementation wrapped into a schema, so the
//! engine sees an opaque leaf and uses the returned explanation verbatim.
//! Constructors whose arguments can be malformed (an invalid pattern, a
//! zero divisor, size bounds admitting no length) return a
//! [`SchemaError`](crate::SchemaError); the rest are infallible.

use std::cmp::Ordering;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ops::{Bound, RangeBounds};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::engine::{wrong_type, wrong_type_because};
use crate::error::{Result, SchemaError};
use crate::schema::{check, Check, Schema};
use crate::value::{float_repr, is_close, quote_str, Value};

#[derive(Debug, Clone, Copy)]
enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOp {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            CmpOp::Gt => "strictly greater than",
            CmpOp::Ge => "greater than or equal to",
            CmpOp::Lt => "strictly less than",
            CmpOp::Le => "less than or equal to",
        }
    }
}

/// Bound rendering for messages: strings unquoted, numbers as written.
fn bound_repr(bound: &Value) -> String {
    match bound {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_message(path: &str, value: &Value, op: CmpOp, bound: &Value) -> String {
    format!(
        "{} (value:{}) is not {} {}",
        path,
        value.shown(),
        op.phrase(),
        bound_repr(bound)
    )
}

fn check_bound(value: &Value, path: &str, op: CmpOp, bound: &Value) -> String {
    match value.compare(bound) {
        Some(ord) if op.accepts(ord) => String::new(),
        Some(_) => compare_message(path, value, op, bound),
        None => format!(
            "{}: '{}' and '{}' are not comparable",
            compare_message(path, value, op, bound),
            value.type_name(),
            bound.type_name()
        ),
    }
}

/// A bound the argument of a comparison constructor must support ordering
/// for; rejects bounds no value could ever compare against.
fn orderable(bound: Value, kind: &str) -> std::result::Result<Value, SchemaError> {
    if bound.compare(&bound) == Some(Ordering::Equal) {
        Ok(bound)
    } else {
        Err(
            SchemaError::new(format!("the bound {} does not support comparison", bound))
                .with_origin(kind),
        )
    }
}

struct Comparison {
    op: CmpOp,
    bound: Value,
    name: String,
}

impl Check for Comparison {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, value: &Value, path: &str) -> String {
        check_bound(value, path, self.op, &self.bound)
    }
}

fn comparison(op: CmpOp, bound: impl Into<Value>, kind: &str) -> Result<Schema> {
    let bound = orderable(bound.into(), kind)?;
    let name = format!("{}({})", kind, bound_repr(&bound));
    Ok(check(Comparison { op, bound, name }))
}

/// Values strictly greater than the bound.
pub fn gt(bound: impl Into<Value>) -> Result<Schema> {
    comparison(CmpOp::Gt, bound, "gt")
}

/// Values greater than or equal to the bound.
pub fn ge(bound: impl Into<Value>) -> Result<Schema> {
    comparison(CmpOp::Ge, bound, "ge")
}

/// Values strictly less than the bound.
pub fn lt(bound: impl Into<Value>) -> Result<Schema> {
    comparison(CmpOp::Lt, bound, "lt")
}

/// Values less than or equal to the bound.
pub fn le(bound: impl Into<Value>) -> Result<Schema> {
    comparison(CmpOp::Le, bound, "le")
}

struct Interval {
    lo: Bound<Value>,
    hi: Bound<Value>,
    name: String,
}

impl Check for Interval {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, value: &Value, path: &str) -> String {
        let explanation = match &self.lo {
            Bound::Included(b) => check_bound(value, path, CmpOp::Ge, b),
            Bound::Excluded(b) => check_bound(value, path, CmpOp::Gt, b),
            Bound::Unbounded => String::new(),
        };
        if !explanation.is_empty() {
            return explanation;
        }
        match &self.hi {
            Bound::Included(b) => check_bound(value, path, CmpOp::Le, b),
            Bound::Excluded(b) => check_bound(value, path, CmpOp::Lt, b),
            Bound::Unbounded => String::new(),
        }
    }
}

fn clone_bound<V: Clone + Into<Value>>(bound: Bound<&V>) -> Bound<Value> {
    match bound {
        Bound::Included(v) => Bound::Included(v.clone().into()),
        Bound::Excluded(v) => Bound::Excluded(v.clone().into()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn range_repr(lo: &Bound<Value>, hi: &Bound<Value>) -> String {
    let lo_s = match lo {
        Bound::Included(v) => bound_repr(v),
        Bound::Excluded(v) => format!(">{}", bound_repr(v)),
        Bound::Unbounded => String::new(),
    };
    let hi_s = match hi {
        Bound::Included(v) => format!("..={}", bound_repr(v)),
        Bound::Excluded(v) => format!("..{}", bound_repr(v)),
        Bound::Unbounded => "..".to_string(),
    };
    format!("{}{}", lo_s, hi_s)
}

/// Values inside the interval. Bounds follow the usual range syntax, so
/// `interval(0..=100)`, `interval(0.5..)`, and `interval("a".."n")` all
/// work; an end left unbounded is not checked.
pub fn interval<V, R>(bounds: R) -> Schema
where
    V: Clone + Into<Value>,
    R: RangeBounds<V>,
{
    let lo = clone_bound(bounds.start_bound());
    let hi = clone_bound(bounds.end_bound());
    let name = format!("interval({})", range_repr(&lo, &hi));
    check(Interval { lo, hi, name })
}

struct Size {
    lo: Bound<usize>,
    hi: Bound<usize>,
    name: String,
}

impl Check for Size {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, value: &Value, path: &str) -> String {
        let len = match value.length() {
            Some(len) => len,
            None => return format!("{} (value:{}) has no len()", path, value.shown()),
        };
        let len_value = Value::Int(len as i64);
        let len_path = format!("len({})", path);
        let explanation = match self.lo {
            Bound::Included(n) => check_bound(&len_value, &len_path, CmpOp::Ge, &Value::Int(n as i64)),
            Bound::Excluded(n) => check_bound(&len_value, &len_path, CmpOp::Gt, &Value::Int(n as i64)),
            Bound::Unbounded => String::new(),
        };
        if !explanation.is_empty() {
            return explanation;
        }
        match self.hi {
            Bound::Included(n) => check_bound(&len_value, &len_path, CmpOp::Le, &Value::Int(n as i64)),
            Bound::Excluded(n) => check_bound(&len_value, &len_path, CmpOp::Lt, &Value::Int(n as i64)),
            Bound::Unbounded => String::new(),
        }
    }
}

/// Values with a length (strings, lists, dicts, sets) whose length falls
/// inside the bounds: `size(1..=80)`, `size(10..)`, `size(3..=3)`.
///
/// Bounds admitting no length, like `size(5..2)` or `size(0..0)`, are an
/// authoring mistake and are rejected.
pub fn size<R: RangeBounds<usize>>(bounds: R) -> Result<Schema> {
    fn copied(bound: Bound<&usize>) -> Bound<usize> {
        match bound {
            Bound::Included(n) => Bound::Included(*n),
            Bound::Excluded(n) => Bound::Excluded(*n),
            Bound::Unbounded => Bound::Unbounded,
        }
    }
    let lo = copied(bounds.start_bound());
    let hi = copied(bounds.end_bound());
    let lo_min = match lo {
        Bound::Included(n) => Some(n),
        Bound::Excluded(n) => match n.checked_add(1) {
            Some(min) => Some(min),
            None => {
                return Err(SchemaError::new(
                    "the lower size bound exceeds every representable length",
                )
                .with_origin("size")
                .into())
            }
        },
        Bound::Unbounded => None,
    };
    let hi_max = match hi {
        Bound::Included(n) => Some(n),
        Bound::Excluded(n) => match n.checked_sub(1) {
            Some(max) => Some(max),
            None => {
                return Err(SchemaError::new(
                    "the upper size bound excludes every length",
                )
                .with_origin("size")
                .into())
            }
        },
        Bound::Unbounded => None,
    };
    if let (Some(min), Some(max)) = (lo_min, hi_max) {
        if min > max {
            return Err(SchemaError::new(format!(
                "the lower size bound {} is bigger than the upper bound {}",
                min, max
            ))
            .with_origin("size")
            .into());
        }
    }
    fn as_value(bound: Bound<usize>) -> Bound<Value> {
        match bound {
            Bound::Included(n) => Bound::Included(Value::Int(n as i64)),
            Bound::Excluded(n) => Bound::Excluded(Value::Int(n as i64)),
            Bound::Unbounded => Bound::Unbounded,
        }
    }
    let name = format!("size({})", range_repr(&as_value(lo), &as_value(hi)));
    Ok(check(Size { lo, hi, name }))
}

struct Div {
    divisor: i64,
    remainder: i64,
    name: String,
}

impl Check for Div {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, value: &Value, path: &str) -> String {
        let x = match value {
            Value::Int(x) => *x,
            _ => return wrong_type(path, value, "int"),
        };
        // i128 keeps the subtraction exact for every i64 pair.
        if (i128::from(x) - i128::from(self.remainder)) % i128::from(self.divisor) == 0 {
            String::new()
        } else {
            wrong_type(path, value, &self.name)
        }
    }
}

/// Integers divisible by `divisor`.
pub fn div(divisor: i64) -> Result<Schema> {
    div_rem(divisor, 0)
}

/// Integers `x` with `(x - remainder) % divisor == 0`.
pub fn div_rem(divisor: i64, remainder: i64) -> Result<Schema> {
    if divisor == 0 {
        return Err(SchemaError::new("the divisor cannot be zero")
            .with_origin("div")
            .into());
    }
    let name = if remainder == 0 {
        format!("div({})", divisor)
    } else {
        format!("div({},{})", divisor, remainder)
    };
    Ok(check(Div {
        divisor,
        remainder,
        name,
    }))
}

struct CloseTo {
    x: f64,
    rel_tol: f64,
    abs_tol: f64,
    name: String,
}

impl Check for CloseTo {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, value: &Value, path: &str) -> String {
        match value.as_f64() {
            None => wrong_type(path, value, "number"),
            Some(v) if is_close(v, self.x, self.rel_tol, self.abs_tol) => String::new(),
            Some(_) => wrong_type(path, value, &self.name),
        }
    }
}

/// Numbers close to `x` under the default relative tolerance of `1e-9`.
pub fn close_to(x: f64) -> Schema {
    check(CloseTo {
        x,
        rel_tol: 1e-9,
        abs_tol: 0.0,
        name: format!("close_to({})", float_repr(x)),
    })
}

/// Numbers close to `x` under explicit tolerances.
pub fn close_to_with(x: f64, rel_tol: f64, abs_tol: f64) -> Result<Schema> {
    if rel_tol < 0.0 || abs_tol < 0.0 {
        return Err(SchemaError::new("tolerances must not be negative")
            .with_origin("close_to")
            .into());
    }
    Ok(check(CloseTo {
        x,
        rel_tol,
        abs_tol,
        name: format!(
            "close_to({},rel_tol={},abs_tol={})",
            float_repr(x),
            float_repr(rel_tol),
            float_repr(abs_tol)
        ),
    }))
}

struct RegexCheck {
    pattern: Regex,
    name: String,
}

impl Check for RegexCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, value: &Value, path: &str) -> String {
        match value.as_str() {
            Some(s) if self.pattern.is_match(s) => String::new(),
            _ => wrong_type(path, value, &self.name),
        }
    }
}

fn regex_impl(pattern: &str, name: Option<&str>) -> Result<Schema> {
    // Anchored: the whole string must match, as anchors are easy to forget
    // and partial matches are rarely what a schema means.
    let compiled = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
        SchemaError::new(format!("{} is an invalid regular expression: {}", pattern, e))
            .with_origin("regex")
    })?;
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| format!("regex({})", quote_str(pattern)));
    Ok(check(RegexCheck {
        pattern: compiled,
        name,
    }))
}

/// Strings fully matching the pattern.
pub fn regex(pattern: &str) -> Result<Schema> {
    regex_impl(pattern, None)
}

/// Strings fully matching the pattern, reported under a friendlier name.
pub fn regex_named(pattern: &str, name: &str) -> Result<Schema> {
    regex_impl(pattern, Some(name))
}

/// Translate a filename pattern into regex source.
fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                // A leading `!` negates, a leading `]` is a member, and an
                // unterminated class is a literal `[`.
                let mut j = i;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str(r"\[");
                } else {
                    let mut body = i;
                    out.push('[');
                    if chars[body] == '!' {
                        out.push('^');
                        body += 1;
                    }
                    for &m in &chars[body..j] {
                        // `-` passes through so ranges keep working.
                        if m.is_ascii_punctuation() && m != '-' {
                            out.push('\\');
                        }
                        out.push(m);
                    }
                    out.push(']');
                    i = j + 1;
                }
            }
            c if c.is_ascii_punctuation() => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Strings matching a Unix-style filename pattern, like `glob("*.toml")`.
///
/// `*` and `?` never cross a `/`. A relative pattern may match at any
/// component boundary from the right; a pattern starting with `/` must
/// match the whole string.
pub fn glob(pattern: &str) -> Result<Schema> {
    if pattern.is_empty() {
        return Err(SchemaError::new(format!(
            "{} is not a valid filename pattern: empty pattern",
            quote_str(pattern)
        ))
        .with_origin("glob")
        .into());
    }
    let body = glob_to_regex(pattern);
    let source = if pattern.starts_with('/') {
        format!("^{}$", body)
    } else {
        format!("^(?s:.*/)?{}$", body)
    };
    let compiled = Regex::new(&source).map_err(|e| {
        SchemaError::new(format!(
            "{} is not a valid filename pattern: {}",
            quote_str(pattern),
            e
        ))
        .with_origin("glob")
    })?;
    Ok(check(RegexCheck {
        pattern: compiled,
        name: format!("glob({})", quote_str(pattern)),
    }))
}

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .unwrap()
});

struct Email;

impl Check for Email {
    fn name(&self) -> &str {
        "email"
    }

    fn check(&self, value: &Value, path: &str) -> String {
        match value.as_str() {
            Some(s) if EMAIL.is_match(s) => String::new(),
            _ => wrong_type(path, value, "email"),
        }
    }
}

/// Syntactically valid email addresses.
pub fn email() -> Schema {
    check(Email)
}

struct UrlCheck;

impl Check for UrlCheck {
    fn name(&self) -> &str {
        "url"
    }

    fn check(&self, value: &Value, path: &str) -> String {
        let ok = value
            .as_str()
            .and_then(|s| url::Url::parse(s).ok())
            .map(|u| u.has_host())
            .unwrap_or(false);
        if ok {
            String::new()
        } else {
            wrong_type(path, value, "url")
        }
    }
}

/// Absolute URLs with a host.
pub fn url() -> Schema {
    check(UrlCheck)
}

#[derive(Clone, Copy)]
enum IpKind {
    Any,
    V4,
    V6,
}

struct Ip {
    kind: IpKind,
    name: &'static str,
}

impl Check for Ip {
    fn name(&self) -> &str {
        self.name
    }

    fn check(&self, value: &Value, path: &str) -> String {
        let s = match value.as_str() {
            Some(s) => s,
            None => return wrong_type(path, value, self.name),
        };
        let result = match self.kind {
            IpKind::Any => s.parse::<IpAddr>().map(|_| ()).map_err(|e| e.to_string()),
            IpKind::V4 => s.parse::<Ipv4Addr>().map(|_| ()).map_err(|e| e.to_string()),
            IpKind::V6 => s.parse::<Ipv6Addr>().map(|_| ()).map_err(|e| e.to_string()),
        };
        match result {
            Ok(()) => String::new(),
            Err(reason) => wrong_type_because(path, value, self.name, &reason),
        }
    }
}

/// IPv4 or IPv6 address literals.
pub fn ip_address() -> Schema {
    check(Ip {
        kind: IpKind::Any,
        name: "ip_address",
    })
}

/// IPv4 address literals.
pub fn ipv4_address() -> Schema {
    check(Ip {
        kind: IpKind::V4,
        name: "ipv4_address",
    })
}

/// IPv6 address literals.
pub fn ipv6_address() -> Schema {
    check(Ip {
        kind: IpKind::V6,
        name: "ipv6_address",
    })
}

static DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$").unwrap()
});

struct DomainName;

impl Check for DomainName {
    fn name(&self) -> &str {
        "domain_name"
    }

    fn check(&self, value: &Value, path: &str) -> String {
        let ok = value
            .as_str()
            .map(|s| s.len() <= 253 && DOMAIN.is_match(s))
            .unwrap_or(false);
        if ok {
            String::new()
        } else {
            wrong_type(path, value, "domain_name")
        }
    }
}

/// Syntactically valid dotted host names (letters, digits, hyphens).
pub fn domain_name() -> Schema {
    check(DomainName)
}

#[derive(Clone, Copy)]
enum TemporalKind {
    DateTime,
    Date,
    Time,
}

struct Temporal {
    kind: TemporalKind,
    format: Option<String>,
    name: String,
}

impl Check for Temporal {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, value: &Value, path: &str) -> String {
        let s = match value.as_str() {
            Some(s) => s,
            None => return wrong_type(path, value, &self.name),
        };
        let result = match (self.kind, self.format.as_deref()) {
            (TemporalKind::DateTime, Some(format)) => {
                NaiveDateTime::parse_from_str(s, format).map(|_| ()).map_err(|e| e.to_string())
            }
            (TemporalKind::DateTime, None) => {
                DateTime::parse_from_rfc3339(s).map(|_| ()).map_err(|e| e.to_string())
            }
            (TemporalKind::Date, Some(format)) => {
                NaiveDate::parse_from_str(s, format).map(|_| ()).map_err(|e| e.to_string())
            }
            (TemporalKind::Date, None) => s.parse::<NaiveDate>().map(|_| ()).map_err(|e| e.to_string()),
            (TemporalKind::Time, Some(format)) => {
                NaiveTime::parse_from_str(s, format).map(|_| ()).map_err(|e| e.to_string())
            }
            (TemporalKind::Time, None) => s.parse::<NaiveTime>().map(|_| ()).map_err(|e| e.to_string()),
        };
        match result {
            Ok(()) => String::new(),
            Err(reason) => wrong_type_because(path, value, &self.name, &reason),
        }
    }
}

fn temporal(kind: TemporalKind, format: Option<&str>, base: &str) -> Schema {
    let name = match format {
        Some(format) => format!("{}({})", base, quote_str(format)),
        None => base.to_string(),
    };
    check(Temporal {
        kind,
        format: format.map(str::to_string),
        name,
    })
}

/// Date-times in the given `strftime`-style format.
pub fn date_time(format: &str) -> Schema {
    temporal(TemporalKind::DateTime, Some(format), "date_time")
}

/// RFC 3339 date-times, like `1996-12-19T16:39:57-08:00`.
pub fn date_time_iso() -> Schema {
    temporal(TemporalKind::DateTime, None, "date_time")
}

/// Dates in the given `strftime`-style format.
pub fn date(format: &str) -> Schema {
    temporal(TemporalKind::Date, Some(format), "date")
}

/// ISO 8601 dates, like `2013-08-09`.
pub fn date_iso() -> Schema {
    temporal(TemporalKind::Date, None, "date")
}

/// Times in the given `strftime`-style format.
pub fn time(format: &str) -> Schema {
    temporal(TemporalKind::Time, Some(format), "time")
}

/// ISO 8601 times, like `23:56:04`.
pub fn time_iso() -> Schema {
    temporal(TemporalKind::Time, None, "time")
}
