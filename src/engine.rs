//! The validator core.
//!
//! A compiled schema is a [`Program`]: an arena of [`Node`]s addressed by
//! index, with one designated root. Checking walks the arena recursively,
//! threading a [`Context`] (strictness flag and substitution table) and a
//! path string used to qualify failure explanations. An empty explanation
//! means the value conforms.
//!
//! Programs are immutable after compilation and cheap to clone
//! ([`CompiledSchema`] is an `Arc` handle), so one compiled schema can be
//! shared freely across threads and concurrent validations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::compiler::compile;
use crate::error::{Result, SchemaError, ValidationError};
use crate::mapping::MappingNode;
use crate::schema::{ExternalCheck, Predicate, Schema};
use crate::sequence::SequenceNode;
use crate::value::{float_repr, is_close, quote_str, Ty, Value};

/// Index of a node within a [`Program`] arena.
pub(crate) type NodeId = usize;

/// An executable validator node.
///
/// Child links are arena indices, which lets recursive schemas compile into
/// cyclic graphs without reference cycles.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    /// Type-membership check.
    Type(Ty),
    /// Literal equality; non-integral float literals compare with the
    /// default closeness tolerance.
    Literal(Value),
    /// Literal equality, always exact.
    Quoted(Value),
    /// Named predicate.
    Predicate(Predicate),
    /// External check implementation.
    External(ExternalCheck),
    /// Fixed prefix plus optional repeated tail.
    Sequence(SequenceNode),
    /// Ordered key/value entries.
    Mapping(MappingNode),
    /// Every set element must match one of the members.
    SetOf(Vec<NodeId>),
    /// Any alternative may accept.
    Union(Vec<NodeId>),
    /// Every part must accept.
    Intersect(Vec<NodeId>),
    /// The child must reject.
    Complement(NodeId),
    /// Force lax key handling below.
    Lax(NodeId),
    /// Force strict key handling below.
    Strict(NodeId),
    /// Report failures under a display name.
    Named {
        child: NodeId,
        name: String,
        reason: bool,
    },
    /// Guarded check with optional else branch.
    IfThen {
        cond: NodeId,
        then: NodeId,
        otherwise: Option<NodeId>,
    },
    /// First matching guard selects its branch.
    CondChain(Vec<(NodeId, NodeId)>),
    /// Substitutable wrapper.
    Labeled { child: NodeId, labels: Vec<String> },
    /// Exactly one of the keys must be present.
    OneOf(Vec<String>),
    /// At least one of the keys must be present.
    AtLeastOneOf(Vec<String>),
    /// At most one of the keys may be present.
    AtMostOneOf(Vec<String>),
    /// All keys must be present.
    HasKeys(Vec<String>),
    /// Back-patched indirection, installed for self-referential schemas.
    Alias(NodeId),
}

/// The immutable result of compiling a schema.
#[derive(Debug)]
pub(crate) struct Program {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

/// Per-call validation state, copied (never mutated) on derivation.
#[derive(Clone, Copy)]
pub(crate) struct Context<'a> {
    pub(crate) strict: bool,
    pub(crate) subs: &'a Substitutions,
}

/// The standard failure explanation for a value of the wrong kind.
pub(crate) fn wrong_type(path: &str, value: &Value, type_name: &str) -> String {
    format!(
        "{} (value:{}) is not of type '{}'",
        path,
        value.shown(),
        type_name
    )
}

/// [`wrong_type`] with a reason appended.
pub(crate) fn wrong_type_because(
    path: &str,
    value: &Value,
    type_name: &str,
    reason: &str,
) -> String {
    format!(
        "{} (value:{}) is not of type '{}': {}",
        path,
        value.shown(),
        type_name,
        reason
    )
}

/// Wrong-type explanation without the value, with the inner explanation
/// appended. Used by named schemas asked to show their reason.
pub(crate) fn named_failure(path: &str, type_name: &str, reason: &str) -> String {
    format!("{} is not of type '{}': {}", path, type_name, reason)
}

fn not_equal(path: &str, value: &Value, literal: &Value) -> String {
    format!(
        "{} (value:{}) is not equal to {}",
        path,
        value.shown(),
        literal
    )
}

/// Extend a path with a quoted dict key.
pub(crate) fn key_path(path: &str, key: &str) -> String {
    format!("{}[{}]", path, quote_str(key))
}

fn presence_name(kind: &str, keys: &[String]) -> String {
    let quoted: Vec<String> = keys.iter().map(|k| quote_str(k)).collect();
    format!("{}({})", kind, quoted.join(","))
}

fn check_literal(literal: &Value, value: &Value, path: &str) -> String {
    if let Value::Float(x) = literal {
        if x.fract() != 0.0 {
            return match value.as_f64() {
                Some(v) if is_close(v, *x, 1e-9, 0.0) => String::new(),
                Some(_) => wrong_type(path, value, &format!("close_to({})", float_repr(*x))),
                None => wrong_type(path, value, "number"),
            };
        }
    }
    if value == literal {
        String::new()
    } else {
        not_equal(path, value, literal)
    }
}

impl Program {
    /// Check `value` against the node at `id`, qualifying failures with
    /// `path`. Empty return means the value conforms.
    pub(crate) fn check_at(
        &self,
        id: NodeId,
        value: &Value,
        path: &str,
        ctx: Context<'_>,
    ) -> String {
        match &self.nodes[id] {
            Node::Alias(target) => self.check_at(*target, value, path, ctx),
            Node::Type(t) => {
                if t.admits(value) {
                    String::new()
                } else {
                    wrong_type(path, value, t.name())
                }
            }
            Node::Literal(literal) => check_literal(literal, value, path),
            Node::Quoted(literal) => {
                if value == literal {
                    String::new()
                } else {
                    not_equal(path, value, literal)
                }
            }
            Node::Predicate(p) => match p.eval(value) {
                Ok(true) => String::new(),
                Ok(false) => wrong_type(path, value, p.name()),
                Err(reason) => wrong_type_because(path, value, p.name(), &reason),
            },
            Node::External(check) => check.0.check(value, path),
            Node::Sequence(node) => node.check(self, value, path, ctx),
            Node::Mapping(node) => node.check(self, value, path, ctx),
            Node::SetOf(members) => self.check_set(members, value, path, ctx),
            Node::Union(alternatives) => self.check_union(alternatives, value, path, ctx),
            Node::Intersect(parts) => {
                for part in parts {
                    let explanation = self.check_at(*part, value, path, ctx);
                    if !explanation.is_empty() {
                        return explanation;
                    }
                }
                String::new()
            }
            Node::Complement(child) => {
                if self.check_at(*child, value, path, ctx).is_empty() {
                    format!("{} does not match the complemented schema", path)
                } else {
                    String::new()
                }
            }
            Node::Lax(child) => self.check_at(*child, value, path, Context { strict: false, ..ctx }),
            Node::Strict(child) => self.check_at(*child, value, path, Context { strict: true, ..ctx }),
            Node::Named {
                child,
                name,
                reason,
            } => {
                let explanation = self.check_at(*child, value, path, ctx);
                if explanation.is_empty() {
                    explanation
                } else if *reason {
                    named_failure(path, name, &explanation)
                } else {
                    wrong_type(path, value, name)
                }
            }
            Node::IfThen {
                cond,
                then,
                otherwise,
            } => {
                // Guards evaluate laxly: extra dict keys do not stop a
                // value from matching the guard.
                let guard_ctx = Context { strict: false, ..ctx };
                if self.check_at(*cond, value, path, guard_ctx).is_empty() {
                    self.check_at(*then, value, path, ctx)
                } else if let Some(otherwise) = otherwise {
                    self.check_at(*otherwise, value, path, ctx)
                } else {
                    String::new()
                }
            }
            Node::CondChain(branches) => {
                let guard_ctx = Context { strict: false, ..ctx };
                for (guard, branch) in branches {
                    if self.check_at(*guard, value, path, guard_ctx).is_empty() {
                        return self.check_at(*branch, value, path, ctx);
                    }
                }
                String::new()
            }
            Node::Labeled { child, labels } => {
                self.check_labeled(*child, labels, value, path, ctx)
            }
            Node::OneOf(keys) => check_presence(value, path, keys, "one_of", |n| n == 1),
            Node::AtLeastOneOf(keys) => {
                check_presence(value, path, keys, "at_least_one_of", |n| n >= 1)
            }
            Node::AtMostOneOf(keys) => {
                check_presence(value, path, keys, "at_most_one_of", |n| n <= 1)
            }
            Node::HasKeys(keys) => check_has_keys(value, path, keys),
        }
    }

    fn check_union(
        &self,
        alternatives: &[NodeId],
        value: &Value,
        path: &str,
        ctx: Context<'_>,
    ) -> String {
        let mut failures = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            let explanation = self.check_at(*alternative, value, path, ctx);
            if explanation.is_empty() {
                return String::new();
            }
            failures.push(explanation);
        }
        failures.join(" and ")
    }

    fn check_set(
        &self,
        members: &[NodeId],
        value: &Value,
        path: &str,
        ctx: Context<'_>,
    ) -> String {
        let items = match value {
            Value::Set(items) => items,
            _ => return wrong_type(path, value, "set"),
        };
        if members.is_empty() {
            if items.is_empty() {
                return String::new();
            }
            return format!("{} (value:{}) is not empty", path, value.shown());
        }
        for (i, item) in items.iter().enumerate() {
            let item_path = format!("{}{{{}}}", path, i);
            let explanation = self.check_union(members, item, &item_path, ctx);
            if !explanation.is_empty() {
                return explanation;
            }
        }
        String::new()
    }

    fn check_labeled(
        &self,
        child: NodeId,
        labels: &[String],
        value: &Value,
        path: &str,
        ctx: Context<'_>,
    ) -> String {
        for label in labels {
            if let Some(substitute) = ctx.subs.get(label) {
                debug!("schema for {} replaced through label {:?}", path, label);
                let program = substitute.program();
                return program.check_at(program.root, value, path, ctx);
            }
        }
        self.check_at(child, value, path, ctx)
    }

    /// Reject substitution tables that hit two labels of one labeled node.
    /// Run once per validation, before any checking starts.
    fn ensure_unambiguous(&self, subs: &Substitutions) -> std::result::Result<(), SchemaError> {
        if subs.is_empty() {
            return Ok(());
        }
        for node in &self.nodes {
            if let Node::Labeled { labels, .. } = node {
                let hits: Vec<&str> = labels
                    .iter()
                    .filter(|label| subs.get(label).is_some())
                    .map(|label| label.as_str())
                    .collect();
                if hits.len() >= 2 {
                    return Err(SchemaError::new(format!(
                        "multiple substitutions apply (labels: {})",
                        hits.join(", ")
                    ))
                    .with_origin("set_label"));
                }
            }
        }
        Ok(())
    }
}

fn check_presence(
    value: &Value,
    path: &str,
    keys: &[String],
    kind: &str,
    accept: impl Fn(usize) -> bool,
) -> String {
    let display = presence_name(kind, keys);
    match value.as_dict() {
        None => wrong_type(path, value, &display),
        Some(dict) => {
            let present = keys
                .iter()
                .filter(|key| dict.contains_key(key.as_str()))
                .count();
            if accept(present) {
                String::new()
            } else {
                wrong_type(path, value, &display)
            }
        }
    }
}

fn check_has_keys(value: &Value, path: &str, keys: &[String]) -> String {
    match value.as_dict() {
        None => wrong_type(path, value, "dict"),
        Some(dict) => {
            for key in keys {
                if !dict.contains_key(key.as_str()) {
                    return format!("{} is missing", key_path(path, key));
                }
            }
            String::new()
        }
    }
}

/// A table of label substitutions, applied through
/// [`set_label`](crate::set_label) wrappers at validation time.
///
/// Schemas are compiled when inserted, so a malformed replacement surfaces
/// here rather than in the middle of a validation run.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    table: HashMap<String, CompiledSchema>,
}

impl Substitutions {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a replacement schema for a label, compiling it eagerly.
    pub fn insert(&mut self, label: impl Into<String>, schema: &Schema) -> Result<()> {
        let compiled = compile(schema)?;
        self.table.insert(label.into(), compiled);
        Ok(())
    }

    /// Register an already-compiled replacement for a label.
    pub fn insert_compiled(&mut self, label: impl Into<String>, schema: CompiledSchema) {
        self.table.insert(label.into(), schema);
    }

    /// Look up the replacement for a label.
    pub fn get(&self, label: &str) -> Option<&CompiledSchema> {
        self.table.get(label)
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn programs(&self) -> impl Iterator<Item = &CompiledSchema> {
        self.table.values()
    }
}

/// Validation options: the root path name, the strictness flag, and the
/// substitution table.
///
/// ```
/// use vjson::Options;
///
/// let options = Options::new().with_name("payload").with_strict(false);
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    name: String,
    strict: bool,
    subs: Substitutions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            name: "object".to_string(),
            strict: true,
            subs: Substitutions::new(),
        }
    }
}

impl Options {
    /// Strict validation rooted at `"object"` with no substitutions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root path name used in explanations.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the strictness flag. Strict validation rejects dict keys the
    /// schema does not mention.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Register a label substitution, compiling the replacement eagerly.
    pub fn with_substitution(mut self, label: impl Into<String>, schema: &Schema) -> Result<Self> {
        self.subs.insert(label, schema)?;
        Ok(self)
    }

    /// Replace the whole substitution table.
    pub fn with_substitutions(mut self, subs: Substitutions) -> Self {
        self.subs = subs;
        self
    }

    /// The root path name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The strictness flag.
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// The substitution table.
    pub fn substitutions(&self) -> &Substitutions {
        &self.subs
    }
}

/// An immutable, executable schema.
///
/// Produced by [`compile`]; cheap to clone and safe to share across threads
/// and concurrent validations.
#[derive(Clone)]
pub struct CompiledSchema {
    program: Arc<Program>,
}

impl CompiledSchema {
    pub(crate) fn new(program: Program) -> Self {
        Self {
            program: Arc::new(program),
        }
    }

    pub(crate) fn program(&self) -> &Program {
        &self.program
    }

    /// Stable identity of the underlying program, used by the compiler to
    /// embed a pre-compiled schema only once per output program.
    pub(crate) fn program_key(&self) -> usize {
        Arc::as_ptr(&self.program) as usize
    }

    /// Validate strictly under the default root name.
    pub fn validate(&self, value: &Value) -> Result<()> {
        self.validate_with(value, &Options::default())
    }

    /// Validate under explicit options.
    pub fn validate_with(&self, value: &Value, options: &Options) -> Result<()> {
        let explanation = self.explain(value, options)?;
        if explanation.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(explanation)
                .with_path(options.name())
                .into())
        }
    }

    /// Check and return the explanation instead of an error. Empty string
    /// means the value conforms.
    pub fn explain(&self, value: &Value, options: &Options) -> Result<String> {
        self.program.ensure_unambiguous(&options.subs)?;
        for substitute in options.subs.programs() {
            substitute.program.ensure_unambiguous(&options.subs)?;
        }
        let ctx = Context {
            strict: options.strict,
            subs: &options.subs,
        };
        Ok(self
            .program
            .check_at(self.program.root, value, options.name(), ctx))
    }

    /// Whether the value conforms under default options.
    pub fn is_valid(&self, value: &Value) -> bool {
        matches!(self.explain(value, &Options::default()), Ok(e) if e.is_empty())
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompiledSchema({} nodes)", self.program.nodes.len())
    }
}

/// Validate a value against a schema, strictly, rooted at `"object"`.
///
/// Compiles the schema first; reuse [`compile`] + [`CompiledSchema`] to
/// validate many values against the same schema.
pub fn validate(schema: &Schema, value: &Value) -> Result<()> {
    validate_with(schema, value, &Options::default())
}

/// Validate a value against a schema under explicit [`Options`].
pub fn validate_with(schema: &Schema, value: &Value, options: &Options) -> Result<()> {
    let compiled = compile(schema)?;
    compiled.validate_with(value, options)
}

/// Whether the value conforms to the schema under default options.
///
/// Swallows the distinction between a malformed schema and a failing
/// value; use [`validate`] when it matters.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    compile(schema)
        .map(|compiled| compiled.is_valid(value))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        at_most_one_of, complement, cond, ifthen, ifthen_else, intersect, keys, lax, one_of,
        predicate, quote, set_label, set_name, set_name_with_reason, set_of, strict, union,
    };
    use crate::value::Ty;
    use serde_json::json;

    fn explain(schema: &Schema, value: &Value) -> String {
        compile(schema)
            .unwrap()
            .explain(value, &Options::default())
            .unwrap()
    }

    #[test]
    fn test_type_check_message() {
        let schema = Schema::from(Ty::Int);
        assert_eq!(explain(&schema, &Value::Int(1)), "");
        assert_eq!(
            explain(&schema, &Value::Str("a".to_string())),
            "object (value:'a') is not of type 'int'"
        );
        assert_eq!(
            explain(&schema, &Value::Float(1.0)),
            "object (value:1.0) is not of type 'int'"
        );
    }

    #[test]
    fn test_literal_equality() {
        let schema = Schema::from(1i64);
        assert_eq!(explain(&schema, &Value::Int(1)), "");
        assert_eq!(explain(&schema, &Value::Float(1.0)), "");
        assert_eq!(
            explain(&schema, &Value::Int(2)),
            "object (value:2) is not equal to 1"
        );
    }

    #[test]
    fn test_nonintegral_float_literal_is_tolerant() {
        let schema = Schema::from(2.94);
        assert_eq!(explain(&schema, &Value::Float(2.94 + 1e-10)), "");
        assert!(explain(&schema, &Value::Float(2.95)).contains("close_to(2.94)"));
        assert!(explain(&schema, &Value::Str("x".to_string()))
            .contains("is not of type 'number'"));
    }

    #[test]
    fn test_quote_is_exact() {
        let schema = quote(Value::Float(1.0 + 1e-14));
        assert_ne!(explain(&schema, &Value::Float(1.0)), "");
        let schema = quote(Value::Float(2.94));
        assert_eq!(explain(&schema, &Value::Float(2.94)), "");
        assert_ne!(explain(&schema, &Value::Float(2.94 + 1e-10)), "");
    }

    #[test]
    fn test_predicate_messages() {
        let even = predicate("is_even", |v| match v {
            Value::Int(i) => Ok(i % 2 == 0),
            _ => Err("not an integer".to_string()),
        });
        assert_eq!(explain(&even, &Value::Int(2)), "");
        assert_eq!(
            explain(&even, &Value::Int(3)),
            "object (value:3) is not of type 'is_even'"
        );
        assert_eq!(
            explain(&even, &Value::Null),
            "object (value:null) is not of type 'is_even': not an integer"
        );
    }

    #[test]
    fn test_union_joins_failures() {
        let schema = union([Schema::from(Ty::Int), Schema::from(Ty::Str)]);
        assert_eq!(explain(&schema, &Value::Int(1)), "");
        assert_eq!(explain(&schema, &Value::Str("a".to_string())), "");
        let msg = explain(&schema, &Value::Null);
        assert!(msg.contains("is not of type 'int'"));
        assert!(msg.contains(" and "));
        assert!(msg.contains("is not of type 'str'"));
    }

    #[test]
    fn test_intersect_reports_first_failure() {
        let even = predicate("is_even", |v| match v {
            Value::Int(i) => Ok(i % 2 == 0),
            _ => Ok(false),
        });
        let schema = intersect([Schema::from(Ty::Int), even]);
        assert_eq!(explain(&schema, &Value::Int(2)), "");
        let msg = explain(&schema, &Value::Float(3.0));
        assert!(msg.contains("is not of type 'int'"));
        assert!(!msg.contains("is_even"));
    }

    #[test]
    fn test_complement() {
        let schema = complement(Ty::Int);
        assert_eq!(explain(&schema, &Value::Str("a".to_string())), "");
        assert_eq!(
            explain(&schema, &Value::Int(1)),
            "object does not match the complemented schema"
        );
    }

    #[test]
    fn test_set_name_messages() {
        let schema = set_name(Ty::Int, "identifier");
        assert_eq!(
            explain(&schema, &Value::Null),
            "object (value:null) is not of type 'identifier'"
        );
        let schema = set_name_with_reason(Ty::Int, "identifier");
        assert_eq!(
            explain(&schema, &Value::Null),
            "object is not of type 'identifier': object (value:null) is not of type 'int'"
        );
    }

    #[test]
    fn test_ifthen() {
        let schema = ifthen(
            crate::schema::dict([("flag", Schema::from(true))]),
            crate::schema::dict([("flag", Schema::from(true)), ("x", Schema::from(Ty::Int))]),
        );
        assert_ne!(
            explain(&schema, &Value::from(json!({"flag": true, "x": "s"}))),
            ""
        );
        assert_eq!(explain(&schema, &Value::from(json!({"flag": false}))), "");
    }

    #[test]
    fn test_ifthen_else() {
        let schema = ifthen_else(Ty::Int, Schema::from(1i64), Schema::from(Ty::Str));
        assert_eq!(explain(&schema, &Value::Int(1)), "");
        assert_ne!(explain(&schema, &Value::Int(2)), "");
        assert_eq!(explain(&schema, &Value::Str("a".to_string())), "");
        assert_ne!(explain(&schema, &Value::Null), "");
    }

    #[test]
    fn test_cond_default_branch() {
        let schema = cond([
            (Schema::from(Ty::Int), Schema::from(1i64)),
            (Schema::from(Ty::Anything), Schema::from(Ty::Str)),
        ]);
        assert_eq!(explain(&schema, &Value::Int(1)), "");
        assert_ne!(explain(&schema, &Value::Int(2)), "");
        assert_eq!(explain(&schema, &Value::Str("a".to_string())), "");
        assert_ne!(explain(&schema, &Value::Null), "");
    }

    #[test]
    fn test_cond_no_guard_passes() {
        let schema = cond([(Schema::from(Ty::Int), Schema::from(1i64))]);
        assert_eq!(explain(&schema, &Value::Str("a".to_string())), "");
    }

    #[test]
    fn test_presence_family() {
        let value = Value::from(json!({"cat": 1}));
        let both = Value::from(json!({"cat": 1, "dog": 2}));
        let neither = Value::from(json!({}));

        let schema = one_of(["cat", "dog"]);
        assert_eq!(explain(&schema, &value), "");
        assert_eq!(
            explain(&schema, &both),
            "object (value:{'cat': 1, 'dog': 2}) is not of type 'one_of('cat','dog')'"
        );
        assert_ne!(explain(&schema, &neither), "");
        assert_ne!(explain(&schema, &Value::Null), "");

        let schema = at_most_one_of(["cat", "dog"]);
        assert_eq!(explain(&schema, &neither), "");
        assert_eq!(explain(&schema, &value), "");
        assert_ne!(explain(&schema, &both), "");
    }

    #[test]
    fn test_keys_missing_message() {
        let schema = keys(["a", "b"]);
        assert_eq!(explain(&schema, &Value::from(json!({"a": 1, "b": 2, "c": 3}))), "");
        assert_eq!(
            explain(&schema, &Value::from(json!({"a": 1}))),
            "object['b'] is missing"
        );
        assert_eq!(
            explain(&schema, &Value::Int(1)),
            "object (value:1) is not of type 'dict'"
        );
    }

    #[test]
    fn test_strict_and_lax_overrides() {
        let inner = crate::schema::dict([("a", Schema::from(Ty::Int))]);
        let value = Value::from(json!({"a": 1, "extra": 2}));

        assert_ne!(explain(&inner, &value), "");
        assert_eq!(explain(&lax(inner.clone()), &value), "");
        let compiled = compile(&strict(lax(inner.clone()))).unwrap();
        assert!(compiled
            .explain(&value, &Options::new().with_strict(false))
            .unwrap()
            .is_empty());
        let compiled = compile(&strict(inner)).unwrap();
        assert!(!compiled
            .explain(&value, &Options::new().with_strict(false))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_set_membership() {
        let schema = set_of([Schema::from(Ty::Int), Schema::from(Ty::Str)]);
        assert_eq!(
            explain(&schema, &Value::Set(vec![Value::Int(1), Value::Str("a".to_string())])),
            ""
        );
        let msg = explain(&schema, &Value::Set(vec![Value::Float(1.5)]));
        assert!(msg.contains("object{0}"));
        assert!(msg.contains(" and "));
        assert_ne!(explain(&schema, &Value::Int(1)), "");

        let empty = set_of([]);
        assert_eq!(explain(&empty, &Value::Set(vec![])), "");
        assert_eq!(
            explain(&empty, &Value::Set(vec![Value::Int(1)])),
            "object (value:{1}) is not empty"
        );
    }

    #[test]
    fn test_label_substitution() {
        let schema = crate::schema::dict([("a", set_label(Ty::Int, ["loose"]))]);
        let value = Value::from(json!({"a": "s"}));
        assert_ne!(explain(&schema, &value), "");

        let options = Options::new()
            .with_substitution("loose", &Schema::from(Ty::Str))
            .unwrap();
        let compiled = compile(&schema).unwrap();
        assert_eq!(compiled.explain(&value, &options).unwrap(), "");
    }

    #[test]
    fn test_ambiguous_substitution_is_schema_error() {
        let schema = set_label(Ty::Int, ["a", "b"]);
        let options = Options::new()
            .with_substitution("a", &Schema::from(Ty::Str))
            .unwrap()
            .with_substitution("b", &Schema::from(Ty::Float))
            .unwrap();
        let compiled = compile(&schema).unwrap();
        match compiled.validate_with(&Value::Int(1), &options) {
            Err(crate::error::Error::Schema(e)) => {
                assert!(e.message.contains("multiple substitutions"));
            }
            other => panic!("expected schema error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_options_accessors() {
        let options = Options::new().with_name("payload").with_strict(false);
        assert_eq!(options.name(), "payload");
        assert!(!options.strict());
        assert!(options.substitutions().is_empty());
    }

    #[test]
    fn test_validate_entry_points() {
        let schema = Schema::from(Ty::Int);
        assert!(validate(&schema, &Value::Int(1)).is_ok());
        let err = validate(&schema, &Value::Null).unwrap_err();
        assert!(err.to_string().contains("is not of type 'int'"));
        assert!(is_valid(&schema, &Value::Int(1)));
        assert!(!is_valid(&schema, &Value::Null));
        assert!(!is_valid(&union([]), &Value::Int(1)));
    }
}
