//! Schema compilation.
//!
//! [`compile`] turns a [`Schema`] description into an arena [`Program`].
//! Dispatch over the description's shape is an explicit ordered match:
//! pre-compiled programs are embedded as-is, external checks are wrapped
//! unchanged, combinators compile their children recursively, then type
//! tags, predicates, sequences, mappings, sets, and finally literals.
//!
//! Self-referential schemas compile through a registry keyed by identity:
//! when a shared or deferred description is first seen, a placeholder node
//! is reserved and recorded, so re-encountering the same identity while
//! compiling its own children yields the placeholder instead of recursing
//! forever. Once the real node exists the placeholder is back-patched into
//! an alias. A placeholder that only ever resolves to other placeholders
//! is a schema error.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::engine::{CompiledSchema, Node, NodeId, Program};
use crate::error::{Result, SchemaError};
use crate::mapping::{KeyNode, MapEntryNode, MappingNode};
use crate::schema::{MapKey, Schema};
use crate::sequence::SequenceNode;
use crate::value::Ty;

/// Sentinel target for a reserved, not yet back-patched placeholder.
const PENDING: NodeId = usize::MAX;

/// Compile a schema description into an executable program.
///
/// Compilation is deterministic and idempotent: compiling a
/// [`Schema::Compiled`] embeds the existing program unchanged. Malformed
/// descriptions (an empty union, a misplaced repeat marker, an undefined or
/// unresolvable recursive schema) are reported as
/// [`SchemaError`](crate::SchemaError)s.
pub fn compile(schema: &Schema) -> Result<CompiledSchema> {
    let mut builder = Builder::new();
    let root = builder.compile_schema(schema)?;
    let program = builder.finish(root)?;
    Ok(CompiledSchema::new(program))
}

struct Builder {
    nodes: Vec<Node>,
    /// Identity of in-progress shared/deferred descriptions to their
    /// placeholder, plus already-embedded programs to their root.
    registry: HashMap<usize, NodeId>,
}

impl Builder {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            registry: HashMap::new(),
        }
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    fn reserve(&mut self) -> NodeId {
        self.push(Node::Alias(PENDING))
    }

    fn fill(&mut self, placeholder: NodeId, target: NodeId) {
        self.nodes[placeholder] = Node::Alias(target);
    }

    fn compile_schema(&mut self, schema: &Schema) -> std::result::Result<NodeId, SchemaError> {
        match schema {
            // Pre-compiled programs are embedded, ids rebased.
            Schema::Compiled(compiled) => Ok(self.embed(compiled)),

            // External checks are wrapped without modification.
            Schema::Check(check) => Ok(self.push(Node::External(check.clone()))),

            // Identity-carrying wrappers go through the registry.
            Schema::Shared(inner) => {
                let key = Arc::as_ptr(inner) as usize;
                if let Some(&id) = self.registry.get(&key) {
                    return Ok(id);
                }
                let placeholder = self.reserve();
                self.registry.insert(key, placeholder);
                let real = self.compile_schema(inner)?;
                self.fill(placeholder, real);
                Ok(placeholder)
            }
            Schema::Deferred(handle) => {
                let key = handle.key();
                if let Some(&id) = self.registry.get(&key) {
                    return Ok(id);
                }
                let definition = handle.get().ok_or_else(|| {
                    SchemaError::new("recursive schema used before being defined")
                        .with_origin("recursive")
                })?;
                let placeholder = self.reserve();
                self.registry.insert(key, placeholder);
                let real = self.compile_schema(definition)?;
                self.fill(placeholder, real);
                Ok(placeholder)
            }

            // Combinators compile their children recursively.
            Schema::Union(alternatives) => {
                if alternatives.is_empty() {
                    return Err(SchemaError::new("a union needs at least one alternative")
                        .with_origin("union"));
                }
                let ids = self.compile_children(alternatives)?;
                Ok(self.push(Node::Union(ids)))
            }
            Schema::Intersect(parts) => {
                if parts.is_empty() {
                    return Err(SchemaError::new("an intersection needs at least one part")
                        .with_origin("intersect"));
                }
                let ids = self.compile_children(parts)?;
                Ok(self.push(Node::Intersect(ids)))
            }
            Schema::Complement(inner) => {
                let child = self.compile_schema(inner)?;
                Ok(self.push(Node::Complement(child)))
            }
            Schema::Lax(inner) => {
                let child = self.compile_schema(inner)?;
                Ok(self.push(Node::Lax(child)))
            }
            Schema::Strict(inner) => {
                let child = self.compile_schema(inner)?;
                Ok(self.push(Node::Strict(child)))
            }
            Schema::Quote(value) => Ok(self.push(Node::Quoted(value.clone()))),
            Schema::Named {
                schema,
                name,
                reason,
            } => {
                let child = self.compile_schema(schema)?;
                Ok(self.push(Node::Named {
                    child,
                    name: name.clone(),
                    reason: *reason,
                }))
            }
            Schema::IfThen {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.compile_schema(cond)?;
                let then = self.compile_schema(then)?;
                let otherwise = match otherwise {
                    Some(schema) => Some(self.compile_schema(schema)?),
                    None => None,
                };
                Ok(self.push(Node::IfThen {
                    cond,
                    then,
                    otherwise,
                }))
            }
            Schema::CondChain(branches) => {
                if branches.is_empty() {
                    return Err(
                        SchemaError::new("a cond chain needs at least one branch").with_origin("cond")
                    );
                }
                let mut ids = Vec::with_capacity(branches.len());
                for (guard, branch) in branches {
                    let guard = self.compile_schema(guard)?;
                    let branch = self.compile_schema(branch)?;
                    ids.push((guard, branch));
                }
                Ok(self.push(Node::CondChain(ids)))
            }
            Schema::Labeled { schema, labels } => {
                if labels.is_empty() {
                    return Err(SchemaError::new("a labeled schema needs at least one label")
                        .with_origin("set_label"));
                }
                let child = self.compile_schema(schema)?;
                Ok(self.push(Node::Labeled {
                    child,
                    labels: labels.clone(),
                }))
            }
            Schema::OneOf(keys) => Ok(self.push(Node::OneOf(keys.clone()))),
            Schema::AtLeastOneOf(keys) => Ok(self.push(Node::AtLeastOneOf(keys.clone()))),
            Schema::AtMostOneOf(keys) => Ok(self.push(Node::AtMostOneOf(keys.clone()))),
            Schema::HasKeys(keys) => Ok(self.push(Node::HasKeys(keys.clone()))),

            // Plain type tags.
            Schema::Type(t) => Ok(self.push(Node::Type(*t))),

            // Predicates.
            Schema::Predicate(p) => Ok(self.push(Node::Predicate(p.clone()))),

            // Sequences, with the trailing repeat marker unpacked.
            Schema::Sequence(elements) => self.compile_sequence(elements),
            Schema::Ellipsis => Err(SchemaError::new(
                "the repeat marker is only allowed as the last element of a sequence",
            )
            .with_origin("ellipsis")),

            // Mappings.
            Schema::Mapping(entries) => self.compile_mapping(entries),

            // Sets.
            Schema::SetOf(members) => {
                let ids = self.compile_children(members)?;
                Ok(self.push(Node::SetOf(ids)))
            }

            // Everything else is a literal.
            Schema::Literal(value) => Ok(self.push(Node::Literal(value.clone()))),
        }
    }

    fn compile_children(
        &mut self,
        schemas: &[Schema],
    ) -> std::result::Result<Vec<NodeId>, SchemaError> {
        let mut ids = Vec::with_capacity(schemas.len());
        for schema in schemas {
            ids.push(self.compile_schema(schema)?);
        }
        Ok(ids)
    }

    fn compile_sequence(
        &mut self,
        elements: &[Schema],
    ) -> std::result::Result<NodeId, SchemaError> {
        for (i, element) in elements.iter().enumerate() {
            if matches!(element, Schema::Ellipsis) && i + 1 != elements.len() {
                return Err(SchemaError::new(
                    "the repeat marker is only allowed as the last element of a sequence",
                )
                .with_origin("seq"));
            }
        }

        let (prefix_schemas, tail) = match elements.last() {
            Some(Schema::Ellipsis) if elements.len() == 1 => {
                let anything = self.push(Node::Type(Ty::Anything));
                (&elements[..0], Some(anything))
            }
            Some(Schema::Ellipsis) => {
                let tail = self.compile_schema(&elements[elements.len() - 2])?;
                (&elements[..elements.len() - 2], Some(tail))
            }
            _ => (elements, None),
        };

        let prefix = self.compile_children(prefix_schemas)?;
        Ok(self.push(Node::Sequence(SequenceNode { prefix, tail })))
    }

    fn compile_mapping(
        &mut self,
        entries: &[(MapKey, Schema)],
    ) -> std::result::Result<NodeId, SchemaError> {
        let mut compiled = Vec::with_capacity(entries.len());
        for (key, value_schema) in entries {
            let matcher = match key {
                MapKey::Const { key, optional } => KeyNode::Const {
                    key: key.clone(),
                    optional: *optional,
                },
                MapKey::Pattern(schema) => KeyNode::Pattern(self.compile_schema(schema)?),
            };
            let value = self.compile_schema(value_schema)?;
            compiled.push(MapEntryNode { matcher, value });
        }
        Ok(self.push(Node::Mapping(MappingNode::new(compiled))))
    }

    fn embed(&mut self, compiled: &CompiledSchema) -> NodeId {
        let key = compiled.program_key();
        if let Some(&root) = self.registry.get(&key) {
            return root;
        }
        let offset = self.nodes.len();
        let program = compiled.program();
        for node in &program.nodes {
            let rebased = rebase(node, offset);
            self.nodes.push(rebased);
        }
        let root = offset + program.root;
        self.registry.insert(key, root);
        root
    }

    fn finish(self, root: NodeId) -> std::result::Result<Program, SchemaError> {
        // Every alias chain must reach a real node.
        for start in 0..self.nodes.len() {
            if !matches!(self.nodes[start], Node::Alias(_)) {
                continue;
            }
            let mut current = start;
            let mut steps = 0;
            while let Node::Alias(next) = self.nodes[current] {
                if next == PENDING || steps > self.nodes.len() {
                    return Err(SchemaError::new("recursive schema never resolves")
                        .with_origin("compile"));
                }
                current = next;
                steps += 1;
            }
        }
        trace!("compiled schema program with {} nodes", self.nodes.len());
        Ok(Program {
            nodes: self.nodes,
            root,
        })
    }
}

/// Clone a node shifting every child id by `offset`.
fn rebase(node: &Node, offset: usize) -> Node {
    match node {
        Node::Type(_)
        | Node::Literal(_)
        | Node::Quoted(_)
        | Node::Predicate(_)
        | Node::External(_)
        | Node::OneOf(_)
        | Node::AtLeastOneOf(_)
        | Node::AtMostOneOf(_)
        | Node::HasKeys(_) => node.clone(),
        Node::Sequence(seq) => Node::Sequence(SequenceNode {
            prefix: seq.prefix.iter().map(|id| id + offset).collect(),
            tail: seq.tail.map(|id| id + offset),
        }),
        Node::Mapping(mapping) => Node::Mapping(MappingNode {
            entries: mapping
                .entries
                .iter()
                .map(|entry| MapEntryNode {
                    matcher: match &entry.matcher {
                        KeyNode::Const { key, optional } => KeyNode::Const {
                            key: key.clone(),
                            optional: *optional,
                        },
                        KeyNode::Pattern(id) => KeyNode::Pattern(id + offset),
                    },
                    value: entry.value + offset,
                })
                .collect(),
        }),
        Node::SetOf(ids) => Node::SetOf(ids.iter().map(|id| id + offset).collect()),
        Node::Union(ids) => Node::Union(ids.iter().map(|id| id + offset).collect()),
        Node::Intersect(ids) => Node::Intersect(ids.iter().map(|id| id + offset).collect()),
        Node::Complement(id) => Node::Complement(id + offset),
        Node::Lax(id) => Node::Lax(id + offset),
        Node::Strict(id) => Node::Strict(id + offset),
        Node::Named {
            child,
            name,
            reason,
        } => Node::Named {
            child: child + offset,
            name: name.clone(),
            reason: *reason,
        },
        Node::IfThen {
            cond,
            then,
            otherwise,
        } => Node::IfThen {
            cond: cond + offset,
            then: then + offset,
            otherwise: otherwise.map(|id| id + offset),
        },
        Node::CondChain(branches) => Node::CondChain(
            branches
                .iter()
                .map(|(guard, branch)| (guard + offset, branch + offset))
                .collect(),
        ),
        Node::Labeled { child, labels } => Node::Labeled {
            child: child + offset,
            labels: labels.clone(),
        },
        Node::Alias(id) => Node::Alias(id + offset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Options;
    use crate::error::Error;
    use crate::schema::{cond, dict, ellipsis, seq, set_label, shared, union, Recursive};
    use crate::value::Value;
    use serde_json::json;

    fn explain(schema: &Schema, value: &Value) -> String {
        compile(schema)
            .unwrap()
            .explain(value, &Options::default())
            .unwrap()
    }

    fn schema_error(result: Result<CompiledSchema>) -> SchemaError {
        match result {
            Err(Error::Schema(e)) => e,
            Err(other) => panic!("expected schema error, got {}", other),
            Ok(_) => panic!("expected schema error, got a compiled schema"),
        }
    }

    #[test]
    fn test_compile_is_idempotent() {
        let schema = dict([("a", Schema::from(Ty::Int))]);
        let once = compile(&schema).unwrap();
        let twice = compile(&Schema::from(once.clone())).unwrap();
        let good = Value::from(json!({"a": 1}));
        let bad = Value::from(json!({"a": "s"}));
        assert!(once.is_valid(&good) && twice.is_valid(&good));
        assert_eq!(
            once.explain(&bad, &Options::default()).unwrap(),
            twice.explain(&bad, &Options::default()).unwrap()
        );
    }

    #[test]
    fn test_embedded_program_is_shared_not_duplicated() {
        let inner = compile(&Schema::from(Ty::Int)).unwrap();
        let node_count = inner.program().nodes.len();
        let outer = compile(&union([
            Schema::from(inner.clone()),
            Schema::from(inner.clone()),
        ]))
        .unwrap();
        // One embedded copy plus the union node itself.
        assert_eq!(outer.program().nodes.len(), node_count + 1);
    }

    #[test]
    fn test_shared_subtree_compiles_once() {
        let leaf = shared(dict([("a", Schema::from(Ty::Int))]));
        let twice = union([leaf.clone(), leaf.clone()]);
        let once = union([leaf.clone()]);
        let compiled_twice = compile(&twice).unwrap();
        let compiled_once = compile(&once).unwrap();
        assert_eq!(
            compiled_twice.program().nodes.len(),
            compiled_once.program().nodes.len()
        );
    }

    #[test]
    fn test_recursive_schema_compiles_and_validates() {
        let tree = Recursive::new();
        tree.define(dict([
            ("value", Schema::from(Ty::Int)),
            ("left?", Schema::from(tree.clone())),
            ("right?", Schema::from(tree.clone())),
        ]))
        .unwrap();
        let schema = Schema::from(tree);

        let good = Value::from(json!({
            "value": 1,
            "left": {"value": 2, "right": {"value": 3}}
        }));
        assert_eq!(explain(&schema, &good), "");

        let bad = Value::from(json!({
            "value": 1,
            "left": {"value": "x"}
        }));
        assert_eq!(
            explain(&schema, &bad),
            "object['left']['value'] (value:'x') is not of type 'int'"
        );
    }

    #[test]
    fn test_mutual_recursion() {
        let a = Recursive::new();
        let b = Recursive::new();
        a.define(dict([("b?", Schema::from(b.clone()))])).unwrap();
        b.define(dict([("a?", Schema::from(a.clone()))])).unwrap();
        let schema = Schema::from(a);
        let good = Value::from(json!({"b": {"a": {"b": {}}}}));
        assert_eq!(explain(&schema, &good), "");
        let bad = Value::from(json!({"b": {"x": 1}}));
        assert_ne!(explain(&schema, &bad), "");
    }

    #[test]
    fn test_undefined_recursive_is_schema_error() {
        let orphan = Recursive::new();
        let err = schema_error(compile(&Schema::from(orphan)));
        assert!(err.message.contains("before being defined"));
    }

    #[test]
    fn test_self_alias_never_resolves() {
        let loops = Recursive::new();
        loops.define(Schema::from(loops.clone())).unwrap();
        let err = schema_error(compile(&Schema::from(loops)));
        assert!(err.message.contains("never resolves"));
    }

    #[test]
    fn test_empty_union_is_schema_error() {
        let err = schema_error(compile(&union([])));
        assert!(err.message.contains("at least one alternative"));
    }

    #[test]
    fn test_empty_cond_is_schema_error() {
        let err = schema_error(compile(&cond([])));
        assert!(err.message.contains("at least one branch"));
    }

    #[test]
    fn test_misplaced_ellipsis_is_schema_error() {
        let err = schema_error(compile(&seq([
            Schema::from(Ty::Int),
            ellipsis(),
            Schema::from(Ty::Str),
        ])));
        assert!(err.message.contains("last element"));

        let err = schema_error(compile(&ellipsis()));
        assert!(err.message.contains("sequence"));
    }

    #[test]
    fn test_empty_labels_is_schema_error() {
        let err = schema_error(compile(&set_label(Ty::Int, Vec::<String>::new())));
        assert!(err.message.contains("at least one label"));
    }
}
