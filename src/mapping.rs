//! The mapping matcher.
//!
//! A mapping node holds an ordered key list: constant keys first in
//! declaration order, then pattern keys in declaration order. Checking a
//! dict runs in two phases. First every required constant key must be
//! present, regardless of strictness. Then each key actually present in the
//! dict is scanned against the key list: the first entry whose key matcher
//! accepts the candidate key gets to check the candidate's value, and a
//! rejected value falls through to later matching entries. A key matching
//! no entry at all is rejected under strict validation and ignored under
//! lax; a key whose every matching entry rejected its value fails
//! unconditionally, with the collected explanations joined by `" and "`.
//!
//! Pattern keys constrain only keys that exist, so they can never make a
//! key required.

use crate::engine::{key_path, wrong_type, Context, NodeId, Program};
use crate::value::Value;

/// A compiled mapping entry.
#[derive(Debug, Clone)]
pub(crate) struct MapEntryNode {
    pub(crate) matcher: KeyNode,
    pub(crate) value: NodeId,
}

/// A compiled key matcher.
#[derive(Debug, Clone)]
pub(crate) enum KeyNode {
    /// Exact key, possibly optional.
    Const { key: String, optional: bool },
    /// Schema matched against candidate keys.
    Pattern(NodeId),
}

/// A compiled mapping schema.
#[derive(Debug, Clone)]
pub(crate) struct MappingNode {
    pub(crate) entries: Vec<MapEntryNode>,
}

impl MappingNode {
    /// Build the node, ordering constants before patterns while keeping
    /// declaration order within each group.
    pub(crate) fn new(entries: Vec<MapEntryNode>) -> Self {
        let (constants, patterns): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|entry| matches!(entry.matcher, KeyNode::Const { .. }));
        let mut entries = constants;
        entries.extend(patterns);
        Self { entries }
    }

    pub(crate) fn check(
        &self,
        program: &Program,
        value: &Value,
        path: &str,
        ctx: Context<'_>,
    ) -> String {
        let dict = match value.as_dict() {
            Some(dict) => dict,
            None => return wrong_type(path, value, "dict"),
        };

        for entry in &self.entries {
            if let KeyNode::Const {
                key,
                optional: false,
            } = &entry.matcher
            {
                if !dict.contains_key(key.as_str()) {
                    return format!("{} is missing", key_path(path, key));
                }
            }
        }

        for (key, item) in dict {
            let item_path = key_path(path, key);
            let candidate = Value::Str(key.clone());
            let mut failures: Vec<String> = Vec::new();
            let mut accepted = false;

            for entry in &self.entries {
                match &entry.matcher {
                    KeyNode::Const { key: expected, .. } => {
                        if expected != key {
                            continue;
                        }
                    }
                    KeyNode::Pattern(matcher) => {
                        // Pattern match on the key is a pass/fail question;
                        // its own explanation is discarded.
                        if !program.check_at(*matcher, &candidate, "key", ctx).is_empty() {
                            continue;
                        }
                    }
                }
                let explanation = program.check_at(entry.value, item, &item_path, ctx);
                if explanation.is_empty() {
                    accepted = true;
                    break;
                }
                failures.push(explanation);
            }

            if accepted {
                continue;
            }
            if !failures.is_empty() {
                return failures.join(" and ");
            }
            if ctx.strict {
                return format!("{} is not in the schema", item_path);
            }
        }

        String::new()
    }
}
