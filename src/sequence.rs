//! The sequence matcher.
//!
//! A sequence node is a fixed-arity prefix plus an optional repeated tail.
//! Without a tail, missing elements always fail and extra elements fail
//! only under strict validation. With a tail, every element past the prefix
//! is checked against the tail node and length can never overshoot.

use crate::engine::{wrong_type, Context, NodeId, Program};
use crate::value::Value;

/// A compiled sequence schema.
#[derive(Debug, Clone)]
pub(crate) struct SequenceNode {
    pub(crate) prefix: Vec<NodeId>,
    pub(crate) tail: Option<NodeId>,
}

impl SequenceNode {
    pub(crate) fn check(
        &self,
        program: &Program,
        value: &Value,
        path: &str,
        ctx: Context<'_>,
    ) -> String {
        let items = match value.as_list() {
            Some(items) => items,
            None => return wrong_type(path, value, "list"),
        };
        let arity = self.prefix.len();

        if self.tail.is_none() && ctx.strict && items.len() > arity {
            return format!("{}[{}] is not in the schema", path, arity);
        }
        if arity > items.len() {
            return format!("{}[{}] is missing", path, items.len());
        }

        for (i, node) in self.prefix.iter().enumerate() {
            let item_path = format!("{}[{}]", path, i);
            let explanation = program.check_at(*node, &items[i], &item_path, ctx);
            if !explanation.is_empty() {
                return explanation;
            }
        }
        if let Some(tail) = self.tail {
            for (i, item) in items.iter().enumerate().skip(arity) {
                let item_path = format!("{}[{}]", path, i);
                let explanation = program.check_at(tail, item, &item_path, ctx);
                if !explanation.is_empty() {
                    return explanation;
                }
            }
        }
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::compile;
    use crate::engine::Options;
    use crate::schema::{ellipsis, seq, Schema};
    use crate::value::{Ty, Value};
    use serde_json::json;

    fn explain(schema: &Schema, value: &Value) -> String {
        compile(schema)
            .unwrap()
            .explain(value, &Options::default())
            .unwrap()
    }

    fn explain_lax(schema: &Schema, value: &Value) -> String {
        compile(schema)
            .unwrap()
            .explain(value, &Options::new().with_strict(false))
            .unwrap()
    }

    #[test]
    fn test_non_list_is_rejected() {
        let schema = seq([Schema::from(Ty::Int)]);
        assert_eq!(
            explain(&schema, &Value::Int(1)),
            "object (value:1) is not of type 'list'"
        );
    }

    #[test]
    fn test_fixed_arity() {
        let schema = seq([Schema::from(Ty::Int), Schema::from(Ty::Str)]);
        assert_eq!(explain(&schema, &Value::from(json!([1, "a"]))), "");
        assert_eq!(
            explain(&schema, &Value::from(json!([1]))),
            "object[1] is missing"
        );
        assert_eq!(
            explain(&schema, &Value::from(json!([1, "a", 2]))),
            "object[2] is not in the schema"
        );
        // Lax validation ignores trailing extras but never missing elements.
        assert_eq!(explain_lax(&schema, &Value::from(json!([1, "a", 2]))), "");
        assert_eq!(
            explain_lax(&schema, &Value::from(json!([1]))),
            "object[1] is missing"
        );
    }

    #[test]
    fn test_element_failure_names_index() {
        let schema = seq([Schema::from(Ty::Int), Schema::from(Ty::Str)]);
        assert_eq!(
            explain(&schema, &Value::from(json!([1, 2]))),
            "object[1] (value:2) is not of type 'str'"
        );
    }

    #[test]
    fn test_repeated_tail() {
        let schema = seq([Schema::from(Ty::Str), ellipsis()]);
        assert_eq!(explain(&schema, &Value::from(json!([]))), "");
        assert_eq!(explain(&schema, &Value::from(json!(["x"]))), "");
        assert_eq!(explain(&schema, &Value::from(json!(["x", "y"]))), "");
        assert_eq!(
            explain(&schema, &Value::from(json!([1]))),
            "object[0] (value:1) is not of type 'str'"
        );
    }

    #[test]
    fn test_prefix_before_tail() {
        let schema = seq([Schema::from(Ty::Int), Schema::from(Ty::Str), ellipsis()]);
        assert_eq!(explain(&schema, &Value::from(json!([1]))), "");
        assert_eq!(explain(&schema, &Value::from(json!([1, "a", "b"]))), "");
        assert_eq!(
            explain(&schema, &Value::from(json!([]))),
            "object[0] is missing"
        );
        assert_eq!(
            explain(&schema, &Value::from(json!([1, "a", 2]))),
            "object[2] (value:2) is not of type 'str'"
        );
    }

    #[test]
    fn test_bare_ellipsis_accepts_any_list() {
        let schema = seq([ellipsis()]);
        assert_eq!(explain(&schema, &Value::from(json!([]))), "");
        assert_eq!(explain(&schema, &Value::from(json!([1, "a", null]))), "");
        assert_ne!(explain(&schema, &Value::Int(1)), "");
    }

    #[test]
    fn test_empty_sequence() {
        let schema = seq([]);
        assert_eq!(explain(&schema, &Value::from(json!([]))), "");
        assert_eq!(
            explain(&schema, &Value::from(json!([1]))),
            "object[0] is not in the schema"
        );
        assert_eq!(explain_lax(&schema, &Value::from(json!([1]))), "");
    }
}
