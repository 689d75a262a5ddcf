//! dynamic member access
//!
//! [Node::access] is the member-style dispatch layer: a requested name plus
//! arguments is classified by an ordered rule set and acted on. The order
//! is part of the contract:
//!
//! 1. `name=`  — assignment, stores the first argument
//! 2. `_`, `__`, `___`, … — relative ancestor access (underscore count
//!    minus one hops up; `_` alone is the current node)
//! 3. `_name` — passthrough to the children map itself (`_keys`, `_size`, …)
//! 4. `name?` — truthiness test of the stored value
//! 5. stored callable — invoked with the arguments
//! 6. stored value — returned as-is, arguments ignored
//! 7. anything else auto-vivifies: an empty child node is created, linked
//!    immediately, and returned
//!
//! A key literally named `foo?` is reachable only through the passthrough
//! and stored-value machinery, never by rule 4's suffix stripping.
use crate::node::Node;
use crate::value::Value;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AccessError {
    #[error("access needs an argument: {0}")]
    MissingArgument(String),
    #[error("unknown map operation: _{0}")]
    UnknownMapOp(String),
    #[error("map operation expects a node argument: _{0}")]
    NotANode(String),
}

impl Node {
    /// Member-style access. Returns `Ok(None)` only when a relative
    /// ancestor walk runs out of ancestors.
    pub fn access(&self, name: &str, args: &[Value]) -> Result<Option<Value>, AccessError> {
        // rule 1: assignment
        if let Some(key) = name.strip_suffix('=') {
            let value = args
                .first()
                .cloned()
                .ok_or_else(|| AccessError::MissingArgument(name.to_string()))?;
            self.set(key, value.clone());
            return Ok(Some(value));
        }

        // rule 2: relative ancestor chain; `_` is the current node
        if !name.is_empty() && name.bytes().all(|b| b == b'_') {
            let hops = name.len() - 1;
            let mut node = self.clone();
            for _ in 0..hops {
                match node.parent() {
                    Some(parent) => node = parent,
                    None => return Ok(None),
                }
            }
            return Ok(Some(Value::Node(node)));
        }

        // rule 3: children-map passthrough
        if let Some(op) = name.strip_prefix('_') {
            return self.map_op(op, args).map(Some);
        }

        // rule 4: truthiness test
        if let Some(key) = name.strip_suffix('?') {
            let truthy = self.get(key).map(|v| v.truthy()).unwrap_or(false);
            return Ok(Some(Value::Boolean(truthy)));
        }

        // Rules 5-7 go through the children map directly; a node default
        // answers plain reads, not dynamic access, so an absent key still
        // auto-vivifies.
        match self.child(name) {
            // rule 5: computed attribute
            Some(Value::Func(f)) => Ok(Some(f.call(args))),
            // rule 6: plain value, extra arguments ignored
            Some(value) => Ok(Some(value)),
            // rule 7: auto-vivify and link immediately
            None => {
                let child = self.like();
                self.set(name, child.clone());
                Ok(Some(Value::Node(child)))
            }
        }
    }

    fn map_op(&self, op: &str, args: &[Value]) -> Result<Value, AccessError> {
        let key_arg = |args: &[Value]| -> Result<String, AccessError> {
            match args.first() {
                Some(Value::String(key)) => Ok(key.clone()),
                _ => Err(AccessError::MissingArgument(format!("_{op}"))),
            }
        };

        match op {
            "keys" => Ok(Value::Array(
                self.keys()
                    .into_iter()
                    .map(|k| Value::String(k.as_str().to_string()))
                    .collect(),
            )),
            "values" => Ok(Value::Array(self.values())),
            "size" | "length" => Ok(Value::Integer(self.len() as i64)),
            "empty?" => Ok(Value::Boolean(self.is_empty())),
            "has_key?" | "include?" => {
                let key = key_arg(args)?;
                Ok(Value::Boolean(self.contains_key(key.as_str())))
            }
            "delete" => {
                let key = key_arg(args)?;
                Ok(self
                    .remove(key.as_str())
                    .unwrap_or(Value::Boolean(false)))
            }
            "merge!" => match args.first() {
                Some(Value::Node(other)) => {
                    self.merge_in_place(other);
                    Ok(Value::Node(self.clone()))
                }
                Some(_) => Err(AccessError::NotANode(op.to_string())),
                None => Err(AccessError::MissingArgument(format!("_{op}"))),
            },
            other => Err(AccessError::UnknownMapOp(other.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node;
    use pretty_assertions::assert_eq;

    fn int(node: &Node, name: &str) -> Value {
        node.access(name, &[]).unwrap().unwrap()
    }

    #[test]
    fn assignment_rule() {
        let node = Node::new();
        let out = node.access("a=", &[Value::Integer(1)]).unwrap();
        assert_eq!(out, Some(Value::Integer(1)));
        assert_eq!(node.get("a"), Some(Value::Integer(1)));
    }

    #[test]
    fn ancestor_chain_rule() {
        let root = node! { "my" => node! { "friend" => node!{} } };
        let my = root.get("my").unwrap().as_node().unwrap().clone();
        let friend = my.get("friend").unwrap().as_node().unwrap().clone();

        assert_eq!(int(&friend, "_"), Value::Node(friend.clone()));
        assert_eq!(int(&friend, "__"), Value::Node(my.clone()));
        assert_eq!(int(&friend, "___"), Value::Node(root.clone()));
        // off the top of the tree
        assert_eq!(friend.access("____", &[]).unwrap(), None);
    }

    #[test]
    fn map_passthrough_rule() {
        let node = node! { "a" => 1, "b" => 2 };
        assert_eq!(
            int(&node, "_keys"),
            Value::Array(vec!["a".into(), "b".into()])
        );
        assert_eq!(int(&node, "_size"), Value::Integer(2));
        assert_eq!(int(&node, "_empty?"), Value::Boolean(false));
        assert_eq!(
            node.access("_nope", &[]),
            Err(AccessError::UnknownMapOp("nope".to_string()))
        );
    }

    #[test]
    fn map_empty_comes_before_predicate_empty() {
        // `_empty?` asks the map; `empty?` tests the (vivified) key "empty"
        let node = Node::new();
        let sub = int(&node, "i");
        let sub = sub.as_node().unwrap();
        assert_eq!(int(sub, "_empty?"), Value::Boolean(true));
        assert_eq!(int(sub, "empty?"), Value::Boolean(false));
    }

    #[test]
    fn predicate_rule() {
        let node = node! { "a" => 1, "off" => false };
        assert_eq!(int(&node, "a?"), Value::Boolean(true));
        assert_eq!(int(&node, "off?"), Value::Boolean(false));
        assert_eq!(int(&node, "missing?"), Value::Boolean(false));
    }

    #[test]
    fn literal_question_mark_key_is_not_confused_with_predicates() {
        let node = Node::with_policy(false);
        node.set("foo?", 42);
        // rule 4 strips the suffix and tests key "foo", which is absent
        assert_eq!(int(&node, "foo?"), Value::Boolean(false));
        assert_eq!(node.get("foo?"), Some(Value::Integer(42)));
    }

    #[test]
    fn callable_rule_takes_arguments() {
        let node = Node::new();
        node.set(
            "count",
            Value::func(|args| match args {
                [Value::Integer(n)] => Value::Integer(n + 1),
                _ => Value::Integer(0),
            }),
        );

        assert_eq!(
            node.access("count", &[Value::Integer(1)]).unwrap(),
            Some(Value::Integer(2))
        );
        // a completely different absent name still auto-vivifies
        let vivified = int(&node, "other");
        assert!(vivified.is_node());
    }

    #[test]
    fn stored_value_ignores_extra_arguments() {
        let node = node! { "a" => 1 };
        assert_eq!(
            node.access("a", &[Value::Integer(9)]).unwrap(),
            Some(Value::Integer(1))
        );
    }

    #[test]
    fn auto_vivification_links_immediately() {
        let root = Node::new();
        let first = int(&root, "x");
        let second = int(&root, "x");
        // linked on first access, so the second access sees the same node
        assert_eq!(first, second);
        assert!(root.contains_key("x"));

        let x = first.as_node().unwrap();
        x.set("y", 1);
        assert_eq!(root.fetch("x.y"), Some(Value::Integer(1)));
    }

    #[test]
    fn defaults_answer_reads_but_not_vivification() {
        let node = Node::with_default(5);
        // plain reads and predicates keep the default fallback
        assert_eq!(node.get("missing"), Some(Value::Integer(5)));
        assert_eq!(node.access("missing?", &[]), Ok(Some(Value::Boolean(true))));
        // dynamic access on an absent key vivifies instead of echoing it
        let vivified = node.access("missing", &[]).unwrap().unwrap();
        assert!(vivified.is_node());
        assert!(node.contains_key("missing"));
        // a stored value still wins over the default
        node.set("present", 7);
        assert_eq!(node.access("present", &[]), Ok(Some(Value::Integer(7))));
    }
}
