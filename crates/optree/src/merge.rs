//! deep merge
//!
//! Two trees combine key by key. When both sides hold a node the merge
//! recurses; in every other conflict the source side wins. The
//! non-mutating [Node::merge] never aliases subtrees of either input:
//! conflicting node pairs are rebuilt into fresh nodes, so later edits to
//! an input cannot leak into the result.
use crate::node::Node;
use crate::value::Value;

/// How a source tree combines into an existing tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Source values override existing ones (the default).
    #[default]
    Replace,
    /// Existing values are kept; only new keys come in.
    Ignore,
}

impl Node {
    /// Deep-merges `source` into this node, mutating it. Node/node
    /// conflicts recurse, anything else is overwritten by the source.
    pub fn merge_in_place(&self, source: &Node) {
        for (key, incoming) in source.entries() {
            match (self.child(key.clone()), incoming) {
                (Some(Value::Node(mine)), Value::Node(theirs)) => {
                    mine.merge_in_place(&theirs);
                }
                (_, incoming) => self.set(key, incoming),
            }
        }
    }

    /// Deep-merges `source` into this node under `policy`.
    ///
    /// `Ignore` is `Replace` with the sides swapped: the source only fills
    /// keys this tree does not define yet.
    pub fn merge_in_place_with(&self, source: &Node, policy: MergePolicy) {
        match policy {
            MergePolicy::Replace => self.merge_in_place(source),
            MergePolicy::Ignore => {
                let base = source.duplicate_deep();
                base.merge_in_place(self);
                self.replace(&base);
            }
        }
    }

    /// Non-mutating deep merge: a fresh tree holding this node's entries
    /// combined with `source`'s, source side winning.
    pub fn merge(&self, source: &Node) -> Node {
        fn combined(a: &Node, b: &Node) -> Node {
            let out = Node::with(a.default(), a.normalizes_keys());
            for (key, value) in a.entries() {
                out.set(key, deep(&value));
            }
            for (key, incoming) in b.entries() {
                match (out.child(key.clone()), incoming) {
                    (Some(Value::Node(mine)), Value::Node(theirs)) => {
                        out.set(key, combined(&mine, &theirs));
                    }
                    (_, incoming) => out.set(key, deep(&incoming)),
                }
            }
            out
        }

        fn deep(value: &Value) -> Value {
            match value {
                Value::Node(node) => Value::Node(node.duplicate_deep()),
                other => other.clone(),
            }
        }

        combined(self, source)
    }

    /// Recursive structural copy, sharing no nodes with the original.
    pub fn duplicate_deep(&self) -> Node {
        let copy = Node::with(self.default(), self.normalizes_keys());
        for (key, value) in self.entries() {
            match value {
                Value::Node(node) => copy.set(key, node.duplicate_deep()),
                other => copy.set(key, other),
            }
        }
        copy
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node;
    use pretty_assertions::assert_eq;

    fn base() -> Node {
        node! {
            "a" => node! { "b" => 1, "c" => "foo" },
            "b" => node! { "c" => "x" },
        }
    }

    fn overlay() -> Node {
        node! { "a" => node! { "b" => 2, "d" => "bar" } }
    }

    fn merged() -> Node {
        node! {
            "a" => node! { "b" => 2, "c" => "foo", "d" => "bar" },
            "b" => node! { "c" => "x" },
        }
    }

    #[test]
    fn merge_in_place_recurses_source_wins() {
        let tree = base();
        tree.merge_in_place(&overlay());
        assert_eq!(tree, merged());
    }

    #[test]
    fn merge_in_place_ignore_keeps_existing() {
        let tree = base();
        tree.merge_in_place_with(&overlay(), MergePolicy::Ignore);
        assert_eq!(
            tree,
            node! {
                "a" => node! { "b" => 1, "c" => "foo", "d" => "bar" },
                "b" => node! { "c" => "x" },
            }
        );
    }

    #[test]
    fn merge_leaves_both_inputs_untouched() {
        let left = base();
        let right = overlay();
        let out = left.merge(&right);

        assert_eq!(out, merged());
        assert_eq!(left, base());
        assert_eq!(right, overlay());

        // no aliasing: editing the result never shows up in the inputs
        out.fetch("a").unwrap().as_node().unwrap().set("b", 99);
        assert_eq!(left.fetch("a.b"), Some(Value::Integer(1)));
        assert_eq!(right.fetch("a.b"), Some(Value::Integer(2)));
    }

    #[test]
    fn merge_is_deterministic() {
        let once = base().merge(&overlay());
        let twice = base().merge(&overlay());
        assert_eq!(once, twice);
    }

    #[test]
    fn scalar_overwrites_subtree_and_back() {
        let tree = node! { "a" => node! { "b" => 1 } };
        tree.merge_in_place(&node! { "a" => 7 });
        assert_eq!(tree, node! { "a" => 7 });

        tree.merge_in_place(&node! { "a" => node! { "c" => 2 } });
        assert_eq!(tree, node! { "a" => node! { "c" => 2 } });
    }

    #[test]
    fn deep_duplicate_shares_nothing() {
        let tree = node! { "a" => node! { "b" => 1 } };
        let copy = tree.duplicate_deep();
        assert_eq!(copy, tree);

        copy.fetch("a").unwrap().as_node().unwrap().set("b", 2);
        assert_eq!(tree.fetch("a.b"), Some(Value::Integer(1)));
        // the original subtree still hangs under the original root
        let sub = tree.fetch("a").unwrap();
        assert!(sub.as_node().unwrap().parent().unwrap().ptr_eq(&tree));
    }
}
