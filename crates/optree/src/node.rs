//! the tree container
//!
//! A [Node] is a shared handle over one level of the configuration tree:
//! a children map from [Key] to [Value], a back pointer to the owning
//! parent, the key it occupies there, an optional default value for missing
//! keys, and the key-normalization policy fixed at creation time.
//!
//! The parent pointer is navigation only — the parent owns the node through
//! its children map, so the back edge is weak. The root is never cached;
//! [Node::root] walks up every time, which keeps subtree splicing via
//! [Node::replace] from ever seeing a stale root.
//!
//! Linking is centralized in [Node::set]: assigning a node value is the only
//! way a parent/name pair gets established, and re-assigning the same node
//! elsewhere re-parents it (last assignment wins).
use crate::value::Value;
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

/// A child key
///
/// `Sym` is the canonical, normalized form; `Str` preserves a raw string
/// key. Under the default normalization policy every string key collapses
/// to `Sym`, so `"a"` and `Key::sym("a")` address the same slot. With
/// normalization off the two variants stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Sym(String),
    Str(String),
}

impl Key {
    pub fn sym(name: impl Into<String>) -> Key {
        Key::Sym(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Key::Sym(name) | Key::Str(name) => name,
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Sym(name) => f.write_str(name),
            Key::Str(name) => write!(f, "{name:?}"),
        }
    }
}

pub(crate) struct NodeInner {
    name: Option<Key>,
    parent: Weak<RefCell<NodeInner>>,
    children: IndexMap<Key, Value>,
    default: Option<Value>,
    normalize: bool,
}

/// One level of the configuration tree
#[derive(Clone)]
pub struct Node(pub(crate) Rc<RefCell<NodeInner>>);

/// Non-owning handle to a [Node]
#[derive(Clone)]
pub struct WeakNode(Weak<RefCell<NodeInner>>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::new()
    }
}

impl Node {
    /// An empty root with key normalization on.
    pub fn new() -> Node {
        Node::with(None, true)
    }

    /// An empty root that answers missing keys with `default`.
    pub fn with_default(default: impl Into<Value>) -> Node {
        Node::with(Some(default.into()), true)
    }

    /// An empty root with an explicit normalization policy.
    pub fn with_policy(normalize: bool) -> Node {
        Node::with(None, normalize)
    }

    pub fn with(default: Option<Value>, normalize: bool) -> Node {
        Node(Rc::new(RefCell::new(NodeInner {
            name: None,
            parent: Weak::new(),
            children: IndexMap::new(),
            default,
            normalize,
        })))
    }

    /// A fresh empty node carrying this node's normalization policy.
    /// Used wherever the tree grows a level on its own (auto-vivification,
    /// build-mode path walks).
    pub(crate) fn like(&self) -> Node {
        Node::with(None, self.normalizes_keys())
    }

    fn inner(&self) -> Ref<'_, NodeInner> {
        self.0.borrow()
    }

    fn inner_mut(&self) -> RefMut<'_, NodeInner> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    /// The key this node occupies in its parent; `None` for roots.
    pub fn name(&self) -> Option<Key> {
        self.inner().name.clone()
    }

    pub fn parent(&self) -> Option<Node> {
        self.inner().parent.upgrade().map(Node)
    }

    /// The topmost ancestor, computed by walking `parent` links.
    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn default(&self) -> Option<Value> {
        self.inner().default.clone()
    }

    pub fn normalizes_keys(&self) -> bool {
        self.inner().normalize
    }

    pub(crate) fn normalize_key(&self, key: Key) -> Key {
        match key {
            Key::Str(name) if self.inner().normalize => Key::Sym(name),
            other => other,
        }
    }

    /// Child value for `key`, falling back to the node's default.
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        let key = self.normalize_key(key.into());
        let inner = self.inner();
        inner.children.get(&key).or(inner.default.as_ref()).cloned()
    }

    /// Child value for `key` without the default fallback.
    pub(crate) fn child(&self, key: impl Into<Key>) -> Option<Value> {
        let key = self.normalize_key(key.into());
        self.inner().children.get(&key).cloned()
    }

    /// Store `value` under `key`.
    ///
    /// A node value is linked: its parent becomes `self` and its name the
    /// normalized key. A node previously stored under the key has its
    /// linkage severed.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = self.normalize_key(key.into());
        let value = value.into();

        if let Some(Value::Node(old)) = self.child(key.clone()) {
            let same = matches!(&value, Value::Node(new) if new.ptr_eq(&old));
            if !same {
                old.unlink();
            }
        }

        if let Some(node) = value.as_node() {
            node.link_to(self, key.clone());
        }

        self.inner_mut().children.insert(key, value);
    }

    fn link_to(&self, parent: &Node, name: Key) {
        let mut inner = self.inner_mut();
        inner.parent = Rc::downgrade(&parent.0);
        inner.name = Some(name);
    }

    fn unlink(&self) {
        let mut inner = self.inner_mut();
        inner.parent = Weak::new();
        inner.name = None;
    }

    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        let key = self.normalize_key(key.into());
        self.inner().children.contains_key(&key)
    }

    /// Remove `key`, severing a node value's linkage.
    pub fn remove(&self, key: impl Into<Key>) -> Option<Value> {
        let key = self.normalize_key(key.into());
        let removed = self.inner_mut().children.shift_remove(&key);
        if let Some(Value::Node(node)) = &removed {
            node.unlink();
        }
        removed
    }

    pub fn keys(&self) -> Vec<Key> {
        self.inner().children.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.inner().children.values().cloned().collect()
    }

    /// Cloned snapshot of the children map entries.
    pub fn entries(&self) -> Vec<(Key, Value)> {
        self.inner()
            .children
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner().children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner().children.is_empty()
    }

    /// Shallow structural copy: a fresh children map with every value
    /// cloned by reference. Nested node values end up re-parented to the
    /// copy — last assignment wins, exactly as with [Node::set].
    pub fn duplicate(&self) -> Node {
        let copy = Node::with(self.default(), self.normalizes_keys());
        for (key, value) in self.entries() {
            copy.set(key, value);
        }
        copy
    }

    /// In-place structural replace.
    ///
    /// If this node sits under a parent, a duplicate of its current state
    /// is parked in that slot first, so the old subtree stays reachable
    /// from its former parent. Then name, parent and children are taken
    /// over from `other`.
    pub fn replace(&self, other: &Node) {
        if self.ptr_eq(other) {
            return;
        }

        if let (Some(parent), Some(name)) = (self.parent(), self.name()) {
            parent.set(name, self.duplicate());
        }

        {
            let mut inner = self.inner_mut();
            let other_inner = other.inner();
            inner.name = other_inner.name.clone();
            inner.parent = other_inner.parent.clone();
            inner.children = IndexMap::new();
        }
        for (key, value) in other.entries() {
            self.set(key, value);
        }
    }

    /// Run `f` with the children snapshotted, restoring them afterwards.
    /// A temporary change scope.
    pub fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        let snapshot = self.inner().children.clone();
        let result = f();
        self.inner_mut().children = snapshot;
        result
    }

    pub fn to_map(&self) -> IndexMap<Key, Value> {
        self.inner().children.clone()
    }

    pub fn from_map(map: impl IntoIterator<Item = (Key, Value)>) -> Node {
        let node = Node::new();
        for (key, value) in map {
            node.set(key, value);
        }
        node
    }
}

/// Structural equality: same children content, recursively. Name, parent
/// and root identity are ignored.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.inner().children == other.inner().children
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(self, f, 1)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(self, f, 1)
    }
}

// pretty print
//
//   <optree
//     b => 1
//     c => 2
//     d => <optree
//       c => 2>>
fn write_node(node: &Node, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    f.write_str("<optree")?;
    for (key, value) in node.entries() {
        write!(f, "\n{}{} => ", "  ".repeat(depth), key)?;
        match value {
            Value::Node(child) => write_node(&child, f, depth + 1)?,
            other => write!(f, "{other:?}")?,
        }
    }
    f.write_str(">")
}

impl serde::ser::Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let inner = self.inner();
        let mut map = serializer.serialize_map(Some(inner.children.len()))?;
        for (key, value) in inner.children.iter() {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}

/// Utility macro to build a [Node] from key/value pairs
///
/// ```
/// use optree::node;
///
/// let tree = node! {
///     "a" => 1,
///     "b" => node! { "c" => 2 },
/// };
/// assert_eq!(tree.fetch("b.c"), Some(2.into()));
/// ```
#[macro_export]
macro_rules! node {
    {} => { $crate::node::Node::new() };
    { $($key:expr => $value:expr),+ $(,)? } => {{
        let node = $crate::node::Node::new();
        $( node.set($key, $value); )+
        node
    }};
}
