//! # optree - hierarchical, dynamically-navigable configuration
//!
//! ## Introduction for developers
//!
//! Read this to understand how `optree` works internally.
//!
//! ### The tree
//!
//! Configuration lives in a tree of [node::Node]s. A node is a shared
//! handle (`Rc<RefCell<..>>`) over one level:
//!
//! - an insertion-ordered children map from [node::Key] to [value::Value]
//! - a weak back pointer to the parent plus the key the node occupies
//!   there (the parent owns the child, never the other way around)
//! - an optional default value answered for missing keys
//! - the key-normalization policy, fixed at creation
//!
//! Values are scalars, arrays, nested nodes, callables ([value::Func]) or
//! pending path references ([value::Deferred]). Assigning a node value
//! through [node::Node::set] links it: parent and name are established
//! there and nowhere else, and the last assignment wins.
//!
//! ### Navigation
//!
//! Dotted paths (`"a.b.c"`) walk the tree, see [path]. Walking down
//! descends through children; a leading `-` walks up, matching each
//! segment against the node's name in its parent. Both directions have a
//! build mode that creates missing steps, which is what
//! [node::Node::store] and namespace wrapping in [load] rely on.
//!
//! [Node::access](node::Node::access) is the dynamic, member-style
//! surface: a name plus arguments is classified by an ordered rule set
//! (assignment, ancestor hop, map passthrough, predicate, callable,
//! plain read, auto-vivify), see [access] for the order and its corners.
//!
//! ### The text format
//!
//! The native format is indentation-sugar:
//!
//! ```text
//! a = 1
//! b:
//!   c = 2
//!   d = _.c
//! ```
//!
//! [transform] rewrites it in one forward scan into an explicit,
//! marker-delimited block form and anchors bare assignments to the
//! current node. [eval] executes that form: statements store, block
//! bodies run against the child the head names, and path-reference
//! expressions (`_.c`, `__.age`) become [value::Deferred] values that a
//! final pass resolves once the whole tree exists — single-underscore
//! references search the ancestor chain from the root downward,
//! multi-underscore ones hop to an exact ancestor.
//!
//! ### Loading
//!
//! [load::Loader] folds multiple named sources into one tree: each name
//! is resolved by a [load::SourceLoader], parsed by the
//! [adapt::AdapterRegistry] entry for its file extension (YAML and JSON
//! ship in the box, everything else is the native format), and merged
//! under a [merge::MergePolicy]. Environment variables and interactive
//! answers come in through the same `store` path, see [load::load_env]
//! and [load::load_input].
//!
//! ### A note on threads
//!
//! A tree is deliberately single-threaded (`Rc`, `RefCell`). Callers who
//! need cross-thread access serialize externally and pass values, not
//! nodes.
pub mod access;
pub mod adapt;
mod error;
pub mod eval;
pub mod load;
pub mod merge;
pub mod node;
pub mod path;
pub mod transform;
pub mod value;

pub use error::{Error, Result};
pub use eval::eval;
pub use merge::MergePolicy;
pub use node::{Key, Node};
pub use value::Value;
