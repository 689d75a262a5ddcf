//! dotted-path navigation
//!
//! Paths are dot-separated key sequences (`"a.b.c"`). Walking down
//! descends through children; a leading `-` reverses direction and walks
//! up toward (and past) the root, matching each segment against the name
//! a node carries in its parent. In build mode missing steps are created
//! instead of reported, which is how `store` grows intermediate nodes and
//! how namespace wrapping grows new roots above an existing tree.
//!
//! [Node::fetch] and [Node::delete] are lenient (`Option`), [Node::walk]
//! and [Node::store] are strict.
use crate::node::Node;
use crate::value::Value;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PathError {
    #[error("path `{path}` has no segment `{segment}`")]
    Missing { path: String, segment: String },
    #[error("path `{path}`: segment `{segment}` is not a node")]
    NotANode { path: String, segment: String },
}

/// Splits a path into directory and base name.
///
/// `"a.b.c"` becomes `("a.b", "c")`, a single segment becomes
/// `("", segment)`.
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('.') {
        Some(at) => (&path[..at], &path[at + 1..]),
        None => ("", path),
    }
}

impl Node {
    /// Walks `path` in either direction. A leading `-` walks up, anything
    /// else walks down. `""` and `"_"` are the node itself.
    pub fn walk(&self, path: &str, build: bool) -> Result<Node, PathError> {
        match path.strip_prefix('-') {
            Some(up) => self.walk_up(up, build),
            None => self.walk_down(path, build),
        }
    }

    /// Descends through child nodes, one segment at a time. In build mode
    /// a missing step is created; a scalar in the way is an error in both
    /// modes, never overwritten.
    pub fn walk_down(&self, path: &str, build: bool) -> Result<Node, PathError> {
        if path.is_empty() || path == "_" {
            return Ok(self.clone());
        }

        let mut node = self.clone();
        for segment in path.split('.') {
            node = match node.child(segment) {
                Some(Value::Node(child)) => child,
                Some(_) => {
                    return Err(PathError::NotANode {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    })
                }
                None if build => {
                    let child = node.like();
                    node.set(segment, child.clone());
                    child
                }
                None => {
                    return Err(PathError::Missing {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    })
                }
            };
        }
        Ok(node)
    }

    /// Ascends toward the root. Each segment must equal the name the
    /// current node carries in its parent; in build mode a missing parent
    /// is synthesized and the node linked into it under the segment.
    pub fn walk_up(&self, path: &str, build: bool) -> Result<Node, PathError> {
        if path.is_empty() || path == "_" {
            return Ok(self.clone());
        }

        let mut node = self.clone();
        for segment in path.split('.') {
            let matches = node.name().map(|k| k.as_str() == segment).unwrap_or(false);
            node = match (matches, node.parent()) {
                (true, Some(parent)) => parent,
                _ if build => {
                    let parent = node.like();
                    parent.set(segment, node.clone());
                    parent
                }
                _ => {
                    return Err(PathError::Missing {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    })
                }
            };
        }
        Ok(node)
    }

    /// Walks `path` in build mode and makes this handle refer to the
    /// destination. Used to wrap a tree under a namespace: after
    /// `t.walk_replace("-b.a")`, `t` is a new root holding the old
    /// contents at `a.b`.
    pub fn walk_replace(&self, path: &str) -> Result<Node, PathError> {
        let dest = self.walk(path, true)?;
        if !self.ptr_eq(&dest) {
            self.replace(&dest);
        }
        Ok(self.clone())
    }

    /// Reads the value at `path`, `None` when any step is missing or not
    /// a node.
    pub fn fetch(&self, path: &str) -> Option<Value> {
        let (dir, base) = split_path(path);
        self.walk_down(dir, false).ok()?.get(base)
    }

    /// Stores `value` at `path`, building intermediate nodes as needed.
    pub fn store(&self, path: &str, value: impl Into<Value>) -> Result<(), PathError> {
        let (dir, base) = split_path(path);
        self.walk(dir, true)?.set(base, value);
        Ok(())
    }

    /// Removes the value at `path`, `None` when nothing was stored there.
    pub fn delete(&self, path: &str) -> Option<Value> {
        let (dir, base) = split_path(path);
        self.walk_down(dir, false).ok()?.remove(base)
    }
}
