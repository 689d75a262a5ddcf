//! value representation
//!
//! A tree slot holds one of the following
//! - boolean (true/false)
//! - integer (signed, currently: i64 - may change)
//! - decimal (currently: f64 - may change)
//! - string (utf-8)
//! - array ("list" of values)
//! - node (a nested subtree, see [crate::node::Node])
//! - func (a callable, the "computed attribute" mechanism)
//! - deferred (a path reference that is resolved after the tree is built)
//!
//! Additionally:
//! - there is no `null`/`None` value; absence is expressed as `Option<Value>`
//! - the only valid **implicit** conversion: an `integer` compares equal to
//!   the `decimal` of the same magnitude
//! - `func` and `deferred` are handles; they compare by identity and refuse
//!   serialization
use crate::node::{Node, WeakNode};
use serde::{
    ser::{Error as _, SerializeSeq},
    Serializer,
};
use std::fmt;
use std::rc::Rc;

/// All possible value types
#[derive(Clone)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Node(Node),
    Func(Func),
    Deferred(Deferred),
}

impl Value {
    /// Wrap a callable as a value.
    ///
    /// The callable is invoked by dynamic access whenever its key is read
    /// with arguments, receiving those arguments.
    pub fn func(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Value::Func(Func::new(f))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Value::Node(_))
    }

    /// Truthiness of a stored value. Only `false` is falsy; everything else
    /// that exists is truthy.
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(value) => write!(f, "{value:?}"),
            Value::Integer(value) => write!(f, "{value:?}"),
            Value::Decimal(value) => write!(f, "{value:?}"),
            Value::String(value) => write!(f, "{value:?}"),
            Value::Array(value) => f.debug_list().entries(value).finish(),
            Value::Node(value) => write!(f, "{value:?}"),
            Value::Func(_) => f.write_str("<func>"),
            Value::Deferred(value) => write!(f, "<deferred {}>", value.reference()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;

        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (Integer(a), Decimal(b)) | (Decimal(b), Integer(a)) => *a as f64 == *b,
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Node(a), Node(b)) => a == b,
            (Func(a), Func(b)) => a.ptr_eq(b),
            (Deferred(a), Deferred(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Decimal(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Self {
        Value::Node(value)
    }
}

impl From<Func> for Value {
    fn from(value: Func) -> Self {
        Value::Func(value)
    }
}

impl From<Deferred> for Value {
    fn from(value: Deferred) -> Self {
        Value::Deferred(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Node(value) => value.serialize(serializer),
            Value::Func(_) => Err(S::Error::custom("cannot serialize a callable value")),
            Value::Deferred(value) => Err(S::Error::custom(format!(
                "cannot serialize an unresolved reference: {}",
                value.reference()
            ))),
        }
    }
}

/// A callable stored in the tree
#[derive(Clone)]
pub struct Func(Rc<dyn Fn(&[Value]) -> Value>);

impl Func {
    pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Func(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    fn ptr_eq(&self, other: &Func) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A path reference awaiting resolution
///
/// Produced by the text evaluator for expressions like `_.name` or
/// `__.name`. The reference remembers the node it appeared on (weakly, the
/// tree owns the node) and is collapsed into a plain value by the
/// resolution pass once the whole tree exists.
#[derive(Clone)]
pub struct Deferred(Rc<DeferredInner>);

struct DeferredInner {
    anchor: WeakNode,
    underscores: usize,
    path: String,
}

impl Deferred {
    pub fn new(anchor: &Node, underscores: usize, path: impl Into<String>) -> Self {
        Deferred(Rc::new(DeferredInner {
            anchor: anchor.downgrade(),
            underscores,
            path: path.into(),
        }))
    }

    /// The node the reference appeared on, if the tree is still alive.
    pub fn anchor(&self) -> Option<Node> {
        self.0.anchor.upgrade()
    }

    /// Number of underscore characters in the sentinel. One means
    /// scope-search, two and up are exact ancestor hops.
    pub fn underscores(&self) -> usize {
        self.0.underscores
    }

    pub fn path(&self) -> &str {
        &self.0.path
    }

    /// The reference as written in the source, for diagnostics.
    pub fn reference(&self) -> String {
        format!("{}.{}", "_".repeat(self.0.underscores), self.0.path)
    }

    fn ptr_eq(&self, other: &Deferred) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numeric_equality_crosses_types() {
        assert_eq!(Value::Integer(1), Value::Decimal(1.0));
        assert_eq!(Value::Decimal(2.5), Value::Decimal(2.5));
        assert_ne!(Value::Integer(1), Value::Decimal(1.5));
    }

    #[test]
    fn funcs_compare_by_identity() {
        let f = Value::func(|_| Value::Integer(1));
        let g = Value::func(|_| Value::Integer(1));

        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }

    #[test]
    fn func_receives_arguments() {
        let f = Func::new(|args| match args {
            [Value::Integer(n)] => Value::Integer(n + 1),
            _ => Value::Integer(0),
        });

        assert_eq!(f.call(&[Value::Integer(41)]), Value::Integer(42));
        assert_eq!(f.call(&[]), Value::Integer(0));
    }

    #[test]
    fn serializes_scalars_and_arrays() {
        let value: Value = vec![Value::Integer(1), Value::from("x")].into();
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[1,"x"]"#);
    }

    #[test]
    fn refuses_to_serialize_callables() {
        let value = Value::func(|_| Value::Boolean(true));
        assert!(serde_json::to_string(&value).is_err());
    }
}
