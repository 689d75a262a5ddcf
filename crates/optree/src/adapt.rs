//! format adapters
//!
//! An adapter reads raw file content into an existing node. The registry
//! maps file extensions to adapters; anything without a registered
//! extension falls back to the native text format.
use crate::eval::EvalError;
use crate::node::Node;
use crate::value::Value;
use indexmap::IndexMap;
use std::path::Path;

pub type Adapter = fn(&Node, &str) -> Result<(), AdaptError>;

#[derive(thiserror::Error, Debug)]
pub enum AdaptError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported value under `{key}`: {found}")]
    Unsupported { key: String, found: String },
}

/// Extension-keyed adapter lookup. [AdapterRegistry::default] knows the
/// native format plus YAML and JSON.
pub struct AdapterRegistry {
    adapters: IndexMap<String, Adapter>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let mut registry = AdapterRegistry {
            adapters: IndexMap::new(),
        };
        registry.register("ot", text);
        registry.register("yml", yaml);
        registry.register("yaml", yaml);
        registry.register("json", json);
        registry
    }
}

impl AdapterRegistry {
    pub fn register(&mut self, extension: impl Into<String>, adapter: Adapter) {
        self.adapters.insert(extension.into(), adapter);
    }

    /// Adapter for a file path, chosen by extension. Unknown and missing
    /// extensions get the native text adapter.
    pub fn for_path(&self, path: &Path) -> Adapter {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.adapters.get(ext).copied())
            .unwrap_or(text)
    }

    pub fn extensions(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }
}

/// The native indentation-sugar format.
pub fn text(node: &Node, content: &str) -> Result<(), AdaptError> {
    node.eval_text(content)?;
    Ok(())
}

pub fn yaml(node: &Node, content: &str) -> Result<(), AdaptError> {
    let parsed: serde_yaml::Value = serde_yaml::from_str(content)?;
    load_yaml(node, "", &parsed)
}

pub fn json(node: &Node, content: &str) -> Result<(), AdaptError> {
    let parsed: serde_json::Value = serde_json::from_str(content)?;
    load_json(node, "", &parsed)
}

fn load_yaml(node: &Node, key: &str, parsed: &serde_yaml::Value) -> Result<(), AdaptError> {
    use serde_yaml::Value as Yaml;

    match parsed {
        Yaml::Mapping(map) => {
            for (name, value) in map {
                let name = name.as_str().ok_or_else(|| unsupported(key, "non-string key"))?;
                match value {
                    Yaml::Mapping(_) => {
                        let child = node.like();
                        load_yaml(&child, name, value)?;
                        node.set(name, child);
                    }
                    other => node.set(name, yaml_scalar(name, other)?),
                }
            }
            Ok(())
        }
        _ => Err(unsupported(key, "top level must be a mapping")),
    }
}

fn yaml_scalar(key: &str, value: &serde_yaml::Value) -> Result<Value, AdaptError> {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Bool(b) => Ok(Value::Boolean(*b)),
        Yaml::Number(n) => match n.as_i64() {
            Some(int) => Ok(Value::Integer(int)),
            None => Ok(Value::Decimal(n.as_f64().unwrap_or_default())),
        },
        Yaml::String(s) => Ok(Value::String(s.clone())),
        Yaml::Sequence(items) => items
            .iter()
            .map(|item| yaml_scalar(key, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Yaml::Null => Err(unsupported(key, "null")),
        _ => Err(unsupported(key, "unsupported YAML value")),
    }
}

fn load_json(node: &Node, key: &str, parsed: &serde_json::Value) -> Result<(), AdaptError> {
    use serde_json::Value as Json;

    match parsed {
        Json::Object(map) => {
            for (name, value) in map {
                match value {
                    Json::Object(_) => {
                        let child = node.like();
                        load_json(&child, name, value)?;
                        node.set(name.as_str(), child);
                    }
                    other => node.set(name.as_str(), json_scalar(name, other)?),
                }
            }
            Ok(())
        }
        _ => Err(unsupported(key, "top level must be an object")),
    }
}

fn json_scalar(key: &str, value: &serde_json::Value) -> Result<Value, AdaptError> {
    use serde_json::Value as Json;

    match value {
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::Number(n) => match n.as_i64() {
            Some(int) => Ok(Value::Integer(int)),
            None => Ok(Value::Decimal(n.as_f64().unwrap_or_default())),
        },
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Array(items) => items
            .iter()
            .map(|item| json_scalar(key, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Json::Null => Err(unsupported(key, "null")),
        _ => Err(unsupported(key, "unsupported JSON value")),
    }
}

fn unsupported(key: &str, found: &str) -> AdaptError {
    AdaptError::Unsupported {
        key: key.to_string(),
        found: found.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node;
    use pretty_assertions::assert_eq;

    #[test]
    fn yaml_maps_to_nodes() {
        let node = Node::new();
        yaml(&node, "a: 1\nb:\n  c: foo\n  d: [1, 2]\n").unwrap();
        assert_eq!(
            node,
            node! {
                "a" => 1,
                "b" => node! {
                    "c" => "foo",
                    "d" => Value::Array(vec![1.into(), 2.into()]),
                },
            }
        );
    }

    #[test]
    fn json_maps_to_nodes() {
        let node = Node::new();
        json(&node, r#"{"a": 1, "b": {"c": true, "d": 2.5}}"#).unwrap();
        assert_eq!(
            node,
            node! {
                "a" => 1,
                "b" => node! { "c" => true, "d" => 2.5 },
            }
        );
    }

    #[test]
    fn null_values_are_rejected() {
        let node = Node::new();
        assert!(matches!(
            yaml(&node, "a:\n").unwrap_err(),
            AdaptError::Unsupported { .. }
        ));
        assert!(matches!(
            json(&node, r#"{"a": null}"#).unwrap_err(),
            AdaptError::Unsupported { .. }
        ));
    }

    #[test]
    fn registry_falls_back_to_text() {
        let registry = AdapterRegistry::default();
        assert_eq!(
            registry.for_path(Path::new("conf.json")) as usize,
            json as usize
        );
        assert_eq!(
            registry.for_path(Path::new("conf.yml")) as usize,
            yaml as usize
        );
        assert_eq!(
            registry.for_path(Path::new("conf.weird")) as usize,
            text as usize
        );
        assert_eq!(registry.for_path(Path::new("conf")) as usize, text as usize);
    }

    #[test]
    fn custom_adapters_can_be_registered() {
        fn upper(node: &Node, content: &str) -> Result<(), AdaptError> {
            node.set("raw", content.to_uppercase());
            Ok(())
        }

        let mut registry = AdapterRegistry::default();
        registry.register("up", upper as Adapter);

        let node = Node::new();
        registry.for_path(Path::new("x.up"))(&node, "hi").unwrap();
        assert_eq!(node.get("raw"), Some(Value::String("HI".to_string())));
    }
}
