//! loading trees from files, the environment, and interactive input
//!
//! [Loader] is the multi-source pipeline: each named source is resolved
//! through a [SourceLoader], parsed by the adapter matching its file
//! extension, and folded into an accumulator under a [MergePolicy].
//! Missing sources are skipped unless the loader is strict. A namespace
//! wraps the finished tree under a dotted path.
use crate::adapt::{AdaptError, AdapterRegistry};
use crate::merge::MergePolicy;
use crate::node::Node;
use crate::path::PathError;
use crate::value::Value;
use derive_new::new;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("configuration source `{name}` not found")]
    MissingSource { name: String },
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Adapt(#[from] AdaptError),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// A resolved source: where it was found and what it contains. The path
/// picks the format adapter.
pub struct Source {
    pub path: PathBuf,
    pub content: String,
}

pub trait SourceLoader {
    fn resolve(&self, name: &str) -> Result<Option<Source>, LoadError>;
}

/// Filesystem lookup. Absolute and `~`-prefixed names are checked
/// directly; bare names are probed against every search path with the
/// known extensions appended.
#[derive(new)]
pub struct FsLoader {
    search_paths: Vec<PathBuf>,
}

const PROBE_EXTENSIONS: &[&str] = &["", ".ot", ".yml", ".yaml", ".json"];

impl Default for FsLoader {
    fn default() -> Self {
        FsLoader::new(vec![PathBuf::from(".")])
    }
}

impl FsLoader {
    pub fn push_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    fn read(path: &Path) -> Result<Source, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Source {
            path: path.to_path_buf(),
            content,
        })
    }
}

impl SourceLoader for FsLoader {
    fn resolve(&self, name: &str) -> Result<Option<Source>, LoadError> {
        if let Some(rest) = name.strip_prefix("~/") {
            let home = match std::env::var_os("HOME") {
                Some(home) => PathBuf::from(home),
                None => return Ok(None),
            };
            let path = home.join(rest);
            return if path.exists() {
                FsLoader::read(&path).map(Some)
            } else {
                Ok(None)
            };
        }

        let direct = Path::new(name);
        if direct.is_absolute() {
            return if direct.exists() {
                FsLoader::read(direct).map(Some)
            } else {
                Ok(None)
            };
        }

        for dir in &self.search_paths {
            for extension in PROBE_EXTENSIONS {
                let candidate = dir.join(format!("{name}{extension}"));
                if candidate.is_file() {
                    return FsLoader::read(&candidate).map(Some);
                }
            }
        }
        Ok(None)
    }
}

/// The multi-source load pipeline.
#[derive(new)]
pub struct Loader<L> {
    sources: L,
    #[new(default)]
    registry: AdapterRegistry,
    #[new(value = "MergePolicy::Replace")]
    policy: MergePolicy,
    #[new(default)]
    namespace: Option<String>,
    #[new(value = "false")]
    strict: bool,
}

impl Default for Loader<FsLoader> {
    fn default() -> Self {
        Loader::new(FsLoader::default())
    }
}

impl<L: SourceLoader> Loader<L> {
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Missing sources become [LoadError::MissingSource] instead of
    /// being skipped.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn registry_mut(&mut self) -> &mut AdapterRegistry {
        &mut self.registry
    }

    /// Loads every named source in order and folds the results together.
    ///
    /// Under [MergePolicy::Replace] later sources override earlier ones;
    /// under [MergePolicy::Ignore] the accumulated tree is folded into
    /// each newcomer instead, so earlier sources take precedence.
    pub fn load(&self, names: &[&str]) -> Result<Node, LoadError> {
        let mut acc = Node::new();

        for &name in names {
            let source = match self.sources.resolve(name)? {
                Some(source) => source,
                None if self.strict => {
                    return Err(LoadError::MissingSource {
                        name: name.to_string(),
                    })
                }
                None => {
                    warn!(name, "missing configuration source skipped");
                    continue;
                }
            };

            debug!(name, path = %source.path.display(), "loading");
            let tree = Node::new();
            self.registry.for_path(&source.path)(&tree, &source.content)?;

            match self.policy {
                MergePolicy::Replace => acc.merge_in_place(&tree),
                MergePolicy::Ignore => {
                    tree.merge_in_place(&acc);
                    acc = tree;
                }
            }
        }

        if let Some(namespace) = &self.namespace {
            wrap_namespace(&acc, namespace)?;
        }
        Ok(acc)
    }
}

/// Grows parents above `node` so it ends up at `namespace` under a new
/// root. Walking up consumes segments leaf-first, so the dotted path is
/// reversed.
fn wrap_namespace(node: &Node, namespace: &str) -> Result<(), PathError> {
    let reversed: Vec<&str> = namespace.split('.').rev().collect();
    node.walk_replace(&format!("-{}", reversed.join(".")))?;
    Ok(())
}

/// A string-valued key/value source, the shape environment variables
/// come in.
pub trait Provider {
    fn get(&self, key: &str) -> Option<String>;
}

pub struct EnvProvider;

impl Provider for EnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Default)]
pub struct EnvOptions {
    /// Stripped from each key before it becomes a path; keys without the
    /// prefix are skipped.
    pub prefix: Option<String>,
    /// Splits the remaining key into nested path segments.
    pub separator: Option<char>,
    /// Keys are lowercased unless set.
    pub case_sensitive: bool,
    pub namespace: Option<String>,
}

/// Loads the named environment variables into a fresh tree, lowercasing
/// the keys.
pub fn load_env(keys: &[&str]) -> Result<Node, LoadError> {
    load_env_with(&EnvProvider, keys, &EnvOptions::default())
}

pub fn load_env_with(
    provider: &impl Provider,
    keys: &[&str],
    options: &EnvOptions,
) -> Result<Node, LoadError> {
    let tree = Node::new();

    for &key in keys {
        let value = match provider.get(key) {
            Some(value) => value,
            None => continue,
        };

        let name = match &options.prefix {
            Some(prefix) => match key.strip_prefix(prefix.as_str()) {
                Some(rest) => rest,
                None => continue,
            },
            None => key,
        };
        let name = if options.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        };
        let path = match options.separator {
            Some(separator) => name.split(separator).collect::<Vec<_>>().join("."),
            None => name,
        };

        tree.store(&path, value)?;
    }

    if let Some(namespace) = &options.namespace {
        wrap_namespace(&tree, namespace)?;
    }
    Ok(tree)
}

/// An interactive answer source.
pub trait InputProvider {
    /// Shows `prompt` and returns the trimmed answer, `None` when the
    /// user enters nothing.
    fn read(&self, prompt: &str) -> Result<Option<String>, LoadError>;
}

pub struct StdinInput;

impl InputProvider for StdinInput {
    fn read(&self, prompt: &str) -> Result<Option<String>, LoadError> {
        let stdin_error = |source| LoadError::Io {
            path: PathBuf::from("<stdin>"),
            source,
        };

        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes()).map_err(stdin_error)?;
        stdout.flush().map_err(stdin_error)?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer).map_err(stdin_error)?;
        let answer = answer.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }
}

/// Prompts for one value and stores it at `path`, falling back to
/// `default` on an empty answer. Returns the root of the built tree.
pub fn load_input(
    input: &impl InputProvider,
    prompt: &str,
    path: &str,
    default: Option<Value>,
) -> Result<Node, LoadError> {
    let tree = Node::new();
    let answer = input.read(prompt)?.map(Value::String).or(default);
    if let Some(value) = answer {
        tree.store(path, value)?;
    }
    Ok(tree)
}
