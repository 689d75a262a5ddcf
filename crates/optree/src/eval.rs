//! evaluating transformed text against a tree
//!
//! [Node::eval_text] runs the [crate::transform] rewrite and executes the
//! result. The explicit form is a restricted, data-only language:
//!
//! ```text
//! _.a = 1
//! b <<OPTREE_EOB0
//!   _.c = 2
//!   _.d = _.c
//! OPTREE_EOB0
//! ```
//!
//! Statements are anchored assignments (`_.path = expr`, one extra
//! underscore per parent hop) and block openers whose bodies run against
//! the child node the head path names. Expressions are literals, arrays,
//! or path references; a reference is stored as a [Deferred] value and
//! resolved once the whole tree exists, in repeated passes so references
//! to references settle too.
//!
//! Reference anchoring is asymmetric on purpose. In statement position
//! `_.a = 1` writes to the node being evaluated. In expression position
//! `_.age` searches the anchor's ancestor chain from the root downward
//! and the first node defining the head key wins, so a forward reference
//! can reach both a later sibling and a root-level value. `__`, `___`, …
//! hop to an exact ancestor instead.
use crate::node::Node;
use crate::path::PathError;
use crate::transform::{transform, ParseError, BLOCK_MARKER};
use crate::value::{Deferred, Value};
use tracing::debug;

/// Resolution passes before a still-deferred reference is a hard error.
const RESOLVE_LIMIT: usize = 32;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("syntax error at line {line}: `{text}`")]
    Syntax { line: usize, text: String },
    #[error("block `{head}` is never closed")]
    UnterminatedBlock { head: String },
    #[error("reference `{reference}` cannot be resolved")]
    Unresolved { reference: String },
}

impl Node {
    /// Transforms and evaluates sugar-syntax `content` against this node,
    /// then resolves every deferred reference in the tree.
    pub fn eval_text(&self, content: &str) -> Result<(), EvalError> {
        let script = transform(content)?;
        let lines: Vec<String> = script.lines().map(str::to_string).collect();

        let mut at = 0;
        eval_block(self, &lines, &mut at, None)?;
        resolve(self)?;
        debug!(statements = lines.len(), "evaluated");
        Ok(())
    }
}

/// Builds a fresh tree from sugar-syntax `content`.
pub fn eval(content: &str) -> Result<Node, EvalError> {
    let node = Node::new();
    node.eval_text(content)?;
    Ok(node)
}

fn eval_block(
    node: &Node,
    lines: &[String],
    at: &mut usize,
    end: Option<&str>,
) -> Result<(), EvalError> {
    while *at < lines.len() {
        let line = *at + 1;
        let statement = lines[*at].trim();
        *at += 1;

        if statement.is_empty() {
            continue;
        }
        if end == Some(statement) {
            return Ok(());
        }

        if let Some((head, marker)) = block_open(statement) {
            let child = node.walk(head, true)?;
            eval_block(&child, lines, at, Some(marker))?;
            continue;
        }

        let (target, path, expr) =
            assignment(statement).ok_or_else(|| EvalError::Syntax {
                line,
                text: statement.to_string(),
            })?;

        let anchor = ancestor(node, target).ok_or_else(|| EvalError::Syntax {
            line,
            text: statement.to_string(),
        })?;
        let value = parse_expr(&anchor, expr).ok_or_else(|| EvalError::Syntax {
            line,
            text: statement.to_string(),
        })?;
        anchor.store(path, value)?;
    }

    match end {
        Some(marker) => Err(EvalError::UnterminatedBlock {
            head: marker.to_string(),
        }),
        None => Ok(()),
    }
}

/// `head <<OPTREE_EOB{n}` → `(head, marker)`.
fn block_open(statement: &str) -> Option<(&str, &str)> {
    let (head, marker) = statement.split_once(" <<")?;
    let digits = marker.strip_prefix(BLOCK_MARKER)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((head.trim_end(), marker))
}

/// `_.a.b = expr` → `(underscore count, "a.b", "expr")`.
fn assignment(statement: &str) -> Option<(usize, &str, &str)> {
    let (lhs, rhs) = statement.split_once('=')?;
    let lhs = lhs.trim_end();
    let underscores = lhs.bytes().take_while(|b| *b == b'_').count();
    if underscores == 0 {
        return None;
    }
    let path = lhs[underscores..].strip_prefix('.')?;
    if path.is_empty() || !is_path(path) {
        return None;
    }
    Some((underscores, path, rhs.trim()))
}

fn is_path(text: &str) -> bool {
    !text.is_empty()
        && text.split('.').all(|seg| {
            !seg.is_empty()
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '?')
        })
}

/// Exact ancestor hop: one extra underscore per level up.
fn ancestor(node: &Node, underscores: usize) -> Option<Node> {
    let mut node = node.clone();
    for _ in 1..underscores {
        node = node.parent()?;
    }
    Some(node)
}

fn parse_expr(anchor: &Node, expr: &str) -> Option<Value> {
    match expr {
        "true" | "yes" => return Some(Value::Boolean(true)),
        "false" | "no" => return Some(Value::Boolean(false)),
        _ => {}
    }

    if let Some(text) = quoted(expr) {
        return Some(Value::String(text));
    }

    if let Some(inner) = expr.strip_prefix('[').and_then(|e| e.strip_suffix(']')) {
        let mut items = Vec::new();
        for item in split_items(inner) {
            items.push(parse_expr(anchor, item.trim())?);
        }
        return Some(Value::Array(items));
    }

    if let Ok(int) = expr.parse::<i64>() {
        return Some(Value::Integer(int));
    }
    if expr.contains('.') {
        if let Ok(dec) = expr.parse::<f64>() {
            return Some(Value::Decimal(dec));
        }
    }

    // path reference, deferred until the whole tree exists
    let underscores = expr.bytes().take_while(|b| *b == b'_').count();
    if underscores > 0 {
        if let Some(path) = expr[underscores..].strip_prefix('.') {
            if is_path(path) {
                return Some(Deferred::new(anchor, underscores, path).into());
            }
        }
    }

    None
}

fn quoted(expr: &str) -> Option<String> {
    let mut chars = expr.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('"' | '\''))) => q,
        _ => return None,
    };

    let mut out = String::new();
    let mut escaped = false;
    for (at, c) in chars {
        if escaped {
            out.push(match c {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            // the closing quote must end the expression
            return (at + c.len_utf8() == expr.len()).then_some(out);
        } else {
            out.push(c);
        }
    }
    None
}

/// Splits array items at top-level commas, leaving quoted strings and
/// nested brackets intact.
fn split_items(inner: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (at, c) in inner.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                items.push(&inner[start..at]);
                start = at + 1;
            }
            _ => {}
        }
    }
    if !inner[start..].trim().is_empty() {
        items.push(&inner[start..]);
    }
    items
}

/// Walks the whole tree repeatedly, swapping resolved values in for
/// deferred references, until nothing is left or nothing moves.
fn resolve(root: &Node) -> Result<(), EvalError> {
    for _ in 0..RESOLVE_LIMIT {
        let mut remaining = Vec::new();
        resolve_pass(root, &mut remaining);
        if remaining.is_empty() {
            return Ok(());
        }
    }

    let mut remaining = Vec::new();
    resolve_pass(root, &mut remaining);
    match remaining.into_iter().next() {
        Some(reference) => Err(EvalError::Unresolved { reference }),
        None => Ok(()),
    }
}

fn resolve_pass(node: &Node, remaining: &mut Vec<String>) {
    for (key, value) in node.entries() {
        match value {
            Value::Node(child) => resolve_pass(&child, remaining),
            Value::Deferred(deferred) => match lookup(&deferred) {
                Some(found) => node.set(key, found),
                None => remaining.push(deferred.reference()),
            },
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                let mut stuck = Vec::new();
                for item in &items {
                    match item {
                        Value::Deferred(deferred) => match lookup(deferred) {
                            Some(found) => resolved.push(found),
                            None => stuck.push(deferred.reference()),
                        },
                        other => resolved.push(other.clone()),
                    }
                }
                if !stuck.is_empty() {
                    remaining.append(&mut stuck);
                } else if resolved != items {
                    node.set(key, Value::Array(resolved));
                }
            }
            _ => {}
        }
    }
}

/// Resolves one reference against its anchor, or `None` when the target
/// does not exist yet (another pass may fill it in).
fn lookup(deferred: &Deferred) -> Option<Value> {
    let anchor = deferred.anchor()?;
    let path = deferred.path();

    let node = if deferred.underscores() == 1 {
        // root-downward search of the ancestor chain
        let mut chain = vec![anchor.clone()];
        let mut current = anchor;
        while let Some(parent) = current.parent() {
            chain.push(parent.clone());
            current = parent;
        }
        let head = path.split('.').next()?;
        chain
            .into_iter()
            .rev()
            .find(|node| node.contains_key(head))?
    } else {
        ancestor(&anchor, deferred.underscores())?
    };

    match node.fetch(path)? {
        // a reference to a reference: wait for the target to settle
        Value::Deferred(_) => None,
        value => Some(value),
    }
}
