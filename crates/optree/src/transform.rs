//! the indentation-to-block transformer
//!
//! Source text arrives in an indentation-sensitive sugar syntax:
//!
//! ```text
//! a = 1
//! b:
//!   c = 2
//!   d = _.c
//! ```
//!
//! [transform] rewrites it into the explicit form the evaluator executes,
//! in two passes over the text:
//!
//! 1. [compile] — a single forward scan turns every `name:` block-start
//!    line into `name <<OPTREE_EOB{n}` and closes it with a matching
//!    `OPTREE_EOB{n}` marker when the indentation drops back. The marker
//!    index is the block-nesting depth at open time, so nested blocks
//!    close independently.
//! 2. [rewrite_locals] — bare assignments (`age = 1`) are anchored to the
//!    current node (`_.age = 1`) so they store into the tree instead of
//!    naming a transient local.
//!
//! Already-explicit input passes through structurally unchanged, so the
//! rewrite is a fixed point.
use tracing::trace;

/// Marker stem for explicit block delimiters.
pub const BLOCK_MARKER: &str = "OPTREE_EOB";

const INDENT: &str = "  ";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("inconsistent indentation at line {line}: {found:?}")]
    InconsistentIndent { line: usize, found: String },
}

/// One scanner event. Depth changes are reported before the line's
/// statement: a same-depth line yields `Undent`, a depth change yields
/// one `Indent`/`Dedent` per level crossed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Indent,
    Dedent,
    Undent,
    /// A line ending in a bare `:`, held without the colon.
    BlockStart(String),
    Statement(String),
}

#[derive(Clone, Copy, PartialEq)]
enum IndentStyle {
    Unknown,
    Spaces,
    Tabs,
}

/// Line-oriented forward scan. Blank lines and `#` comment lines are
/// skipped; trailing `Dedent`s bring the depth back to zero at end of
/// input.
///
/// Indentation is tabs (one per level) or spaces (two per level, partial
/// runs rounded up). Mixing the two, on one line or across the file, is
/// an error.
pub fn scan(content: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut style = IndentStyle::Unknown;
    let mut last_depth = 0usize;

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let statement = line.trim_start();
        let indent = &line[..line.len() - statement.len()];
        let depth = indent_depth(indent, &mut style)
            .ok_or_else(|| ParseError::InconsistentIndent {
                line: index + 1,
                found: indent.to_string(),
            })?;

        if depth == last_depth {
            tokens.push(Token::Undent);
        } else {
            let step = if depth > last_depth {
                Token::Indent
            } else {
                Token::Dedent
            };
            for _ in 0..depth.abs_diff(last_depth) {
                tokens.push(step.clone());
            }
        }
        last_depth = depth;

        let statement = statement.trim_end();
        match statement.strip_suffix(':') {
            Some(head) if !head.is_empty() => {
                tokens.push(Token::BlockStart(head.trim_end().to_string()))
            }
            _ => tokens.push(Token::Statement(statement.to_string())),
        }
    }

    for _ in 0..last_depth {
        tokens.push(Token::Dedent);
    }
    Ok(tokens)
}

fn indent_depth(indent: &str, style: &mut IndentStyle) -> Option<usize> {
    if indent.is_empty() {
        return Some(0);
    }

    let line_style = if indent.bytes().all(|b| b == b' ') {
        IndentStyle::Spaces
    } else if indent.bytes().all(|b| b == b'\t') {
        IndentStyle::Tabs
    } else {
        return None;
    };

    match *style {
        IndentStyle::Unknown => *style = line_style,
        current if current != line_style => return None,
        _ => {}
    }

    Some(match line_style {
        IndentStyle::Spaces => indent.len().div_ceil(INDENT.len()),
        _ => indent.len(),
    })
}

/// Rewrites block-start lines into explicit delimited blocks.
pub fn compile(content: &str) -> Result<String, ParseError> {
    let mut script = String::new();
    let mut depth = 0usize;
    // indent level each open block started at
    let mut block_levels: Vec<usize> = Vec::new();

    // Every line carries its own pad so the indent stays right no matter
    // what token precedes it, a close marker included.
    for token in scan(content)? {
        match token {
            Token::BlockStart(head) => {
                block_levels.push(depth);
                script.push_str(&INDENT.repeat(depth));
                script.push_str(&head);
                script.push_str(&format!(" <<{}{}\n", BLOCK_MARKER, block_levels.len() - 1));
            }
            Token::Statement(statement) => {
                script.push_str(&INDENT.repeat(depth));
                script.push_str(&statement);
                script.push('\n');
            }
            Token::Indent => depth += 1,
            Token::Undent => {}
            Token::Dedent => {
                depth -= 1;
                if block_levels.last() == Some(&depth) {
                    script.push_str(&INDENT.repeat(depth));
                    script.push_str(&format!("{}{}\n", BLOCK_MARKER, block_levels.len() - 1));
                    block_levels.pop();
                }
            }
        }
    }

    Ok(script)
}

/// Anchors bare assignment lines to the current node: `age = 1` becomes
/// `_.age = 1`. A line qualifies when, after the indent, it starts with a
/// lowercase letter or digit, continues as a dotted name, and is followed
/// by a single `=` (not `==`, `=~`). Everything else — already-anchored
/// lines, block delimiters, comparisons — passes through.
pub fn rewrite_locals(content: &str) -> String {
    let mut out = String::new();
    for line in content.lines() {
        let statement = line.trim_start();
        let indent = &line[..line.len() - statement.len()];
        if is_local_assignment(statement) {
            out.push_str(indent);
            out.push_str("_.");
            out.push_str(statement);
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

fn is_local_assignment(statement: &str) -> bool {
    let mut chars = statement.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => return false,
    }

    let mut rest = statement;
    for (at, c) in chars {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            continue;
        }
        rest = &statement[at..];
        break;
    }
    if rest == statement {
        // name runs to end of line, no `=` follows
        return false;
    }

    let rest = rest.trim_start();
    match rest.strip_prefix('=') {
        Some(after) => !matches!(after.as_bytes().first(), Some(b'=') | Some(b'~')),
        None => false,
    }
}

/// The full sugar-to-explicit rewrite: [compile] then [rewrite_locals].
pub fn transform(content: &str) -> Result<String, ParseError> {
    let script = rewrite_locals(&compile(content)?);
    trace!(?script, "transformed");
    Ok(script)
}

/// Names assigned at the top level of `content`, block bodies excluded.
pub fn collect_local_variables(content: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in remove_block_string(content).lines() {
        let statement = line.trim_start();
        if !is_local_assignment(statement) {
            continue;
        }
        let name: String = statement
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
            .collect();
        if name.contains('.') || names.contains(&name) {
            continue;
        }
        names.push(name);
    }
    names
}

/// Drops every block-start line and its indented body, keeping only
/// top-level statements.
pub fn remove_block_string(content: &str) -> String {
    let mut in_block = false;
    let mut out = String::new();

    for line in content.lines() {
        let statement = line.trim_end();
        if statement.ends_with(':') {
            in_block = true;
        } else if statement
            .chars()
            .next()
            .map(|c| !c.is_whitespace())
            .unwrap_or(false)
        {
            in_block = false;
        }

        if !in_block {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
