//! Token substitution over templated text.
//!
//! A template references data with brace tokens:
//!
//! - `{path}` substitutes the value at `path` (see [`crate::path`]).
//! - `{path@sep}` joins collection items with `sep` instead of nothing.
//! - A collection token followed immediately by a bracketed template,
//!   `{items}[<li>{name}</li>]`, renders the template once per item with
//!   the item as the context; scalar items are wrapped as `{"val": item}`.
//!
//! Tokens whose path cannot be resolved are logged and left in place, so a
//! partially-filled template stays inspectable instead of failing.

use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use crate::path::resolve;

/// Hard cap on full re-scan passes. Substituted data that itself contains
/// token syntax could otherwise re-introduce work forever.
const MAX_PASSES: usize = 1_000;

/// Renders `source` against `context`, substituting every resolvable token.
///
/// ```
/// use serde_json::json;
///
/// let context = json!({"round": 3, "players": [{"name": "ada"}, {"name": "brin"}]});
/// let text = inject::render("Round {round}: {players@, }[{name}]", &context);
/// assert_eq!(text, "Round 3: ada, brin");
/// ```
pub fn render(source: &str, context: &Value) -> String {
    let mut warned = HashSet::new();
    render_with(source, context, &mut warned)
}

fn render_with(source: &str, context: &Value, warned: &mut HashSet<String>) -> String {
    let mut text = source.to_owned();
    // After any substitution the whole string is scanned again from the
    // start, so tokens introduced by substituted data are picked up.
    for _ in 0..MAX_PASSES {
        match substitute_first(&text, context, warned) {
            Some(next) => text = next,
            None => return text,
        }
    }
    warn!("render stopped after {MAX_PASSES} passes; data keeps re-introducing tokens");
    text
}

/// One left-to-right scan: performs the first possible substitution and
/// returns the new text, or `None` when nothing more can be substituted.
fn substitute_first(text: &str, context: &Value, warned: &mut HashSet<String>) -> Option<String> {
    let mut from = 0;
    while let Some(token) = next_token(text, from) {
        match resolve(context, token.path) {
            None | Some(Value::Null) => {
                if warned.insert(token.path.to_owned()) {
                    warn!(
                        "no value for '{}' in injection data; leaving token in place",
                        token.path
                    );
                }
                from = token.end;
            }
            Some(value) if value.is_array() || value.is_object() => {
                let (replacement, cut_to) = match adjacent_block(text, token.end) {
                    Some(block) => {
                        let rendered: Vec<String> = collection_items(value)
                            .into_iter()
                            .map(|item| render_with(block.inner, &item_context(item), warned))
                            .collect();
                        (rendered.join(token.separator), block.end)
                    }
                    // No template to iterate: substitute the collection
                    // in its serialized form.
                    None => (value.to_string(), token.end),
                };
                return Some(splice(text, token.start, cut_to, &replacement));
            }
            Some(scalar) => {
                return Some(splice(text, token.start, token.end, &scalar_text(scalar)));
            }
        }
    }
    None
}

struct Token<'a> {
    /// Byte offset of the opening brace.
    start: usize,
    /// Byte offset just past the closing brace.
    end: usize,
    path: &'a str,
    separator: &'a str,
}

/// Finds the next balanced `{...}` token at or after `from`. An opening
/// brace that never closes is skipped so later tokens are still found.
fn next_token(text: &str, from: usize) -> Option<Token<'_>> {
    let mut at = from;
    while let Some(found) = text[at..].find('{') {
        let start = at + found;
        match balanced_span(text, start, b'{', b'}') {
            Some((inner_start, inner_end, end)) => {
                let inner = &text[inner_start..inner_end];
                let (path, separator) = match inner.split_once('@') {
                    Some((path, separator)) => (path, separator),
                    None => (inner, ""),
                };
                return Some(Token {
                    start,
                    end,
                    path,
                    separator,
                });
            }
            None => at = start + 1,
        }
    }
    None
}

struct Block<'a> {
    inner: &'a str,
    /// Byte offset just past the closing bracket.
    end: usize,
}

/// Returns the balanced `[...]` block starting exactly at `at`, if any.
fn adjacent_block(text: &str, at: usize) -> Option<Block<'_>> {
    if text.as_bytes().get(at) != Some(&b'[') {
        return None;
    }
    let (inner_start, inner_end, end) = balanced_span(text, at, b'[', b']')?;
    Some(Block {
        inner: &text[inner_start..inner_end],
        end,
    })
}

/// Matches `open` at `start` to its balancing `close`, returning
/// `(inner_start, inner_end, after_close)` byte offsets. Delimiters are
/// ASCII, so byte scanning is UTF-8 safe.
fn balanced_span(text: &str, start: usize, open: u8, close: u8) -> Option<(usize, usize, usize)> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &byte) in bytes.iter().enumerate().skip(start) {
        if byte == open {
            depth += 1;
        } else if byte == close {
            depth -= 1;
            if depth == 0 {
                return Some((start + 1, i, i + 1));
            }
        }
    }
    None
}

fn collection_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        // Objects iterate their values in key order.
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    }
}

/// Objects and arrays act as the template context directly; scalars are
/// wrapped so templates can address them as `{val}`.
fn item_context(item: &Value) -> Value {
    match item {
        Value::Object(_) | Value::Array(_) => item.clone(),
        scalar => serde_json::json!({ "val": scalar }),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn splice(text: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..start]);
    out.push_str(replacement);
    out.push_str(&text[end..]);
    out
}
