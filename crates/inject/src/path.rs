//! Dotted-path lookup over JSON values.
//!
//! Paths address nested data with `.` between object fields and `[n]` for
//! array positions: `players[0].name`, `round.scores[2]`. A numeric index
//! falls back to an object key of the same spelling, so `x[0]` also finds
//! `{"x": {"0": ...}}`.

use serde_json::Value;

enum Index<'a> {
    Position(usize),
    Key(&'a str),
}

/// Resolves `path` against `root`, returning `None` when any step is
/// missing or the path is malformed.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = root;
    for segment in path.split('.') {
        let (name, indexes) = parse_segment(segment)?;
        if !name.is_empty() {
            current = current.get(name)?;
        }
        for index in indexes {
            current = match index {
                Index::Position(n) => current
                    .get(n)
                    .or_else(|| current.get(n.to_string().as_str()))?,
                Index::Key(key) => current.get(key)?,
            };
        }
    }
    Some(current)
}

/// Splits one `.`-delimited segment into its field name and any trailing
/// bracket indexes. `None` for empty or unbalanced segments.
fn parse_segment(segment: &str) -> Option<(&str, Vec<Index<'_>>)> {
    let (name, mut rest) = match segment.find('[') {
        Some(at) => (&segment[..at], &segment[at..]),
        None => (segment, ""),
    };

    let mut indexes = Vec::new();
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return None;
        }
        let close = rest.find(']')?;
        let inner = &rest[1..close];
        indexes.push(match inner.parse::<usize>() {
            Ok(n) => Index::Position(n),
            Err(_) => Index::Key(inner),
        });
        rest = &rest[close + 1..];
    }

    if name.is_empty() && indexes.is_empty() {
        return None;
    }
    Some((name, indexes))
}
