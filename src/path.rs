//! `Path`: an ordered sequence of `Key`s addressing a node, with the
//! dotted/bracketed literal syntax of §4.5/§6 (`a.b[2]['x.y']`).
//!
//! Grounded on `original_source/nodel/impl/path.h` for the tag set and
//! literal-grammar intent; that file's `PathIterator`/`Step::eval` is
//! incomplete (missing `break`s in the eval switch, an `AncestorIterator`
//! that is referenced but never defined), so the parsing and creation
//! logic below is written fresh rather than ported.

use crate::error::{NodelError, NodelResult};
use crate::key::Key;
use crate::value::Value;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<Key>);

impl Path {
    pub fn new(steps: Vec<Key>) -> Self {
        Path(steps)
    }

    pub fn steps(&self) -> &[Key] {
        &self.0
    }

    pub fn push(&mut self, key: Key) {
        self.0.push(key);
    }

    /// Parses the literal syntax: `.` starts a string-key segment, `[`
    /// starts a segment closed by `]` (bracketed segments may hold an
    /// integer or a quoted string); `\.` escapes a literal dot inside an
    /// unbracketed string-key segment.
    pub fn parse(literal: &str) -> NodelResult<Path> {
        let bytes = literal.as_bytes();
        let mut i = 0;
        let mut steps = Vec::new();

        // A path may start with a bare key (no leading dot), e.g. "a.b".
        if i < bytes.len() && bytes[i] != b'[' {
            let (key, next) = parse_dotted_segment(literal, i)?;
            steps.push(key);
            i = next;
        }

        while i < bytes.len() {
            match bytes[i] {
                b'.' => {
                    let (key, next) = parse_dotted_segment(literal, i + 1)?;
                    steps.push(key);
                    i = next;
                }
                b'[' => {
                    let close = literal[i..]
                        .find(']')
                        .map(|p| p + i)
                        .ok_or_else(|| NodelError::Parse { message: "unterminated [".into(), offset: i })?;
                    let inner = &literal[i + 1..close];
                    steps.push(parse_bracketed_segment(inner)?);
                    i = close + 1;
                }
                _ => {
                    return Err(NodelError::Parse {
                        message: format!("unexpected character {:?}", bytes[i] as char),
                        offset: i,
                    })
                }
            }
        }
        Ok(Path(steps))
    }

    /// Renders the literal syntax for this path.
    pub fn to_literal(&self) -> String {
        let mut out = String::new();
        for (i, key) in self.0.iter().enumerate() {
            match key {
                Key::Int(_) | Key::Uint(_) => {
                    out.push('[');
                    out.push_str(&key.to_string());
                    out.push(']');
                }
                Key::Str(s) if s.contains('.') || s.contains('[') => {
                    out.push('[');
                    out.push('\'');
                    out.push_str(s);
                    out.push('\'');
                    out.push(']');
                }
                Key::Str(s) => {
                    if i > 0 {
                        out.push('.');
                    }
                    out.push_str(s);
                }
                other => {
                    out.push('[');
                    out.push_str(&other.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    pub fn eval(&self, root: &Value) -> NodelResult<Value> {
        root.get_path(&self.0)
    }

    /// Walks `self.0`, creating intermediate OMAP containers for string
    /// keys and LIST containers for integer keys where the path doesn't
    /// yet exist, then sets `value` at the final key (§4.5 `create`).
    pub fn create(&self, root: &Value, value: Value) -> NodelResult<()> {
        if self.0.is_empty() {
            root.replace_with(value)?;
            return Ok(());
        }
        let mut cur = root.clone();
        for (i, key) in self.0.iter().enumerate() {
            let is_last = i == self.0.len() - 1;
            if is_last {
                cur.set(key.clone(), value.clone())?;
                return Ok(());
            }
            let next_is_index = matches!(self.0[i + 1], Key::Int(_) | Key::Uint(_));
            let existing = cur.get(key).ok();
            let child = match existing {
                Some(v) if v.is_container() => v,
                _ => {
                    let fresh = if next_is_index { Value::list(Vec::new()) } else { Value::omap(indexmap::IndexMap::new()) };
                    cur.set(key.clone(), fresh.clone())?;
                    cur.get(key)?
                }
            };
            cur = child;
        }
        Ok(())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_literal())
    }
}

fn parse_dotted_segment(literal: &str, start: usize) -> NodelResult<(Key, usize)> {
    let bytes = literal.as_bytes();
    let mut i = start;
    let mut out = String::new();
    while i < bytes.len() && bytes[i] != b'.' && bytes[i] != b'[' {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            out.push(bytes[i + 1] as char);
            i += 2;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    if out.is_empty() {
        return Err(NodelError::Parse { message: "empty path segment".into(), offset: start });
    }
    Ok((Key::str(out), i))
}

fn parse_bracketed_segment(inner: &str) -> NodelResult<Key> {
    let trimmed = inner.trim();
    if (trimmed.starts_with('\'') && trimmed.ends_with('\'') && trimmed.len() >= 2)
        || (trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2)
    {
        return Ok(Key::str(&trimmed[1..trimmed.len() - 1]));
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(Key::Int(i));
    }
    Err(NodelError::Parse {
        message: format!("invalid bracketed path segment {:?}", inner),
        offset: 0,
    })
}
