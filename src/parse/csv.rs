//! CSV parser, ported in control-flow from
//! `original_source/nodel/parser/csv.hxx`'s `Parser<StreamType>`: row
//! loop over column loop, quote/escape handling, and the blank-row
//! discard rule (a row with exactly one empty unquoted field is
//! dropped).

use crate::value::Value;

pub fn parse_csv(text: &str) -> Value {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let mut rows = Vec::new();
    while pos < bytes.len() {
        let (row, next) = parse_row(bytes, pos);
        pos = next;
        if let Some(row) = row {
            rows.push(row);
        }
    }
    Value::list(rows)
}

fn parse_row(bytes: &[u8], mut pos: usize) -> (Option<Value>, usize) {
    let mut fields = Vec::new();
    loop {
        let (field, next) = parse_column(bytes, pos);
        pos = next;
        fields.push(field);
        match bytes.get(pos) {
            Some(b',') => {
                pos += 1;
            }
            Some(b'\n') => {
                pos += 1;
                break;
            }
            _ => break,
        }
    }
    if fields.len() == 1 {
        if let Ok(s) = fields[0].as_str() {
            if s.is_empty() {
                return (None, pos);
            }
        }
    }
    (Some(Value::list(fields)), pos)
}

fn consume_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos] != b'\n' && (bytes[pos] as char).is_whitespace() {
        pos += 1;
    }
    pos
}

fn parse_column(bytes: &[u8], pos: usize) -> (Value, usize) {
    let pos = consume_whitespace(bytes, pos);
    match bytes.get(pos) {
        Some(b',') | Some(b'\n') | None => (Value::from(""), pos),
        Some(b'"') => parse_quoted(bytes, pos, b'"'),
        Some(b'\'') => parse_quoted(bytes, pos, b'\''),
        _ => parse_unquoted(bytes, pos),
    }
}

fn parse_quoted(bytes: &[u8], mut pos: usize, quote: u8) -> (Value, usize) {
    pos += 1; // opening quote
    let mut out = String::new();
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if pos + 1 < bytes.len() => {
                out.push(bytes[pos + 1] as char);
                pos += 2;
            }
            c if c == quote => {
                pos += 1;
                break;
            }
            c => {
                out.push(c as char);
                pos += 1;
            }
        }
    }
    let pos = consume_whitespace(bytes, pos);
    (Value::from(out), pos)
}

fn parse_unquoted(bytes: &[u8], pos: usize) -> (Value, usize) {
    let start = pos;
    let mut end = pos;
    while end < bytes.len() && bytes[end] != b',' && bytes[end] != b'\n' {
        end += 1;
    }
    let text = std::str::from_utf8(&bytes[start..end]).unwrap_or("").trim_end();
    let value = sniff_number(text).unwrap_or_else(|| Value::from(text));
    (value, end)
}

fn sniff_number(text: &str) -> Option<Value> {
    let first = text.as_bytes().first()?;
    if !(first.is_ascii_digit() || *first == b'-' || *first == b'+') {
        return None;
    }
    if text.contains('.') {
        text.parse::<f64>().ok().map(Value::from)
    } else {
        text.parse::<i64>().ok().map(Value::from)
    }
}
