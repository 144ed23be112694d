//! `Value` → JSON writer, with a `JsonConfig` (compact/pretty, indent
//! width). Structurally modeled on `crates/runtime/src/son.rs`'s
//! `SonConfig`/`value_to_son`/`format_value` family: a config struct with
//! `compact()`/`pretty()` constructors and one recursive formatter per
//! container kind.

use crate::key::Key;
use crate::value::Value;

#[derive(Debug, Clone, Copy)]
pub struct JsonConfig {
    pub pretty: bool,
    pub indent: usize,
}

impl JsonConfig {
    pub fn compact() -> Self {
        JsonConfig { pretty: false, indent: 0 }
    }

    pub fn pretty() -> Self {
        JsonConfig { pretty: true, indent: 2 }
    }

    pub fn pretty_with_indent(indent: usize) -> Self {
        JsonConfig { pretty: true, indent }
    }
}

pub fn value_to_json(value: &Value, config: &JsonConfig) -> String {
    let mut out = String::new();
    format_value(value, config, 0, &mut out);
    out
}

fn push_indent(out: &mut String, config: &JsonConfig, depth: usize) {
    if config.pretty {
        out.push('\n');
        out.push_str(&" ".repeat(config.indent * depth));
    }
}

fn format_value(value: &Value, config: &JsonConfig, depth: usize, out: &mut String) {
    if value.is_nil() {
        out.push_str("null");
        return;
    }
    if let Some(msg) = value.error_message() {
        out.push_str(&quote_json_string(&msg));
        return;
    }
    if let Ok(b) = value.as_bool() {
        out.push_str(if b { "true" } else { "false" });
        return;
    }
    if let Ok(i) = value.as_int() {
        out.push_str(&i.to_string());
        return;
    }
    if let Ok(u) = value.as_uint() {
        out.push_str(&u.to_string());
        return;
    }
    if let Ok(f) = value.as_float() {
        out.push_str(&crate::key::format_float(f));
        return;
    }
    if let Ok(s) = value.as_str() {
        out.push_str(&quote_json_string(&s));
        return;
    }
    if value.is_list() {
        format_list(value, config, depth, out);
        return;
    }
    if value.is_omap() || value.is_smap() {
        format_map(value, config, depth, out);
        return;
    }
    // Opaque or a materialized-to-str DSRC: fall back to its string view.
    out.push_str(&quote_json_string(&format!("{:?}", value)));
}

fn format_list(value: &Value, config: &JsonConfig, depth: usize, out: &mut String) {
    let items = value.values().unwrap_or_default();
    if items.is_empty() {
        out.push_str("[]");
        return;
    }
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_indent(out, config, depth + 1);
        format_value(item, config, depth + 1, out);
    }
    push_indent(out, config, depth);
    out.push(']');
}

fn format_map(value: &Value, config: &JsonConfig, depth: usize, out: &mut String) {
    let items = value.items().unwrap_or_default();
    if items.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push('{');
    for (i, (key, val)) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_indent(out, config, depth + 1);
        out.push_str(&quote_json_string(&key_to_string(key)));
        out.push(':');
        if config.pretty {
            out.push(' ');
        }
        format_value(val, config, depth + 1, out);
    }
    push_indent(out, config, depth);
    out.push('}');
}

fn key_to_string(key: &Key) -> String {
    match key {
        Key::Str(s) => s.to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn quote_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
