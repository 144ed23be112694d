//! Streaming recursive-descent JSON parser → `Value` (§4.4). Numbers
//! parse to INT when integral and signed-range, UINT when integral and
//! unsigned-range, FLOAT otherwise. Map variant (OMAP vs SMAP) is
//! configurable; duplicate keys: later entry wins.

use crate::error::{NodelError, NodelResult};
use crate::key::Key;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapVariant {
    Omap,
    Smap,
}

#[derive(Debug, Clone, Copy)]
pub struct JsonParseConfig {
    pub map_variant: MapVariant,
}

impl Default for JsonParseConfig {
    fn default() -> Self {
        JsonParseConfig { map_variant: MapVariant::Omap }
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    config: JsonParseConfig,
}

/// Parses `text` per `config`, returning a `Value::Error` (not a Rust
/// `Err`) on malformed input — callers inspect `is_error()`/`error_message()`
/// rather than unwrapping a `Result`, matching §4.4's "Errors produce an
/// ERROR Value".
pub fn parse_json(text: &str, config: JsonParseConfig) -> Value {
    let mut parser = Parser { bytes: text.as_bytes(), pos: 0, config };
    parser.skip_ws();
    match parser.parse_value() {
        Ok(v) => {
            parser.skip_ws();
            if parser.pos != parser.bytes.len() {
                Value::error(format!("trailing data at offset {}", parser.pos))
            } else {
                v
            }
        }
        Err(e) => Value::error(e.to_string()),
    }
}

/// Type-probe mode (§4.4): returns only the top-level kind without
/// constructing the tree, by peeking at the first significant byte.
pub fn probe_json_type(text: &str) -> NodelResult<&'static str> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'{') => Ok("omap"),
        Some(b'[') => Ok("list"),
        Some(b'"') | Some(b'\'') => Ok("str"),
        Some(b't') | Some(b'f') => Ok("bool"),
        Some(b'n') => Ok("nil"),
        Some(c) if c.is_ascii_digit() || *c == b'-' || *c == b'+' => Ok("number"),
        _ => Err(NodelError::Parse { message: "empty or unrecognized input".into(), offset: i }),
    }
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, c: u8) -> NodelResult<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(NodelError::Parse { message: format!("expected {:?}", c as char), offset: self.pos })
        }
    }

    fn parse_value(&mut self) -> NodelResult<Value> {
        self.skip_ws();
        match self.peek() {
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => self.parse_string(b'"').map(Value::from),
            Some(b'\'') => self.parse_string(b'\'').map(Value::from),
            Some(b't') => self.parse_literal("true", Value::from(true)),
            Some(b'f') => self.parse_literal("false", Value::from(false)),
            Some(b'n') => self.parse_literal("null", Value::nil()),
            Some(c) if c.is_ascii_digit() || c == b'-' || c == b'+' => self.parse_number(),
            _ => Err(NodelError::Parse { message: "unexpected end of input".into(), offset: self.pos }),
        }
    }

    fn parse_literal(&mut self, lit: &str, value: Value) -> NodelResult<Value> {
        if self.bytes[self.pos..].starts_with(lit.as_bytes()) {
            self.pos += lit.len();
            Ok(value)
        } else {
            Err(NodelError::Parse { message: format!("expected literal {:?}", lit), offset: self.pos })
        }
    }

    fn parse_string(&mut self, quote: u8) -> NodelResult<String> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(NodelError::Parse { message: "unterminated string".into(), offset: self.pos }),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    // §4.4: backslash escapes pass the next byte through
                    // literally (no `\n`/`\t`/`\r` control-character
                    // translation).
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => out.push(c as char),
                        None => return Err(NodelError::Parse { message: "unterminated escape".into(), offset: self.pos }),
                    }
                    self.pos += 1;
                }
                Some(_) => {
                    let start = self.pos;
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != quote && self.bytes[self.pos] != b'\\' {
                        self.pos += 1;
                    }
                    out.push_str(std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or(""));
                }
            }
        }
    }

    fn parse_number(&mut self) -> NodelResult<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-') | Some(b'+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == b'.' || c == b'e' || c == b'E' {
                is_float = true;
                self.pos += 1;
                if matches!(self.peek(), Some(b'-') | Some(b'+')) {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        if is_float {
            text.parse::<f64>()
                .map(Value::from)
                .map_err(|_| NodelError::Parse { message: format!("invalid number {:?}", text), offset: start })
        } else if let Ok(i) = text.parse::<i64>() {
            Ok(Value::from(i))
        } else if let Ok(u) = text.parse::<u64>() {
            Ok(Value::from(u))
        } else {
            text.parse::<f64>()
                .map(Value::from)
                .map_err(|_| NodelError::Parse { message: format!("invalid number {:?}", text), offset: start })
        }
    }

    fn parse_array(&mut self) -> NodelResult<Value> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::list(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                }
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(NodelError::Parse { message: "expected ',' or ']'".into(), offset: self.pos }),
            }
        }
        Ok(Value::list(items))
    }

    fn parse_object(&mut self) -> NodelResult<Value> {
        self.expect(b'{')?;
        let mut omap: IndexMap<Key, Value> = IndexMap::new();
        let mut smap: BTreeMap<Key, Value> = BTreeMap::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(self.finish_map(omap, smap));
        }
        loop {
            self.skip_ws();
            let key = match self.peek() {
                Some(b'"') => self.parse_string(b'"')?,
                Some(b'\'') => self.parse_string(b'\'')?,
                _ => return Err(NodelError::Parse { message: "expected string key".into(), offset: self.pos }),
            };
            self.skip_ws();
            self.expect(b':')?;
            let value = self.parse_value()?;
            match self.config.map_variant {
                MapVariant::Omap => {
                    omap.insert(Key::str(key), value);
                }
                MapVariant::Smap => {
                    smap.insert(Key::str(key), value);
                }
            }
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(NodelError::Parse { message: "expected ',' or '}'".into(), offset: self.pos }),
            }
        }
        Ok(self.finish_map(omap, smap))
    }

    fn finish_map(&self, omap: IndexMap<Key, Value>, smap: BTreeMap<Key, Value>) -> Value {
        match self.config.map_variant {
            MapVariant::Omap => Value::omap(omap),
            MapVariant::Smap => Value::smap(smap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_and_array() {
        let v = parse_json(r#"{"x": [1,2], "y": "t"}"#, JsonParseConfig::default());
        assert!(!v.is_error());
        assert_eq!(v.get(&Key::str("x")).unwrap().get(&Key::Uint(0)).unwrap().as_int().unwrap(), 1);
        assert_eq!(&*v.get(&Key::str("y")).unwrap().as_str().unwrap(), "t");
    }

    #[test]
    fn test_integer_vs_float() {
        let v = parse_json("42", JsonParseConfig::default());
        assert_eq!(v.as_int().unwrap(), 42);
        let v = parse_json("3.14", JsonParseConfig::default());
        assert!((v.as_float().unwrap() - 3.14).abs() < 1e-9);
    }

    #[test]
    fn test_booleans_and_null() {
        assert!(parse_json("true", JsonParseConfig::default()).as_bool().unwrap());
        assert!(parse_json("null", JsonParseConfig::default()).is_nil());
    }

    #[test]
    fn test_duplicate_keys_later_wins() {
        let v = parse_json(r#"{"x": 1, "x": 2}"#, JsonParseConfig::default());
        assert_eq!(v.get(&Key::str("x")).unwrap().as_int().unwrap(), 2);
    }

    #[test]
    fn test_malformed_input_produces_error_value() {
        let v = parse_json("{oops", JsonParseConfig::default());
        assert!(v.is_error());
    }

    #[test]
    fn test_single_quoted_strings() {
        let v = parse_json("'hi'", JsonParseConfig::default());
        assert_eq!(&*v.as_str().unwrap(), "hi");
    }

    #[test]
    fn test_backslash_escape_passes_through_literally() {
        // `\n` in the input is the two bytes backslash-n, not a newline.
        let v = parse_json(r#""a\nb""#, JsonParseConfig::default());
        assert_eq!(&*v.as_str().unwrap(), "anb");
        let v = parse_json(r#""a\\b""#, JsonParseConfig::default());
        assert_eq!(&*v.as_str().unwrap(), "a\\b");
    }

    #[test]
    fn test_probe_type_without_materializing() {
        assert_eq!(probe_json_type(r#"  {"x": 1}"#).unwrap(), "omap");
        assert_eq!(probe_json_type("[1,2]").unwrap(), "list");
    }

    #[test]
    fn test_smap_variant() {
        let v = parse_json(
            r#"{"b": 1, "a": 2}"#,
            JsonParseConfig { map_variant: MapVariant::Smap },
        );
        assert!(v.is_smap());
        let keys = v.keys().unwrap();
        assert_eq!(keys[0], Key::str("a"));
    }
}
