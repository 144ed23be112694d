//! Raw string serialization: a STR value passes through byte-for-byte
//! (§6 "Raw" file format); anything else is stringified via its
//! `to_str`/`Display`-equivalent view.

use crate::value::Value;

pub fn value_to_raw(value: &Value) -> String {
    if let Ok(s) = value.as_str() {
        return s.to_string();
    }
    if let Ok(i) = value.as_int() {
        return i.to_string();
    }
    if let Ok(u) = value.as_uint() {
        return u.to_string();
    }
    if let Ok(f) = value.as_float() {
        return crate::key::format_float(f);
    }
    if let Ok(b) = value.as_bool() {
        return b.to_string();
    }
    if value.is_nil() {
        return String::new();
    }
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_passthrough() {
        assert_eq!(value_to_raw(&Value::from("Assam")), "Assam");
    }

    #[test]
    fn test_nil_is_empty() {
        assert_eq!(value_to_raw(&Value::nil()), "");
    }

    #[test]
    fn test_int_stringifies() {
        assert_eq!(value_to_raw(&Value::from(42i64)), "42");
    }
}
