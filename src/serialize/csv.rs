//! `Value` → CSV writer: a LIST of LISTs of scalars becomes one
//! comma-separated row per inner list. Quoting mirrors the reader in
//! `crate::parse::csv` (`original_source/nodel/parser/csv.hxx`): a field
//! is quoted if it contains a comma, quote, or newline.

use crate::error::{NodelError, NodelResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvConfig {
    pub delimiter: char,
}

impl CsvConfig {
    pub fn new() -> Self {
        CsvConfig { delimiter: ',' }
    }
}

pub fn value_to_csv(value: &Value, config: &CsvConfig) -> NodelResult<String> {
    let rows = value.values().map_err(|_| NodelError::Type("CSV output requires a list of rows".into()))?;
    let mut out = String::new();
    for row in rows {
        let cells = row.values().map_err(|_| NodelError::Type("each CSV row must be a list".into()))?;
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                out.push(config.delimiter);
            }
            out.push_str(&format_cell(cell, config)?);
        }
        out.push('\n');
    }
    Ok(out)
}

fn format_cell(value: &Value, config: &CsvConfig) -> NodelResult<String> {
    let text = if let Ok(s) = value.as_str() {
        s.to_string()
    } else if let Ok(i) = value.as_int() {
        i.to_string()
    } else if let Ok(u) = value.as_uint() {
        u.to_string()
    } else if let Ok(f) = value.as_float() {
        crate::key::format_float(f)
    } else if value.is_nil() {
        String::new()
    } else {
        return Err(NodelError::Type("CSV cells must be scalars".into()));
    };
    let needs_quote = text.contains(config.delimiter) || text.contains('"') || text.contains('\n');
    if needs_quote {
        Ok(format!("\"{}\"", text.replace('"', "\\\"")))
    } else {
        Ok(text)
    }
}
