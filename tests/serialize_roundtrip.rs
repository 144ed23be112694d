//! JSON/CSV round-trip laws and format-specific boundary behavior (§4.4).

use nodel::parse::csv::parse_csv;
use nodel::parse::json::{parse_json, JsonParseConfig};
use nodel::serialize::csv::{value_to_csv, CsvConfig};
use nodel::serialize::json::{value_to_json, JsonConfig};
use nodel::value::Value;
use nodel::Key;

#[test]
fn test_json_object_round_trips_through_compact_and_back() {
    let mut map = indexmap::IndexMap::new();
    map.insert(Key::str("name"), Value::from("Assam"));
    map.insert(Key::str("rating"), Value::from(5i64));
    map.insert(Key::str("tags"), Value::list(vec![Value::from("black"), Value::from("strong")]));
    let original = Value::omap(map);

    let text = value_to_json(&original, &JsonConfig::compact());
    let parsed = parse_json(&text, JsonParseConfig::default());

    assert!(!parsed.is_error());
    assert_eq!(&*parsed.get(&Key::str("name")).unwrap().as_str().unwrap(), "Assam");
    assert_eq!(parsed.get(&Key::str("rating")).unwrap().as_int().unwrap(), 5);
    assert_eq!(parsed.get(&Key::str("tags")).unwrap().size().unwrap(), 2);
}

#[test]
fn test_json_pretty_printing_is_still_parseable() {
    let v = Value::list(vec![Value::from(1i64), Value::from(2i64)]);
    let pretty = value_to_json(&v, &JsonConfig::pretty_with_indent(4));
    assert!(pretty.contains('\n'));
    let reparsed = parse_json(&pretty, JsonParseConfig::default());
    assert_eq!(reparsed.size().unwrap(), 2);
}

#[test]
fn test_csv_round_trip_with_quoted_comma_field() {
    let row = Value::list(vec![Value::from("a,b"), Value::from(42i64)]);
    let table = Value::list(vec![row]);
    let text = value_to_csv(&table, &CsvConfig::new()).unwrap();
    let reparsed = parse_csv(&text);
    let row0 = reparsed.get(&Key::Uint(0)).unwrap();
    assert_eq!(&*row0.get(&Key::Uint(0)).unwrap().as_str().unwrap(), "a,b");
    assert_eq!(row0.get(&Key::Uint(1)).unwrap().as_int().unwrap(), 42);
}

#[test]
fn test_csv_consecutive_commas_yield_empty_cells() {
    let v = parse_csv(",,,\n");
    let row = v.get(&Key::Uint(0)).unwrap();
    assert_eq!(row.size().unwrap(), 4);
}
