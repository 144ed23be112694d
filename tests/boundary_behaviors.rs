//! Cross-cutting boundary cases: INT/UINT edges at the `Value` surface,
//! bind() through the real `file://`/`kvdb://` schemes once
//! `register_default_schemes()` has run, and SMAP key ordering.

use nodel::value::Value;
use nodel::Key;
use std::collections::BTreeMap;
use tempfile::TempDir;

#[test]
fn test_uint_boundary_cast_int_succeeds_within_i64_range() {
    let at_max = Value::from(i64::MAX as u64);
    assert_eq!(at_max.cast_int().unwrap(), i64::MAX);
    // `as_int` is strict-typed and does not cross Int/Uint, unlike `cast_int`.
    assert!(at_max.as_int().is_err());
}

#[test]
fn test_uint_boundary_cast_int_fails_beyond_i64_range() {
    let beyond = Value::from((i64::MAX as u64) + 1);
    assert!(beyond.cast_int().is_err());
    assert_eq!(beyond.as_uint().unwrap(), (i64::MAX as u64) + 1);
}

#[test]
fn test_smap_orders_keys_across_kinds() {
    let mut map: BTreeMap<Key, Value> = BTreeMap::new();
    map.insert(Key::str("zz"), Value::from(1i64));
    map.insert(Key::Int(5), Value::from(2i64));
    map.insert(Key::Nil, Value::from(3i64));
    map.insert(Key::Bool(true), Value::from(4i64));
    let v = Value::smap(map);
    let keys = v.keys().unwrap();
    assert_eq!(keys, vec![Key::Nil, Key::Bool(true), Key::Int(5), Key::str("zz")]);
}

#[test]
fn test_bind_file_scheme_after_registering_defaults() {
    nodel::register_default_schemes();
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tea.json"), r#"{"name": "Assam"}"#).unwrap();

    let uri = format!("file://{}", dir.path().display());
    let ds = nodel::bind(&uri).unwrap();
    let root = Value::from_datasource(ds);
    let tea = root.get(&Key::str("tea.json")).unwrap();
    assert_eq!(&*tea.get(&Key::str("name")).unwrap().as_str().unwrap(), "Assam");
}

#[test]
fn test_bind_kvdb_scheme_after_registering_defaults() {
    nodel::register_default_schemes();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("store");

    let uri = format!("kvdb://{}", db_path.display());
    let ds = nodel::bind(&uri).unwrap();
    ds.write_key(&Value::nil(), &Key::str("tea"), &Value::from("Assam")).unwrap();

    let ds2 = nodel::bind(&uri).unwrap();
    let v = ds2.read_key(&Value::nil(), &Key::str("tea")).unwrap();
    assert_eq!(&*v.as_str().unwrap(), "Assam");
}
