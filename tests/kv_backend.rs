//! SPEC_FULL §8 scenario 4: sparse key-value store, key-ordered
//! iteration, and the overlay read path (§4.2) backed by `nodel::backends::kv`.

use nodel::backends::kv::{iter_keys, KvSource};
use nodel::datasource::{DataSource, Origin};
use nodel::value::Value;
use nodel::Key;
use tempfile::TempDir;

#[test]
fn test_value_level_sparse_read_through_attached_source() {
    let dir = TempDir::new().unwrap();
    let ds = KvSource::new(dir.path().join("db"), Origin::Memory);
    let dummy = Value::nil();
    ds.write_key(&dummy, &Key::str("tea"), &Value::from("Assam")).unwrap();
    ds.write_key(&dummy, &Key::Int(1), &Value::from(100i64)).unwrap();

    let root = Value::from_datasource(std::rc::Rc::new(ds));
    let tea = root.get(&Key::str("tea")).unwrap();
    assert_eq!(&*tea.as_str().unwrap(), "Assam");

    // A second read of the same key is served from cache, not the store,
    // since SPARSE sources never set `fully_cached`.
    let tea_again = root.get(&Key::str("tea")).unwrap();
    assert_eq!(&*tea_again.as_str().unwrap(), "Assam");

    let missing = root.get(&Key::str("nonexistent")).unwrap();
    assert!(missing.is_nil());
}

#[test]
fn test_keys_iterate_in_total_key_order() {
    let dir = TempDir::new().unwrap();
    let ds = KvSource::new(dir.path().join("db"), Origin::Memory);
    let dummy = Value::nil();
    for (k, v) in [
        (Key::str("tea"), 1i64),
        (Key::Nil, 2),
        (Key::Int(-3), 3),
        (Key::Bool(false), 4),
        (Key::Uint(9), 5),
    ] {
        ds.write_key(&dummy, &k, &Value::from(v)).unwrap();
    }
    let keys = iter_keys(&ds).unwrap();
    assert_eq!(keys, vec![Key::Nil, Key::Bool(false), Key::Int(-3), Key::Uint(9), Key::str("tea")]);
}

#[test]
fn test_composite_value_round_trips_through_json_tag() {
    let dir = TempDir::new().unwrap();
    let ds = KvSource::new(dir.path().join("db"), Origin::Memory);
    let dummy = Value::nil();
    let list = Value::list(vec![Value::from(1i64), Value::from(2i64)]);
    ds.write_key(&dummy, &Key::str("nums"), &list).unwrap();
    let back = ds.read_key(&dummy, &Key::str("nums")).unwrap();
    assert_eq!(back.size().unwrap(), 2);
    assert_eq!(back.get(&Key::Uint(0)).unwrap().as_int().unwrap(), 1);
}
