//! Path literal parsing/evaluation/auto-vivification and multi-step
//! `Query` navigation (§4.5, §6), exercised end to end against a tree.

use nodel::query::{Axis, Query, Step};
use nodel::value::Value;
use nodel::{Key, Path};

fn sample() -> Value {
    let mut x = indexmap::IndexMap::new();
    x.insert(Key::str("b"), Value::list(vec![Value::from(1i64), Value::from(2i64)]));
    let mut root_map = indexmap::IndexMap::new();
    root_map.insert(Key::str("a"), Value::omap(x));
    root_map.insert(Key::str("a.literal"), Value::from("dotted key"));
    Value::omap(root_map)
}

#[test]
fn test_literal_path_with_bracketed_index() {
    let root = sample();
    let path = Path::parse("a.b[1]").unwrap();
    let v = path.eval(&root).unwrap();
    assert_eq!(v.as_int().unwrap(), 2);
}

#[test]
fn test_literal_path_with_quoted_dotted_key() {
    let root = sample();
    let path = Path::parse("['a.literal']").unwrap();
    let v = path.eval(&root).unwrap();
    assert_eq!(&*v.as_str().unwrap(), "dotted key");
}

#[test]
fn test_path_create_autovivifies_through_missing_segments() {
    let root = Value::omap(indexmap::IndexMap::new());
    let path = Path::parse("x.y[0]").unwrap();
    path.create(&root, Value::from("new")).unwrap();
    assert_eq!(&*path.eval(&root).unwrap().as_str().unwrap(), "new");
}

#[test]
fn test_query_descends_two_child_steps_then_filters_list_index() {
    let root = sample();
    let q = Query::new()
        .step(Step::new(Axis::Child).with_key(Key::str("a")))
        .step(Step::new(Axis::Child).with_key(Key::str("b")));
    let results = q.eval(&root);
    assert_eq!(results.len(), 1);
    assert!(results[0].is_list());
}

#[test]
fn test_query_subtree_then_predicate_finds_matching_scalars() {
    let root = sample();
    let q = Query::new().step(Step::new(Axis::Subtree).with_predicate(|v| v.is_number()));
    let results = q.eval(&root);
    let ints: Vec<i64> = results.iter().map(|v| v.as_int().unwrap()).collect();
    assert_eq!(ints, vec![1, 2]);
}
