//! SPEC_FULL §8 scenario 1: a tree built entirely in memory (no
//! DataSource attached anywhere) behaves as a plain nested container.

use indexmap::IndexMap;
use nodel::value::Value;
use nodel::Key;

#[test]
fn test_nested_map_and_list_roundtrip() {
    let mut inner = IndexMap::new();
    inner.insert(Key::str("name"), Value::from("Assam"));
    inner.insert(Key::str("rating"), Value::from(5i64));

    let mut root_map = IndexMap::new();
    root_map.insert(Key::str("tea"), Value::omap(inner));
    root_map.insert(Key::str("tags"), Value::list(vec![Value::from("black"), Value::from("strong")]));
    let root = Value::omap(root_map);

    let tea = root.get(&Key::str("tea")).unwrap();
    assert_eq!(&*tea.get(&Key::str("name")).unwrap().as_str().unwrap(), "Assam");
    assert_eq!(tea.get(&Key::str("rating")).unwrap().as_int().unwrap(), 5);

    let tags = root.get(&Key::str("tags")).unwrap();
    assert_eq!(tags.size().unwrap(), 2);
    assert_eq!(&*tags.get(&Key::Uint(1)).unwrap().as_str().unwrap(), "strong");
}

#[test]
fn test_parent_links_follow_structure() {
    let child = Value::from(1i64);
    let root = Value::list(vec![child]);
    let stored = root.get(&Key::Uint(0)).unwrap();
    assert!(stored.parent().unwrap().is(&root));
    assert!(root.parent().is_none());
}
