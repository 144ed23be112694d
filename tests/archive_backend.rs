//! SPEC_FULL §8: zip archive DataSource, nested-path reconstruction and
//! full-rebuild write (DESIGN.md decision #4).

use indexmap::IndexMap;
use nodel::backends::archive::ArchiveSource;
use nodel::datasource::{DataSource, Origin};
use nodel::value::Value;
use nodel::Key;
use tempfile::TempDir;

#[test]
fn test_nested_paths_become_nested_omaps() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("catalog.zip");

    let ds = ArchiveSource::new(archive_path.clone(), Origin::Memory);
    let root = Value::omap(IndexMap::new());
    let mut leaf = IndexMap::new();
    leaf.insert(Key::str("origin"), Value::from("India"));
    root.set(Key::str("teas.json"), Value::omap(leaf)).unwrap();
    ds.write_all(&root).unwrap();

    let reloaded = Value::omap(IndexMap::new());
    let ds2 = ArchiveSource::new(archive_path, Origin::Source);
    ds2.read_all(&reloaded).unwrap();

    let origin = reloaded.get(&Key::str("teas.json")).unwrap().get(&Key::str("origin")).unwrap();
    assert_eq!(&*origin.as_str().unwrap(), "India");
}

#[test]
fn test_commit_triggers_full_rebuild() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("data.zip");
    let ds = ArchiveSource::new(archive_path, Origin::Memory);
    let root = Value::omap(IndexMap::new());
    root.set(Key::str("notes.txt"), Value::from("first")).unwrap();
    ds.commit(&root, &[], &[]).unwrap();
    assert_eq!(ds.stats().commit_calls.get(), 1);
    assert_eq!(ds.stats().write_all_calls.get(), 1);
}
