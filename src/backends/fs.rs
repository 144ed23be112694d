//! Filesystem `DataSource`s: a bound directory (COMPLETE, OMAP-reported,
//! multilevel) and the per-format file sources it creates through the
//! registry. Grounded on `original_source/nodel/filesystem/Directory.hxx`
//! (`SubDirectory`/`Directory`, `read()`/`write()`, the "URI specifies
//! path twice" `BindError`) and `nodel/filesystem/Registry.hxx`.

use crate::backends::registry::Registry;
use crate::datasource::{DataSource, Kind, Mode, Origin, ReportedType, Stats};
use crate::error::{NodelError, NodelResult};
use crate::key::Key;
use crate::uri::Uri;
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Options parsed out of a `file://` URI (§10.3), or constructed
/// directly without going through a URI.
#[derive(Debug, Clone)]
pub struct FsOptions {
    pub path: PathBuf,
    pub mode: Mode,
    pub json_indent: usize,
}

impl FsOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FsOptions { path: path.into(), mode: Mode::read_write(), json_indent: 2 }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

fn default_registry() -> Rc<Registry> {
    let reg = Registry::new();
    reg.associate(
        "json",
        Rc::new(|path, origin| Ok(Rc::new(JsonFileSource::new(path.to_path_buf(), origin)) as Rc<dyn DataSource>)),
    );
    reg.associate(
        "csv",
        Rc::new(|path, origin| Ok(Rc::new(CsvFileSource::new(path.to_path_buf(), origin)) as Rc<dyn DataSource>)),
    );
    reg.set_file_default(Rc::new(|path, origin| Ok(Rc::new(RawFileSource::new(path.to_path_buf(), origin)) as Rc<dyn DataSource>)));
    Rc::new(reg)
}

/// A bound directory: reported type OMAP, entries keyed by basename,
/// each entry's DataSource chosen by the registry per extension.
#[derive(Debug)]
pub struct DirectorySource {
    path: RefCell<PathBuf>,
    mode: Cell<Mode>,
    stats: Stats,
    registry: Rc<Registry>,
}

impl DirectorySource {
    pub fn new(path: PathBuf, _origin: Origin) -> Self {
        DirectorySource {
            path: RefCell::new(path),
            mode: Cell::new(Mode::read_write()),
            stats: Stats::new(),
            registry: default_registry(),
        }
    }

    fn path(&self) -> PathBuf {
        self.path.borrow().clone()
    }
}

impl DataSource for DirectorySource {
    fn kind(&self) -> Kind {
        Kind::Complete
    }

    fn origin(&self) -> Origin {
        Origin::Source
    }

    fn mode(&self) -> Mode {
        self.mode.get()
    }

    fn multilevel(&self) -> bool {
        true
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }

    fn probe_type(&self) -> NodelResult<ReportedType> {
        Ok(ReportedType::Omap)
    }

    fn read_all(&self, target: &Value) -> NodelResult<()> {
        self.stats.read_all_calls.set(self.stats.read_all_calls.get() + 1);
        let dir = self.path();
        if !dir.exists() {
            return Ok(());
        }
        let mut map: IndexMap<Key, Value> = IndexMap::new();
        let mut entries: Vec<_> = fs::read_dir(&dir)?.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let entry_path = entry.path();
            let is_dir = entry_path.is_dir();
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = if is_dir {
                Value::from_datasource(Rc::new(DirectorySource::new(entry_path.clone(), Origin::Source)))
            } else if let Some(ds) = self.registry.create_if_defined(&entry_path, false, Origin::Source)? {
                Value::from_datasource(ds)
            } else {
                continue;
            };
            map.insert(Key::str(name), child);
        }
        target.replace_with(Value::omap(map))?;
        target.clear_dirty();
        Ok(())
    }

    fn read_key(&self, target: &Value, key: &Key) -> NodelResult<Value> {
        self.stats.read_key_calls.set(self.stats.read_key_calls.get() + 1);
        self.read_all(target)?;
        target.get(key)
    }

    fn write_all(&self, target: &Value) -> NodelResult<()> {
        self.stats.write_all_calls.set(self.stats.write_all_calls.get() + 1);
        let dir = self.path();
        fs::create_dir_all(&dir)?;
        let existing_names: std::collections::HashSet<String> = if dir.exists() {
            fs::read_dir(&dir)?.filter_map(|e| e.ok()).map(|e| e.file_name().to_string_lossy().into_owned()).collect()
        } else {
            std::collections::HashSet::new()
        };
        let current_names: std::collections::HashSet<String> =
            target.keys()?.into_iter().filter_map(|k| k.to_str().ok().map(|s| s.to_string())).collect();
        for stale in existing_names.difference(&current_names) {
            let p = dir.join(stale);
            if p.is_dir() {
                let _ = fs::remove_dir_all(p);
            } else {
                let _ = fs::remove_file(p);
            }
        }
        for (key, child) in target.items()? {
            let name = key.to_str()?;
            self.save_child(&dir, &name, &child)?;
        }
        Ok(())
    }

    fn write_key(&self, target: &Value, key: &Key, value: &Value) -> NodelResult<()> {
        self.stats.write_key_calls.set(self.stats.write_key_calls.get() + 1);
        let dir = self.path();
        fs::create_dir_all(&dir)?;
        let name = key.to_str()?;
        self.save_child(&dir, &name, value)?;
        let _ = target;
        Ok(())
    }

    fn commit(&self, target: &Value, updates: &[(Key, Value)], deleted: &[Key]) -> NodelResult<()> {
        self.stats.commit_calls.set(self.stats.commit_calls.get() + 1);
        let dir = self.path();
        fs::create_dir_all(&dir)?;
        for key in deleted {
            if let Ok(name) = key.to_str() {
                let p = dir.join(&*name);
                if p.is_dir() {
                    let _ = fs::remove_dir_all(p);
                } else {
                    let _ = fs::remove_file(p);
                }
            }
        }
        for (key, value) in updates {
            let name = key.to_str()?;
            self.save_child(&dir, &name, value)?;
        }
        let _ = target;
        Ok(())
    }

    fn new_instance(&self, key: &Key, origin: Origin) -> NodelResult<Option<Rc<dyn DataSource>>> {
        let name = key.to_str()?;
        let path = self.path().join(&*name);
        Ok(self.registry.create_if_defined(&path, false, origin)?)
    }

    fn configure(&self, uri: &Uri) -> NodelResult<()> {
        let path = uri.resolve_path(".")?;
        *self.path.borrow_mut() = PathBuf::from(path);
        let mode = match uri.query_get("perm") {
            Some("r") => Mode::READ,
            Some("w") => Mode::WRITE,
            _ => Mode::read_write(),
        };
        self.mode.set(mode);
        Ok(())
    }
}

impl DirectorySource {
    /// Child promotion during save (§4.2 item 8, §4.3 "new_instance"):
    /// if a child is itself a bound container (e.g. a sub-directory or a
    /// structured file value), recurse through its own DataSource;
    /// otherwise write it through the registry's association for its
    /// name, falling back to a raw text dump.
    fn save_child(&self, dir: &Path, name: &str, child: &Value) -> NodelResult<()> {
        if child.is_container() {
            fs::create_dir_all(dir.join(name))?;
            let sub = DirectorySource::new(dir.join(name), Origin::Memory);
            sub.write_all(child)?;
            return Ok(());
        }
        let path = dir.join(name);
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let text = match ext {
            "json" => crate::serialize::json::value_to_json(child, &crate::serialize::json::JsonConfig::pretty()),
            "csv" => crate::serialize::csv::value_to_csv(child, &crate::serialize::csv::CsvConfig::new())?,
            _ => crate::serialize::raw::value_to_raw(child),
        };
        fs::write(path, text)?;
        Ok(())
    }
}

/// A `.json` file's content, exposed as the shape its top-level value
/// reports (COMPLETE source).
#[derive(Debug)]
pub struct JsonFileSource {
    path: RefCell<PathBuf>,
    stats: Stats,
}

impl JsonFileSource {
    pub fn new(path: PathBuf, _origin: Origin) -> Self {
        JsonFileSource { path: RefCell::new(path), stats: Stats::new() }
    }
}

impl DataSource for JsonFileSource {
    fn kind(&self) -> Kind {
        Kind::Complete
    }
    fn origin(&self) -> Origin {
        Origin::Source
    }
    fn mode(&self) -> Mode {
        Mode::read_write()
    }
    fn stats(&self) -> &Stats {
        &self.stats
    }
    fn probe_type(&self) -> NodelResult<ReportedType> {
        let text = fs::read_to_string(&*self.path.borrow()).unwrap_or_default();
        match crate::parse::json::probe_json_type(&text) {
            Ok("list") => Ok(ReportedType::List),
            Ok("omap") => Ok(ReportedType::Omap),
            _ => Ok(ReportedType::Omap),
        }
    }
    fn read_all(&self, target: &Value) -> NodelResult<()> {
        self.stats.read_all_calls.set(self.stats.read_all_calls.get() + 1);
        let text = fs::read_to_string(&*self.path.borrow())?;
        let parsed = crate::parse::json::parse_json(&text, crate::parse::json::JsonParseConfig::default());
        target.replace_with(parsed)?;
        target.clear_dirty();
        Ok(())
    }
    fn read_key(&self, target: &Value, key: &Key) -> NodelResult<Value> {
        self.read_all(target)?;
        target.get(key)
    }
    fn write_all(&self, target: &Value) -> NodelResult<()> {
        self.stats.write_all_calls.set(self.stats.write_all_calls.get() + 1);
        let text = crate::serialize::json::value_to_json(target, &crate::serialize::json::JsonConfig::pretty());
        fs::write(&*self.path.borrow(), text)?;
        Ok(())
    }
    fn write_key(&self, target: &Value, _key: &Key, _value: &Value) -> NodelResult<()> {
        self.write_all(target)
    }
    fn commit(&self, target: &Value, _updates: &[(Key, Value)], _deleted: &[Key]) -> NodelResult<()> {
        self.stats.commit_calls.set(self.stats.commit_calls.get() + 1);
        self.write_all(target)
    }
    fn configure(&self, uri: &Uri) -> NodelResult<()> {
        let path = uri.resolve_path("")?;
        if !path.is_empty() {
            *self.path.borrow_mut() = PathBuf::from(path);
        }
        Ok(())
    }
}

/// A `.csv` file's content: a LIST of row LISTs (COMPLETE source).
#[derive(Debug)]
pub struct CsvFileSource {
    path: RefCell<PathBuf>,
    stats: Stats,
}

impl CsvFileSource {
    pub fn new(path: PathBuf, _origin: Origin) -> Self {
        CsvFileSource { path: RefCell::new(path), stats: Stats::new() }
    }
}

impl DataSource for CsvFileSource {
    fn kind(&self) -> Kind {
        Kind::Complete
    }
    fn origin(&self) -> Origin {
        Origin::Source
    }
    fn mode(&self) -> Mode {
        Mode::read_write()
    }
    fn stats(&self) -> &Stats {
        &self.stats
    }
    fn probe_type(&self) -> NodelResult<ReportedType> {
        Ok(ReportedType::List)
    }
    fn read_all(&self, target: &Value) -> NodelResult<()> {
        self.stats.read_all_calls.set(self.stats.read_all_calls.get() + 1);
        let text = fs::read_to_string(&*self.path.borrow())?;
        target.replace_with(crate::parse::csv::parse_csv(&text))?;
        target.clear_dirty();
        Ok(())
    }
    fn read_key(&self, target: &Value, key: &Key) -> NodelResult<Value> {
        self.read_all(target)?;
        target.get(key)
    }
    fn write_all(&self, target: &Value) -> NodelResult<()> {
        self.stats.write_all_calls.set(self.stats.write_all_calls.get() + 1);
        let text = crate::serialize::csv::value_to_csv(target, &crate::serialize::csv::CsvConfig::new())?;
        fs::write(&*self.path.borrow(), text)?;
        Ok(())
    }
    fn write_key(&self, target: &Value, _key: &Key, _value: &Value) -> NodelResult<()> {
        self.write_all(target)
    }
    fn commit(&self, target: &Value, _updates: &[(Key, Value)], _deleted: &[Key]) -> NodelResult<()> {
        self.stats.commit_calls.set(self.stats.commit_calls.get() + 1);
        self.write_all(target)
    }
    fn configure(&self, uri: &Uri) -> NodelResult<()> {
        let path = uri.resolve_path("")?;
        if !path.is_empty() {
            *self.path.borrow_mut() = PathBuf::from(path);
        }
        Ok(())
    }
}

/// Any file without a registered extension: the whole file becomes a
/// single STR value, bytes passed through unmodified (§6 "Raw").
#[derive(Debug)]
pub struct RawFileSource {
    path: RefCell<PathBuf>,
    stats: Stats,
}

impl RawFileSource {
    pub fn new(path: PathBuf, _origin: Origin) -> Self {
        RawFileSource { path: RefCell::new(path), stats: Stats::new() }
    }
}

impl DataSource for RawFileSource {
    fn kind(&self) -> Kind {
        Kind::Complete
    }
    fn origin(&self) -> Origin {
        Origin::Source
    }
    fn mode(&self) -> Mode {
        Mode::read_write()
    }
    fn stats(&self) -> &Stats {
        &self.stats
    }
    fn probe_type(&self) -> NodelResult<ReportedType> {
        Ok(ReportedType::Str)
    }
    fn read_all(&self, target: &Value) -> NodelResult<()> {
        self.stats.read_all_calls.set(self.stats.read_all_calls.get() + 1);
        let text = fs::read_to_string(&*self.path.borrow()).unwrap_or_default();
        target.replace_with(Value::from(text))?;
        target.clear_dirty();
        Ok(())
    }
    fn read_key(&self, target: &Value, key: &Key) -> NodelResult<Value> {
        self.read_all(target)?;
        target.get(key)
    }
    fn write_all(&self, target: &Value) -> NodelResult<()> {
        self.stats.write_all_calls.set(self.stats.write_all_calls.get() + 1);
        fs::write(&*self.path.borrow(), crate::serialize::raw::value_to_raw(target))?;
        Ok(())
    }
    fn write_key(&self, target: &Value, _key: &Key, _value: &Value) -> NodelResult<()> {
        self.write_all(target)
    }
    fn commit(&self, target: &Value, _updates: &[(Key, Value)], _deleted: &[Key]) -> NodelResult<()> {
        self.stats.commit_calls.set(self.stats.commit_calls.get() + 1);
        self.write_all(target)
    }
    fn configure(&self, uri: &Uri) -> NodelResult<()> {
        let path = uri.resolve_path("")?;
        if !path.is_empty() {
            *self.path.borrow_mut() = PathBuf::from(path);
        }
        Ok(())
    }
}

/// Registers the `file://` scheme (§6) with the global URI registry.
pub fn register(options: Option<FsOptions>) {
    crate::uri::register_scheme("file", move |uri, origin| {
        let path = if let Some(opts) = &options {
            opts.path.clone()
        } else {
            PathBuf::from(uri.resolve_path(".")?)
        };
        let ds: Rc<dyn DataSource> = Rc::new(DirectorySource::new(path, origin));
        Ok(ds)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use tempfile::TempDir;

    #[test]
    fn test_directory_lazy_load_reads_json_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("example.json"), r#"{"favorite": "Assam"}"#).unwrap();
        let ds: Rc<dyn DataSource> = Rc::new(DirectorySource::new(dir.path().to_path_buf(), Origin::Source));
        let root = Value::from_datasource(ds);
        let favorite = root.get(&Key::str("example.json")).unwrap().get(&Key::str("favorite")).unwrap();
        assert_eq!(&*favorite.as_str().unwrap(), "Assam");
    }

    #[test]
    fn test_directory_save_creates_new_file() {
        let dir = TempDir::new().unwrap();
        let ds: Rc<dyn DataSource> = Rc::new(DirectorySource::new(dir.path().to_path_buf(), Origin::Memory));
        let root = Value::from_datasource(ds.clone());
        root.materialize().unwrap();
        let mut inner = IndexMap::new();
        inner.insert(Key::str("tea"), Value::from("FTGFOP"));
        root.set(Key::str("new.json"), Value::omap(inner)).unwrap();
        ds.write_all(&root).unwrap();
        assert!(dir.path().join("new.json").exists());
        let content = fs::read_to_string(dir.path().join("new.json")).unwrap();
        assert!(content.contains("FTGFOP"));
    }

    #[test]
    fn test_bind_both_path_forms_is_error() {
        let uri = Uri::parse("file:///abs/path?path=again").unwrap();
        let ds = DirectorySource::new(PathBuf::new(), Origin::Source);
        assert!(ds.configure(&uri).is_err());
    }
}
