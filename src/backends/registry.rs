//! Extension → DataSource-factory association table (§6), grounded on
//! `original_source/nodel/filesystem/Registry.hxx`'s
//! `set_file_default`/`set_directory_default`/`associate`/`get_serializer`/
//! `create_if_defined`.

use crate::datasource::{DataSource, Origin};
use crate::error::NodelResult;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

type FileFactory = Rc<dyn Fn(&Path, Origin) -> NodelResult<Rc<dyn DataSource>>>;

/// Per-tree registry mapping file extension to a DataSource factory,
/// with defaults for files without a registered extension and for
/// subdirectories. Analogous to the original's `Registry` class, scoped
/// to one bound filesystem tree rather than process-global.
pub struct Registry {
    by_extension: RefCell<HashMap<String, FileFactory>>,
    file_default: RefCell<Option<FileFactory>>,
    directory_default: RefCell<Option<FileFactory>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("extensions", &self.by_extension.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            by_extension: RefCell::new(HashMap::new()),
            file_default: RefCell::new(None),
            directory_default: RefCell::new(None),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn associate(&self, extension: &str, factory: FileFactory) {
        self.by_extension.borrow_mut().insert(extension.trim_start_matches('.').to_string(), factory);
    }

    pub fn set_file_default(&self, factory: FileFactory) {
        *self.file_default.borrow_mut() = Some(factory);
    }

    pub fn set_directory_default(&self, factory: FileFactory) {
        *self.directory_default.borrow_mut() = Some(factory);
    }

    pub fn has_association(&self, extension: &str) -> bool {
        self.by_extension.borrow().contains_key(extension.trim_start_matches('.'))
    }

    /// Looks up a factory for `path` by extension (falling back to the
    /// file/directory default) and invokes it, or returns `Ok(None)` if
    /// no association applies (`create_if_defined`).
    pub fn create_if_defined(&self, path: &Path, is_directory: bool, origin: Origin) -> NodelResult<Option<Rc<dyn DataSource>>> {
        if is_directory {
            if let Some(f) = self.directory_default.borrow().as_ref() {
                return Ok(Some(f(path, origin)?));
            }
            return Ok(None);
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if let Some(f) = self.by_extension.borrow().get(ext) {
            return Ok(Some(f(path, origin)?));
        }
        if let Some(f) = self.file_default.borrow().as_ref() {
            return Ok(Some(f(path, origin)?));
        }
        Ok(None)
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.borrow().is_empty() && self.file_default.borrow().is_none() && self.directory_default.borrow().is_none()
    }
}
