//! URI parsing, the scheme registry, and `bind()` (§4.6).
//!
//! The registry's lookup idiom is grounded on
//! `crates/runtime/src/error.rs`'s `thread_local! { static LAST_ERROR:
//! RefCell<...> }` pattern: a thread-local mirror avoids a lock on the
//! steady-state lookup path, falling back to (and refreshing from) a
//! global `Mutex`-guarded table on a miss. The bind control flow itself
//! — factory lookup, Origin selection, `configure`, attach-vs-lazy — is
//! ported from `original_source/nodel/core/bind.hxx`.

use crate::datasource::{DataSource, Origin};
use crate::error::{NodelError, NodelResult};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex, OnceLock};

/// A parsed URI: scheme, authority/path passed through to `url::Url`, and
/// an ordered query-string map (§6).
#[derive(Debug, Clone)]
pub struct Uri {
    inner: url::Url,
    query: IndexMap<String, String>,
}

impl Uri {
    pub fn parse(s: &str) -> NodelResult<Self> {
        let inner = url::Url::parse(s).map_err(|e| NodelError::Bind(format!("invalid URI {:?}: {}", s, e)))?;
        let mut query = IndexMap::new();
        for (k, v) in inner.query_pairs() {
            query.insert(k.into_owned(), v.into_owned());
        }
        Ok(Uri { inner, query })
    }

    pub fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    /// The URI's hierarchical path component, empty string if none.
    pub fn path(&self) -> &str {
        self.inner.path()
    }

    pub fn query_get(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(|s| s.as_str())
    }

    /// Resolves the `path=` option, enforcing §6's rule that specifying a
    /// path both hierarchically and via `?path=` is an error (ported from
    /// `Directory::configure`'s `"URI specifies path twice"` check). The
    /// hierarchical form is returned as-is: `file:///tmp/foo`'s path
    /// component is already the absolute OS path `/tmp/foo`, so it must
    /// not be stripped down to a relative one.
    pub fn resolve_path(&self, default: &str) -> NodelResult<String> {
        let hier = self.path();
        let query_path = self.query_get("path");
        match (hier.is_empty() || hier == "/", query_path) {
            (false, Some(_)) => Err(NodelError::Bind("URI specifies path twice".into())),
            (false, None) => Ok(hier.to_string()),
            (true, Some(p)) => Ok(p.to_string()),
            (true, None) => Ok(default.to_string()),
        }
    }
}

type Factory = Arc<dyn Fn(&Uri, Origin) -> NodelResult<Rc<dyn DataSource>> + Send + Sync>;

fn global_registry() -> &'static Mutex<HashMap<String, Factory>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Factory>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

thread_local! {
    static LOCAL_REGISTRY: RefCell<HashMap<String, Factory>> = RefCell::new(HashMap::new());
}

/// Registers a scheme factory, visible to all threads (other threads
/// pick it up lazily on their next lookup miss).
pub fn register_scheme<F>(scheme: &str, factory: F)
where
    F: Fn(&Uri, Origin) -> NodelResult<Rc<dyn DataSource>> + Send + Sync + 'static,
{
    let factory: Factory = Arc::new(factory);
    global_registry()
        .lock()
        .expect("scheme registry poisoned")
        .insert(scheme.to_string(), factory.clone());
    LOCAL_REGISTRY.with(|local| {
        local.borrow_mut().insert(scheme.to_string(), factory);
    });
}

fn lookup_scheme(scheme: &str) -> Option<Factory> {
    if let Some(f) = LOCAL_REGISTRY.with(|local| local.borrow().get(scheme).cloned()) {
        return Some(f);
    }
    let global = global_registry().lock().expect("scheme registry poisoned");
    let f = global.get(scheme)?.clone();
    LOCAL_REGISTRY.with(|local| {
        local.borrow_mut().insert(scheme.to_string(), f.clone());
    });
    Some(f)
}

/// Binds a URI to a fresh, unmaterialized `DataSource`
/// (`Origin::Source`), for the pure-lazy form of `bind(uri)` (no initial
/// value yet known — see DESIGN.md decision #1).
pub fn bind(uri_str: &str) -> NodelResult<Rc<dyn DataSource>> {
    bind_with_origin(uri_str, Origin::Source)
}

/// Binds a URI with an explicit origin, used internally when attaching a
/// DataSource to an existing in-memory value (`Origin::Memory`).
pub fn bind_with_origin(uri_str: &str, origin: Origin) -> NodelResult<Rc<dyn DataSource>> {
    let uri = Uri::parse(uri_str)?;
    let factory = lookup_scheme(uri.scheme())
        .ok_or_else(|| NodelError::Bind(format!("URI scheme not found: {}", uri.scheme())))?;
    let ds = factory(&uri, origin)?;
    ds.configure(&uri)?;
    Ok(ds)
}
