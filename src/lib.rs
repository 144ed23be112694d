//! `nodel`: a dynamically-typed, tree-structured data model with
//! pluggable external storage.
//!
//! A [`value::Value`] is a handle to a node in a tree of NIL / BOOL /
//! INT / UINT / FLOAT / STR / LIST / OMAP / SMAP / OPAQUE values. Any
//! container node may have a [`datasource::DataSource`] attached,
//! letting part of the tree be backed by a filesystem directory, a zip
//! archive, an embedded key-value store, or a custom backend reached
//! through [`uri::bind`] — the in-memory tree and its external
//! representation stay coherent through a small cache/update-log
//! protocol (§4.2 of the design notes).
//!
//! ```
//! use nodel::value::Value;
//! use nodel::key::Key;
//! use indexmap::IndexMap;
//!
//! let mut map = IndexMap::new();
//! map.insert(Key::str("tea"), Value::from("Assam"));
//! let root = Value::omap(map);
//! assert_eq!(&*root.get(&Key::str("tea")).unwrap().as_str().unwrap(), "Assam");
//! ```

pub mod algo;
pub mod datasource;
pub mod error;
pub mod interner;
pub mod key;
pub mod opaque;
pub mod parse;
pub mod path;
pub mod query;
pub mod serialize;
pub mod slice;
pub mod uri;
pub mod value;

pub mod backends {
    #[cfg(feature = "fs")]
    pub mod fs;

    #[cfg(feature = "archive")]
    pub mod archive;

    #[cfg(feature = "kvdb")]
    pub mod kv;

    pub mod registry;
}

pub use error::{NodelError, NodelResult};
pub use key::Key;
pub use path::Path;
pub use query::Query;
pub use uri::{bind, bind_with_origin, Uri};
pub use value::{Value, ValueId};

/// Registers every backend enabled by this build's feature flags with
/// the global URI scheme registry (§4.6). Call once at startup before
/// using [`uri::bind`] with `file://`, `zip://`, or `kvdb://` URIs;
/// constructing a backend's `DataSource` type directly (e.g.
/// `backends::fs::DirectorySource::new`) never requires this.
pub fn register_default_schemes() {
    #[cfg(feature = "fs")]
    backends::fs::register(None);

    #[cfg(feature = "archive")]
    backends::archive::register();

    #[cfg(feature = "kvdb")]
    backends::kv::register();
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_in_memory_roundtrip() {
        let mut map = IndexMap::new();
        map.insert(Key::str("tea"), Value::from("Assam"));
        let root = Value::omap(map);
        assert_eq!(&*root.get(&Key::str("tea")).unwrap().as_str().unwrap(), "Assam");
    }

    #[test]
    fn test_register_default_schemes_is_idempotent() {
        register_default_schemes();
        register_default_schemes();
    }
}
