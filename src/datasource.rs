//! The `DataSource` trait: the single polymorphism point of the core
//! (§4.2, §9 "Polymorphism over DataSource"). Grounded on
//! `original_source/nodel/impl/Object.h`'s `ILoader` abstract class and
//! `nodel/impl/FileSystemDataSource.h`'s cached-image/iterator shape.

use crate::error::NodelResult;
use crate::key::Key;
use crate::value::Value;
use std::cell::Cell;
use std::fmt;

/// Whether one read populates the whole image, or keys must be read
/// individually (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Complete,
    Sparse,
}

/// Whether there is existing external data to read, or the external
/// location is empty and the in-memory image is authoritative until
/// saved (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Source,
    Memory,
}

/// Read/write/clobber/inherit bitset, grounded on
/// `original_source/nodel/impl/Flags.h`'s `Flags<T>` bitset wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode(u8);

impl Mode {
    pub const READ: Mode = Mode(1 << 0);
    pub const WRITE: Mode = Mode(1 << 1);
    pub const CLOBBER: Mode = Mode(1 << 2);
    pub const INHERIT: Mode = Mode(1 << 3);

    pub const fn empty() -> Self {
        Mode(0)
    }

    pub const fn read_write() -> Self {
        Mode(Self::READ.0 | Self::WRITE.0)
    }

    pub fn contains(&self, flag: Mode) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn with(self, flag: Mode) -> Self {
        Mode(self.0 | flag.0)
    }
}

impl std::ops::BitOr for Mode {
    type Output = Mode;
    fn bitor(self, rhs: Mode) -> Mode {
        self.with(rhs)
    }
}

/// What a DataSource reports as its container shape before any content
/// is read (`probe_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedType {
    List,
    Omap,
    Smap,
    Str,
}

/// Monotonically increasing call counters, exposed so tests can assert
/// exactly how many backend operations a scenario triggers (§10.5,
/// grounded on `original_source/nodel/impl/FileSystemDataSource.h`'s test
/// fixture instrumentation).
#[derive(Debug, Default)]
pub struct Stats {
    pub read_all_calls: Cell<u64>,
    pub read_key_calls: Cell<u64>,
    pub write_all_calls: Cell<u64>,
    pub write_key_calls: Cell<u64>,
    pub commit_calls: Cell<u64>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The contract between a bound `Value` and its external backing store.
///
/// Implementors must be internally mutable (`&self` methods) since a
/// `DataSource` is shared behind an `Rc` alongside the `Value` tree that
/// owns it.
pub trait DataSource: fmt::Debug {
    fn kind(&self) -> Kind;
    fn origin(&self) -> Origin;
    fn mode(&self) -> Mode;
    fn multilevel(&self) -> bool {
        false
    }
    fn stats(&self) -> &Stats;

    /// Throw-on-error flags (§4.2 Attributes): whether a failed read
    /// (`probe_type`/`read_all`/`read_key`) propagates as a hard `Err`, or
    /// is absorbed into an ERROR `Value` on the node that triggered it.
    /// Default per §7's propagation policy: don't throw on reads.
    fn throw_on_read_error(&self) -> bool {
        false
    }

    /// Whether a failed write (`write_all`/`write_key`/`commit`)
    /// propagates as a hard `Err`. Default per §7: do throw on writes.
    fn throw_on_write_error(&self) -> bool {
        true
    }

    /// Cheap: report the container shape without reading content.
    fn probe_type(&self) -> NodelResult<ReportedType>;

    /// Populate `target`'s cache with the full image. SPARSE sources may
    /// no-op or read metadata only.
    fn read_all(&self, target: &Value) -> NodelResult<()>;

    /// Return the value for a single key, populating the cache entry.
    fn read_key(&self, target: &Value, key: &Key) -> NodelResult<Value>;

    /// Flush the whole cached image to the backing store.
    fn write_all(&self, target: &Value) -> NodelResult<()>;

    /// Record (and, for sources without deferred commit, immediately
    /// apply) a single pending key update.
    fn write_key(&self, target: &Value, key: &Key, value: &Value) -> NodelResult<()>;

    /// Apply all pending updates and deletions atomically from the
    /// backing store's point of view.
    fn commit(&self, target: &Value, updates: &[(Key, Value)], deleted: &[Key]) -> NodelResult<()>;

    /// Construct a sibling/child DataSource of compatible kind for a new
    /// node, used by directory-like sources to instantiate sub-sources
    /// during save (child DataSource promotion, §4.2 item 8).
    fn new_instance(&self, _key: &Key, _origin: Origin) -> NodelResult<Option<std::rc::Rc<dyn DataSource>>> {
        Ok(None)
    }

    /// Parse backend-specific options out of the bind-time URI (§4.2
    /// item 9).
    fn configure(&self, uri: &crate::uri::Uri) -> NodelResult<()>;

    /// Release any held OS resources (file handles, connections). Called
    /// on `reset` and after a completed `save` where appropriate (§5).
    fn free_resources(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodelError;
    use crate::key::Key;
    use crate::uri::Uri;

    #[derive(Debug)]
    struct FailingProbeSource {
        stats: Stats,
        throw: bool,
    }

    impl DataSource for FailingProbeSource {
        fn kind(&self) -> Kind {
            Kind::Sparse
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
        fn throw_on_read_error(&self) -> bool {
            self.throw
        }
        fn probe_type(&self) -> NodelResult<ReportedType> {
            Err(NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, "backend unreachable")))
        }
        fn read_all(&self, _target: &Value) -> NodelResult<()> {
            Ok(())
        }
        fn read_key(&self, _target: &Value, _key: &Key) -> NodelResult<Value> {
            Err(NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, "backend unreachable")))
        }
        fn write_all(&self, _target: &Value) -> NodelResult<()> {
            Ok(())
        }
        fn write_key(&self, _target: &Value, _key: &Key, _value: &Value) -> NodelResult<()> {
            Ok(())
        }
        fn commit(&self, _target: &Value, _updates: &[(Key, Value)], _deleted: &[Key]) -> NodelResult<()> {
            Ok(())
        }
        fn configure(&self, _uri: &Uri) -> NodelResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_error_absorbed_as_error_value_by_default() {
        let source = std::rc::Rc::new(FailingProbeSource { stats: Stats::new(), throw: false });
        let v = Value::from_datasource(source);
        let r = v.get(&Key::str("x")).unwrap();
        assert!(r.is_error());
    }

    #[test]
    fn test_read_error_propagates_when_throw_on_read_error_is_set() {
        let source = std::rc::Rc::new(FailingProbeSource { stats: Stats::new(), throw: true });
        let v = Value::from_datasource(source);
        assert!(v.get(&Key::str("x")).is_err());
    }

    #[derive(Debug)]
    struct FailingReadKeySource {
        stats: Stats,
        throw: bool,
    }

    impl DataSource for FailingReadKeySource {
        fn kind(&self) -> Kind {
            Kind::Sparse
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
        fn throw_on_read_error(&self) -> bool {
            self.throw
        }
        fn probe_type(&self) -> NodelResult<ReportedType> {
            Ok(ReportedType::Omap)
        }
        fn read_all(&self, _target: &Value) -> NodelResult<()> {
            Ok(())
        }
        fn read_key(&self, _target: &Value, _key: &Key) -> NodelResult<Value> {
            Err(NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, "key fetch failed")))
        }
        fn write_all(&self, _target: &Value) -> NodelResult<()> {
            Ok(())
        }
        fn write_key(&self, _target: &Value, _key: &Key, _value: &Value) -> NodelResult<()> {
            Ok(())
        }
        fn commit(&self, _target: &Value, _updates: &[(Key, Value)], _deleted: &[Key]) -> NodelResult<()> {
            Ok(())
        }
        fn configure(&self, _uri: &Uri) -> NodelResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sparse_read_key_error_absorbed_as_error_value_by_default() {
        let source = std::rc::Rc::new(FailingReadKeySource { stats: Stats::new(), throw: false });
        let v = Value::from_datasource(source);
        let r = v.get(&Key::str("missing")).unwrap();
        assert!(r.is_error());
    }

    #[test]
    fn test_sparse_read_key_error_propagates_when_throw_on_read_error_is_set() {
        let source = std::rc::Rc::new(FailingReadKeySource { stats: Stats::new(), throw: true });
        let v = Value::from_datasource(source);
        assert!(v.get(&Key::str("missing")).is_err());
    }

    #[test]
    fn test_mode_bits() {
        let m = Mode::READ | Mode::WRITE;
        assert!(m.contains(Mode::READ));
        assert!(m.contains(Mode::WRITE));
        assert!(!m.contains(Mode::CLOBBER));
    }

    #[test]
    fn test_mode_inherit_composes() {
        let m = Mode::read_write().with(Mode::INHERIT);
        assert!(m.contains(Mode::INHERIT));
        assert!(m.contains(Mode::READ));
    }

    #[test]
    fn test_stats_start_at_zero() {
        let s = Stats::new();
        assert_eq!(s.read_all_calls.get(), 0);
        s.read_key_calls.set(3);
        assert_eq!(s.read_key_calls.get(), 3);
    }
}
