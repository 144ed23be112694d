//! `Value`: the tagged-union handle at the center of the data model
//! (§3). Grounded on `crates/runtime/src/value.rs` for the Rust
//! tagged-enum-with-heap-variants shape, and on
//! `original_source/nodel/impl/Object.h`'s `Datum` variant set
//! (`void*`/bool/Int/UInt/Float/string/list/map/loader) for the domain
//! semantics.
//!
//! Every `Value` is a cheap handle (`Rc<NodeCell>` clone) to a shared
//! cell, mirroring the original's intrusive-refcounted `Object`: cloning
//! a `Value` aliases the same payload, and the strong count on the `Rc`
//! *is* the reference count invariant (I-3) requires.

pub mod cmp;
pub mod container;
pub mod mutate;
pub mod nav;

use crate::datasource::{DataSource, Kind, ReportedType};
use crate::error::{NodelError, NodelResult};
use crate::key::Key;
use crate::opaque::OpaqueValue;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// The concrete payload held by a node cell. `Dsrc` is the transient,
/// unmaterialized state of a pure-lazy `bind(uri)` (DESIGN.md decision
/// #1): once probed or read, the cell's data is replaced in place by the
/// reported container shape, and a `BoundSource` is attached.
pub(crate) enum NodeData {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(Rc<str>),
    List(Vec<Value>),
    Omap(IndexMap<Key, Value>),
    Smap(BTreeMap<Key, Value>),
    Opaque(Box<dyn OpaqueValue>),
    Dsrc(Rc<dyn DataSource>),
    Error(Rc<str>),
}

/// Attached external backing store plus the pending-write state the
/// cache-coherence protocol (§4.2) tracks on top of it.
pub(crate) struct BoundSource {
    pub(crate) source: Rc<dyn DataSource>,
    pub(crate) update_log: RefCell<Vec<(Key, Value)>>,
    pub(crate) deleted: RefCell<Vec<Key>>,
    pub(crate) fully_cached: Cell<bool>,
    pub(crate) whole_image_dirty: Cell<bool>,
}

pub(crate) struct NodeCell {
    pub(crate) data: RefCell<NodeData>,
    pub(crate) parent: RefCell<Weak<NodeCell>>,
    pub(crate) source: RefCell<Option<Rc<BoundSource>>>,
    pub(crate) dirty: Cell<bool>,
}

impl fmt::Debug for NodeCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCell").field("dirty", &self.dirty.get()).finish()
    }
}

/// The tagged-union handle. Cheap to clone (an `Rc` bump); clones alias
/// the same underlying cell, matching `is()`/identity semantics.
#[derive(Clone)]
pub struct Value(pub(crate) Rc<NodeCell>);

/// Stable identity for a `Value`, usable as a `HashMap` key independent
/// of the value's own `Eq`. Grounded on `original_source/nodel/impl/Oid.h`'s
/// tagged-pointer identity (§10.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(u8, u64);

impl Value {
    pub(crate) fn from_data(data: NodeData) -> Self {
        Value(Rc::new(NodeCell {
            data: RefCell::new(data),
            parent: RefCell::new(Weak::new()),
            source: RefCell::new(None),
            dirty: Cell::new(false),
        }))
    }

    pub fn nil() -> Self {
        Value::from_data(NodeData::Nil)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Value::from_data(NodeData::Error(Rc::from(message.into().as_str())))
    }

    pub fn list(items: Vec<Value>) -> Self {
        let v = Value::from_data(NodeData::List(items));
        v.adopt_children();
        v
    }

    pub fn omap(map: IndexMap<Key, Value>) -> Self {
        let v = Value::from_data(NodeData::Omap(map));
        v.adopt_children();
        v
    }

    pub fn smap(map: BTreeMap<Key, Value>) -> Self {
        let v = Value::from_data(NodeData::Smap(map));
        v.adopt_children();
        v
    }

    pub fn opaque(payload: Box<dyn OpaqueValue>) -> Self {
        Value::from_data(NodeData::Opaque(payload))
    }

    /// Constructs a pure-lazy DSRC value: nothing about its shape is
    /// known until `type()`/`get()` forces a probe (DESIGN.md #1).
    pub fn from_datasource(source: Rc<dyn DataSource>) -> Self {
        Value::from_data(NodeData::Dsrc(source))
    }

    /// Re-parents every immediate child container/value currently stored
    /// in `self` to point back at `self`. Used right after constructing a
    /// container from owned children (invariant I-1/I-2 maintenance).
    fn adopt_children(&self) {
        let weak_self = Rc::downgrade(&self.0);
        match &*self.0.data.borrow() {
            NodeData::List(items) => {
                for child in items {
                    *child.0.parent.borrow_mut() = weak_self.clone();
                }
            }
            NodeData::Omap(map) => {
                for child in map.values() {
                    *child.0.parent.borrow_mut() = weak_self.clone();
                }
            }
            NodeData::Smap(map) => {
                for child in map.values() {
                    *child.0.parent.borrow_mut() = weak_self.clone();
                }
            }
            _ => {}
        }
    }

    pub fn is(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn id(&self) -> ValueId {
        let tag = self.type_tag();
        let bits = match &*self.0.data.borrow() {
            NodeData::Nil => 0,
            NodeData::Bool(b) => *b as u64,
            NodeData::Int(i) => *i as u64,
            NodeData::Uint(u) => *u,
            NodeData::Float(f) => f.to_bits(),
            _ => Rc::as_ptr(&self.0) as *const () as u64,
        };
        ValueId(tag, bits)
    }

    fn type_tag(&self) -> u8 {
        match &*self.0.data.borrow() {
            NodeData::Nil => 0,
            NodeData::Bool(_) => 1,
            NodeData::Int(_) => 2,
            NodeData::Uint(_) => 3,
            NodeData::Float(_) => 4,
            NodeData::Str(_) => 5,
            NodeData::List(_) => 6,
            NodeData::Omap(_) => 7,
            NodeData::Smap(_) => 8,
            NodeData::Opaque(_) => 9,
            NodeData::Dsrc(_) => 10,
            NodeData::Error(_) => 11,
        }
    }

    /// Forces a DSRC value to resolve its reported shape in place,
    /// attaching a `BoundSource` and, for `Kind::Complete` sources,
    /// eagerly populating the image. No-op if already materialized.
    ///
    /// A failed `probe_type`/`read_all` propagates as `Err` only when the
    /// source opts into `throw_on_read_error`; by default (§7) it is
    /// absorbed in place as an ERROR `Value` instead.
    pub(crate) fn materialize(&self) -> NodelResult<()> {
        let source = {
            let data = self.0.data.borrow();
            match &*data {
                NodeData::Dsrc(ds) => ds.clone(),
                _ => return Ok(()),
            }
        };
        let reported = match source.probe_type() {
            Ok(r) => r,
            Err(e) => return self.absorb_or_throw(&*source, e),
        };
        let empty = match reported {
            ReportedType::List => NodeData::List(Vec::new()),
            ReportedType::Omap => NodeData::Omap(IndexMap::new()),
            ReportedType::Smap => NodeData::Smap(BTreeMap::new()),
            ReportedType::Str => NodeData::Str(Rc::from("")),
        };
        *self.0.data.borrow_mut() = empty;
        *self.0.source.borrow_mut() = Some(Rc::new(BoundSource {
            source: source.clone(),
            update_log: RefCell::new(Vec::new()),
            deleted: RefCell::new(Vec::new()),
            fully_cached: Cell::new(false),
            whole_image_dirty: Cell::new(false),
        }));
        if source.kind() == Kind::Complete {
            if let Err(e) = source.read_all(self) {
                return self.absorb_or_throw(&*source, e);
            }
            if let Some(bound) = &*self.0.source.borrow() {
                bound.fully_cached.set(true);
            }
        }
        Ok(())
    }

    /// Shared by every read path (§4.2 "Throw-on-error flags", §7): turns
    /// a read failure into either a propagated `Err` or an in-place ERROR
    /// `Value`, per the source's `throw_on_read_error` policy.
    pub(crate) fn absorb_or_throw(&self, source: &dyn DataSource, err: NodelError) -> NodelResult<()> {
        if source.throw_on_read_error() {
            return Err(err);
        }
        *self.0.data.borrow_mut() = NodeData::Error(Rc::from(err.to_string().as_str()));
        *self.0.source.borrow_mut() = None;
        Ok(())
    }

    /// Attaches a DataSource to this (already-shaped) container value,
    /// for the `bind(uri, obj)` form (DESIGN.md #1). Replaces any
    /// existing attachment.
    pub fn attach_source(&self, source: Rc<dyn DataSource>) -> NodelResult<()> {
        if !self.is_container() {
            return Err(NodelError::Type("only a container value can have an attached DataSource".into()));
        }
        *self.0.source.borrow_mut() = Some(Rc::new(BoundSource {
            source,
            update_log: RefCell::new(Vec::new()),
            deleted: RefCell::new(Vec::new()),
            fully_cached: Cell::new(false),
            whole_image_dirty: Cell::new(false),
        }));
        Ok(())
    }

    pub fn is_container(&self) -> bool {
        matches!(
            &*self.0.data.borrow(),
            NodeData::List(_) | NodeData::Omap(_) | NodeData::Smap(_)
        )
    }

    pub fn is_nil(&self) -> bool {
        matches!(&*self.0.data.borrow(), NodeData::Nil)
    }

    pub fn is_error(&self) -> bool {
        matches!(&*self.0.data.borrow(), NodeData::Error(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(&*self.0.data.borrow(), NodeData::Bool(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(&*self.0.data.borrow(), NodeData::List(_))
    }

    pub fn is_omap(&self) -> bool {
        matches!(&*self.0.data.borrow(), NodeData::Omap(_))
    }

    pub fn is_smap(&self) -> bool {
        matches!(&*self.0.data.borrow(), NodeData::Smap(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(&*self.0.data.borrow(), NodeData::Str(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(
            &*self.0.data.borrow(),
            NodeData::Int(_) | NodeData::Uint(_) | NodeData::Float(_)
        )
    }

    /// Type name after resolving any DSRC wrapper (invariant I-4).
    pub fn type_name(&self) -> NodelResult<&'static str> {
        self.materialize()?;
        Ok(match &*self.0.data.borrow() {
            NodeData::Nil => "nil",
            NodeData::Bool(_) => "bool",
            NodeData::Int(_) => "int",
            NodeData::Uint(_) => "uint",
            NodeData::Float(_) => "float",
            NodeData::Str(_) => "str",
            NodeData::List(_) => "list",
            NodeData::Omap(_) => "omap",
            NodeData::Smap(_) => "smap",
            NodeData::Opaque(o) => o.tag(),
            NodeData::Dsrc(_) => unreachable!("materialize() resolves Dsrc"),
            NodeData::Error(_) => "error",
        })
    }

    pub fn as_bool(&self) -> NodelResult<bool> {
        match &*self.0.data.borrow() {
            NodeData::Bool(b) => Ok(*b),
            other => Err(NodelError::Type(format!("expected bool, found {}", Self::describe(other)))),
        }
    }

    pub fn as_int(&self) -> NodelResult<i64> {
        match &*self.0.data.borrow() {
            NodeData::Int(i) => Ok(*i),
            other => Err(NodelError::Type(format!("expected int, found {}", Self::describe(other)))),
        }
    }

    pub fn as_uint(&self) -> NodelResult<u64> {
        match &*self.0.data.borrow() {
            NodeData::Uint(u) => Ok(*u),
            other => Err(NodelError::Type(format!("expected uint, found {}", Self::describe(other)))),
        }
    }

    pub fn as_float(&self) -> NodelResult<f64> {
        match &*self.0.data.borrow() {
            NodeData::Float(f) => Ok(*f),
            other => Err(NodelError::Type(format!("expected float, found {}", Self::describe(other)))),
        }
    }

    pub fn as_str(&self) -> NodelResult<Rc<str>> {
        match &*self.0.data.borrow() {
            NodeData::Str(s) => Ok(s.clone()),
            other => Err(NodelError::Type(format!("expected str, found {}", Self::describe(other)))),
        }
    }

    /// Lenient numeric coercion across bool/int/uint/float (§4.1 `cast`).
    pub fn cast_float(&self) -> NodelResult<f64> {
        match &*self.0.data.borrow() {
            NodeData::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            NodeData::Int(i) => Ok(*i as f64),
            NodeData::Uint(u) => Ok(*u as f64),
            NodeData::Float(f) => Ok(*f),
            other => Err(NodelError::Type(format!("{} is not numeric", Self::describe(other)))),
        }
    }

    pub fn cast_int(&self) -> NodelResult<i64> {
        match &*self.0.data.borrow() {
            NodeData::Bool(b) => Ok(*b as i64),
            NodeData::Int(i) => Ok(*i),
            NodeData::Uint(u) => i64::try_from(*u).map_err(|_| NodelError::Range(format!("{} does not fit in i64", u))),
            NodeData::Float(f) => Ok(*f as i64),
            other => Err(NodelError::Type(format!("{} is not numeric", Self::describe(other)))),
        }
    }

    fn describe(data: &NodeData) -> &'static str {
        match data {
            NodeData::Nil => "nil",
            NodeData::Bool(_) => "bool",
            NodeData::Int(_) => "int",
            NodeData::Uint(_) => "uint",
            NodeData::Float(_) => "float",
            NodeData::Str(_) => "str",
            NodeData::List(_) => "list",
            NodeData::Omap(_) => "omap",
            NodeData::Smap(_) => "smap",
            NodeData::Opaque(_) => "opaque",
            NodeData::Dsrc(_) => "dsrc",
            NodeData::Error(_) => "error",
        }
    }

    pub fn error_message(&self) -> Option<Rc<str>> {
        match &*self.0.data.borrow() {
            NodeData::Error(m) => Some(m.clone()),
            _ => None,
        }
    }

    /// A deep, unparented structural copy of `self`, used when a
    /// `Value` that already has a parent is inserted into a new
    /// container (invariant I-2; §4.1 `set`).
    pub(crate) fn deep_copy(&self) -> Value {
        let data = match &*self.0.data.borrow() {
            NodeData::Nil => NodeData::Nil,
            NodeData::Bool(b) => NodeData::Bool(*b),
            NodeData::Int(i) => NodeData::Int(*i),
            NodeData::Uint(u) => NodeData::Uint(*u),
            NodeData::Float(f) => NodeData::Float(*f),
            NodeData::Str(s) => NodeData::Str(s.clone()),
            NodeData::List(items) => NodeData::List(items.iter().map(|v| v.deep_copy()).collect()),
            NodeData::Omap(map) => {
                NodeData::Omap(map.iter().map(|(k, v)| (k.clone(), v.deep_copy())).collect())
            }
            NodeData::Smap(map) => {
                NodeData::Smap(map.iter().map(|(k, v)| (k.clone(), v.deep_copy())).collect())
            }
            NodeData::Opaque(o) => NodeData::Opaque(o.clone_box()),
            NodeData::Dsrc(ds) => NodeData::Dsrc(ds.clone()),
            NodeData::Error(m) => NodeData::Error(m.clone()),
        };
        let copy = Value::from_data(data);
        copy.adopt_children();
        copy
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.data.borrow() {
            NodeData::Nil => write!(f, "Nil"),
            NodeData::Bool(b) => write!(f, "Bool({})", b),
            NodeData::Int(i) => write!(f, "Int({})", i),
            NodeData::Uint(u) => write!(f, "Uint({})", u),
            NodeData::Float(fl) => write!(f, "Float({})", fl),
            NodeData::Str(s) => write!(f, "Str({:?})", s),
            NodeData::List(items) => write!(f, "List(len={})", items.len()),
            NodeData::Omap(m) => write!(f, "Omap(len={})", m.len()),
            NodeData::Smap(m) => write!(f, "Smap(len={})", m.len()),
            NodeData::Opaque(o) => write!(f, "Opaque({})", o.tag()),
            NodeData::Dsrc(_) => write!(f, "Dsrc(unmaterialized)"),
            NodeData::Error(m) => write!(f, "Error({:?})", m),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::nil()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_data(NodeData::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::from_data(NodeData::Int(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::from_data(NodeData::Uint(u))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::from_data(NodeData::Float(f))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::from_data(NodeData::Str(Rc::from(s)))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::from_data(NodeData::Str(Rc::from(s.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_is_nil() {
        assert!(Value::nil().is_nil());
    }

    #[test]
    fn test_clone_is_shared_handle() {
        let a = Value::from(5i64);
        let b = a.clone();
        assert!(a.is(&b));
    }

    #[test]
    fn test_list_children_get_parent_link() {
        let child = Value::from(1i64);
        let list = Value::list(vec![child.clone()]);
        let parent = child.0.parent.borrow().upgrade().unwrap();
        assert!(Rc::ptr_eq(&parent, &list.0));
    }

    #[test]
    fn test_deep_copy_is_not_same_cell() {
        let a = Value::list(vec![Value::from(1i64)]);
        let b = a.deep_copy();
        assert!(!a.is(&b));
        assert_eq!(a.as_int_list_for_test(), b.as_int_list_for_test());
    }

    #[test]
    fn test_as_int_wrong_kind_is_type_error() {
        let v = Value::from("tea");
        assert!(v.as_int().is_err());
    }

    #[test]
    fn test_cast_float_from_bool() {
        assert_eq!(Value::from(true).cast_float().unwrap(), 1.0);
    }

    #[test]
    fn test_error_is_error() {
        let e = Value::error("boom");
        assert!(e.is_error());
        assert_eq!(&*e.error_message().unwrap(), "boom");
    }

    impl Value {
        /// Test-only helper: flattens a list-of-ints for equality checks.
        fn as_int_list_for_test(&self) -> Vec<i64> {
            match &*self.0.data.borrow() {
                NodeData::List(items) => items.iter().map(|v| v.as_int().unwrap()).collect(),
                _ => panic!("not a list"),
            }
        }
    }
}
