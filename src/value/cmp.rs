//! Equality and ordering (§4.1 "Equality and ordering"): structural deep
//! equality over containers, with LIST order-sensitive and OMAP
//! iteration-order-sensitive but SMAP only key/value-sensitive.
//! Ordering between containers, or across unrelated kinds, is a type
//! error rather than an arbitrary total order — hence `compare` returns
//! a `NodelResult`, unlike a plain `Ord` impl.

use super::{NodeData, Value};
use crate::error::{NodelError, NodelResult};
use crate::key::{self, Key};
use std::cmp::Ordering;

impl Value {
    pub fn deep_eq(&self, other: &Value) -> bool {
        let a = self.0.data.borrow();
        let b = other.0.data.borrow();
        match (&*a, &*b) {
            (NodeData::Nil, NodeData::Nil) => true,
            (NodeData::Bool(x), NodeData::Bool(y)) => x == y,
            (NodeData::Str(x), NodeData::Str(y)) => x == y,
            (NodeData::Error(x), NodeData::Error(y)) => x == y,
            (NodeData::List(x), NodeData::List(y)) => {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| a.deep_eq(b))
            }
            (NodeData::Omap(x), NodeData::Omap(y)) => {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|((ka, va), (kb, vb))| ka == kb && va.deep_eq(vb))
            }
            (NodeData::Smap(x), NodeData::Smap(y)) => {
                x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).map(|ov| v.deep_eq(ov)).unwrap_or(false))
            }
            _ if is_numeric(&a) && is_numeric(&b) => numeric_eq(&a, &b),
            _ => false,
        }
    }

    /// Type-checked ordering comparison: numeric-vs-numeric compares
    /// naturally (with the §3 cross-kind rules); anything else is a
    /// `TypeError`.
    pub fn compare(&self, other: &Value) -> NodelResult<Ordering> {
        let a = self.0.data.borrow();
        let b = other.0.data.borrow();
        match (&*a, &*b) {
            (NodeData::Str(x), NodeData::Str(y)) => Ok(x.cmp(y)),
            _ if is_numeric(&a) && is_numeric(&b) => Ok(numeric_cmp(&a, &b)),
            _ => Err(NodelError::Type("values are not ordering-comparable".into())),
        }
    }
}

fn is_numeric(d: &NodeData) -> bool {
    matches!(d, NodeData::Int(_) | NodeData::Uint(_) | NodeData::Float(_) | NodeData::Bool(_))
}

/// Converts a numeric `NodeData` variant to the equivalent `Key`, so
/// comparison can reuse `key::compare_numeric`'s exact-integer-arithmetic
/// cross-kind ordering instead of routing Int/Uint through a lossy `f64`
/// (which loses precision above 2^53 and can collapse distinct INT/UINT
/// values to the same float, per §3's "UINT values in (INT_MAX, UINT_MAX]
/// compare greater than any INT" boundary law).
fn as_key(d: &NodeData) -> Key {
    match d {
        NodeData::Int(i) => Key::Int(*i),
        NodeData::Uint(u) => Key::Uint(*u),
        NodeData::Float(f) => Key::Float(*f),
        NodeData::Bool(b) => Key::Bool(*b),
        _ => Key::Nil,
    }
}

fn numeric_eq(a: &NodeData, b: &NodeData) -> bool {
    key::compare_numeric(&as_key(a), &as_key(b)) == Ordering::Equal
}

fn numeric_cmp(a: &NodeData, b: &NodeData) -> Ordering {
    key::compare_numeric(&as_key(a), &as_key(b))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_order_matters() {
        let a = Value::list(vec![Value::from(1i64), Value::from(2i64)]);
        let b = Value::list(vec![Value::from(2i64), Value::from(1i64)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_omap_order_matters() {
        let mut m1 = indexmap::IndexMap::new();
        m1.insert(crate::key::Key::str("a"), Value::from(1i64));
        m1.insert(crate::key::Key::str("b"), Value::from(2i64));
        let mut m2 = indexmap::IndexMap::new();
        m2.insert(crate::key::Key::str("b"), Value::from(2i64));
        m2.insert(crate::key::Key::str("a"), Value::from(1i64));
        assert_ne!(Value::omap(m1), Value::omap(m2));
    }

    #[test]
    fn test_smap_order_does_not_matter() {
        let mut m1 = std::collections::BTreeMap::new();
        m1.insert(crate::key::Key::str("a"), Value::from(1i64));
        m1.insert(crate::key::Key::str("b"), Value::from(2i64));
        let m2 = m1.clone();
        assert_eq!(Value::smap(m1), Value::smap(m2));
    }

    #[test]
    fn test_numeric_cross_kind_equal() {
        assert_eq!(Value::from(3i64), Value::from(3.0f64));
    }

    #[test]
    fn test_compare_incomparable_kinds_is_type_error() {
        let list = Value::list(vec![]);
        let n = Value::from(1i64);
        assert!(list.compare(&n).is_err());
    }

    #[test]
    fn test_compare_numeric() {
        assert_eq!(Value::from(1i64).compare(&Value::from(2i64)).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_uint_beyond_int_max_compares_greater_without_float_rounding() {
        let at_max = Value::from(i64::MAX);
        let beyond = Value::from((i64::MAX as u64) + 1);
        assert_eq!(at_max.compare(&beyond).unwrap(), Ordering::Less);
        assert_ne!(at_max, beyond);
    }
}
