//! Container access: `get`/`set`/`del`/`size`/iteration (§4.1), including
//! the SPARSE-source overlay (pending updates/deletes take precedence
//! over a stale cache entry, §4.2 "Iteration").

use super::{NodeData, Value};
use crate::error::{NodelError, NodelResult};
use crate::key::Key;
use crate::slice::Slice;
use std::rc::Rc;

impl Value {
    /// Number of entries in a container, or of bytes... no, of code
    /// points for a string. Resolves DSRC first.
    pub fn size(&self) -> NodelResult<usize> {
        self.materialize()?;
        Ok(match &*self.0.data.borrow() {
            NodeData::List(items) => items.len(),
            NodeData::Omap(map) => map.len(),
            NodeData::Smap(map) => map.len(),
            NodeData::Str(s) => s.chars().count(),
            _ => return Err(NodelError::Type("size() requires a container or string".into())),
        })
    }

    /// Used by `get`/`keys`/`values`/`items` on a wrong-kind receiver:
    /// per §4.1 these surface as an ERROR *Value* (absorbed per I-5), not
    /// a hard `Err`.
    fn wrong_kind(op: &str) -> Value {
        Value::error(format!("{} requires a container", op))
    }

    fn key_to_index(&self, key: &Key, len: usize) -> NodelResult<usize> {
        let i = key.to_int().map_err(|_| NodelError::Type("list index must be an integer".into()))?;
        let idx = if i < 0 { len as i64 + i } else { i };
        if idx < 0 || idx as usize >= len {
            return Err(NodelError::Range(format!("list index {} out of range (len {})", i, len)));
        }
        Ok(idx as usize)
    }

    /// Looks up a single key, consulting the attached DataSource for a
    /// SPARSE source on a cache miss (§4.2 read path).
    pub fn get(&self, key: &Key) -> NodelResult<Value> {
        self.materialize()?;
        if self.0.source.borrow().is_some() {
            if let Some(overlay) = self.sparse_overlay_get(key)? {
                return Ok(overlay);
            }
        }
        self.get_cached(key)
    }

    fn sparse_overlay_get(&self, key: &Key) -> NodelResult<Option<Value>> {
        let bound = self.0.source.borrow().as_ref().unwrap().clone();
        if bound.deleted.borrow().iter().any(|k| k == key) {
            return Ok(Some(Value::nil()));
        }
        if let Some((_, v)) = bound.update_log.borrow().iter().rev().find(|(k, _)| k == key) {
            return Ok(Some(v.clone()));
        }
        if bound.fully_cached.get() {
            return Ok(None);
        }
        if self.has_cached(key) {
            return Ok(None);
        }
        let v = match bound.source.read_key(self, key) {
            Ok(v) => v,
            Err(e) if !bound.source.throw_on_read_error() => Value::error(e.to_string()),
            Err(e) => return Err(e),
        };
        bound.source.stats().read_key_calls.set(bound.source.stats().read_key_calls.get() + 1);
        self.insert_cached(key.clone(), v.clone())?;
        Ok(Some(v))
    }

    fn has_cached(&self, key: &Key) -> bool {
        match &*self.0.data.borrow() {
            NodeData::Omap(map) => map.contains_key(key),
            NodeData::Smap(map) => map.contains_key(key),
            NodeData::List(items) => self.key_to_index(key, items.len()).is_ok(),
            _ => false,
        }
    }

    fn get_cached(&self, key: &Key) -> NodelResult<Value> {
        match &*self.0.data.borrow() {
            NodeData::List(items) => {
                let idx = self.key_to_index(key, items.len())?;
                Ok(items[idx].clone())
            }
            NodeData::Omap(map) => Ok(map.get(key).cloned().unwrap_or_else(Value::nil)),
            NodeData::Smap(map) => Ok(map.get(key).cloned().unwrap_or_else(Value::nil)),
            NodeData::Error(_) => Ok(self.clone()),
            _ => Ok(Self::wrong_kind("get(key)")),
        }
    }

    /// Inserts into the cached image without recording a dirty write
    /// (used for sparse-read cache population, not client mutation).
    fn insert_cached(&self, key: Key, value: Value) -> NodelResult<()> {
        let weak_self = Rc::downgrade(&self.0);
        *value.0.parent.borrow_mut() = weak_self;
        match &mut *self.0.data.borrow_mut() {
            NodeData::Omap(map) => {
                map.insert(key, value);
            }
            NodeData::Smap(map) => {
                map.insert(key, value);
            }
            NodeData::List(items) => {
                let idx = key.to_uint().map_err(|_| NodelError::Type("list index must be an integer".into()))? as usize;
                if idx < items.len() {
                    items[idx] = value;
                } else {
                    items.push(value);
                }
            }
            _ => return Err(NodelError::Type("not a container".into())),
        }
        Ok(())
    }

    pub fn get_path(&self, keys: &[Key]) -> NodelResult<Value> {
        let mut cur = self.clone();
        for k in keys {
            cur = cur.get(k)?;
        }
        Ok(cur)
    }

    /// List/string slice read (§4.1 `get(Slice)`).
    pub fn get_slice(&self, slice: &Slice) -> NodelResult<Value> {
        self.materialize()?;
        match &*self.0.data.borrow() {
            NodeData::List(items) => {
                let idx = slice.resolve(items.len())?;
                Ok(Value::list(idx.into_iter().map(|i| items[i].clone()).collect()))
            }
            NodeData::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = slice.resolve(chars.len())?;
                let out: String = idx.into_iter().map(|i| chars[i]).collect();
                Ok(Value::from(out))
            }
            _ => Err(NodelError::Type("slice access requires a list or string".into())),
        }
    }

    /// Keys in iteration order (insertion order for OMAP, sorted for
    /// SMAP, 0..len for LIST).
    /// On a wrong-kind receiver this yields no keys rather than a hard
    /// `Err`, matching `get`'s ERROR-absorption treatment (§4.1): there is
    /// no `Key` variant to carry an ERROR Value through, so an empty
    /// result is the closest equivalent a `Vec<Key>` can express.
    pub fn keys(&self) -> NodelResult<Vec<Key>> {
        self.materialize()?;
        Ok(match &*self.0.data.borrow() {
            NodeData::List(items) => (0..items.len()).map(|i| Key::Uint(i as u64)).collect(),
            NodeData::Omap(map) => map.keys().cloned().collect(),
            NodeData::Smap(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        })
    }

    pub fn values(&self) -> NodelResult<Vec<Value>> {
        self.materialize()?;
        Ok(match &*self.0.data.borrow() {
            NodeData::List(items) => items.clone(),
            NodeData::Omap(map) => map.values().cloned().collect(),
            NodeData::Smap(map) => map.values().cloned().collect(),
            _ => Vec::new(),
        })
    }

    pub fn items(&self) -> NodelResult<Vec<(Key, Value)>> {
        self.materialize()?;
        Ok(match &*self.0.data.borrow() {
            NodeData::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Key::Uint(i as u64), v.clone()))
                .collect(),
            NodeData::Omap(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            NodeData::Smap(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        })
    }
}
