//! Mutation and parent-link maintenance (§4.3): `set`/`del`, slice
//! splice/delete, and recording writes against an attached DataSource's
//! update log / delete set.

use super::{NodeData, Value};
use crate::error::{NodelError, NodelResult};
use crate::key::Key;
use crate::slice::Slice;
use std::rc::Rc;

impl Value {
    /// Detects whether `candidate` becoming a descendant of `self` would
    /// create a cycle (invariant I-1).
    fn would_cycle(&self, candidate: &Value) -> bool {
        if self.is(candidate) {
            return true;
        }
        let mut cur = self.parent();
        while let Some(p) = cur {
            if p.is(candidate) {
                return true;
            }
            cur = p.parent();
        }
        false
    }

    /// If `value` already belongs to a tree, returns a deep structural
    /// copy (so the single-parent invariant holds); otherwise returns it
    /// unchanged. Refuses (as an `InvariantError`) if installing `value`
    /// under `self` would create a cycle.
    fn prepare_for_insertion(&self, value: &Value) -> NodelResult<Value> {
        if self.would_cycle(value) {
            return Err(NodelError::Invariant("assignment would create a cycle".into()));
        }
        if value.parent().is_some() {
            Ok(value.deep_copy())
        } else {
            Ok(value.clone())
        }
    }

    fn mark_dirty_and_log(&self, key: Key, value: Value) {
        self.0.dirty.set(true);
        if let Some(bound) = &*self.0.source.borrow() {
            bound.deleted.borrow_mut().retain(|k| k != &key);
            bound.update_log.borrow_mut().push((key, value));
        }
    }

    fn mark_deleted(&self, key: Key) {
        self.0.dirty.set(true);
        if let Some(bound) = &*self.0.source.borrow() {
            bound.update_log.borrow_mut().retain(|(k, _)| k != &key);
            bound.deleted.borrow_mut().push(key);
        }
    }

    /// Stores `value` at `key`, clearing the old child's parent link and
    /// installing the new one (§4.3 "On set(key, new)").
    pub fn set(&self, key: Key, value: Value) -> NodelResult<()> {
        self.materialize()?;
        let installed = self.prepare_for_insertion(&value)?;
        let weak_self = Rc::downgrade(&self.0);

        let mut data = self.0.data.borrow_mut();
        match &mut *data {
            NodeData::List(items) => {
                let idx = key.to_uint().map_err(|_| NodelError::Type("list index must be an integer".into()))? as usize;
                if idx > items.len() {
                    return Err(NodelError::Invariant(format!(
                        "list index {} out of range for set (len {})",
                        idx,
                        items.len()
                    )));
                }
                *installed.0.parent.borrow_mut() = weak_self;
                if idx == items.len() {
                    items.push(installed.clone());
                } else {
                    *items[idx].0.parent.borrow_mut() = std::rc::Weak::new();
                    items[idx] = installed.clone();
                }
            }
            NodeData::Omap(map) => {
                if let Some(old) = map.get(&key) {
                    *old.0.parent.borrow_mut() = std::rc::Weak::new();
                }
                *installed.0.parent.borrow_mut() = weak_self;
                map.insert(key.clone(), installed.clone());
            }
            NodeData::Smap(map) => {
                if let Some(old) = map.get(&key) {
                    *old.0.parent.borrow_mut() = std::rc::Weak::new();
                }
                *installed.0.parent.borrow_mut() = weak_self;
                map.insert(key.clone(), installed.clone());
            }
            NodeData::Error(_) => return Ok(()),
            _ => return Err(NodelError::Type("set(key, value) requires a container".into())),
        }
        drop(data);
        self.mark_dirty_and_log(key, installed);
        Ok(())
    }

    /// Removes the entry at `key`, clearing its parent link and recording
    /// a pending delete against any attached DataSource.
    pub fn del(&self, key: &Key) -> NodelResult<()> {
        self.materialize()?;
        let mut data = self.0.data.borrow_mut();
        match &mut *data {
            NodeData::List(items) => {
                let idx = self.key_to_index_pub(key, items.len())?;
                let removed = items.remove(idx);
                *removed.0.parent.borrow_mut() = std::rc::Weak::new();
            }
            NodeData::Omap(map) => {
                if let Some(removed) = map.shift_remove(key) {
                    *removed.0.parent.borrow_mut() = std::rc::Weak::new();
                }
            }
            NodeData::Smap(map) => {
                if let Some(removed) = map.remove(key) {
                    *removed.0.parent.borrow_mut() = std::rc::Weak::new();
                }
            }
            NodeData::Error(_) => return Ok(()),
            _ => return Err(NodelError::Type("del(key) requires a container".into())),
        }
        drop(data);
        self.mark_deleted(key.clone());
        Ok(())
    }

    fn key_to_index_pub(&self, key: &Key, len: usize) -> NodelResult<usize> {
        let i = key.to_int().map_err(|_| NodelError::Type("list index must be an integer".into()))?;
        let idx = if i < 0 { len as i64 + i } else { i };
        if idx < 0 || idx as usize >= len {
            return Err(NodelError::Range(format!("list index {} out of range (len {})", i, len)));
        }
        Ok(idx as usize)
    }

    /// Removes every position `slice` selects (§8 scenario 6). Deletion
    /// has no "replacement length" constraint the way `set_slice` does,
    /// so this does not delegate to it: indices are dropped in
    /// descending order so earlier removals don't shift later ones.
    pub fn del_slice(&self, slice: &Slice) -> NodelResult<()> {
        self.materialize()?;
        let mut data = self.0.data.borrow_mut();
        let items = match &mut *data {
            NodeData::List(items) => items,
            _ => return Err(NodelError::Type("slice delete requires a list".into())),
        };
        let mut idx = slice.resolve(items.len())?;
        idx.sort_unstable();
        idx.dedup();
        for i in idx.into_iter().rev() {
            let removed = items.remove(i);
            *removed.0.parent.borrow_mut() = std::rc::Weak::new();
        }
        drop(data);
        self.0.dirty.set(true);
        if let Some(bound) = &*self.0.source.borrow() {
            bound.whole_image_dirty.set(true);
        }
        Ok(())
    }

    /// Replaces the indexed positions with `replacement`, Python
    /// `list[slice] = iterable` semantics: for step==1 the length may
    /// change; for step != 1 lengths must match (§4.1). Each replacement
    /// value goes through `prepare_for_insertion` just like `set` does,
    /// so a value already parented elsewhere is structurally copied
    /// rather than stolen out from under its current parent (I-2).
    pub fn set_slice(&self, slice: &Slice, replacement: Vec<Value>) -> NodelResult<()> {
        self.materialize()?;
        let step = slice.step.unwrap_or(1);
        let replacement = replacement
            .iter()
            .map(|v| self.prepare_for_insertion(v))
            .collect::<NodelResult<Vec<_>>>()?;
        let mut data = self.0.data.borrow_mut();
        let items = match &mut *data {
            NodeData::List(items) => items,
            _ => return Err(NodelError::Type("slice assignment requires a list".into())),
        };
        let idx = slice.resolve(items.len())?;
        if step != 1 && idx.len() != replacement.len() {
            return Err(NodelError::Invariant(format!(
                "extended slice assignment requires matching lengths: {} indices, {} values",
                idx.len(),
                replacement.len()
            )));
        }
        let weak_self = Rc::downgrade(&self.0);
        if step == 1 {
            let (lo, hi) = if idx.is_empty() {
                let lo = slice.start.map(|s| s.max(0) as usize).unwrap_or(0).min(items.len());
                (lo, lo)
            } else {
                (idx[0], idx[idx.len() - 1] + 1)
            };
            for removed in items.drain(lo..hi) {
                *removed.0.parent.borrow_mut() = std::rc::Weak::new();
            }
            let mut new_items = replacement;
            for v in &new_items {
                *v.0.parent.borrow_mut() = weak_self.clone();
            }
            let tail = items.split_off(lo);
            items.append(&mut new_items);
            items.extend(tail);
        } else {
            for (pos, value) in idx.into_iter().zip(replacement.into_iter()) {
                *items[pos].0.parent.borrow_mut() = std::rc::Weak::new();
                *value.0.parent.borrow_mut() = weak_self.clone();
                items[pos] = value;
            }
        }
        drop(data);
        self.0.dirty.set(true);
        if let Some(bound) = &*self.0.source.borrow() {
            bound.whole_image_dirty.set(true);
        }
        Ok(())
    }

    /// Whole-container replacement: every existing child's parent link is
    /// cleared before the new payload is adopted (§4.3).
    pub fn replace_with(&self, new_data: Value) -> NodelResult<()> {
        for child in self.values().unwrap_or_default() {
            *child.0.parent.borrow_mut() = std::rc::Weak::new();
        }
        let moved = new_data.deep_copy();
        *self.0.data.borrow_mut() = std::mem::replace(&mut *moved.0.data.borrow_mut(), NodeData::Nil);
        self.adopt_children();
        self.0.dirty.set(true);
        if let Some(bound) = &*self.0.source.borrow() {
            bound.whole_image_dirty.set(true);
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    pub fn clear_dirty(&self) {
        self.0.dirty.set(false);
        if let Some(bound) = &*self.0.source.borrow() {
            bound.update_log.borrow_mut().clear();
            bound.deleted.borrow_mut().clear();
            bound.whole_image_dirty.set(false);
        }
    }
}
