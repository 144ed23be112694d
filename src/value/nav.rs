//! Structural navigation: `parent`/`root`/`key`/`path`, and the
//! ancestor/sibling/subtree iterators (§4.1, §9 "Iterator
//! restartability" — every iterator here is single-pass and finite).

use super::{NodeData, Value};
use crate::error::NodelResult;
use crate::key::Key;
use crate::path::Path;

impl Value {
    pub fn parent(&self) -> Option<Value> {
        self.0.parent.borrow().upgrade().map(Value)
    }

    pub fn root(&self) -> Value {
        let mut cur = self.clone();
        while let Some(p) = cur.parent() {
            cur = p;
        }
        cur
    }

    /// The key under which this value is held by its parent, found by
    /// searching the parent's entries by identity (§4.1 `key()`).
    pub fn key(&self) -> Option<Key> {
        let parent = self.parent()?;
        match &*parent.0.data.borrow() {
            NodeData::List(items) => items.iter().position(|v| v.is(self)).map(|i| Key::Uint(i as u64)),
            NodeData::Omap(map) => map.iter().find(|(_, v)| v.is(self)).map(|(k, _)| k.clone()),
            NodeData::Smap(map) => map.iter().find(|(_, v)| v.is(self)).map(|(k, _)| k.clone()),
            _ => None,
        }
    }

    pub fn path(&self) -> Path {
        let mut steps = Vec::new();
        let mut cur = self.clone();
        while let Some(k) = cur.key() {
            steps.push(k);
            cur = cur.parent().expect("key() implies a parent");
        }
        steps.reverse();
        Path::new(steps)
    }

    /// Self and ancestors, nearest first (used as the ANCESTOR axis in
    /// query evaluation, §4.5).
    pub fn iter_ancestors(&self) -> Vec<Value> {
        let mut out = vec![self.clone()];
        let mut cur = self.clone();
        while let Some(p) = cur.parent() {
            out.push(p.clone());
            cur = p;
        }
        out
    }

    /// Other children of this value's parent, in container order.
    pub fn iter_siblings(&self) -> Vec<Value> {
        match self.parent() {
            Some(p) => p.values().unwrap_or_default().into_iter().filter(|v| !v.is(self)).collect(),
            None => Vec::new(),
        }
    }

    /// Breadth-first traversal from `self`; `filter` selects which nodes
    /// are yielded, `descend` prunes which nodes are expanded into
    /// (distinct controls, per §9's note not to conflate them).
    pub fn iter_tree(
        &self,
        filter: impl Fn(&Value) -> bool,
        descend: impl Fn(&Value) -> bool,
    ) -> NodelResult<Vec<Value>> {
        let mut out = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(self.clone());
        while let Some(node) = queue.pop_front() {
            if filter(&node) {
                out.push(node.clone());
            }
            if descend(&node) && node.is_container() {
                for child in node.values()? {
                    queue.push_back(child);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;

    #[test]
    fn test_parent_and_root() {
        let leaf = Value::from(1i64);
        let mid = Value::list(vec![leaf.clone()]);
        let top = Value::list(vec![mid.clone()]);
        assert!(leaf.parent().unwrap().is(&mid));
        assert!(leaf.root().is(&top));
    }

    #[test]
    fn test_key_lookup_by_identity() {
        let leaf = Value::from(1i64);
        let mut map = indexmap::IndexMap::new();
        map.insert(Key::str("favorite"), leaf.clone());
        let parent = Value::omap(map);
        assert_eq!(leaf.key(), Some(Key::str("favorite")));
        let _ = parent; // keep alive
    }

    #[test]
    fn test_path_concatenation() {
        let leaf = Value::from(7i64);
        let inner = Value::list(vec![leaf.clone()]);
        let mut map = indexmap::IndexMap::new();
        map.insert(Key::str("x"), inner);
        let top = Value::omap(map);
        let path = leaf.path();
        assert_eq!(path.to_literal(), "x[0]");
        let _ = top;
    }

    #[test]
    fn test_iter_siblings_excludes_self() {
        let a = Value::from(1i64);
        let b = Value::from(2i64);
        let list = Value::list(vec![a.clone(), b.clone()]);
        let sibs = a.iter_siblings();
        assert_eq!(sibs.len(), 1);
        assert!(sibs[0].is(&b));
        let _ = list;
    }

    #[test]
    fn test_iter_tree_breadth_first() {
        let leaf1 = Value::from(1i64);
        let leaf2 = Value::from(2i64);
        let inner = Value::list(vec![leaf1.clone()]);
        let top = Value::list(vec![inner.clone(), leaf2.clone()]);
        let visited = top.iter_tree(|_| true, |_| true).unwrap();
        assert_eq!(visited.len(), 4);
        assert!(visited[0].is(&top));
    }
}
