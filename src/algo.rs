//! Tree-walk algorithms and list diffing.
//!
//! Grounded on `original_source/nodel/impl/Object.h`'s `WalkDF`
//! (stack-based depth-first, `FIRST_VALUE`/`NEXT_VALUE`/`BEGIN_PARENT`/
//! `END_PARENT` event flags) and `WalkBF` (deque-based breadth-first),
//! and on `nodel/core/LCS.h`'s longest-common-subsequence diff — the
//! latter supplemented per SPEC_FULL §10.5 to let `save` minimize the
//! update log it writes for list-valued DSRC children.

use crate::value::Value;

/// Depth-first walk event, mirroring `WalkDF`'s four-state flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent {
    FirstValue,
    NextValue,
    BeginParent,
    EndParent,
}

/// Depth-first traversal, visiting a node, then (if it is a container)
/// its children in order, emitting `BeginParent`/`EndParent` bracketing
/// events around the children of each container.
pub fn walk_df(root: &Value, mut visit: impl FnMut(WalkEvent, &Value)) {
    fn go(node: &Value, first: bool, visit: &mut dyn FnMut(WalkEvent, &Value)) {
        visit(if first { WalkEvent::FirstValue } else { WalkEvent::NextValue }, node);
        if node.is_container() {
            visit(WalkEvent::BeginParent, node);
            for (i, child) in node.values().unwrap_or_default().into_iter().enumerate() {
                go(&child, i == 0, visit);
            }
            visit(WalkEvent::EndParent, node);
        }
    }
    go(root, true, &mut visit);
}

/// Breadth-first traversal, visiting `root` then each successive
/// generation of children in container order.
pub fn walk_bf(root: &Value, mut visit: impl FnMut(&Value)) {
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(root.clone());
    while let Some(node) = queue.pop_front() {
        visit(&node);
        if node.is_container() {
            for child in node.values().unwrap_or_default() {
                queue.push_back(child);
            }
        }
    }
}

/// An edit in an LCS-based diff between two lists: keep, insert at the
/// new list's index, or remove at the old list's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Keep { old_index: usize, new_index: usize },
    Insert { new_index: usize },
    Remove { old_index: usize },
}

/// Longest-common-subsequence diff between two value lists (by
/// `deep_eq`), used to minimize the update log `save` writes for a
/// list-valued DSRC child when elements merely move rather than change.
pub fn lcs_diff(old: &[Value], new: &[Value]) -> Vec<Edit> {
    let n = old.len();
    let m = new.len();
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if old[i].deep_eq(&new[j]) {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }
    let mut edits = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i].deep_eq(&new[j]) {
            edits.push(Edit::Keep { old_index: i, new_index: j });
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            edits.push(Edit::Remove { old_index: i });
            i += 1;
        } else {
            edits.push(Edit::Insert { new_index: j });
            j += 1;
        }
    }
    while i < n {
        edits.push(Edit::Remove { old_index: i });
        i += 1;
    }
    while j < m {
        edits.push(Edit::Insert { new_index: j });
        j += 1;
    }
    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_bf_visits_root_first() {
        let leaf = Value::from(1i64);
        let root = Value::list(vec![leaf.clone()]);
        let mut order = Vec::new();
        walk_bf(&root, |v| order.push(v.clone()));
        assert_eq!(order.len(), 2);
        assert!(order[0].is(&root));
    }

    #[test]
    fn test_walk_df_brackets_container_children() {
        let leaf = Value::from(1i64);
        let root = Value::list(vec![leaf.clone()]);
        let mut events = Vec::new();
        walk_df(&root, |ev, _| events.push(ev));
        assert_eq!(
            events,
            vec![WalkEvent::FirstValue, WalkEvent::BeginParent, WalkEvent::FirstValue, WalkEvent::EndParent]
        );
    }

    #[test]
    fn test_lcs_diff_identical_lists_all_keep() {
        let a = vec![Value::from(1i64), Value::from(2i64)];
        let b = a.clone();
        let edits = lcs_diff(&a, &b);
        assert!(edits.iter().all(|e| matches!(e, Edit::Keep { .. })));
    }

    #[test]
    fn test_lcs_diff_detects_insertion() {
        let a = vec![Value::from(1i64), Value::from(3i64)];
        let b = vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)];
        let edits = lcs_diff(&a, &b);
        assert!(edits.iter().any(|e| matches!(e, Edit::Insert { new_index: 1 })));
    }

    #[test]
    fn test_lcs_diff_detects_removal() {
        let a = vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)];
        let b = vec![Value::from(1i64), Value::from(3i64)];
        let edits = lcs_diff(&a, &b);
        assert!(edits.iter().any(|e| matches!(e, Edit::Remove { old_index: 1 })));
    }
}
