//! Multi-axis `Query` evaluation (§3, §4.5). Each `Step` declares an
//! `Axis`, an optional key filter, and an optional predicate; steps
//! compose by feeding each result of step *i* as the origin of step
//! *i+1*.
//!
//! The axis set is grounded on `original_source/nodel/impl/path.h`'s
//! `Axis` enum; its own evaluation engine (`PathIterator`) is not
//! reusable (undefined `AncestorIterator`, missing `break`s in
//! `Step::eval`'s switch — see DESIGN.md decision under "Open
//! Questions"), so evaluation here is a fresh breadth-first work-queue
//! walk.

use crate::key::Key;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Root,
    Ancestor,
    Parent,
    SelfAxis,
    Child,
    Sibling,
    Subtree,
}

pub struct Step {
    pub axis: Axis,
    pub key_filter: Option<Key>,
    pub predicate: Option<Box<dyn Fn(&Value) -> bool>>,
}

impl Step {
    pub fn new(axis: Axis) -> Self {
        Step { axis, key_filter: None, predicate: None }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key_filter = Some(key);
        self
    }

    pub fn with_predicate(mut self, pred: impl Fn(&Value) -> bool + 'static) -> Self {
        self.predicate = Some(Box::new(pred));
        self
    }

    fn matches_key(&self, key: Option<&Key>) -> bool {
        match (&self.key_filter, key) {
            (None, _) => true,
            (Some(want), Some(k)) => want == k,
            (Some(_), None) => false,
        }
    }

    fn matches(&self, key: Option<&Key>, value: &Value) -> bool {
        self.matches_key(key) && self.predicate.as_ref().map(|p| p(value)).unwrap_or(true)
    }

    fn expand(&self, origin: &Value) -> Vec<Value> {
        match self.axis {
            Axis::Root => vec![origin.root()],
            Axis::Ancestor => origin.iter_ancestors(),
            Axis::Parent => origin.parent().into_iter().collect(),
            Axis::SelfAxis => vec![origin.clone()],
            Axis::Child => origin
                .items()
                .unwrap_or_default()
                .into_iter()
                .filter(|(k, v)| self.matches(Some(k), v))
                .map(|(_, v)| v)
                .collect(),
            Axis::Sibling => origin
                .parent()
                .map(|p| {
                    p.items()
                        .unwrap_or_default()
                        .into_iter()
                        .filter(|(_, v)| !v.is(origin))
                        .filter(|(k, v)| self.matches(Some(k), v))
                        .map(|(_, v)| v)
                        .collect()
                })
                .unwrap_or_default(),
            Axis::Subtree => origin
                .iter_tree(|v| self.matches(None, v), |_| true)
                .unwrap_or_default(),
        }
    }
}

/// A sequence of steps evaluated left to right; duplicates are not
/// removed (§4.5: "Results ... Duplicates are not removed").
#[derive(Default)]
pub struct Query(Vec<Step>);

impl Query {
    pub fn new() -> Self {
        Query(Vec::new())
    }

    pub fn step(mut self, step: Step) -> Self {
        self.0.push(step);
        self
    }

    pub fn eval(&self, origin: &Value) -> Vec<Value> {
        let mut frontier = vec![origin.clone()];
        for step in &self.0 {
            // CHILD/SIBLING already apply their own filter/predicate
            // during expansion (they need the candidate's key); other
            // axes apply the filter afterward since the key is not the
            // candidate's own key but irrelevant to axes like ROOT/SELF.
            let next: Vec<Value> = frontier
                .iter()
                .flat_map(|v| step.expand(v))
                .collect();
            frontier = match step.axis {
                Axis::Child | Axis::Sibling | Axis::Subtree => next,
                _ => next.into_iter().filter(|v| step.matches(None, v)).collect(),
            };
        }
        frontier
    }
}
