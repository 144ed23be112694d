//! Thread-local string interning, grounded on
//! `original_source/nodel/support/intern.h`'s thread-local
//! `unordered_set<StringView>`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

thread_local! {
    static INTERNED: RefCell<HashSet<Rc<str>>> = RefCell::new(HashSet::new());
}

/// Returns an `Rc<str>` shared with any prior interning of the same text
/// on this thread. Interned strings are never evicted; callers that need
/// an unbounded stream of unique short-lived strings should not intern
/// them.
pub fn intern(s: &str) -> Rc<str> {
    INTERNED.with(|set| {
        let mut set = set.borrow_mut();
        if let Some(existing) = set.get(s) {
            return existing.clone();
        }
        let rc: Rc<str> = Rc::from(s);
        set.insert(rc.clone());
        rc
    })
}

/// Number of distinct strings interned on the current thread. Exposed for
/// tests and diagnostics only.
pub fn interned_count() -> usize {
    INTERNED.with(|set| set.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_shared_allocation() {
        let a = intern("favorite");
        let b = intern("favorite");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_intern_distinct_strings() {
        let a = intern("assam");
        let b = intern("darjeeling");
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(&*a, "assam");
        assert_eq!(&*b, "darjeeling");
    }
}
