//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions over the context that decide whether a
//! transition candidate is enabled. Candidates are tried in order, so a list
//! of guarded candidates behaves like an if / else-if chain.

use std::fmt;
use std::sync::Arc;

/// Pure predicate that determines if a transition candidate is enabled.
///
/// Guards are evaluated against the current context only. They must be
/// deterministic and free of side effects.
///
/// # Example
///
/// ```rust
/// use waypoint::core::Guard;
///
/// struct Household {
///     members: usize,
/// }
///
/// let has_others = Guard::new(|h: &Household| h.members > 1);
///
/// assert!(has_others.check(&Household { members: 3 }));
/// assert!(!has_others.check(&Household { members: 1 }));
/// ```
pub struct Guard<C> {
    predicate: Arc<dyn Fn(&C) -> bool + Send + Sync>,
}

impl<C> Guard<C> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be pure (deterministic, no side effects) and
    /// thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Check if the guard admits the transition for this context.
    pub fn check(&self, context: &C) -> bool {
        (self.predicate)(context)
    }

    /// Guard that admits exactly when `self` rejects.
    ///
    /// ```rust
    /// use waypoint::core::Guard;
    ///
    /// let positive = Guard::new(|n: &i32| *n > 0);
    /// let not_positive = positive.negate();
    ///
    /// assert!(not_positive.check(&0));
    /// assert!(!not_positive.check(&5));
    /// ```
    pub fn negate(&self) -> Self
    where
        C: 'static,
    {
        let inner = Arc::clone(&self.predicate);
        Guard {
            predicate: Arc::new(move |c: &C| !inner(c)),
        }
    }
}

impl<C> Clone for Guard<C> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<C> fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default)]
    struct TestContext {
        members: usize,
        cursor: usize,
    }

    #[test]
    fn guard_allows_matching_contexts() {
        let guard = Guard::new(|c: &TestContext| c.members > 1);

        assert!(guard.check(&TestContext {
            members: 2,
            cursor: 0
        }));
        assert!(!guard.check(&TestContext {
            members: 1,
            cursor: 0
        }));
    }

    #[test]
    fn guard_is_deterministic() {
        let context = TestContext {
            members: 3,
            cursor: 1,
        };
        let guard = Guard::new(|c: &TestContext| c.cursor < c.members);

        let result1 = guard.check(&context);
        let result2 = guard.check(&context);

        assert_eq!(result1, result2);
    }

    #[test]
    fn negated_guard_is_complement() {
        let guard = Guard::new(|c: &TestContext| c.cursor == 0);
        let negated = guard.negate();

        for cursor in 0..4 {
            let context = TestContext { members: 4, cursor };
            assert_ne!(guard.check(&context), negated.check(&context));
        }
    }

    #[test]
    fn cloned_guard_shares_predicate() {
        let guard = Guard::new(|c: &TestContext| c.members == 0);
        let cloned = guard.clone();

        assert!(cloned.check(&TestContext::default()));
        assert_eq!(
            guard.check(&TestContext::default()),
            cloned.check(&TestContext::default())
        );
    }
}
