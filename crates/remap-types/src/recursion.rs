//! Recursion guards for cycle detection and depth limiting.
//!
//! Generic type graphs may be self-referential (`Enum<E extends Enum<E>>`),
//! and object graphs being mapped may be arbitrarily deep. Both walks go
//! through one of the two guards here:
//!
//! - [`RecursionGuard`] tracks the set of keys currently being visited, so a
//!   revisit is reported as a cycle instead of recursing forever.
//! - [`DepthCounter`] only limits nesting depth, for walks where revisiting
//!   the same key is legitimate.
//!
//! Limits come from [`RecursionProfile`] presets rather than raw numbers at the
//! call site.

use rustc_hash::FxHashSet;
use std::hash::Hash;

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Resolving type variables against a context and their bounds.
    ///
    /// depth = 50, iterations = 100,000
    TypeResolution,

    /// Structural assignability between parameterized types.
    ///
    /// depth = 50, iterations = 100,000
    Assignability,

    /// Walking a supertype hierarchy.
    ///
    /// depth = 64, iterations = 10,000
    SupertypeWalk,

    /// Nested object mapping (one level per nested strategy invocation).
    ///
    /// depth = 1,000
    ObjectGraph,

    /// Custom limits for one-off or test scenarios.
    Custom { max_depth: u32, max_iterations: u32 },
}

impl RecursionProfile {
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::TypeResolution => 50,
            Self::Assignability => 50,
            Self::SupertypeWalk => 64,
            Self::ObjectGraph => 1_000,
            Self::Custom { max_depth, .. } => max_depth,
        }
    }

    pub const fn max_iterations(self) -> u32 {
        match self {
            Self::TypeResolution => 100_000,
            Self::Assignability => 100_000,
            Self::SupertypeWalk => 10_000,
            Self::ObjectGraph => u32::MAX,
            Self::Custom { max_iterations, .. } => max_iterations,
        }
    }
}

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    Entered,
    /// The key is already being visited.
    Cycle,
    DepthExceeded,
    IterationExceeded,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered)
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        matches!(self, Self::Cycle)
    }

    #[inline]
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::IterationExceeded)
    }
}

/// Tracks the keys currently being visited plus depth and iteration budgets.
///
/// Every successful [`enter`](Self::enter) must be paired with one
/// [`leave`](Self::leave). In debug builds a guard dropped with keys still in
/// its visiting set panics.
pub struct RecursionGuard<K: Hash + Eq + Clone> {
    visiting: FxHashSet<K>,
    depth: u32,
    iterations: u32,
    max_depth: u32,
    max_iterations: u32,
    exceeded: bool,
}

impl<K: Hash + Eq + Clone> RecursionGuard<K> {
    pub fn new(max_depth: u32, max_iterations: u32) -> Self {
        Self {
            visiting: FxHashSet::default(),
            depth: 0,
            iterations: 0,
            max_depth,
            max_iterations,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth(), profile.max_iterations())
    }

    /// Try to enter the computation for `key`.
    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.iterations = self.iterations.saturating_add(1);

        if self.iterations > self.max_iterations {
            self.exceeded = true;
            return RecursionResult::IterationExceeded;
        }
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }
        if self.visiting.contains(&key) {
            return RecursionResult::Cycle;
        }

        self.visiting.insert(key);
        self.depth += 1;
        RecursionResult::Entered
    }

    /// Leave the computation for `key`.
    pub fn leave(&mut self, key: &K) {
        let was_present = self.visiting.remove(key);
        debug_assert!(
            was_present,
            "RecursionGuard::leave() called with a key that is not being visited"
        );
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` between `enter(key)` and `leave(key)`.
    ///
    /// Returns `Err(reason)` without running `f` when entry is denied.
    pub fn scope<T>(
        &mut self,
        key: K,
        f: impl FnOnce(&mut Self) -> T,
    ) -> Result<T, RecursionResult> {
        match self.enter(key.clone()) {
            RecursionResult::Entered => {
                let result = f(self);
                self.leave(&key);
                Ok(result)
            }
            denied => Err(denied),
        }
    }

    #[inline]
    pub fn is_visiting(&self, key: &K) -> bool {
        self.visiting.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Sticky: stays set once any limit was hit.
    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq + Clone> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.visiting.is_empty() {
            panic!(
                "RecursionGuard dropped with {} active entries; enter() without leave()",
                self.visiting.len(),
            );
        }
    }
}

/// Depth-only guard.
pub struct DepthCounter {
    depth: u32,
    max_depth: u32,
    exceeded: bool,
}

impl DepthCounter {
    pub fn new(max_depth: u32) -> Self {
        Self {
            depth: 0,
            max_depth,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth())
    }

    /// Returns `false` (and does not increment) once the limit is reached;
    /// do not call `leave()` in that case.
    #[inline]
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return false;
        }
        self.depth += 1;
        true
    }

    #[inline]
    pub fn leave(&mut self) {
        debug_assert!(self.depth > 0, "DepthCounter::leave() called at depth 0");
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_limits() {
        assert_eq!(RecursionProfile::TypeResolution.max_depth(), 50);
        assert_eq!(RecursionProfile::SupertypeWalk.max_iterations(), 10_000);
        let custom = RecursionProfile::Custom {
            max_depth: 3,
            max_iterations: 7,
        };
        assert_eq!(custom.max_depth(), 3);
        assert_eq!(custom.max_iterations(), 7);
    }

    #[test]
    fn guard_detects_cycle() {
        let mut guard = RecursionGuard::<u32>::with_profile(RecursionProfile::TypeResolution);
        assert!(guard.enter(1).is_entered());
        assert!(guard.enter(2).is_entered());
        assert!(guard.enter(1).is_cycle());
        assert_eq!(guard.depth(), 2);
        guard.leave(&2);
        guard.leave(&1);
        assert_eq!(guard.depth(), 0);
        assert!(!guard.is_exceeded());
    }

    #[test]
    fn guard_depth_limit_is_sticky() {
        let mut guard = RecursionGuard::<u32>::new(1, 100);
        assert!(guard.enter(1).is_entered());
        assert_eq!(guard.enter(2), RecursionResult::DepthExceeded);
        guard.leave(&1);
        assert!(guard.is_exceeded());
        assert!(guard.enter(3).is_entered());
        guard.leave(&3);
    }

    #[test]
    fn guard_iteration_limit() {
        let mut guard = RecursionGuard::<u32>::new(10, 2);
        assert!(guard.enter(1).is_entered());
        guard.leave(&1);
        assert!(guard.enter(1).is_entered());
        guard.leave(&1);
        assert_eq!(guard.enter(1), RecursionResult::IterationExceeded);
    }

    #[test]
    fn scope_runs_and_leaves() {
        let mut guard = RecursionGuard::<&str>::new(10, 100);
        let nested = guard.scope("a", |g| g.scope("a", |_| 1));
        assert_eq!(nested, Ok(Err(RecursionResult::Cycle)));
        assert!(!guard.is_visiting(&"a"));
    }

    #[test]
    fn depth_counter_limits() {
        let mut counter = DepthCounter::new(2);
        assert!(counter.enter());
        assert!(counter.enter());
        assert!(!counter.enter());
        assert!(counter.is_exceeded());
        counter.leave();
        counter.leave();
        assert_eq!(counter.depth(), 0);
    }
}
