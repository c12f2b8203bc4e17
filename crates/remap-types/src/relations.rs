//! Assignability between types.
//!
//! `is_assignable_from(target, source)` answers "can a value of `source` be
//! stored where `target` is expected":
//!
//! - `Object` accepts every non-primitive type.
//! - A primitive only accepts itself.
//! - Arrays are covariant over non-primitive components.
//! - Otherwise `source` is viewed as `target`'s raw type through its
//!   supertypes. If either side is unparameterized the raw match is enough;
//!   if both are parameterized every argument pair must be assignable.
//!
//! Recursive pairs are answered coinductively (assumed assignable while being
//! checked).

use crate::intern::TypeInterner;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::resolve::TypeResolver;
use crate::types::{TypeFlags, TypeId};

pub struct AssignabilityChecker<'a> {
    interner: &'a TypeInterner,
    guard: RecursionGuard<(TypeId, TypeId)>,
}

impl<'a> AssignabilityChecker<'a> {
    pub fn new(interner: &'a TypeInterner) -> Self {
        Self {
            interner,
            guard: RecursionGuard::with_profile(RecursionProfile::Assignability),
        }
    }

    pub fn is_assignable_from(&mut self, target: TypeId, source: TypeId) -> bool {
        if target == source {
            return true;
        }
        let (Some(t), Some(s)) = (self.interner.lookup(target), self.interner.lookup(source))
        else {
            return false;
        };
        if t.flags.contains(TypeFlags::PRIMITIVE) || s.flags.contains(TypeFlags::PRIMITIVE) {
            return false;
        }
        if target == TypeId::OBJECT {
            return true;
        }
        if t.flags.contains(TypeFlags::ARRAY) {
            if !s.flags.contains(TypeFlags::ARRAY) {
                return false;
            }
            let tc = t.arg(0).unwrap_or(TypeId::OBJECT);
            let sc = s.arg(0).unwrap_or(TypeId::OBJECT);
            if self.interner.is_primitive(tc) || self.interner.is_primitive(sc) {
                return tc == sc;
            }
            return self.is_assignable_from(tc, sc);
        }
        if s.flags.contains(TypeFlags::ARRAY) {
            return false;
        }

        let key = (target, source);
        match self.guard.enter(key) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return true,
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => return false,
        }
        let result = self.check_structural(target, source);
        self.guard.leave(&key);
        result
    }

    fn check_structural(&mut self, target: TypeId, source: TypeId) -> bool {
        let Some(t) = self.interner.lookup(target) else {
            return false;
        };
        let view = match TypeResolver::new(self.interner).as_supertype(source, t.raw) {
            Ok(Some(view)) => view,
            Ok(None) | Err(_) => return false,
        };
        let Some(v) = self.interner.lookup(view) else {
            return false;
        };
        if !t.is_parameterized() || !v.is_parameterized() {
            return true;
        }
        t.args
            .iter()
            .zip(v.args.iter())
            .all(|(ta, va)| self.is_assignable_from(*ta, *va))
    }
}

impl TypeInterner {
    /// Whether a `source` value can be stored where `target` is expected.
    pub fn is_assignable_from(&self, target: TypeId, source: TypeId) -> bool {
        AssignabilityChecker::new(self).is_assignable_from(target, source)
    }

    /// Of the candidates, the one every other candidate is assignable to.
    ///
    /// Returns `None` when there is no candidate or no single answer.
    pub fn most_general(&self, candidates: &[TypeId]) -> Option<TypeId> {
        let mut found = candidates.iter().copied().filter(|c| {
            candidates
                .iter()
                .all(|other| self.is_assignable_from(*c, *other))
        });
        let first = found.next()?;
        found.all(|other| other == first).then_some(first)
    }

    /// Of the candidates, the one assignable to every other candidate.
    pub fn most_specific(&self, candidates: &[TypeId]) -> Option<TypeId> {
        let mut found = candidates.iter().copied().filter(|c| {
            candidates
                .iter()
                .all(|other| self.is_assignable_from(*other, *c))
        });
        let first = found.next()?;
        found.all(|other| other == first).then_some(first)
    }
}

#[cfg(test)]
#[path = "../tests/relations_tests.rs"]
mod tests;
