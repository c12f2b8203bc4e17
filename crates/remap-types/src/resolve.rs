//! Generic type resolution.
//!
//! Turns declaration-site `TypeRef`s into interned `TypeId`s, recovering actual
//! type arguments from a surrounding context type. Given a property declared
//! as `List<T>` on `Holder<T>` and the context `Holder<Employee>`, the property
//! resolves to `List<Employee>`.
//!
//! Binding rules for a type variable:
//! 1. The binding supplied by the context (looked up through the context's
//!    supertypes when the variable belongs to an ancestor) is preferred.
//! 2. Without a binding, the declaration-site bound is used.
//! 3. When both exist, the more specific one wins; incomparable candidates
//!    are a configuration error.
//!
//! Bounds may be self-referential (`E extends Enum<E>`). A `RecursionGuard`
//! keyed by `(raw, parameter index)` detects the cycle and substitutes the
//! erasure of the bound.

use crate::error::TypeError;
use crate::format::TypeFormatter;
use crate::intern::TypeInterner;
use crate::recursion::{DepthCounter, RecursionGuard, RecursionProfile, RecursionResult};
use crate::relations::AssignabilityChecker;
use crate::types::{PropertyDecl, RawTypeId, TypeId, TypeRef};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

pub struct TypeResolver<'a> {
    interner: &'a TypeInterner,
    guard: RecursionGuard<(RawTypeId, usize)>,
    walk: DepthCounter,
}

impl<'a> TypeResolver<'a> {
    pub fn new(interner: &'a TypeInterner) -> Self {
        Self {
            interner,
            guard: RecursionGuard::with_profile(RecursionProfile::TypeResolution),
            walk: DepthCounter::with_profile(RecursionProfile::SupertypeWalk),
        }
    }

    /// Resolve `raw` with every type parameter bound as specifically as the
    /// context allows.
    pub fn resolve(
        &mut self,
        raw: RawTypeId,
        context: Option<TypeId>,
    ) -> Result<TypeId, TypeError> {
        let def = self.interner.raw_def(raw)?;
        if def.type_params.is_empty() {
            return Ok(self.interner.raw_type(raw));
        }
        let mut args = Vec::with_capacity(def.type_params.len());
        for index in 0..def.type_params.len() {
            args.push(self.bind_var(raw, index, context)?);
        }
        let resolved = self.interner.intern(raw, &args)?;
        trace!(raw = raw.0, ?context, resolved = resolved.0, "TypeResolver::resolve");
        Ok(resolved)
    }

    /// Resolve a declaration-site type expression written inside `declaring`.
    pub fn resolve_ref(
        &mut self,
        tref: &TypeRef,
        declaring: RawTypeId,
        context: Option<TypeId>,
    ) -> Result<TypeId, TypeError> {
        match tref {
            TypeRef::Concrete(id) => Ok(*id),
            TypeRef::Var(name) => {
                let def = self.interner.raw_def(declaring)?;
                let index = def
                    .param_index(name)
                    .ok_or_else(|| TypeError::UnknownTypeVariable {
                        owner: def.name.to_string(),
                        var: name.to_string(),
                    })?;
                self.bind_var(declaring, index, context)
            }
            TypeRef::Generic(raw, args) if args.is_empty() => self.interner.intern(*raw, &[]),
            TypeRef::Generic(raw, args) => {
                let mut resolved = Vec::with_capacity(args.len());
                for arg in args {
                    resolved.push(self.resolve_ref(arg, declaring, context)?);
                }
                self.interner.intern(*raw, &resolved)
            }
            TypeRef::Array(component) => {
                let component = self.resolve_ref(component, declaring, context)?;
                Ok(self.interner.array_of(component))
            }
            TypeRef::Wildcard(None) => Ok(TypeId::OBJECT),
            TypeRef::Wildcard(Some(bound)) => self.resolve_ref(bound, declaring, context),
        }
    }

    fn bind_var(
        &mut self,
        declaring: RawTypeId,
        index: usize,
        context: Option<TypeId>,
    ) -> Result<TypeId, TypeError> {
        let binding = match context {
            Some(ctx) => self
                .as_supertype(ctx, declaring)?
                .and_then(|view| self.interner.lookup(view))
                .and_then(|data| data.arg(index))
                .filter(|arg| *arg != TypeId::OBJECT),
            None => None,
        };
        let bound = self.bound_of(declaring, index)?;
        self.pick(declaring, index, binding, bound)
    }

    fn bound_of(&mut self, declaring: RawTypeId, index: usize) -> Result<TypeId, TypeError> {
        let def = self.interner.raw_def(declaring)?;
        let Some(param) = def.type_params.get(index) else {
            return Ok(TypeId::OBJECT);
        };
        let key = (declaring, index);
        match self.guard.enter(key) {
            RecursionResult::Entered => {
                let resolved = self.resolve_ref(&param.bound, declaring, None);
                self.guard.leave(&key);
                resolved
            }
            RecursionResult::Cycle => self.erasure(&param.bound),
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                Err(TypeError::DepthExceeded(def.name.to_string()))
            }
        }
    }

    fn pick(
        &self,
        declaring: RawTypeId,
        index: usize,
        binding: Option<TypeId>,
        bound: TypeId,
    ) -> Result<TypeId, TypeError> {
        let Some(binding) = binding else {
            return Ok(bound);
        };
        if bound == TypeId::OBJECT || binding == bound {
            return Ok(binding);
        }
        let mut checker = AssignabilityChecker::new(self.interner);
        if checker.is_assignable_from(bound, binding) {
            return Ok(binding);
        }
        if checker.is_assignable_from(binding, bound) {
            return Ok(bound);
        }
        let def = self.interner.raw_def(declaring)?;
        let formatter = TypeFormatter::new(self.interner);
        Err(TypeError::IncomparableBindings {
            owner: def.name.to_string(),
            var: def
                .type_params
                .get(index)
                .map(|p| p.name.to_string())
                .unwrap_or_default(),
            first: formatter.format(binding),
            second: formatter.format(bound),
        })
    }

    /// The non-recursive placeholder for a bound: its raw type, unparameterized.
    fn erasure(&self, tref: &TypeRef) -> Result<TypeId, TypeError> {
        match tref {
            TypeRef::Concrete(id) => Ok(self
                .interner
                .raw_of(*id)
                .map(|raw| self.interner.raw_type(raw))
                .unwrap_or(TypeId::OBJECT)),
            TypeRef::Generic(raw, _) => self.interner.intern(*raw, &[]),
            TypeRef::Array(component) => {
                let component = self.erasure(component)?;
                Ok(self.interner.array_of(component))
            }
            TypeRef::Var(_) | TypeRef::Wildcard(_) => Ok(TypeId::OBJECT),
        }
    }

    // -------------------------------------------------------------------------
    // Supertypes
    // -------------------------------------------------------------------------

    /// Direct supertypes of `ty`, resolved against `ty`'s own arguments.
    pub fn direct_supertypes(&mut self, ty: TypeId) -> Result<Vec<TypeId>, TypeError> {
        let data = self.interner.data(ty)?;
        let def = self.interner.raw_def(data.raw)?;
        let mut out = Vec::with_capacity(def.supertypes.len());
        for sup in &def.supertypes {
            out.push(self.resolve_ref(sup, data.raw, Some(ty))?);
        }
        Ok(out)
    }

    /// View `ty` as an instance of `raw`, e.g. `ArrayList<String>` as
    /// `List<String>`. `None` when `raw` is not among its supertypes.
    pub fn as_supertype(
        &mut self,
        ty: TypeId,
        raw: RawTypeId,
    ) -> Result<Option<TypeId>, TypeError> {
        let data = self.interner.data(ty)?;
        if data.raw == raw {
            return Ok(Some(ty));
        }
        if raw == RawTypeId::OBJECT {
            return Ok(Some(TypeId::OBJECT));
        }
        if !self.walk.enter() {
            return Err(TypeError::DepthExceeded(
                TypeFormatter::new(self.interner).format(ty),
            ));
        }
        let found = self.find_supertype(ty, raw);
        self.walk.leave();
        found
    }

    fn find_supertype(&mut self, ty: TypeId, raw: RawTypeId) -> Result<Option<TypeId>, TypeError> {
        for sup in self.direct_supertypes(ty)? {
            if let Some(found) = self.as_supertype(sup, raw)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// All supertypes of `ty`, nearest first, ending with `Object`.
    pub fn supertypes(&mut self, ty: TypeId) -> Result<Vec<TypeId>, TypeError> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut queue: VecDeque<TypeId> = self.direct_supertypes(ty)?.into();
        while let Some(next) = queue.pop_front() {
            if next == TypeId::OBJECT || !seen.insert(next) {
                continue;
            }
            out.push(next);
            if out.len() as u32 > RecursionProfile::SupertypeWalk.max_iterations() {
                return Err(TypeError::DepthExceeded(
                    TypeFormatter::new(self.interner).format(ty),
                ));
            }
            queue.extend(self.direct_supertypes(next)?);
        }
        if ty != TypeId::OBJECT {
            out.push(TypeId::OBJECT);
        }
        Ok(out)
    }

    /// Every property visible on `ty`, own declarations first, each with its
    /// declaring raw type. Redeclared names shadow inherited ones.
    pub fn declared_properties(
        &mut self,
        ty: TypeId,
    ) -> Result<Vec<(RawTypeId, PropertyDecl)>, TypeError> {
        let data = self.interner.data(ty)?;
        let mut seen: FxHashSet<Arc<str>> = FxHashSet::default();
        let mut out = Vec::new();
        let mut owners = vec![data.raw];
        for sup in self.supertypes(ty)? {
            if let Some(raw) = self.interner.raw_of(sup) {
                owners.push(raw);
            }
        }
        for owner in owners {
            let def = self.interner.raw_def(owner)?;
            for decl in &def.properties {
                if seen.insert(decl.name.clone()) {
                    out.push((owner, decl.clone()));
                }
            }
        }
        Ok(out)
    }
}

// =============================================================================
// Convenience entry points
// =============================================================================

impl TypeInterner {
    /// Resolve `raw` against an optional generic context.
    pub fn resolve(&self, raw: RawTypeId, context: Option<TypeId>) -> Result<TypeId, TypeError> {
        TypeResolver::new(self).resolve(raw, context)
    }

    pub fn resolve_ref(
        &self,
        tref: &TypeRef,
        declaring: RawTypeId,
        context: Option<TypeId>,
    ) -> Result<TypeId, TypeError> {
        TypeResolver::new(self).resolve_ref(tref, declaring, context)
    }

    pub fn as_supertype(&self, ty: TypeId, raw: RawTypeId) -> Result<Option<TypeId>, TypeError> {
        TypeResolver::new(self).as_supertype(ty, raw)
    }

    pub fn supertypes(&self, ty: TypeId) -> Result<Vec<TypeId>, TypeError> {
        TypeResolver::new(self).supertypes(ty)
    }

    /// Element type of an array or collection, entry type of a map.
    pub fn element_type(&self, ty: TypeId) -> Option<TypeId> {
        let data = self.lookup(ty)?;
        if self.is_array(ty) {
            return Some(data.arg(0).unwrap_or(TypeId::OBJECT));
        }
        if self.is_collection(ty) {
            let view = self.as_supertype(ty, RawTypeId::COLLECTION).ok().flatten();
            return Some(
                view.and_then(|v| self.lookup(v))
                    .and_then(|v| v.arg(0))
                    .unwrap_or(TypeId::OBJECT),
            );
        }
        if self.is_map(ty) {
            let (key, value) = self.map_key_value(ty);
            return Some(self.entry_of(key, value));
        }
        None
    }

    /// Key and value types of a map or entry type (`Object` when unknown).
    pub fn map_key_value(&self, ty: TypeId) -> (TypeId, TypeId) {
        let raw = if self.is_entry(ty) {
            RawTypeId::ENTRY
        } else {
            RawTypeId::MAP
        };
        self.as_supertype(ty, raw)
            .ok()
            .flatten()
            .and_then(|view| self.lookup(view))
            .map(|view| {
                (
                    view.arg(0).unwrap_or(TypeId::OBJECT),
                    view.arg(1).unwrap_or(TypeId::OBJECT),
                )
            })
            .unwrap_or((TypeId::OBJECT, TypeId::OBJECT))
    }
}

#[cfg(test)]
#[path = "../tests/resolve_tests.rs"]
mod tests;
