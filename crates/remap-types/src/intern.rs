//! Type interning.
//!
//! `TypeInterner` owns every raw type declaration and every interned
//! `(raw, arguments)` combination. Requesting the same combination twice
//! returns the same `TypeId`, so type equality is an integer comparison.
//!
//! The tables are append-only arenas behind `RwLock`s, indexed through
//! `DashMap`s. Interning computes the new entry and inserts it through the
//! map's entry API, so two threads racing on the same key agree on a single
//! winner.

use crate::error::TypeError;
use crate::types::{
    CollectionKind, PrimitiveKind, PropertyDecl, RawKind, RawTypeDef, RawTypeId, TypeData,
    TypeFlags, TypeId, TypeKey, TypeRef,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use smallvec::SmallVec;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

#[derive(Clone, Debug)]
struct RawEntry {
    def: Arc<RawTypeDef>,
    flags: TypeFlags,
}

/// Arena of raw type declarations and interned types.
pub struct TypeInterner {
    raws: RwLock<Vec<RawEntry>>,
    raw_names: DashMap<Arc<str>, RawTypeId>,
    types: RwLock<Vec<Arc<TypeData>>>,
    type_index: DashMap<TypeKey, TypeId>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInterner {
    /// Create an interner with every built-in raw type declared.
    pub fn new() -> Self {
        let interner = Self {
            raws: RwLock::new(Vec::with_capacity(64)),
            raw_names: DashMap::new(),
            types: RwLock::new(Vec::with_capacity(256)),
            type_index: DashMap::new(),
        };
        interner.declare_builtins();
        interner
    }

    fn declare_builtins(&self) {
        let object = RawTypeDef::builtin("Object", RawKind::Any);
        self.push_raw(object);

        for kind in PrimitiveKind::ALL {
            self.push_raw(RawTypeDef::builtin(
                kind.primitive_name(),
                RawKind::Primitive(kind),
            ));
        }
        for kind in PrimitiveKind::ALL {
            let mut def = RawTypeDef::builtin(kind.wrapper_name(), RawKind::Wrapper(kind));
            if kind.is_numeric() {
                def = def.extends(TypeRef::raw(RawTypeId::NUMBER));
            }
            self.push_raw(def);
        }
        self.push_raw(RawTypeDef::builtin("Number", RawKind::Number));
        self.push_raw(RawTypeDef::builtin("String", RawKind::String));
        self.push_raw(
            RawTypeDef::builtin("BigInteger", RawKind::BigInteger)
                .extends(TypeRef::raw(RawTypeId::NUMBER)),
        );

        let enum_bound = TypeRef::generic(RawTypeId::ENUM, vec![TypeRef::var("E")]);
        self.push_raw(RawTypeDef::builtin("Enum", RawKind::Enum).bounded_param("E", enum_bound));

        self.push_raw(
            RawTypeDef::builtin("Collection", RawKind::Collection(CollectionKind::Any)).param("E"),
        );
        let collection_of_e = TypeRef::generic(RawTypeId::COLLECTION, vec![TypeRef::var("E")]);
        self.push_raw(
            RawTypeDef::builtin("List", RawKind::Collection(CollectionKind::List))
                .param("E")
                .extends(collection_of_e.clone()),
        );
        self.push_raw(
            RawTypeDef::builtin("Set", RawKind::Collection(CollectionKind::Set))
                .param("E")
                .extends(collection_of_e),
        );
        self.push_raw(
            RawTypeDef::builtin("Map", RawKind::Map)
                .param("K")
                .param("V"),
        );
        self.push_raw(
            RawTypeDef::builtin("Entry", RawKind::Entry)
                .param("K")
                .param("V")
                .property(PropertyDecl::new("key", TypeRef::var("K")))
                .property(PropertyDecl::new("value", TypeRef::var("V"))),
        );
        self.push_raw(RawTypeDef::builtin("Array", RawKind::Array).param("T"));

        debug_assert_eq!(read(&self.raws).len() as u32, RawTypeId::FIRST_USER);
        debug_assert_eq!(read(&self.types).len() as u32, RawTypeId::FIRST_USER);
    }

    /// Append a raw declaration and intern its unparameterized form.
    fn push_raw(&self, def: RawTypeDef) -> RawTypeId {
        let flags = self.raw_flags_for(&def);
        let id = {
            let mut raws = write(&self.raws);
            let id = RawTypeId(raws.len() as u32);
            let mut def = def;
            if def.kind == RawKind::Enum && !id.is_builtin() && def.supertypes.is_empty() {
                def.supertypes.push(TypeRef::generic(
                    RawTypeId::ENUM,
                    vec![TypeRef::raw(id)],
                ));
            }
            self.raw_names.insert(def.name.clone(), id);
            raws.push(RawEntry {
                def: Arc::new(def),
                flags,
            });
            id
        };
        self.intern_unchecked(id, SmallVec::new());
        id
    }

    /// Kind flags of a declaration, plus multi-occurrence flags inherited
    /// from its direct supertypes.
    fn raw_flags_for(&self, def: &RawTypeDef) -> TypeFlags {
        let mut flags = TypeFlags::for_kind(def.kind);
        if def.immutable {
            flags |= TypeFlags::IMMUTABLE;
        }
        if def.is_abstract {
            flags |= TypeFlags::ABSTRACT;
        }
        let inheritable = TypeFlags::COLLECTION | TypeFlags::MAP | TypeFlags::NUMERIC;
        for sup in &def.supertypes {
            let raw = match sup {
                TypeRef::Generic(raw, _) => Some(*raw),
                TypeRef::Concrete(id) => self.lookup(*id).map(|d| d.raw),
                _ => None,
            };
            if let Some(raw) = raw
                && let Some(entry) = read(&self.raws).get(raw.0 as usize)
            {
                flags |= entry.flags & inheritable;
            }
        }
        flags
    }

    // -------------------------------------------------------------------------
    // Raw declarations
    // -------------------------------------------------------------------------

    /// Declare a user raw type.
    pub fn declare(&self, def: RawTypeDef) -> Result<RawTypeId, TypeError> {
        if self.raw_names.contains_key(&def.name) {
            return Err(TypeError::DuplicateRawType {
                name: def.name.to_string(),
            });
        }
        let name = def.name.clone();
        let id = self.push_raw(def);
        debug!(raw = id.0, %name, "TypeInterner::declare");
        Ok(id)
    }

    pub fn raw_def(&self, raw: RawTypeId) -> Result<Arc<RawTypeDef>, TypeError> {
        read(&self.raws)
            .get(raw.0 as usize)
            .map(|entry| entry.def.clone())
            .ok_or(TypeError::UnknownRawType(raw))
    }

    pub fn raw_by_name(&self, name: &str) -> Option<RawTypeId> {
        self.raw_names.get(name).map(|r| *r)
    }

    pub fn raw_count(&self) -> usize {
        read(&self.raws).len()
    }

    // -------------------------------------------------------------------------
    // Interning
    // -------------------------------------------------------------------------

    /// Intern `raw<args>`.
    ///
    /// `args` must be empty (the unparameterized form) or match the raw
    /// type's declared parameter count exactly.
    pub fn intern(&self, raw: RawTypeId, args: &[TypeId]) -> Result<TypeId, TypeError> {
        let def = self.raw_def(raw)?;
        if !args.is_empty() && args.len() != def.type_params.len() {
            return Err(TypeError::ArityMismatch {
                name: def.name.to_string(),
                expected: def.type_params.len(),
                actual: args.len(),
            });
        }
        if let Some(&bad) = args.iter().find(|a| self.lookup(**a).is_none()) {
            return Err(TypeError::UnknownType(bad));
        }
        Ok(self.intern_unchecked(raw, SmallVec::from_slice(args)))
    }

    fn intern_unchecked(&self, raw: RawTypeId, args: SmallVec<[TypeId; 2]>) -> TypeId {
        let key = TypeKey {
            raw,
            args: args.clone(),
        };
        if let Some(existing) = self.type_index.get(&key) {
            return *existing;
        }

        let (kind, mut flags, param_count) = {
            let raws = read(&self.raws);
            let entry = &raws[raw.0 as usize];
            (entry.def.kind, entry.flags, entry.def.type_params.len())
        };
        if param_count > 0 && args.is_empty() {
            flags |= TypeFlags::UNPARAMETERIZED;
        }
        let data = TypeData {
            raw,
            args,
            kind,
            flags,
        };

        match self.type_index.entry(key) {
            Entry::Occupied(existing) => *existing.get(),
            Entry::Vacant(slot) => {
                let mut types = write(&self.types);
                let id = TypeId(types.len() as u32);
                types.push(Arc::new(data));
                slot.insert(id);
                trace!(type_id = id.0, raw = raw.0, "TypeInterner::intern");
                id
            }
        }
    }

    /// The unparameterized form of `raw`.
    ///
    /// # Panics
    ///
    /// If `raw` was never declared. Use [`Self::try_raw_type`] for ids that
    /// do not come from [`Self::declare`].
    pub fn raw_type(&self, raw: RawTypeId) -> TypeId {
        self.intern_unchecked(raw, SmallVec::new())
    }

    /// The unparameterized form of `raw`, or `UnknownRawType`.
    pub fn try_raw_type(&self, raw: RawTypeId) -> Result<TypeId, TypeError> {
        self.intern(raw, &[])
    }

    pub fn lookup(&self, id: TypeId) -> Option<Arc<TypeData>> {
        read(&self.types).get(id.0 as usize).cloned()
    }

    pub fn data(&self, id: TypeId) -> Result<Arc<TypeData>, TypeError> {
        self.lookup(id).ok_or(TypeError::UnknownType(id))
    }

    pub fn type_count(&self) -> usize {
        read(&self.types).len()
    }

    pub fn array_of(&self, component: TypeId) -> TypeId {
        self.intern_unchecked(RawTypeId::ARRAY, SmallVec::from_slice(&[component]))
    }

    pub fn list_of(&self, element: TypeId) -> TypeId {
        self.intern_unchecked(RawTypeId::LIST, SmallVec::from_slice(&[element]))
    }

    pub fn set_of(&self, element: TypeId) -> TypeId {
        self.intern_unchecked(RawTypeId::SET, SmallVec::from_slice(&[element]))
    }

    pub fn map_of(&self, key: TypeId, value: TypeId) -> TypeId {
        self.intern_unchecked(RawTypeId::MAP, SmallVec::from_slice(&[key, value]))
    }

    pub fn entry_of(&self, key: TypeId, value: TypeId) -> TypeId {
        self.intern_unchecked(RawTypeId::ENTRY, SmallVec::from_slice(&[key, value]))
    }

    // -------------------------------------------------------------------------
    // O(1) predicates
    // -------------------------------------------------------------------------

    #[inline]
    pub fn flags(&self, id: TypeId) -> TypeFlags {
        self.lookup(id).map(|d| d.flags).unwrap_or_default()
    }

    #[inline]
    fn has(&self, id: TypeId, flags: TypeFlags) -> bool {
        self.flags(id).intersects(flags)
    }

    pub fn raw_of(&self, id: TypeId) -> Option<RawTypeId> {
        self.lookup(id).map(|d| d.raw)
    }

    pub fn is_any(&self, id: TypeId) -> bool {
        id == TypeId::OBJECT
    }

    pub fn is_array(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::ARRAY)
    }

    pub fn is_primitive(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::PRIMITIVE)
    }

    pub fn is_primitive_wrapper(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::WRAPPER)
    }

    pub fn is_collection(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::COLLECTION)
    }

    pub fn is_map(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::MAP)
    }

    pub fn is_entry(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::ENTRY)
    }

    pub fn is_enum(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::ENUM)
    }

    pub fn is_string(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::STRING)
    }

    pub fn is_big_integer(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::BIG_INTEGER)
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::NUMERIC)
    }

    pub fn is_immutable(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::IMMUTABLE)
    }

    pub fn is_abstract(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::ABSTRACT)
    }

    /// Primitive, wrapper, string, enum or big integer.
    pub fn is_scalar(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::SCALAR)
    }

    /// Array, collection or map.
    pub fn is_multi_occurrence(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::MULTI_OCCURRENCE)
    }

    pub fn is_array_or_collection(&self, id: TypeId) -> bool {
        self.has(id, TypeFlags::ARRAY | TypeFlags::COLLECTION)
    }

    /// The primitive kind of a primitive or wrapper type.
    pub fn primitive_kind(&self, id: TypeId) -> Option<PrimitiveKind> {
        match self.lookup(id)?.kind {
            RawKind::Primitive(kind) | RawKind::Wrapper(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn collection_kind(&self, id: TypeId) -> Option<CollectionKind> {
        match self.lookup(id)?.kind {
            RawKind::Collection(kind) => Some(kind),
            RawKind::Class | RawKind::Interface if self.is_collection(id) => {
                Some(CollectionKind::List)
            }
            _ => None,
        }
    }

    pub fn wrapper_of(&self, kind: PrimitiveKind) -> TypeId {
        self.raw_type(kind.wrapper_raw())
    }

    pub fn primitive_of(&self, kind: PrimitiveKind) -> TypeId {
        self.raw_type(kind.primitive_raw())
    }

    /// `true` when one side is a primitive and the other its wrapper.
    pub fn is_wrapper_compatible(&self, a: TypeId, b: TypeId) -> bool {
        match (self.lookup(a), self.lookup(b)) {
            (Some(a), Some(b)) => matches!(
                (a.kind, b.kind),
                (RawKind::Primitive(x), RawKind::Wrapper(y))
                    | (RawKind::Wrapper(x), RawKind::Primitive(y)) if x == y
            ),
            _ => false,
        }
    }

    /// Enum constant names declared on an enum type.
    pub fn enum_constants(&self, id: TypeId) -> Vec<Arc<str>> {
        self.lookup(id)
            .and_then(|d| self.raw_def(d.raw).ok())
            .map(|def| def.enum_constants.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "../tests/intern_tests.rs"]
mod tests;
