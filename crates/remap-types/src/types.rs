//! Core type representations.
//!
//! Types are referred to by interned `TypeId` handles. The structure behind a
//! handle is a `TypeData`: a raw type plus its resolved type arguments. Raw
//! types (the declarations) are `RawTypeDef`s addressed by `RawTypeId`.
//!
//! Declarations use `TypeRef` to describe generic signatures such as
//! `List<T>` or `Map<String, V>`; those are turned into `TypeId`s by the
//! resolver once a context is known.

use bitflags::bitflags;
use smallvec::SmallVec;
use std::sync::Arc;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a raw (unparameterized) type declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawTypeId(pub u32);

impl RawTypeId {
    pub const OBJECT: Self = Self(0);
    pub const BOOLEAN: Self = Self(1);
    pub const BYTE: Self = Self(2);
    pub const SHORT: Self = Self(3);
    pub const INT: Self = Self(4);
    pub const LONG: Self = Self(5);
    pub const FLOAT: Self = Self(6);
    pub const DOUBLE: Self = Self(7);
    pub const CHAR: Self = Self(8);
    pub const BOOLEAN_WRAPPER: Self = Self(9);
    pub const BYTE_WRAPPER: Self = Self(10);
    pub const SHORT_WRAPPER: Self = Self(11);
    pub const INT_WRAPPER: Self = Self(12);
    pub const LONG_WRAPPER: Self = Self(13);
    pub const FLOAT_WRAPPER: Self = Self(14);
    pub const DOUBLE_WRAPPER: Self = Self(15);
    pub const CHAR_WRAPPER: Self = Self(16);
    pub const NUMBER: Self = Self(17);
    pub const STRING: Self = Self(18);
    pub const BIG_INTEGER: Self = Self(19);
    pub const ENUM: Self = Self(20);
    pub const COLLECTION: Self = Self(21);
    pub const LIST: Self = Self(22);
    pub const SET: Self = Self(23);
    pub const MAP: Self = Self(24);
    pub const ENTRY: Self = Self(25);
    pub const ARRAY: Self = Self(26);

    /// First id handed out to user declarations.
    pub const FIRST_USER: u32 = 27;

    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_USER
    }
}

/// Interned type handle.
///
/// Two handles are equal iff the raw type and every type argument are equal.
/// Built-in raw types are interned first, in declaration order, so the
/// unparameterized form of built-in raw `n` is always `TypeId(n)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    /// `Object`: the unbounded "any" type.
    pub const OBJECT: Self = Self(0);
    pub const BOOLEAN: Self = Self(1);
    pub const BYTE: Self = Self(2);
    pub const SHORT: Self = Self(3);
    pub const INT: Self = Self(4);
    pub const LONG: Self = Self(5);
    pub const FLOAT: Self = Self(6);
    pub const DOUBLE: Self = Self(7);
    pub const CHAR: Self = Self(8);
    pub const BOOLEAN_WRAPPER: Self = Self(9);
    pub const BYTE_WRAPPER: Self = Self(10);
    pub const SHORT_WRAPPER: Self = Self(11);
    pub const INT_WRAPPER: Self = Self(12);
    pub const LONG_WRAPPER: Self = Self(13);
    pub const FLOAT_WRAPPER: Self = Self(14);
    pub const DOUBLE_WRAPPER: Self = Self(15);
    pub const CHAR_WRAPPER: Self = Self(16);
    pub const NUMBER: Self = Self(17);
    pub const STRING: Self = Self(18);
    pub const BIG_INTEGER: Self = Self(19);
    /// Raw `Enum` (no arguments).
    pub const ENUM: Self = Self(20);
    /// Raw `Collection` (no arguments).
    pub const COLLECTION: Self = Self(21);
    /// Raw `List` (no arguments).
    pub const LIST: Self = Self(22);
    /// Raw `Set` (no arguments).
    pub const SET: Self = Self(23);
    /// Raw `Map` (no arguments).
    pub const MAP: Self = Self(24);
    /// Raw `Entry` (no arguments).
    pub const ENTRY: Self = Self(25);
    /// Raw array (no component).
    pub const ARRAY: Self = Self(26);
}

// =============================================================================
// Kinds
// =============================================================================

/// The eight primitive kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::Char,
    ];

    pub const fn primitive_raw(self) -> RawTypeId {
        match self {
            Self::Boolean => RawTypeId::BOOLEAN,
            Self::Byte => RawTypeId::BYTE,
            Self::Short => RawTypeId::SHORT,
            Self::Int => RawTypeId::INT,
            Self::Long => RawTypeId::LONG,
            Self::Float => RawTypeId::FLOAT,
            Self::Double => RawTypeId::DOUBLE,
            Self::Char => RawTypeId::CHAR,
        }
    }

    pub const fn wrapper_raw(self) -> RawTypeId {
        match self {
            Self::Boolean => RawTypeId::BOOLEAN_WRAPPER,
            Self::Byte => RawTypeId::BYTE_WRAPPER,
            Self::Short => RawTypeId::SHORT_WRAPPER,
            Self::Int => RawTypeId::INT_WRAPPER,
            Self::Long => RawTypeId::LONG_WRAPPER,
            Self::Float => RawTypeId::FLOAT_WRAPPER,
            Self::Double => RawTypeId::DOUBLE_WRAPPER,
            Self::Char => RawTypeId::CHAR_WRAPPER,
        }
    }

    pub const fn primitive_name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
        }
    }

    pub const fn wrapper_name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Short => "Short",
            Self::Int => "Integer",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::Char => "Character",
        }
    }

    /// Numeric kinds take part in numeric conversions; boolean and char don't.
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Boolean | Self::Char)
    }
}

/// Collection flavours.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Abstract `Collection<E>`.
    Any,
    List,
    Set,
}

/// What a raw type is.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RawKind {
    /// `Object`, the root of every hierarchy.
    Any,
    Primitive(PrimitiveKind),
    Wrapper(PrimitiveKind),
    /// Abstract numeric supertype of the numeric wrappers.
    Number,
    String,
    BigInteger,
    Enum,
    Class,
    Interface,
    Collection(CollectionKind),
    Map,
    /// Key/value pair of a map.
    Entry,
    Array,
}

bitflags! {
    /// Classification bits copied into every `TypeData` so predicates are O(1).
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u16 {
        const PRIMITIVE = 1 << 0;
        const WRAPPER = 1 << 1;
        const STRING = 1 << 2;
        const ENUM = 1 << 3;
        const ARRAY = 1 << 4;
        const COLLECTION = 1 << 5;
        const MAP = 1 << 6;
        const ENTRY = 1 << 7;
        const IMMUTABLE = 1 << 8;
        const ABSTRACT = 1 << 9;
        const NUMERIC = 1 << 10;
        const BIG_INTEGER = 1 << 11;
        const ANY = 1 << 12;
        /// Raw type declared with parameters but interned without arguments.
        const UNPARAMETERIZED = 1 << 13;
    }
}

impl TypeFlags {
    /// Types whose values are a single scalar (never an object graph).
    pub const SCALAR: Self = Self::PRIMITIVE
        .union(Self::WRAPPER)
        .union(Self::STRING)
        .union(Self::ENUM)
        .union(Self::BIG_INTEGER);

    /// Collections, arrays and maps.
    pub const MULTI_OCCURRENCE: Self = Self::ARRAY.union(Self::COLLECTION).union(Self::MAP);

    pub(crate) fn for_kind(kind: RawKind) -> Self {
        match kind {
            RawKind::Any => Self::ANY | Self::ABSTRACT,
            RawKind::Primitive(p) => {
                let mut flags = Self::PRIMITIVE | Self::IMMUTABLE;
                if p.is_numeric() {
                    flags |= Self::NUMERIC;
                }
                flags
            }
            RawKind::Wrapper(p) => {
                let mut flags = Self::WRAPPER | Self::IMMUTABLE;
                if p.is_numeric() {
                    flags |= Self::NUMERIC;
                }
                flags
            }
            RawKind::Number => Self::ABSTRACT | Self::IMMUTABLE,
            RawKind::String => Self::STRING | Self::IMMUTABLE,
            RawKind::BigInteger => Self::BIG_INTEGER | Self::NUMERIC | Self::IMMUTABLE,
            RawKind::Enum => Self::ENUM | Self::IMMUTABLE,
            RawKind::Class => Self::empty(),
            RawKind::Interface => Self::ABSTRACT,
            RawKind::Collection(CollectionKind::Any) => Self::COLLECTION | Self::ABSTRACT,
            RawKind::Collection(_) => Self::COLLECTION,
            RawKind::Map => Self::MAP,
            RawKind::Entry => Self::ENTRY,
            RawKind::Array => Self::ARRAY,
        }
    }
}

// =============================================================================
// Generic signatures
// =============================================================================

/// A generic type expression as written in a declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// An already resolved type.
    Concrete(TypeId),
    /// A type variable of the declaring raw type, e.g. `T`.
    Var(Arc<str>),
    /// A raw type applied to arguments; no arguments means the raw form.
    Generic(RawTypeId, Vec<TypeRef>),
    /// Array of the component expression.
    Array(Box<TypeRef>),
    /// `?` or `? extends Bound`.
    Wildcard(Option<Box<TypeRef>>),
}

impl TypeRef {
    pub fn var(name: &str) -> Self {
        Self::Var(Arc::from(name))
    }

    pub fn raw(raw: RawTypeId) -> Self {
        Self::Generic(raw, Vec::new())
    }

    pub fn generic(raw: RawTypeId, args: Vec<TypeRef>) -> Self {
        Self::Generic(raw, args)
    }

    pub fn array(component: TypeRef) -> Self {
        Self::Array(Box::new(component))
    }

    pub fn list_of(element: TypeRef) -> Self {
        Self::Generic(RawTypeId::LIST, vec![element])
    }

    pub fn set_of(element: TypeRef) -> Self {
        Self::Generic(RawTypeId::SET, vec![element])
    }

    pub fn map_of(key: TypeRef, value: TypeRef) -> Self {
        Self::Generic(RawTypeId::MAP, vec![key, value])
    }

    pub fn wildcard_extends(bound: TypeRef) -> Self {
        Self::Wildcard(Some(Box::new(bound)))
    }
}

impl From<TypeId> for TypeRef {
    fn from(id: TypeId) -> Self {
        Self::Concrete(id)
    }
}

/// A declared type parameter with its upper bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParamDef {
    pub name: Arc<str>,
    pub bound: TypeRef,
}

/// A declared property of a raw type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDecl {
    pub name: Arc<str>,
    pub ty: TypeRef,
    pub readable: bool,
    pub writable: bool,
}

impl PropertyDecl {
    pub fn new(name: &str, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: Arc::from(name),
            ty: ty.into(),
            readable: true,
            writable: true,
        }
    }

    /// Getter only: the value can be read and mutated in place, never replaced.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }
}

// =============================================================================
// Raw type definitions
// =============================================================================

/// A raw type declaration.
#[derive(Clone, Debug)]
pub struct RawTypeDef {
    pub name: Arc<str>,
    pub kind: RawKind,
    pub type_params: Vec<TypeParamDef>,
    /// Direct supertypes, expressed in terms of this type's own parameters.
    pub supertypes: Vec<TypeRef>,
    pub properties: Vec<PropertyDecl>,
    pub enum_constants: Vec<Arc<str>>,
    pub immutable: bool,
    pub is_abstract: bool,
}

impl RawTypeDef {
    fn with_kind(name: &str, kind: RawKind) -> Self {
        Self {
            name: Arc::from(name),
            kind,
            type_params: Vec::new(),
            supertypes: Vec::new(),
            properties: Vec::new(),
            enum_constants: Vec::new(),
            immutable: false,
            is_abstract: false,
        }
    }

    /// A concrete, instantiable class.
    pub fn class(name: &str) -> Self {
        Self::with_kind(name, RawKind::Class)
    }

    /// An abstract class; cannot be instantiated by default.
    pub fn abstract_class(name: &str) -> Self {
        let mut def = Self::with_kind(name, RawKind::Class);
        def.is_abstract = true;
        def
    }

    pub fn interface(name: &str) -> Self {
        let mut def = Self::with_kind(name, RawKind::Interface);
        def.is_abstract = true;
        def
    }

    /// An enum; its `Enum<Self>` supertype is added on registration.
    pub fn enumeration<'a>(name: &str, constants: impl IntoIterator<Item = &'a str>) -> Self {
        let mut def = Self::with_kind(name, RawKind::Enum);
        def.enum_constants = constants.into_iter().map(Arc::from).collect();
        def.immutable = true;
        def
    }

    pub(crate) fn builtin(name: &str, kind: RawKind) -> Self {
        let mut def = Self::with_kind(name, kind);
        let flags = TypeFlags::for_kind(kind);
        def.immutable = flags.contains(TypeFlags::IMMUTABLE);
        def.is_abstract = flags.contains(TypeFlags::ABSTRACT);
        def
    }

    /// Declare a type parameter bounded by `Object`.
    pub fn param(self, name: &str) -> Self {
        self.bounded_param(name, TypeRef::Concrete(TypeId::OBJECT))
    }

    pub fn bounded_param(mut self, name: &str, bound: TypeRef) -> Self {
        self.type_params.push(TypeParamDef {
            name: Arc::from(name),
            bound,
        });
        self
    }

    pub fn extends(mut self, supertype: TypeRef) -> Self {
        self.supertypes.push(supertype);
        self
    }

    pub fn property(mut self, decl: PropertyDecl) -> Self {
        self.properties.push(decl);
        self
    }

    /// Shorthand for a readable and writable property.
    pub fn field(self, name: &str, ty: impl Into<TypeRef>) -> Self {
        self.property(PropertyDecl::new(name, ty))
    }

    /// Instances are never mutated after construction and may be shared.
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.type_params.iter().position(|p| &*p.name == name)
    }
}

// =============================================================================
// Interned type data
// =============================================================================

/// The structure behind a `TypeId`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeData {
    pub raw: RawTypeId,
    pub args: SmallVec<[TypeId; 2]>,
    pub kind: RawKind,
    pub flags: TypeFlags,
}

impl TypeData {
    #[inline]
    pub fn is_parameterized(&self) -> bool {
        !self.args.is_empty()
    }

    #[inline]
    pub fn arg(&self, index: usize) -> Option<TypeId> {
        self.args.get(index).copied()
    }
}

/// Hash key of the interning table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TypeKey {
    pub raw: RawTypeId,
    pub args: SmallVec<[TypeId; 2]>,
}

#[cfg(test)]
#[path = "../tests/types_tests.rs"]
mod tests;
