//! Runtime generic type model.
//!
//! Values moved around by the mapper carry no compile-time type information,
//! so this crate provides the descriptors the mapper reasons about:
//!
//! - **Interning**: every `(raw type, type arguments)` combination maps to one
//!   `TypeId`, so equality is an integer comparison
//! - **Generic resolution**: type variables are bound from a context type and
//!   fall back to their declared bounds, with cycle detection for recursive
//!   bounds such as `Enum<E extends Enum<E>>`
//! - **Assignability**: erasure-aware, argument-wise checks between types
//!
//! All tables are safe to share between threads.

pub mod error;
mod format;
mod intern;
pub mod recursion;
mod relations;
mod resolve;
pub mod types;

pub use error::TypeError;
pub use format::TypeFormatter;
pub use intern::TypeInterner;
pub use recursion::{DepthCounter, RecursionGuard, RecursionProfile, RecursionResult};
pub use relations::AssignabilityChecker;
pub use resolve::TypeResolver;
pub use types::{
    CollectionKind, PrimitiveKind, PropertyDecl, RawKind, RawTypeDef, RawTypeId, TypeData,
    TypeFlags, TypeId, TypeParamDef, TypeRef,
};
