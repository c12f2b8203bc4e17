//! remap: an object graph mapper over a runtime generic type model.
//!
//! Types are declared with [`TypeInterner`], values are built as [`Value`]
//! graphs, and a [`MapperFactory`] maps values of one type into values of
//! another through registered or generated class maps:
//!
//! ```
//! use remap::{MapperFactory, RawTypeDef, TypeId, TypeInterner, Value};
//! use std::sync::Arc;
//!
//! let types = Arc::new(TypeInterner::new());
//! let person = types
//!     .declare(RawTypeDef::class("Person").field("name", TypeId::STRING))
//!     .unwrap();
//! let dto = types
//!     .declare(RawTypeDef::class("PersonDto").field("fullName", TypeId::STRING))
//!     .unwrap();
//! let (person, dto) = (types.raw_type(person), types.raw_type(dto));
//!
//! let factory = MapperFactory::new(types).unwrap();
//! factory.class_map(person, dto).field("name", "fullName").register().unwrap();
//!
//! let ada = Value::object(person, [("name", Value::string("Ada"))]);
//! let mapped = factory.map(&ada, dto).unwrap();
//! assert_eq!(mapped.get("fullName"), Value::string("Ada"));
//! ```
//!
//! Set `REMAP_LOG` and call [`init_tracing`] to see how class maps are
//! compiled and which strategies are chosen.

pub mod tracing_config;

pub use remap_core::*;
pub use remap_types as types;
pub use remap_types::{
    CollectionKind, PrimitiveKind, PropertyDecl, RawKind, RawTypeDef, RawTypeId, TypeError,
    TypeFlags, TypeId, TypeInterner, TypeRef,
};
pub use tracing_config::init_tracing;
