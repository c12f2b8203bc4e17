//! Object graph mapping engine.
//!
//! A `MapperFactory` holds class maps (which properties of two types
//! correspond), converters and object factories, and maps values of one type
//! into values of another:
//!
//! - **Specification chain**: each field pair is bound, once, to the first
//!   rule that can map it (converter, copy, boxing, enum, string, container,
//!   nested object)
//! - **Aggregation**: `{}` element paths on either side are walked in
//!   parallel, possibly nested, with back references wired on the way
//! - **Strategies**: per `(source type, destination type, destination
//!   supplied)` the factory decides once whether to convert, copy,
//!   instantiate or reuse, and caches the answer
//!
//! The factory is `Send + Sync`. A single mapping call runs on one thread
//! with its own `MappingContext`, which keeps shared references and cycles
//! intact in the result.
mod aggregate;
mod builder;
pub mod coerce;
pub mod config;
mod context;
pub mod converter;
pub mod error;
mod executor;
mod factory;
pub mod instantiate;
mod mapper;
pub mod metadata;
pub mod property;
pub mod specs;
mod strategy;
pub mod value;

pub use aggregate::{AggregatePlan, ElementPlan};
pub use builder::{ClassMapBuilder, FieldMapBuilder};
pub use config::{MAX_MAPPING_DEPTH, MapperConfig};
pub use context::MappingContext;
pub use converter::{
    Converter, ConverterRegistry, EnumConverter, FnConverter, NumericConverter, StringConverter,
};
pub use error::{MappingError, Result};
pub use executor::BoundMapper;
pub use factory::{MapperFactory, MapperFactoryBuilder};
pub use instantiate::{FnObjectFactory, IdentityUnenhancer, ObjectFactory, Unenhancer};
pub use mapper::CompiledMapper;
pub use metadata::{ClassMap, CustomMapper, Direction, FieldMap, PairKey};
pub use property::{
    DeclaredPropertyResolver, Property, PropertyKind, PropertyResolver, resolve_expression,
};
pub use specs::{FieldOp, Produced, Specification, SpecificationChain};
pub use strategy::{Strategy, StrategyKey, StrategyKind};
pub use value::{EnumValue, MapRef, ObjectRef, SeqKind, SeqRef, Value};
