//! Per-invocation mapping state.
//!
//! A context lives for one top-level `map` call. It remembers every
//! `(source object, destination type)` pair mapped so far, so shared
//! references and cycles in the source graph come out as shared references
//! and cycles in the destination graph. Contexts are never shared between
//! invocations or threads.

use crate::config::MapperConfig;
use crate::error::{MappingError, Result};
use crate::factory::MapperFactory;
use crate::strategy::StrategyKind;
use crate::value::Value;
use remap_types::{DepthCounter, TypeId, TypeInterner};
use rustc_hash::FxHashMap;
use tracing::trace;

/// Stack left before a nested mapping step switches to a new segment.
const STACK_RED_ZONE: usize = 256 * 1024;
/// Size of each new stack segment.
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

pub struct MappingContext<'f> {
    factory: &'f MapperFactory,
    /// Keyed by source identity; the source is kept alive so its address
    /// cannot be reused while the context exists.
    mapped: FxHashMap<(usize, TypeId), (Value, Value)>,
    depth: DepthCounter,
}

impl<'f> MappingContext<'f> {
    pub fn new(factory: &'f MapperFactory) -> Self {
        Self {
            factory,
            mapped: FxHashMap::default(),
            depth: DepthCounter::new(factory.config().max_depth),
        }
    }

    pub fn factory(&self) -> &'f MapperFactory {
        self.factory
    }

    pub fn types(&self) -> &'f TypeInterner {
        self.factory.types()
    }

    pub fn config(&self) -> &'f MapperConfig {
        self.factory.config()
    }

    /// Current object nesting.
    pub fn depth(&self) -> u32 {
        self.depth.depth()
    }

    /// Number of objects mapped so far.
    pub fn mapped_count(&self) -> usize {
        self.mapped.len()
    }

    /// Destination already produced for `source` as `destination`.
    pub fn already_mapped(&self, source: &Value, destination: TypeId) -> Option<Value> {
        let id = source.identity()?;
        self.mapped.get(&(id, destination)).map(|(_, dest)| dest.clone())
    }

    /// Record `dest` as the image of `source`. Must happen before the fields
    /// of `dest` are mapped, so back references resolve to it.
    pub fn cache_mapped(&mut self, source: &Value, destination: TypeId, dest: &Value) {
        if let Some(id) = source.identity() {
            self.mapped
                .insert((id, destination), (source.clone(), dest.clone()));
        }
    }

    /// Map `source` to a new value of `destination`.
    pub fn map(&mut self, source: &Value, destination: TypeId) -> Result<Value> {
        if source.is_null() {
            return Ok(Value::Null);
        }
        let source = self.factory.unenhance(source);
        if let Some(hit) = self.already_mapped(&source, destination) {
            trace!(destination = destination.0, "reusing mapped object");
            return Ok(hit);
        }
        let strategy = self
            .factory
            .resolve_strategy(source.runtime_type(), destination, false)?;
        self.enter()?;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            strategy.map(&source, None, destination, self)
        });
        self.depth.leave();
        result
    }

    /// Map `source` onto the existing value `dest`.
    pub fn map_into(&mut self, source: &Value, dest: &Value) -> Result<()> {
        if source.is_null() || dest.is_null() {
            return Ok(());
        }
        let source = self.factory.unenhance(source);
        let destination = dest.runtime_type();
        let strategy = self
            .factory
            .resolve_strategy(source.runtime_type(), destination, true)?;
        if matches!(
            strategy.kind,
            StrategyKind::UseConverter | StrategyKind::CopyByReference
        ) {
            return Err(MappingError::NoStrategy {
                from: self.types().type_name(source.runtime_type()),
                to: format!("existing {}", self.types().type_name(destination)),
            });
        }
        self.enter()?;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            strategy.map(&source, Some(dest), destination, self)
        });
        self.depth.leave();
        result.map(|_| ())
    }

    /// New instance of `ty`, through a registered object factory when there
    /// is one.
    pub fn instantiate(&mut self, ty: TypeId, source: &Value) -> Result<Value> {
        match self.factory.object_factory(ty) {
            Some(factory) => factory.create(source, ty, self),
            None => self.factory.instantiate(ty),
        }
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth.enter() {
            Ok(())
        } else {
            Err(MappingError::DepthExceeded(self.depth.max_depth()))
        }
    }
}
