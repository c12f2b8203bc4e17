//! Mapping strategies: how a source of a given runtime type becomes a
//! destination of a requested type.
//!
//! Strategies are resolved once per key and cached by the factory. The cache
//! is cleared whenever registrations change what a key would resolve to.

use crate::context::MappingContext;
use crate::converter::Converter;
use crate::error::{MappingError, Result};
use crate::instantiate::ObjectFactory;
use crate::mapper::CompiledMapper;
use crate::specs::multi::map_container;
use crate::value::Value;
use remap_types::{RawTypeId, TypeId};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrategyKey {
    pub raw_source: RawTypeId,
    pub source: TypeId,
    pub destination: TypeId,
    pub destination_provided: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    UseConverter,
    CopyByReference,
    InstantiateAndMapForward,
    InstantiateAndMapReverse,
    InstantiateByDefaultAndMapForward,
    InstantiateByDefaultAndMapReverse,
    MapExistingForward,
    MapExistingReverse,
    /// Container to container, element by element.
    MapElements,
}

impl StrategyKind {
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            StrategyKind::InstantiateAndMapReverse
                | StrategyKind::InstantiateByDefaultAndMapReverse
                | StrategyKind::MapExistingReverse
        )
    }

    /// Kind for an object mapping through a class map.
    pub(crate) fn for_mapper(provided: bool, has_factory: bool, reverse: bool) -> Self {
        match (provided, has_factory, reverse) {
            (true, _, false) => StrategyKind::MapExistingForward,
            (true, _, true) => StrategyKind::MapExistingReverse,
            (false, true, false) => StrategyKind::InstantiateAndMapForward,
            (false, true, true) => StrategyKind::InstantiateAndMapReverse,
            (false, false, false) => StrategyKind::InstantiateByDefaultAndMapForward,
            (false, false, true) => StrategyKind::InstantiateByDefaultAndMapReverse,
        }
    }
}

pub struct Strategy {
    pub kind: StrategyKind,
    pub source: TypeId,
    /// Concrete destination type.
    pub destination: TypeId,
    pub(crate) converter: Option<Arc<dyn Converter>>,
    pub(crate) mapper: Option<Arc<CompiledMapper>>,
    pub(crate) object_factory: Option<Arc<dyn ObjectFactory>>,
}

impl Strategy {
    pub(crate) fn simple(kind: StrategyKind, source: TypeId, destination: TypeId) -> Self {
        Self {
            kind,
            source,
            destination,
            converter: None,
            mapper: None,
            object_factory: None,
        }
    }

    /// Apply to `source`. `dest` is the existing destination for the
    /// map-existing kinds; `requested` is the type the caller asked for.
    pub fn map(
        &self,
        source: &Value,
        dest: Option<&Value>,
        requested: TypeId,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Value> {
        match self.kind {
            StrategyKind::UseConverter => {
                let converter = self
                    .converter
                    .as_ref()
                    .ok_or_else(|| self.incomplete(ctx, "converter"))?;
                converter.convert(source, self.destination, ctx)
            }
            StrategyKind::CopyByReference => Ok(source.clone()),
            StrategyKind::MapElements => {
                let result = map_container(source, self.destination, dest, ctx)?;
                ctx.cache_mapped(source, requested, &result);
                Ok(result)
            }
            StrategyKind::MapExistingForward | StrategyKind::MapExistingReverse => {
                let dest = dest.ok_or_else(|| self.incomplete(ctx, "destination"))?;
                self.map_fields(source, dest, requested, ctx)?;
                Ok(dest.clone())
            }
            StrategyKind::InstantiateAndMapForward | StrategyKind::InstantiateAndMapReverse => {
                let factory = self
                    .object_factory
                    .as_ref()
                    .ok_or_else(|| self.incomplete(ctx, "object factory"))?;
                let created = factory.create(source, self.destination, ctx)?;
                self.map_fields(source, &created, requested, ctx)?;
                Ok(created)
            }
            StrategyKind::InstantiateByDefaultAndMapForward
            | StrategyKind::InstantiateByDefaultAndMapReverse => {
                let created = ctx.factory().instantiate(self.destination)?;
                self.map_fields(source, &created, requested, ctx)?;
                Ok(created)
            }
        }
    }

    fn map_fields(
        &self,
        source: &Value,
        dest: &Value,
        requested: TypeId,
        ctx: &mut MappingContext<'_>,
    ) -> Result<()> {
        let mapper = self
            .mapper
            .as_ref()
            .ok_or_else(|| self.incomplete(ctx, "mapper"))?;
        ctx.cache_mapped(source, requested, dest);
        if requested != self.destination {
            ctx.cache_mapped(source, self.destination, dest);
        }
        mapper.map(source, dest, self.kind.is_reverse(), ctx)
    }

    fn incomplete(&self, ctx: &MappingContext<'_>, missing: &str) -> MappingError {
        MappingError::Config(format!(
            "{:?} strategy from `{}` to `{}` has no {missing}",
            self.kind,
            ctx.types().type_name(self.source),
            ctx.types().type_name(self.destination),
        ))
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("converter", &self.converter.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}
