//! The mapper factory: registry of class maps, converters and object
//! factories, and the resolver of mapping strategies.
//!
//! A factory is built once and then shared. Registration and mapping may
//! run concurrently from several threads; every table is a concurrent map
//! and every cache is filled compute-then-insert, so a racing thread at worst
//! computes a result that is then discarded. No table lock is held while a
//! strategy or mapper is being computed.

use crate::builder::ClassMapBuilder;
use crate::config::MapperConfig;
use crate::context::MappingContext;
use crate::converter::{Converter, ConverterRegistry};
use crate::error::{MappingError, Result};
use crate::executor::BoundMapper;
use crate::instantiate::{self, IdentityUnenhancer, ObjectFactory, Unenhancer};
use crate::mapper::CompiledMapper;
use crate::metadata::{ClassMap, PairKey};
use crate::property::{self, DeclaredPropertyResolver, Property, PropertyResolver};
use crate::specs::SpecificationChain;
use crate::strategy::{Strategy, StrategyKey, StrategyKind};
use crate::value::Value;
use dashmap::DashMap;
use remap_types::{TypeId, TypeInterner};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info, trace};

pub struct MapperFactoryBuilder {
    types: Arc<TypeInterner>,
    config: MapperConfig,
    properties: Option<Arc<dyn PropertyResolver>>,
    unenhancer: Option<Arc<dyn Unenhancer>>,
    specs: Option<SpecificationChain>,
}

impl MapperFactoryBuilder {
    pub fn config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn property_resolver(mut self, resolver: Arc<dyn PropertyResolver>) -> Self {
        self.properties = Some(resolver);
        self
    }

    pub fn unenhancer(mut self, unenhancer: Arc<dyn Unenhancer>) -> Self {
        self.unenhancer = Some(unenhancer);
        self
    }

    pub fn specifications(mut self, specs: SpecificationChain) -> Self {
        self.specs = Some(specs);
        self
    }

    pub fn build(self) -> Result<MapperFactory> {
        self.config.validate()?;
        let converters = if self.config.use_builtin_converters {
            ConverterRegistry::with_builtins()
        } else {
            ConverterRegistry::new()
        };
        info!(
            map_nulls = self.config.map_nulls,
            builtin_converters = self.config.use_builtin_converters,
            auto_generate = self.config.auto_generate,
            "mapper factory created"
        );
        Ok(MapperFactory {
            types: self.types,
            config: self.config,
            properties: self
                .properties
                .unwrap_or_else(|| Arc::new(DeclaredPropertyResolver::new())),
            converters,
            specs: self.specs.unwrap_or_default(),
            class_maps: DashMap::new(),
            mappers: DashMap::new(),
            partners: DashMap::new(),
            object_factories: DashMap::new(),
            strategies: DashMap::new(),
            unenhancer: self
                .unenhancer
                .unwrap_or_else(|| Arc::new(IdentityUnenhancer)),
        })
    }
}

pub struct MapperFactory {
    types: Arc<TypeInterner>,
    config: MapperConfig,
    properties: Arc<dyn PropertyResolver>,
    converters: ConverterRegistry,
    specs: SpecificationChain,
    class_maps: DashMap<PairKey, Arc<ClassMap>>,
    mappers: DashMap<PairKey, Arc<CompiledMapper>>,
    /// For every type, the types it has a class map with.
    partners: DashMap<TypeId, SmallVec<[TypeId; 4]>>,
    object_factories: DashMap<TypeId, Arc<dyn ObjectFactory>>,
    strategies: DashMap<StrategyKey, Arc<Strategy>>,
    unenhancer: Arc<dyn Unenhancer>,
}

impl MapperFactory {
    pub fn builder(types: Arc<TypeInterner>) -> MapperFactoryBuilder {
        MapperFactoryBuilder {
            types,
            config: MapperConfig::default(),
            properties: None,
            unenhancer: None,
            specs: None,
        }
    }

    /// Factory with the default configuration.
    pub fn new(types: Arc<TypeInterner>) -> Result<Self> {
        Self::builder(types).build()
    }

    pub fn types(&self) -> &TypeInterner {
        &self.types
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    pub fn specs(&self) -> &SpecificationChain {
        &self.specs
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn properties(&self, owner: TypeId) -> Result<Arc<[Arc<Property>]>> {
        self.properties.properties(&self.types, owner)
    }

    /// Resolve a property expression against `owner`.
    pub fn property(&self, owner: TypeId, expression: &str) -> Result<Arc<Property>> {
        property::resolve_expression(self.properties.as_ref(), &self.types, owner, expression)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Start a class map between `a` and `b`.
    pub fn class_map(&self, a: TypeId, b: TypeId) -> ClassMapBuilder<'_> {
        ClassMapBuilder::new(self, a, b)
    }

    /// Compile and register a class map. Replaces any class map for the same
    /// pair in either order.
    pub fn register_class_map(&self, class_map: ClassMap) -> Result<()> {
        self.insert_class_map(class_map)?;
        self.invalidate_strategies();
        Ok(())
    }

    /// Compile and store a class map without touching cached strategies.
    fn insert_class_map(&self, class_map: ClassMap) -> Result<()> {
        let class_map = Arc::new(class_map);
        let mapper = Arc::new(CompiledMapper::compile(class_map.clone(), self)?);
        let (a, b) = (class_map.a_type, class_map.b_type);
        let key = class_map.key();
        self.class_maps.insert(key, class_map);
        self.mappers.insert(key, mapper);
        self.add_partner(a, b);
        self.add_partner(b, a);
        debug!(
            a = %self.types.type_name(a),
            b = %self.types.type_name(b),
            "registered class map"
        );
        Ok(())
    }

    fn add_partner(&self, ty: TypeId, partner: TypeId) {
        let mut entry = self.partners.entry(ty).or_default();
        if !entry.contains(&partner) {
            entry.push(partner);
        }
    }

    pub fn class_map_for(&self, a: TypeId, b: TypeId) -> Option<Arc<ClassMap>> {
        self.class_maps.get(&PairKey::new(a, b)).map(|c| c.value().clone())
    }

    pub fn mapper_for(&self, a: TypeId, b: TypeId) -> Option<Arc<CompiledMapper>> {
        self.mappers.get(&PairKey::new(a, b)).map(|m| m.value().clone())
    }

    pub fn class_map_count(&self) -> usize {
        self.class_maps.len()
    }

    pub fn register_converter(&self, converter: Arc<dyn Converter>) {
        self.converters.register(converter);
        self.invalidate_strategies();
    }

    pub fn register_converter_with_id(&self, id: &str, converter: Arc<dyn Converter>) {
        self.converters.register_with_id(id, converter);
    }

    pub fn register_object_factory(&self, ty: TypeId, factory: Arc<dyn ObjectFactory>) {
        self.object_factories.insert(ty, factory);
        self.invalidate_strategies();
    }

    pub(crate) fn object_factory(&self, ty: TypeId) -> Option<Arc<dyn ObjectFactory>> {
        self.object_factories.get(&ty).map(|f| f.value().clone())
    }

    /// Forget every cached strategy.
    pub fn invalidate_strategies(&self) {
        if !self.strategies.is_empty() {
            trace!(cached = self.strategies.len(), "invalidating strategies");
        }
        self.strategies.clear();
    }

    pub fn cached_strategy_count(&self) -> usize {
        self.strategies.len()
    }

    // =========================================================================
    // Mapping entry points
    // =========================================================================

    /// Map `source` to a new value of `destination`.
    pub fn map(&self, source: &Value, destination: TypeId) -> Result<Value> {
        MappingContext::new(self).map(source, destination)
    }

    /// Map `source` onto an existing destination.
    pub fn map_into(&self, source: &Value, dest: &Value) -> Result<()> {
        MappingContext::new(self).map_into(source, dest)
    }

    /// Map every item to `element`, sharing one context so references shared
    /// between items stay shared.
    pub fn map_as_list(&self, items: &[Value], element: TypeId) -> Result<Vec<Value>> {
        let mut ctx = MappingContext::new(self);
        items.iter().map(|item| ctx.map(item, element)).collect()
    }

    /// `map_as_list` collected into an array of `element`.
    pub fn map_as_array(&self, items: &[Value], element: TypeId) -> Result<Value> {
        let mapped = self.map_as_list(items, element)?;
        Ok(Value::array(self.types.array_of(element), mapped))
    }

    /// Facade for one pair of types.
    pub fn bound(&self, a: TypeId, b: TypeId) -> BoundMapper<'_> {
        BoundMapper::new(self, a, b)
    }

    pub(crate) fn unenhance(&self, value: &Value) -> Value {
        self.unenhancer.unenhance(value)
    }

    /// Default-constructed instance of `ty`.
    pub fn instantiate(&self, ty: TypeId) -> Result<Value> {
        instantiate::instantiate_default(&self.types, self.properties.as_ref(), ty)
    }

    // =========================================================================
    // Strategy resolution
    // =========================================================================

    pub fn resolve_strategy(
        &self,
        source: TypeId,
        destination: TypeId,
        destination_provided: bool,
    ) -> Result<Arc<Strategy>> {
        let source = self.unenhancer.unenhance_type(source);
        let data = self.types.data(source)?;
        let key = StrategyKey {
            raw_source: data.raw,
            source,
            destination,
            destination_provided,
        };
        if let Some(hit) = self.strategies.get(&key) {
            return Ok(hit.value().clone());
        }
        let computed = Arc::new(self.compute_strategy(&key)?);
        debug!(
            from = %self.types.type_name(source),
            to = %self.types.type_name(destination),
            kind = ?computed.kind,
            "resolved strategy"
        );
        Ok(self.strategies.entry(key).or_insert(computed).value().clone())
    }

    fn compute_strategy(&self, key: &StrategyKey) -> Result<Strategy> {
        let types = &*self.types;
        let (source, destination) = (key.source, key.destination);

        if let Some(converter) = self.converters.find(types, source, destination) {
            let mut strategy = Strategy::simple(StrategyKind::UseConverter, source, destination);
            strategy.converter = Some(converter);
            return Ok(strategy);
        }

        if types.is_immutable(source)
            && (source == destination
                || types.is_any(destination)
                || types.is_wrapper_compatible(source, destination)
                || types.is_assignable_from(destination, source))
        {
            return Ok(Strategy::simple(StrategyKind::CopyByReference, source, source));
        }

        if types.is_multi_occurrence(source)
            && (types.is_multi_occurrence(destination) || types.is_any(destination))
        {
            let target = if types.is_any(destination) {
                source
            } else {
                destination
            };
            return Ok(Strategy::simple(StrategyKind::MapElements, source, target));
        }

        if let Some(strategy) = self.mapper_strategy(key)? {
            return Ok(strategy);
        }

        if self.config.auto_generate && self.generate_class_map(source, destination)? {
            if let Some(strategy) = self.mapper_strategy(key)? {
                return Ok(strategy);
            }
        }

        Err(MappingError::NoStrategy {
            from: types.type_name(source),
            to: types.type_name(destination),
        })
    }

    fn mapper_strategy(&self, key: &StrategyKey) -> Result<Option<Strategy>> {
        let Some((mapper, reverse, concrete)) = self.resolve_mapper(key.source, key.destination)?
        else {
            return Ok(None);
        };
        let object_factory = self.object_factory(concrete);
        let kind =
            StrategyKind::for_mapper(key.destination_provided, object_factory.is_some(), reverse);
        let mut strategy = Strategy::simple(kind, key.source, concrete);
        strategy.mapper = Some(mapper);
        strategy.object_factory = object_factory;
        Ok(Some(strategy))
    }

    fn can_create(&self, ty: TypeId) -> bool {
        !self.types.is_abstract(ty) || self.object_factories.contains_key(&ty)
    }

    /// Class map to use for `source -> destination`, whether it runs in
    /// reverse, and the concrete destination type.
    ///
    /// The source is tried as itself, as its raw form and as each supertype,
    /// nearest first. For each, a class map registered with exactly the
    /// destination wins. Otherwise the registered partners that are
    /// assignable to the destination and instantiable are candidates; one
    /// candidate is taken as is, several resolve to the one candidate that is
    /// assignable to every other.
    fn resolve_mapper(
        &self,
        source: TypeId,
        destination: TypeId,
    ) -> Result<Option<(Arc<CompiledMapper>, bool, TypeId)>> {
        let types = &*self.types;
        let mut sources = vec![source];
        let data = types.data(source)?;
        if data.is_parameterized() {
            sources.push(types.raw_type(data.raw));
        }
        sources.extend(
            types
                .supertypes(source)?
                .into_iter()
                .filter(|t| !types.is_any(*t)),
        );

        for candidate_source in sources {
            if let Some(mapper) = self.mapper_for(candidate_source, destination)
                && self.can_create(destination)
            {
                let reverse = mapper.a_type() != candidate_source;
                return Ok(Some((mapper, reverse, destination)));
            }

            let partners: SmallVec<[TypeId; 4]> = self
                .partners
                .get(&candidate_source)
                .map(|p| p.value().clone())
                .unwrap_or_default();
            let candidates: Vec<TypeId> = partners
                .into_iter()
                .filter(|p| {
                    *p != destination
                        && types.is_assignable_from(destination, *p)
                        && self.can_create(*p)
                })
                .collect();
            let chosen = match candidates.as_slice() {
                [] => continue,
                [only] => *only,
                many => types.most_specific(many).ok_or_else(|| MappingError::AmbiguousDestination {
                    requested: types.type_name(destination),
                    candidates: many
                        .iter()
                        .map(|t| types.type_name(*t))
                        .collect::<Vec<_>>()
                        .join(", "),
                })?,
            };
            if let Some(mapper) = self.mapper_for(candidate_source, chosen) {
                let reverse = mapper.a_type() != candidate_source;
                trace!(
                    requested = %types.type_name(destination),
                    chosen = %types.type_name(chosen),
                    "most specific destination"
                );
                return Ok(Some((mapper, reverse, chosen)));
            }
        }
        Ok(None)
    }

    /// Register a same-name class map for `source -> destination` if the
    /// pair can have one.
    fn generate_class_map(&self, source: TypeId, destination: TypeId) -> Result<bool> {
        let types = &*self.types;
        if types.is_scalar(source)
            || types.is_scalar(destination)
            || types.is_multi_occurrence(source)
            || types.is_multi_occurrence(destination)
        {
            return Ok(false);
        }
        let target = if types.is_any(destination) {
            source
        } else {
            destination
        };
        if !self.can_create(target) {
            return Ok(false);
        }
        debug!(
            from = %types.type_name(source),
            to = %types.type_name(target),
            "generating default class map"
        );
        // No cached key resolves through a pair that had no class map.
        let class_map = self.class_map(source, target).by_default().build()?;
        self.insert_class_map(class_map)?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "../tests/factory_tests.rs"]
mod tests;
