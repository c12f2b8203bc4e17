//! The specification chain: ordered rules that decide how a single field
//! pair is mapped.
//!
//! For each field map the chain picks the first rule that applies. The rule
//! validates the pair when the plan is compiled and produces the destination
//! value when it runs. The order is fixed:
//!
//! 1. convert by converter
//! 2. array or collection to array, element-wise converter
//! 3. array or collection to collection, element-wise converter
//! 4. copy by reference
//! 5. primitive and wrapper
//! 6. string to enum, enum to string
//! 7. enum to enum
//! 8. string to primitive, primitive to string
//! 9. array or collection to array
//! 10. array or collection to collection
//! 11. map to map
//! 12. array or collection to map, map to array, map to collection
//! 13. object to object

mod convert;
pub(crate) mod multi;
mod object;
mod scalar;

use crate::aggregate::ElementPlan;
use crate::context::MappingContext;
use crate::converter::Converter;
use crate::error::{MappingError, Result};
use crate::factory::MapperFactory;
use crate::metadata::FieldMap;
use crate::value::Value;
use std::sync::Arc;
use tracing::trace;

pub use convert::{ConvertByConverter, ToArrayWithConverter, ToCollectionWithConverter};
pub use multi::{ContainerToMap, MapToContainer, MapToMap, ToArray, ToCollection};
pub use object::ObjectToObject;
pub use scalar::{
    CopyByReference, EnumToEnum, PrimitiveAndWrapper, StringAndEnum, StringAndPrimitive,
};

/// What a rule did with the destination.
#[derive(Debug)]
pub enum Produced {
    /// Store this value in the destination property.
    Assign(Value),
    /// The existing destination value was updated in place.
    InPlace,
}

pub trait Specification: Send + Sync {
    fn name(&self) -> &'static str;

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool;

    /// Plan-time check of a field map this rule was chosen for.
    fn validate(&self, _fm: &FieldMap, _factory: &MapperFactory) -> Result<()> {
        Ok(())
    }

    /// Rules that apply a converter get it resolved at compile time.
    fn uses_converter(&self) -> bool {
        false
    }

    /// Element-level plan compiled once for the field map.
    fn prepare(
        &self,
        _fm: &FieldMap,
        _factory: &MapperFactory,
        _map_nulls: bool,
    ) -> Result<Option<Arc<ElementPlan>>> {
        Ok(None)
    }

    /// `true` when writing `source` over `existing` would change nothing.
    fn is_unchanged(&self, _source: &Value, _existing: &Value) -> bool {
        false
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        existing: &Value,
        owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced>;
}

/// A field map bound to the rule that maps it.
#[derive(Clone)]
pub struct FieldOp {
    pub field_map: Arc<FieldMap>,
    pub spec: Arc<dyn Specification>,
    pub converter: Option<Arc<dyn Converter>>,
    pub map_nulls: bool,
    pub elements: Option<Arc<ElementPlan>>,
}

impl FieldOp {
    pub(crate) fn converter(&self) -> Result<&Arc<dyn Converter>> {
        self.converter
            .as_ref()
            .ok_or_else(|| MappingError::UnknownConverter(self.field_map.describe()))
    }
}

impl std::fmt::Debug for FieldOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldOp")
            .field("field", &self.field_map.describe())
            .field("spec", &self.spec.name())
            .field("map_nulls", &self.map_nulls)
            .finish()
    }
}

#[derive(Clone)]
pub struct SpecificationChain {
    rules: Vec<Arc<dyn Specification>>,
}

impl Default for SpecificationChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl SpecificationChain {
    pub fn standard() -> Self {
        let rules: Vec<Arc<dyn Specification>> = vec![
            Arc::new(ConvertByConverter),
            Arc::new(ToArrayWithConverter),
            Arc::new(ToCollectionWithConverter),
            Arc::new(CopyByReference),
            Arc::new(PrimitiveAndWrapper),
            Arc::new(StringAndEnum),
            Arc::new(EnumToEnum),
            Arc::new(StringAndPrimitive),
            Arc::new(ToArray),
            Arc::new(ToCollection),
            Arc::new(MapToMap),
            Arc::new(ContainerToMap),
            Arc::new(MapToContainer),
            Arc::new(ObjectToObject),
        ];
        Self { rules }
    }

    /// Put `rule` ahead of every standard rule.
    pub fn with_rule_first(mut self, rule: Arc<dyn Specification>) -> Self {
        self.rules.insert(0, rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// First rule that applies to `fm`.
    pub fn select(&self, fm: &FieldMap, factory: &MapperFactory) -> Option<Arc<dyn Specification>> {
        self.rules
            .iter()
            .find(|rule| rule.applies_to(fm, factory))
            .cloned()
    }

    /// Choose and validate the rule for `fm`.
    pub fn compile(
        &self,
        fm: FieldMap,
        factory: &MapperFactory,
        map_nulls: bool,
    ) -> Result<FieldOp> {
        let types = factory.types();
        if let Some(id) = &fm.converter_id
            && factory.converters().by_id(id).is_none()
        {
            return Err(MappingError::UnknownConverter(id.to_string()));
        }
        let spec = self
            .select(&fm, factory)
            .ok_or_else(|| incompatible(factory, &fm, "no mapping rule applies"))?;
        if fm.converter_id.is_some() && !spec.uses_converter() {
            return Err(incompatible(factory, &fm, "the named converter does not apply"));
        }
        spec.validate(&fm, factory)?;
        let converter = if spec.uses_converter() {
            resolve_converter(&fm, factory)
        } else {
            None
        };
        let elements = spec.prepare(&fm, factory, map_nulls)?;
        trace!(
            field = %fm.describe(),
            from = %types.type_name(fm.source.ty),
            to = %types.type_name(fm.destination.ty),
            spec = spec.name(),
            "compiled field"
        );
        Ok(FieldOp {
            field_map: Arc::new(fm),
            spec,
            converter,
            map_nulls,
            elements,
        })
    }
}

/// The converter a field map names, or the registry's best match for its
/// types.
pub(crate) fn resolve_converter(
    fm: &FieldMap,
    factory: &MapperFactory,
) -> Option<Arc<dyn Converter>> {
    match &fm.converter_id {
        Some(id) => factory.converters().by_id(id),
        None => factory
            .converters()
            .find(factory.types(), fm.source.ty, fm.destination.ty),
    }
}

pub(crate) fn incompatible(factory: &MapperFactory, fm: &FieldMap, reason: &str) -> MappingError {
    let types = factory.types();
    MappingError::IncompatibleField {
        from: fm.source.expression.to_string(),
        from_type: types.type_name(fm.source.ty),
        to: fm.destination.expression.to_string(),
        to_type: types.type_name(fm.destination.ty),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/specs_tests.rs"]
mod tests;
