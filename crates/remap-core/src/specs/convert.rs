//! Converter-driven rules.

use super::multi::{elements_of, fill_container};
use super::{FieldOp, Produced, Specification};
use crate::context::MappingContext;
use crate::error::Result;
use crate::factory::MapperFactory;
use crate::metadata::FieldMap;
use crate::value::Value;
use remap_types::TypeId;

/// A converter named by the field map, or found for the field types.
pub struct ConvertByConverter;

impl Specification for ConvertByConverter {
    fn name(&self) -> &'static str {
        "convert-by-converter"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        match &fm.converter_id {
            Some(id) => factory
                .converters()
                .by_id(id)
                .is_some_and(|c| c.can_convert(types, fm.source.ty, fm.destination.ty)),
            None => factory
                .converters()
                .find(types, fm.source.ty, fm.destination.ty)
                .is_some(),
        }
    }

    fn uses_converter(&self) -> bool {
        true
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        _existing: &Value,
        _owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        let converter = op.converter()?.clone();
        let value = converter.convert(source, op.field_map.destination.ty, ctx)?;
        Ok(Produced::Assign(value))
    }
}

/// Element types of a converter field map whose converter applies to the
/// elements rather than the containers.
fn element_pair(fm: &FieldMap, factory: &MapperFactory) -> Option<(TypeId, TypeId)> {
    let types = factory.types();
    let id = fm.converter_id.as_ref()?;
    if !types.is_array_or_collection(fm.source.ty) {
        return None;
    }
    let from = types.element_type(fm.source.ty)?;
    let to = types.element_type(fm.destination.ty)?;
    let converter = factory.converters().by_id(id)?;
    converter.can_convert(types, from, to).then_some((from, to))
}

fn convert_elements(
    op: &FieldOp,
    source: &Value,
    to: TypeId,
    ctx: &mut MappingContext<'_>,
) -> Result<Vec<Value>> {
    let converter = op.converter()?.clone();
    let types = ctx.types();
    let mut out = Vec::new();
    for item in elements_of(types, source) {
        if item.is_null() {
            out.push(Value::Null);
        } else {
            out.push(converter.convert(&item, to, ctx)?);
        }
    }
    Ok(out)
}

/// Array or collection into an array, converting each element.
pub struct ToArrayWithConverter;

impl Specification for ToArrayWithConverter {
    fn name(&self) -> &'static str {
        "to-array-with-converter"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        factory.types().is_array(fm.destination.ty) && element_pair(fm, factory).is_some()
    }

    fn uses_converter(&self) -> bool {
        true
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        existing: &Value,
        _owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        let dest = &op.field_map.destination;
        let to = ctx.types().element_type(dest.ty).unwrap_or(TypeId::OBJECT);
        let elements = convert_elements(op, source, to, ctx)?;
        fill_container(ctx.types(), dest, elements, existing)
    }
}

/// Array or collection into a collection, converting each element.
pub struct ToCollectionWithConverter;

impl Specification for ToCollectionWithConverter {
    fn name(&self) -> &'static str {
        "to-collection-with-converter"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        factory.types().is_collection(fm.destination.ty) && element_pair(fm, factory).is_some()
    }

    fn uses_converter(&self) -> bool {
        true
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        existing: &Value,
        _owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        let dest = &op.field_map.destination;
        let to = ctx.types().element_type(dest.ty).unwrap_or(TypeId::OBJECT);
        let elements = convert_elements(op, source, to, ctx)?;
        fill_container(ctx.types(), dest, elements, existing)
    }
}
