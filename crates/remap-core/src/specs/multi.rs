//! Rules for arrays, collections and maps, plus the container helpers the
//! aggregator and the element strategy share.

use super::{FieldOp, Produced, Specification};
use crate::aggregate::ElementPlan;
use crate::context::MappingContext;
use crate::error::{MappingError, Result};
use crate::factory::MapperFactory;
use crate::metadata::FieldMap;
use crate::property::Property;
use crate::value::Value;
use remap_types::{CollectionKind, TypeId, TypeInterner};
use std::sync::Arc;

// =============================================================================
// Container helpers
// =============================================================================

/// Elements of a container value. Map entries come out as entry objects
/// with `key` and `value` fields.
pub(crate) fn elements_of(types: &TypeInterner, value: &Value) -> Vec<Value> {
    match value {
        Value::Seq(seq) => seq.items(),
        Value::Map(map) => {
            let (key_ty, value_ty) = types.map_key_value(map.type_id());
            let entry_ty = types.entry_of(key_ty, value_ty);
            map.entries()
                .into_iter()
                .map(|(k, v)| Value::object(entry_ty, [("key", k), ("value", v)]))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// A new container of `ty` holding `elements`.
pub(crate) fn new_container(
    types: &TypeInterner,
    ty: TypeId,
    elements: Vec<Value>,
) -> Result<Value> {
    if types.is_array(ty) {
        return Ok(Value::array(ty, elements));
    }
    if types.is_map(ty) {
        let map = Value::map(ty, []);
        refill(&map, elements);
        return Ok(map);
    }
    if types.is_collection(ty) {
        let element = types.element_type(ty).unwrap_or(TypeId::OBJECT);
        return Ok(match types.collection_kind(ty) {
            Some(CollectionKind::Set) => Value::set(ty, elements),
            Some(CollectionKind::Any) => Value::list(types.list_of(element), elements),
            _ => Value::list(ty, elements),
        });
    }
    if types.is_any(ty) {
        return Ok(Value::list(types.list_of(TypeId::OBJECT), elements));
    }
    Err(MappingError::NotInstantiable(types.type_name(ty)))
}

/// Replace the contents of an existing container.
pub(crate) fn refill(container: &Value, elements: Vec<Value>) {
    match container {
        Value::Seq(seq) => {
            seq.clear();
            seq.extend(elements);
        }
        Value::Map(map) => {
            map.clear();
            for entry in elements {
                if let Value::Object(obj) = &entry {
                    let key = obj.get("key").unwrap_or_default();
                    let value = obj.get("value").unwrap_or_default();
                    map.insert(key, value);
                }
            }
        }
        _ => {}
    }
}

/// Writable destinations get a new container; read-only ones keep their
/// container and have it cleared and refilled.
pub(crate) fn fill_container(
    types: &TypeInterner,
    dest: &Property,
    elements: Vec<Value>,
    existing: &Value,
) -> Result<Produced> {
    if dest.writable {
        return new_container(types, dest.ty, elements).map(Produced::Assign);
    }
    if existing.is_null() {
        return Err(MappingError::NotWritable(dest.expression.to_string()));
    }
    refill(existing, elements);
    Ok(Produced::InPlace)
}

/// Point `inverse` on `element` back at `owner`. A collection-typed inverse
/// gets `owner` appended instead, and is created when still null.
pub(crate) fn link_inverse(
    types: &TypeInterner,
    inverse: &Property,
    element: &Value,
    owner: &Value,
) -> Result<()> {
    if element.as_object().is_none() {
        return Ok(());
    }
    if !types.is_collection(inverse.ty) {
        return inverse.write_to(element, owner.clone());
    }
    let mut back = inverse.read_from(element);
    if back.is_null() {
        back = new_container(types, inverse.ty, Vec::new())?;
        inverse.write_to(element, back.clone())?;
    }
    if let Some(seq) = back.as_seq() {
        seq.push(owner.clone());
    }
    Ok(())
}

pub(crate) fn wire_inverse(
    types: &TypeInterner,
    inverse: Option<&Arc<Property>>,
    elements: &[Value],
    owner: &Value,
) -> Result<()> {
    let Some(inverse) = inverse else {
        return Ok(());
    };
    for element in elements {
        link_inverse(types, inverse, element, owner)?;
    }
    Ok(())
}

/// Map every element of `source` to the element type of `to`.
fn map_elements(source: &Value, to: TypeId, ctx: &mut MappingContext<'_>) -> Result<Vec<Value>> {
    let types = ctx.types();
    let element_ty = types.element_type(to).unwrap_or(TypeId::OBJECT);
    let mut out = Vec::new();
    for item in elements_of(types, source) {
        out.push(ctx.map(&item, element_ty)?);
    }
    Ok(out)
}

/// Map one container value into another container type: elements one by
/// one, map entries key by key and value by value.
pub(crate) fn map_container(
    source: &Value,
    to: TypeId,
    existing: Option<&Value>,
    ctx: &mut MappingContext<'_>,
) -> Result<Value> {
    let types = ctx.types();
    let elements = if let (Value::Map(map), true) = (source, types.is_map(to)) {
        let (key_ty, value_ty) = types.map_key_value(to);
        let entry_ty = types.entry_of(key_ty, value_ty);
        let mut out = Vec::with_capacity(map.len());
        for (k, v) in map.entries() {
            let key = ctx.map(&k, key_ty)?;
            let value = ctx.map(&v, value_ty)?;
            out.push(Value::object(entry_ty, [("key", key), ("value", value)]));
        }
        out
    } else {
        map_elements(source, to, ctx)?
    };
    match existing {
        Some(container) => {
            refill(container, elements);
            Ok(container.clone())
        }
        None => new_container(types, to, elements),
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Array or collection into an array.
pub struct ToArray;

impl Specification for ToArray {
    fn name(&self) -> &'static str {
        "to-array"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        types.is_array_or_collection(fm.source.ty) && types.is_array(fm.destination.ty)
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
        let elements = map_elements(source, dest.ty, ctx)?;
        fill_container(ctx.types(), dest, elements, existing)
    }
}

/// Array or collection into a collection, with optional back references.
pub struct ToCollection;

impl Specification for ToCollection {
    fn name(&self) -> &'static str {
        "to-collection"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        types.is_array_or_collection(fm.source.ty) && types.is_collection(fm.destination.ty)
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        existing: &Value,
        owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        let dest = &op.field_map.destination;
        let elements = map_elements(source, dest.ty, ctx)?;
        wire_inverse(ctx.types(), op.field_map.inverse.as_ref(), &elements, owner)?;
        fill_container(ctx.types(), dest, elements, existing)
    }
}

/// Map into map, decomposed into `{key}` and `{value}` element mappings.
pub struct MapToMap;

impl Specification for MapToMap {
    fn name(&self) -> &'static str {
        "map-to-map"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        types.is_map(fm.source.ty) && types.is_map(fm.destination.ty)
    }

    fn prepare(
        &self,
        fm: &FieldMap,
        factory: &MapperFactory,
        map_nulls: bool,
    ) -> Result<Option<Arc<ElementPlan>>> {
        let types = factory.types();
        let (sk, sv) = types.map_key_value(fm.source.ty);
        let (dk, dv) = types.map_key_value(fm.destination.ty);
        let source_entry = types.entry_of(sk, sv);
        let dest_entry = types.entry_of(dk, dv);

        let mut entries = Vec::with_capacity(2);
        for part in ["key", "value"] {
            let mut element = FieldMap::new(
                factory.property(source_entry, part)?,
                factory.property(dest_entry, part)?,
            );
            element.configured = fm.configured;
            element.map_nulls = Some(true);
            entries.push((0, element));
        }
        let plan = ElementPlan::build(entries, dest_entry, factory, map_nulls)?;
        Ok(Some(Arc::new(plan)))
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        existing: &Value,
        owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        let plan = op
            .elements
            .as_ref()
            .ok_or_else(|| {
                MappingError::Config(format!("no entry plan for {}", op.field_map.describe()))
            })?;
        let containers = [elements_of(ctx.types(), source)];
        let entries = plan.collect(&containers, owner, ctx)?;
        fill_container(ctx.types(), &op.field_map.destination, entries, existing)
    }
}

/// Array or collection into a map: every element is mapped to an entry.
pub struct ContainerToMap;

impl Specification for ContainerToMap {
    fn name(&self) -> &'static str {
        "container-to-map"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        types.is_array_or_collection(fm.source.ty) && types.is_map(fm.destination.ty)
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
        let types = ctx.types();
        let (key_ty, value_ty) = types.map_key_value(dest.ty);
        let entry_ty = types.entry_of(key_ty, value_ty);
        let mut entries = Vec::new();
        for item in elements_of(types, source) {
            if !item.is_null() {
                entries.push(ctx.map(&item, entry_ty)?);
            }
        }
        fill_container(types, dest, entries, existing)
    }
}

/// Map into an array or collection: every entry is mapped to an element.
pub struct MapToContainer;

impl Specification for MapToContainer {
    fn name(&self) -> &'static str {
        "map-to-container"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        types.is_map(fm.source.ty) && types.is_array_or_collection(fm.destination.ty)
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        existing: &Value,
        owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        let dest = &op.field_map.destination;
        let elements = map_elements(source, dest.ty, ctx)?;
        wire_inverse(ctx.types(), op.field_map.inverse.as_ref(), &elements, owner)?;
        fill_container(ctx.types(), dest, elements, existing)
    }
}
