//! Running compiled field operations against values, and the typed facade
//! over the factory.

use crate::context::MappingContext;
use crate::error::Result;
use crate::factory::MapperFactory;
use crate::property::{Property, PropertyKind};
use crate::specs::{FieldOp, Produced};
use crate::value::Value;
use remap_types::TypeId;
use tracing::trace;

/// Map one field from `source_owner` onto `dest_owner`.
pub(crate) fn run_field_op(
    op: &FieldOp,
    source_owner: &Value,
    dest_owner: &Value,
    ctx: &mut MappingContext<'_>,
) -> Result<()> {
    let fm = &op.field_map;
    let value = fm.source.read(source_owner);
    if value.is_null() && !op.map_nulls {
        return Ok(());
    }
    let Some(owner) = destination_owner(dest_owner, &fm.destination, !value.is_null(), ctx)? else {
        return Ok(());
    };
    let existing = fm.destination.read_from(&owner);
    if value.is_null() {
        return write_null(&fm.destination, &owner, &existing, ctx);
    }
    if let Some(result) = produce(op, &value, &existing, &owner, ctx)? {
        fm.destination.write_to(&owner, result)?;
    }
    Ok(())
}

/// Value to store for a non-null `value`; `None` when the destination was
/// updated in place or already holds it.
pub(crate) fn produce(
    op: &FieldOp,
    value: &Value,
    existing: &Value,
    owner: &Value,
    ctx: &mut MappingContext<'_>,
) -> Result<Option<Value>> {
    if op.spec.is_unchanged(value, existing) {
        trace!(field = %op.field_map.describe(), "unchanged");
        return Ok(None);
    }
    match op.spec.produce(op, value, existing, owner, ctx)? {
        Produced::Assign(result) => Ok(Some(result)),
        Produced::InPlace => Ok(None),
    }
}

/// Null source with null mapping on: zero a primitive, empty a read-only
/// container, null anything else.
fn write_null(
    dest: &Property,
    owner: &Value,
    existing: &Value,
    ctx: &MappingContext<'_>,
) -> Result<()> {
    let types = ctx.types();
    if types.is_primitive(dest.ty) {
        if let Some(kind) = types.primitive_kind(dest.ty) {
            return dest.write_to(owner, Value::default_for(kind));
        }
    }
    if !dest.writable {
        crate::specs::multi::refill(existing, Vec::new());
        return Ok(());
    }
    dest.write_to(owner, Value::Null)
}

/// The value that directly holds `prop`, walking the intermediate steps of a
/// nested path. With `create`, null intermediate objects are instantiated and
/// stored; without it a null intermediate yields `None`.
pub(crate) fn destination_owner(
    root: &Value,
    prop: &Property,
    create: bool,
    ctx: &mut MappingContext<'_>,
) -> Result<Option<Value>> {
    let steps = prop.steps();
    let mut owner = root.clone();
    for step in &steps[..steps.len().saturating_sub(1)] {
        let mut next = step.read_from(&owner);
        if next.is_null() {
            if !create || step.kind != PropertyKind::Field {
                return Ok(None);
            }
            next = ctx.instantiate(step.ty, &Value::Null)?;
            step.write_to(&owner, next.clone())?;
        }
        owner = next;
    }
    Ok(Some(owner))
}

// =============================================================================
// Facade
// =============================================================================

/// A mapper fixed to one pair of types, usable in both directions.
pub struct BoundMapper<'f> {
    factory: &'f MapperFactory,
    a: TypeId,
    b: TypeId,
}

impl<'f> BoundMapper<'f> {
    pub(crate) fn new(factory: &'f MapperFactory, a: TypeId, b: TypeId) -> Self {
        Self { factory, a, b }
    }

    /// New `B` from an `A`.
    pub fn map(&self, a: &Value) -> Result<Value> {
        self.factory.map(a, self.b)
    }

    /// New `A` from a `B`.
    pub fn map_reverse(&self, b: &Value) -> Result<Value> {
        self.factory.map(b, self.a)
    }

    /// Map an `A` onto an existing `B`.
    pub fn map_into(&self, a: &Value, b: &Value) -> Result<()> {
        self.factory.map_into(a, b)
    }

    /// Map a `B` onto an existing `A`.
    pub fn map_reverse_into(&self, b: &Value, a: &Value) -> Result<()> {
        self.factory.map_into(b, a)
    }

    pub fn a_type(&self) -> TypeId {
        self.a
    }

    pub fn b_type(&self) -> TypeId {
        self.b
    }
}
