//! Rules for immutable and scalar values.

use super::{FieldOp, Produced, Specification};
use crate::coerce;
use crate::context::MappingContext;
use crate::error::{MappingError, Result};
use crate::factory::MapperFactory;
use crate::metadata::FieldMap;
use crate::value::Value;

/// Immutable source assignable to the destination: share the value.
pub struct CopyByReference;

impl Specification for CopyByReference {
    fn name(&self) -> &'static str {
        "copy-by-reference"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        let (from, to) = (fm.source.ty, fm.destination.ty);
        types.is_immutable(from) && (from == to || types.is_assignable_from(to, from))
    }

    fn is_unchanged(&self, source: &Value, existing: &Value) -> bool {
        source == existing
    }

    fn produce(
        &self,
        _op: &FieldOp,
        source: &Value,
        _existing: &Value,
        _owner: &Value,
        _ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        Ok(Produced::Assign(source.clone()))
    }
}

/// A primitive and the wrapper of the same kind, either way round.
pub struct PrimitiveAndWrapper;

impl Specification for PrimitiveAndWrapper {
    fn name(&self) -> &'static str {
        "primitive-and-wrapper"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        match (
            types.primitive_kind(fm.source.ty),
            types.primitive_kind(fm.destination.ty),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn is_unchanged(&self, source: &Value, existing: &Value) -> bool {
        source == existing
    }

    fn produce(
        &self,
        _op: &FieldOp,
        source: &Value,
        _existing: &Value,
        _owner: &Value,
        _ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        Ok(Produced::Assign(source.clone()))
    }
}

/// String to enum by constant name, enum to its constant name.
pub struct StringAndEnum;

impl Specification for StringAndEnum {
    fn name(&self) -> &'static str {
        "string-and-enum"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        let (from, to) = (fm.source.ty, fm.destination.ty);
        (types.is_string(from) && types.is_enum(to)) || (types.is_enum(from) && types.is_string(to))
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        _existing: &Value,
        _owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        let types = ctx.types();
        let to = op.field_map.destination.ty;
        match source {
            Value::Str(s) => coerce::enum_by_name(types, to, s).map(Produced::Assign),
            Value::Enum(e) => Ok(Produced::Assign(Value::Str(e.constant.clone()))),
            other => Err(mismatch(ctx, "a string or enum constant", other)),
        }
    }
}

/// Enum to a different enum with a constant of the same name.
pub struct EnumToEnum;

impl Specification for EnumToEnum {
    fn name(&self) -> &'static str {
        "enum-to-enum"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        types.is_enum(fm.source.ty) && types.is_enum(fm.destination.ty)
    }

    fn is_unchanged(&self, source: &Value, existing: &Value) -> bool {
        match (source, existing) {
            (Value::Enum(a), Value::Enum(b)) => a.constant == b.constant,
            _ => false,
        }
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        _existing: &Value,
        _owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        match source {
            Value::Enum(e) => {
                coerce::enum_by_name(ctx.types(), op.field_map.destination.ty, &e.constant)
                    .map(Produced::Assign)
            }
            other => Err(mismatch(ctx, "an enum constant", other)),
        }
    }
}

/// String parsed into a primitive, wrapper or big integer; those formatted
/// as a string.
pub struct StringAndPrimitive;

impl Specification for StringAndPrimitive {
    fn name(&self) -> &'static str {
        "string-and-primitive"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        let (from, to) = (fm.source.ty, fm.destination.ty);
        (types.is_string(from) && coerce::is_text_convertible(types, to))
            || (coerce::is_text_convertible(types, from) && types.is_string(to))
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        _existing: &Value,
        _owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        let types = ctx.types();
        if let Value::Str(text) = source {
            return coerce::parse_scalar(types, text, op.field_map.destination.ty)
                .map(Produced::Assign);
        }
        match coerce::format_scalar(source) {
            Some(text) => Ok(Produced::Assign(Value::string(&text))),
            None => Err(mismatch(ctx, "a scalar", source)),
        }
    }
}

fn mismatch(ctx: &MappingContext<'_>, expected: &str, found: &Value) -> MappingError {
    MappingError::ValueMismatch {
        expected: expected.to_string(),
        found: found.describe(ctx.types()),
    }
}
