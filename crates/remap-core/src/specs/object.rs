use super::{FieldOp, Produced, Specification};
use crate::context::MappingContext;
use crate::error::Result;
use crate::factory::MapperFactory;
use crate::metadata::FieldMap;
use crate::value::Value;

/// Everything else: map the nested object through its own strategy. Also
/// the fallback for `Object`-typed properties, whose runtime type decides.
pub struct ObjectToObject;

impl Specification for ObjectToObject {
    fn name(&self) -> &'static str {
        "object-to-object"
    }

    fn applies_to(&self, fm: &FieldMap, factory: &MapperFactory) -> bool {
        let types = factory.types();
        let (from, to) = (fm.source.ty, fm.destination.ty);
        if types.is_any(from) || types.is_any(to) {
            return !types.is_primitive(from) && !types.is_primitive(to);
        }
        !types.is_scalar(from)
            && !types.is_scalar(to)
            && !types.is_multi_occurrence(from)
            && !types.is_multi_occurrence(to)
    }

    fn produce(
        &self,
        op: &FieldOp,
        source: &Value,
        existing: &Value,
        _owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Produced> {
        let to = op.field_map.destination.ty;
        let reuse = matches!(existing, Value::Object(_))
            && ctx.already_mapped(source, to).is_none()
            && !ctx.types().is_immutable(existing.runtime_type())
            && ctx
                .types()
                .is_assignable_from(to, existing.runtime_type());
        if reuse {
            ctx.map_into(source, existing)?;
            return Ok(Produced::InPlace);
        }
        ctx.map(source, to).map(Produced::Assign)
    }
}
