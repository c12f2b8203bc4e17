//! Compiled mappers: the executable form of a class map.
//!
//! A class map is compiled once per direction into a list of field ops (one
//! per single-valued field map, each bound to its rule of the specification
//! chain) and an aggregate plan for the `{}` field maps. All configuration
//! errors surface here, at registration, not on first use.

use crate::aggregate::AggregatePlan;
use crate::context::MappingContext;
use crate::error::{MappingError, Result};
use crate::executor;
use crate::factory::MapperFactory;
use crate::metadata::{ClassMap, Direction, FieldMap};
use crate::specs::FieldOp;
use crate::value::Value;
use remap_types::TypeId;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct MapperPlan {
    ops: Vec<FieldOp>,
    aggregate: AggregatePlan,
}

#[derive(Debug)]
pub struct CompiledMapper {
    class_map: Arc<ClassMap>,
    forward: MapperPlan,
    reverse: MapperPlan,
}

impl CompiledMapper {
    pub fn compile(class_map: Arc<ClassMap>, factory: &MapperFactory) -> Result<Self> {
        let forward = compile_plan(&class_map, false, factory)?;
        let reverse = if class_map.a_type == class_map.b_type {
            MapperPlan::default()
        } else {
            compile_plan(&class_map, true, factory)?
        };
        debug!(
            a = %factory.types().type_name(class_map.a_type),
            b = %factory.types().type_name(class_map.b_type),
            forward = forward.ops.len(),
            reverse = reverse.ops.len(),
            "compiled mapper"
        );
        Ok(Self {
            class_map,
            forward,
            reverse,
        })
    }

    pub fn class_map(&self) -> &Arc<ClassMap> {
        &self.class_map
    }

    pub fn a_type(&self) -> TypeId {
        self.class_map.a_type
    }

    pub fn b_type(&self) -> TypeId {
        self.class_map.b_type
    }

    /// Field ops of one direction.
    pub fn ops(&self, reverse: bool) -> &[FieldOp] {
        &self.plan(reverse).ops
    }

    pub fn has_aggregates(&self, reverse: bool) -> bool {
        !self.plan(reverse).aggregate.is_empty()
    }

    fn plan(&self, reverse: bool) -> &MapperPlan {
        if reverse && self.class_map.a_type != self.class_map.b_type {
            &self.reverse
        } else {
            &self.forward
        }
    }

    /// Map `source` onto `dest`; `reverse` maps from the B side to the A side.
    pub fn map(
        &self,
        source: &Value,
        dest: &Value,
        reverse: bool,
        ctx: &mut MappingContext<'_>,
    ) -> Result<()> {
        let plan = self.plan(reverse);
        for op in &plan.ops {
            executor::run_field_op(op, source, dest, ctx)?;
        }
        plan.aggregate.run(source, dest, ctx)?;
        if let Some(custom) = &self.class_map.custom {
            trace!(reverse, "running custom mapper");
            let outcome = if reverse {
                custom.map_b_to_a(source, dest, ctx)
            } else {
                custom.map_a_to_b(source, dest, ctx)
            };
            outcome.map_err(MappingError::Custom)?;
        }
        Ok(())
    }
}

fn compile_plan(
    class_map: &ClassMap,
    reverse: bool,
    factory: &MapperFactory,
) -> Result<MapperPlan> {
    let class_nulls = class_map.map_nulls.unwrap_or(factory.config().map_nulls);
    let mut ops = Vec::new();
    let mut multi = Vec::new();
    for declared in &class_map.field_maps {
        if declared.excluded {
            continue;
        }
        let allowed = if reverse {
            declared.direction.allows_b_to_a()
        } else {
            declared.direction.allows_a_to_b()
        };
        if !allowed {
            continue;
        }
        let fm = if reverse {
            declared.flip()
        } else {
            (**declared).clone()
        };
        if let Some(reason) = unusable(&fm, factory) {
            // A one-way field map that cannot run is a mistake; a
            // bidirectional or defaulted one just does not apply this way.
            if fm.configured && fm.direction != Direction::Bidirectional {
                return Err(reason);
            }
            trace!(field = %fm.describe(), reverse, "skipping field");
            continue;
        }
        if fm.is_multi_occurrence() {
            multi.push(Arc::new(fm));
            continue;
        }
        let nulls = fm.map_nulls.unwrap_or(class_nulls);
        let configured = fm.configured;
        let description = fm.describe();
        match factory.specs().compile(fm, factory, nulls) {
            Ok(op) => ops.push(op),
            Err(err) if !configured => {
                debug!(field = %description, error = %err, "skipping defaulted field");
            }
            Err(err) => return Err(err),
        }
    }
    let aggregate = AggregatePlan::build(&multi, factory, class_nulls)?;
    Ok(MapperPlan { ops, aggregate })
}

/// Why a field map cannot run in its current direction, if it cannot.
fn unusable(fm: &FieldMap, factory: &MapperFactory) -> Option<MappingError> {
    let types = factory.types();
    if !fm.source.readable {
        return Some(MappingError::IncompatibleField {
            from: fm.source.expression.to_string(),
            from_type: types.type_name(fm.source.ty),
            to: fm.destination.expression.to_string(),
            to_type: types.type_name(fm.destination.ty),
            reason: "source is not readable".to_string(),
        });
    }
    let dest = &fm.destination;
    let in_place = types.is_multi_occurrence(dest.ty)
        || (!types.is_scalar(dest.ty) && !types.is_immutable(dest.ty));
    if !dest.writable && !dest.has_element() && !in_place {
        return Some(MappingError::NotWritable(dest.expression.to_string()));
    }
    None
}

#[cfg(test)]
#[path = "../tests/mapper_tests.rs"]
mod tests;
