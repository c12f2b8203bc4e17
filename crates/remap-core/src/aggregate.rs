//! Aggregation of multi-occurrence field maps.
//!
//! Field maps written with `{}` element syntax are not mapped one by one.
//! They are grouped by destination container into a tree:
//!
//! - a **group** is one destination container fed by one or more parallel
//!   source containers (`names{}` and `ages{}` feeding `people{name}` and
//!   `people{age}`)
//! - each group owns an **element plan**: the leaf field ops applied to
//!   every element, plus nested groups for containers inside the elements
//!
//! At run time the source containers of a group are walked in parallel up
//! to the shortest one. Every step instantiates one destination element,
//! applies the leaves and recurses into nested groups with the current
//! source elements as their owners. New elements are collected and only
//! spliced into the destination container after the walk.

use crate::context::MappingContext;
use crate::error::{MappingError, Result};
use crate::executor;
use crate::factory::MapperFactory;
use crate::metadata::FieldMap;
use crate::property::Property;
use crate::specs::multi::{elements_of, fill_container, link_inverse};
use crate::specs::{FieldOp, Produced};
use crate::value::Value;
use indexmap::IndexMap;
use remap_types::TypeId;
use std::sync::Arc;
use tracing::{debug, trace};

/// All multi-occurrence groups of one mapping direction of a class map.
#[derive(Debug, Default)]
pub struct AggregatePlan {
    groups: Vec<Group>,
}

#[derive(Debug)]
struct SourceNode {
    /// Index of the owner among the source values of the enclosing level.
    owner: usize,
    /// Container property, without its element part.
    property: Arc<Property>,
}

#[derive(Debug)]
struct Group {
    sources: Vec<SourceNode>,
    /// Destination container, without its element part.
    destination: Arc<Property>,
    element: ElementPlan,
}

#[derive(Debug)]
struct Leaf {
    source: usize,
    op: FieldOp,
}

/// What happens to every element of a destination container.
#[derive(Debug)]
pub struct ElementPlan {
    element_ty: TypeId,
    leaves: Vec<Leaf>,
    children: Vec<Group>,
    /// Leaf whose destination is the element itself (`{}`).
    self_leaf: Option<usize>,
    /// Property on each element pointing back at the container owner.
    inverse: Option<Arc<Property>>,
}

impl AggregatePlan {
    pub fn build(
        field_maps: &[Arc<FieldMap>],
        factory: &MapperFactory,
        map_nulls: bool,
    ) -> Result<Self> {
        if field_maps.is_empty() {
            return Ok(Self::default());
        }
        let entries = field_maps
            .iter()
            .map(|fm| (0, (**fm).clone()))
            .collect();
        let groups = build_groups(entries, factory, map_nulls)?;
        debug!(groups = groups.len(), "built aggregate plan");
        Ok(Self { groups })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn run(&self, source: &Value, dest: &Value, ctx: &mut MappingContext<'_>) -> Result<()> {
        let owners = std::slice::from_ref(source);
        for group in &self.groups {
            group.run(owners, dest, ctx)?;
        }
        Ok(())
    }
}

/// Make both sides of `fm` the same shape. A plain multi-occurrence property
/// opposite an element expression is read as `property{}`.
fn normalize(mut fm: FieldMap, factory: &MapperFactory) -> Result<FieldMap> {
    let types = factory.types();
    let pad = |prop: &Arc<Property>| -> Option<Arc<Property>> {
        let element_ty = types.element_type(prop.ty)?;
        Some(Arc::new(prop.with_element(Arc::new(Property::self_element(element_ty)))))
    };
    match (fm.source.has_element(), fm.destination.has_element()) {
        (true, false) => {
            fm.destination = pad(&fm.destination).ok_or_else(|| depth_mismatch(factory, &fm))?;
        }
        (false, true) => {
            fm.source = pad(&fm.source).ok_or_else(|| depth_mismatch(factory, &fm))?;
        }
        _ => {}
    }
    Ok(fm)
}

fn depth_mismatch(factory: &MapperFactory, fm: &FieldMap) -> MappingError {
    let types = factory.types();
    MappingError::UnsupportedMultiOccurrence {
        from: format!("{} ({})", fm.source.expression, types.type_name(fm.source.ty)),
        to: format!("{} ({})", fm.destination.expression, types.type_name(fm.destination.ty)),
        reason: "element nesting differs and the shallower side is not multi-occurrence"
            .to_string(),
    }
}

fn strip(prop: &Property) -> Arc<Property> {
    let mut stripped = prop.clone();
    stripped.element = None;
    stripped.expression = stripped.path.clone();
    Arc::new(stripped)
}

#[derive(Default)]
struct PendingGroup {
    destination: Option<Arc<Property>>,
    sources: Vec<SourceNode>,
    elements: Vec<(usize, FieldMap)>,
    inverse: Option<Arc<Property>>,
}

fn build_groups(
    entries: Vec<(usize, FieldMap)>,
    factory: &MapperFactory,
    map_nulls: bool,
) -> Result<Vec<Group>> {
    let mut pending: IndexMap<Arc<str>, PendingGroup> = IndexMap::new();
    for (owner, fm) in entries {
        let fm = normalize(fm, factory)?;
        let destination = strip(&fm.destination);
        let source = strip(&fm.source);
        let slot = pending.entry(destination.path.clone()).or_default();
        slot.destination.get_or_insert(destination);
        let index = match slot
            .sources
            .iter()
            .position(|s| s.owner == owner && s.property.path == source.path)
        {
            Some(index) => index,
            None => {
                slot.sources.push(SourceNode {
                    owner,
                    property: source,
                });
                slot.sources.len() - 1
            }
        };
        if slot.inverse.is_none() {
            slot.inverse = fm.inverse.clone();
        }
        if let Some(element) = fm.element_map() {
            slot.elements.push((index, element));
        }
    }

    let types = factory.types();
    let mut groups = Vec::with_capacity(pending.len());
    for (_, slot) in pending {
        let Some(destination) = slot.destination else {
            continue;
        };
        let element_ty = types.element_type(destination.ty).unwrap_or(TypeId::OBJECT);
        let mut element = ElementPlan::build(slot.elements, element_ty, factory, map_nulls)?;
        element.inverse = slot.inverse;
        groups.push(Group {
            sources: slot.sources,
            destination,
            element,
        });
    }
    Ok(groups)
}

impl ElementPlan {
    /// Plan for elements of `element_ty`. Each entry pairs the index of the
    /// source element it reads from with an element-relative field map.
    pub fn build(
        entries: Vec<(usize, FieldMap)>,
        element_ty: TypeId,
        factory: &MapperFactory,
        map_nulls: bool,
    ) -> Result<Self> {
        let mut leaves = Vec::new();
        let mut deeper = Vec::new();
        let mut self_leaf = None;
        for (source, fm) in entries {
            let fm = normalize(fm, factory)?;
            if fm.is_multi_occurrence() {
                deeper.push((source, fm));
                continue;
            }
            let nulls = fm.map_nulls.unwrap_or(map_nulls);
            let is_self = fm.destination.is_self();
            let op = factory.specs().compile(fm, factory, nulls)?;
            if is_self {
                self_leaf = Some(leaves.len());
            }
            leaves.push(Leaf { source, op });
        }
        let children = build_groups(deeper, factory, map_nulls)?;
        if self_leaf.is_some() && (leaves.len() > 1 || !children.is_empty()) {
            return Err(MappingError::UnsupportedMultiOccurrence {
                from: factory.types().type_name(element_ty),
                to: factory.types().type_name(element_ty),
                reason: "an element cannot be mapped both whole and by property".to_string(),
            });
        }
        Ok(Self {
            element_ty,
            leaves,
            children,
            self_leaf,
            inverse: None,
        })
    }

    /// Walk `containers` in parallel and build one destination element per
    /// position. `owner` is the object that will hold the destination
    /// container.
    pub fn collect(
        &self,
        containers: &[Vec<Value>],
        owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Vec<Value>> {
        let len = containers.iter().map(Vec::len).min().unwrap_or(0);
        let mut collector = Vec::with_capacity(len);
        for i in 0..len {
            let current: Vec<Value> = containers.iter().map(|c| c[i].clone()).collect();
            let element = match self.self_leaf {
                Some(index) => self.produce_whole(&self.leaves[index], &current, owner, ctx)?,
                None => self.produce_by_parts(&current, ctx)?,
            };
            if let Some(inverse) = &self.inverse {
                link_inverse(ctx.types(), inverse, &element, owner)?;
            }
            collector.push(element);
        }
        trace!(elements = collector.len(), "collected elements");
        Ok(collector)
    }

    fn produce_whole(
        &self,
        leaf: &Leaf,
        current: &[Value],
        owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Value> {
        let value = leaf.op.field_map.source.read(&current[leaf.source]);
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(executor::produce(&leaf.op, &value, &Value::Null, owner, ctx)?.unwrap_or_default())
    }

    fn produce_by_parts(&self, current: &[Value], ctx: &mut MappingContext<'_>) -> Result<Value> {
        let hint = current.first().cloned().unwrap_or_default();
        let element = ctx.instantiate(self.element_ty, &hint)?;
        for leaf in &self.leaves {
            executor::run_field_op(&leaf.op, &current[leaf.source], &element, ctx)?;
        }
        for child in &self.children {
            child.run(current, &element, ctx)?;
        }
        Ok(element)
    }
}

impl Group {
    fn run(
        &self,
        source_owners: &[Value],
        dest_owner: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<()> {
        let types = ctx.types();
        let mut any_present = false;
        let containers: Vec<Vec<Value>> = self
            .sources
            .iter()
            .map(|node| {
                let owner = source_owners.get(node.owner).cloned().unwrap_or_default();
                let container = node.property.read(&owner);
                any_present |= !container.is_null();
                elements_of(types, &container)
            })
            .collect();
        if !any_present {
            return Ok(());
        }
        let Some(owner) = executor::destination_owner(dest_owner, &self.destination, true, ctx)?
        else {
            return Ok(());
        };
        let elements = self.element.collect(&containers, &owner, ctx)?;
        let existing = self.destination.read_from(&owner);
        if let Produced::Assign(container) =
            fill_container(types, &self.destination, elements, &existing)?
        {
            self.destination.write_to(&owner, container)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/aggregate_tests.rs"]
mod tests;
