//! Fluent construction of class maps.
//!
//! ```ignore
//! factory
//!     .class_map(person, person_dto)
//!     .field("name.first", "firstName")
//!     .field_map("tags", "labels").converter("tags").add()
//!     .exclude("password")
//!     .by_default()
//!     .register()?;
//! ```
//!
//! Expressions are resolved when the class map is built; the first problem
//! found is returned from `build` or `register`.

use crate::error::Result;
use crate::factory::MapperFactory;
use crate::metadata::{ClassMap, CustomMapper, Direction, FieldMap};
use remap_types::TypeId;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone, Debug)]
struct PendingField {
    a: String,
    b: String,
    direction: Direction,
    converter: Option<String>,
    a_inverse: Option<String>,
    b_inverse: Option<String>,
    map_nulls: Option<bool>,
    excluded: bool,
}

impl PendingField {
    fn new(a: &str, b: &str) -> Self {
        Self {
            a: a.to_string(),
            b: b.to_string(),
            direction: Direction::Bidirectional,
            converter: None,
            a_inverse: None,
            b_inverse: None,
            map_nulls: None,
            excluded: false,
        }
    }
}

#[must_use]
pub struct ClassMapBuilder<'f> {
    factory: &'f MapperFactory,
    a_type: TypeId,
    b_type: TypeId,
    fields: Vec<PendingField>,
    excluded: Vec<String>,
    by_default: bool,
    map_nulls: Option<bool>,
    custom: Option<Arc<dyn CustomMapper>>,
}

impl<'f> ClassMapBuilder<'f> {
    pub(crate) fn new(factory: &'f MapperFactory, a_type: TypeId, b_type: TypeId) -> Self {
        Self {
            factory,
            a_type,
            b_type,
            fields: Vec::new(),
            excluded: Vec::new(),
            by_default: false,
            map_nulls: None,
            custom: None,
        }
    }

    /// Map `a` to `b` both ways.
    pub fn field(self, a: &str, b: &str) -> Self {
        self.field_map(a, b).add()
    }

    pub fn field_a_to_b(self, a: &str, b: &str) -> Self {
        self.field_map(a, b).a_to_b().add()
    }

    pub fn field_b_to_a(self, a: &str, b: &str) -> Self {
        self.field_map(a, b).b_to_a().add()
    }

    /// Start a field map with options.
    pub fn field_map(self, a: &str, b: &str) -> FieldMapBuilder<'f> {
        FieldMapBuilder {
            field: PendingField::new(a, b),
            parent: self,
        }
    }

    /// Never map the property `name` of either side, even by default.
    pub fn exclude(mut self, name: &str) -> Self {
        self.excluded.push(name.to_string());
        self
    }

    /// Add same-name field maps for every property not mapped explicitly.
    pub fn by_default(mut self) -> Self {
        self.by_default = true;
        self
    }

    pub fn map_nulls(mut self, map_nulls: bool) -> Self {
        self.map_nulls = Some(map_nulls);
        self
    }

    /// Run `custom` after the field maps.
    pub fn customize(mut self, custom: Arc<dyn CustomMapper>) -> Self {
        self.custom = Some(custom);
        self
    }

    pub fn build(self) -> Result<ClassMap> {
        let factory = self.factory;
        let types = factory.types();
        let mut class_map = ClassMap::new(self.a_type, self.b_type);
        class_map.map_nulls = self.map_nulls;
        class_map.custom = self.custom.clone();

        let mut used_a: FxHashSet<String> = FxHashSet::default();
        let mut used_b: FxHashSet<String> = FxHashSet::default();

        for pending in &self.fields {
            let source = factory.property(self.a_type, &pending.a)?;
            let destination = factory.property(self.b_type, &pending.b)?;
            used_a.insert(root_name(&pending.a));
            used_b.insert(root_name(&pending.b));

            let mut fm = FieldMap::new(source.clone(), destination.clone());
            fm.direction = pending.direction;
            fm.excluded = pending.excluded;
            fm.converter_id = pending.converter.as_deref().map(Arc::from);
            fm.map_nulls = pending.map_nulls;
            if let Some(expr) = &pending.b_inverse {
                let owner = types.element_type(destination.ty).unwrap_or(destination.ty);
                fm.inverse = Some(factory.property(owner, expr)?);
            }
            if let Some(expr) = &pending.a_inverse {
                let owner = types.element_type(source.ty).unwrap_or(source.ty);
                fm.source_inverse = Some(factory.property(owner, expr)?);
            }
            class_map.field_maps.push(Arc::new(fm));
        }

        for name in &self.excluded {
            let a = factory.property(self.a_type, name).ok();
            let b = factory.property(self.b_type, name).ok();
            if let (Some(a), Some(b)) = (a, b) {
                let mut fm = FieldMap::new(a, b);
                fm.excluded = true;
                class_map.field_maps.push(Arc::new(fm));
            }
            used_a.insert(name.clone());
            used_b.insert(name.clone());
        }

        if self.by_default {
            let b_props = factory.properties(self.b_type)?;
            for a_prop in factory.properties(self.a_type)?.iter() {
                if used_a.contains(&*a_prop.name) || used_b.contains(&*a_prop.name) {
                    continue;
                }
                let Some(b_prop) = b_props.iter().find(|p| p.name == a_prop.name) else {
                    continue;
                };
                let mut fm = FieldMap::new(a_prop.clone(), b_prop.clone());
                fm.configured = false;
                trace!(field = %a_prop.name, "default field");
                class_map.field_maps.push(Arc::new(fm));
            }
        }
        Ok(class_map)
    }

    /// Build and register with the factory.
    pub fn register(self) -> Result<()> {
        let factory = self.factory;
        let class_map = self.build()?;
        factory.register_class_map(class_map)
    }
}

/// First segment of a path: `name` of `name.first`, `names{x}`, `names[0]`.
fn root_name(expression: &str) -> String {
    expression
        .split(['.', '[', '{'])
        .next()
        .unwrap_or(expression)
        .trim()
        .to_string()
}

/// Options for one field map; `add` returns to the class map builder.
#[must_use]
pub struct FieldMapBuilder<'f> {
    parent: ClassMapBuilder<'f>,
    field: PendingField,
}

impl<'f> FieldMapBuilder<'f> {
    pub fn a_to_b(mut self) -> Self {
        self.field.direction = Direction::AToB;
        self
    }

    pub fn b_to_a(mut self) -> Self {
        self.field.direction = Direction::BToA;
        self
    }

    /// Use the converter registered under `id`.
    pub fn converter(mut self, id: &str) -> Self {
        self.field.converter = Some(id.to_string());
        self
    }

    /// Property on each A-side element that points back at its owner.
    pub fn a_inverse(mut self, expression: &str) -> Self {
        self.field.a_inverse = Some(expression.to_string());
        self
    }

    /// Property on each B-side element that points back at its owner.
    pub fn b_inverse(mut self, expression: &str) -> Self {
        self.field.b_inverse = Some(expression.to_string());
        self
    }

    pub fn map_nulls(mut self, map_nulls: bool) -> Self {
        self.field.map_nulls = Some(map_nulls);
        self
    }

    pub fn exclude(mut self) -> Self {
        self.field.excluded = true;
        self
    }

    pub fn add(mut self) -> ClassMapBuilder<'f> {
        self.parent.fields.push(self.field);
        self.parent
    }
}
