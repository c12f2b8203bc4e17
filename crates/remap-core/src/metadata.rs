//! Class maps and field maps: the declarative description of how two types
//! correspond.

use crate::context::MappingContext;
use crate::property::Property;
use crate::value::Value;
use remap_types::TypeId;
use std::sync::Arc;

/// Which way a field map applies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Bidirectional,
    AToB,
    BToA,
}

impl Direction {
    pub fn allows_a_to_b(self) -> bool {
        matches!(self, Direction::Bidirectional | Direction::AToB)
    }

    pub fn allows_b_to_a(self) -> bool {
        matches!(self, Direction::Bidirectional | Direction::BToA)
    }

    pub fn flip(self) -> Self {
        match self {
            Direction::Bidirectional => Direction::Bidirectional,
            Direction::AToB => Direction::BToA,
            Direction::BToA => Direction::AToB,
        }
    }
}

/// One property correspondence. `source` is on the A side and `destination`
/// on the B side of the owning class map until flipped.
#[derive(Clone, Debug)]
pub struct FieldMap {
    pub source: Arc<Property>,
    pub destination: Arc<Property>,
    /// Property on each destination element that points back at the
    /// destination owner.
    pub inverse: Option<Arc<Property>>,
    /// Same, on the source side; becomes `inverse` when flipped.
    pub source_inverse: Option<Arc<Property>>,
    pub direction: Direction,
    pub excluded: bool,
    /// Declared explicitly rather than found by name matching.
    pub configured: bool,
    pub converter_id: Option<Arc<str>>,
    pub map_nulls: Option<bool>,
}

impl FieldMap {
    pub fn new(source: Arc<Property>, destination: Arc<Property>) -> Self {
        Self {
            source,
            destination,
            inverse: None,
            source_inverse: None,
            direction: Direction::Bidirectional,
            excluded: false,
            configured: true,
            converter_id: None,
            map_nulls: None,
        }
    }

    /// The same correspondence seen from the other side.
    pub fn flip(&self) -> Self {
        Self {
            source: self.destination.clone(),
            destination: self.source.clone(),
            inverse: self.source_inverse.clone(),
            source_inverse: self.inverse.clone(),
            direction: self.direction.flip(),
            excluded: self.excluded,
            configured: self.configured,
            converter_id: self.converter_id.clone(),
            map_nulls: self.map_nulls,
        }
    }

    /// Either side uses `{}` element syntax.
    pub fn is_multi_occurrence(&self) -> bool {
        self.source.has_element() || self.destination.has_element()
    }

    /// The element-level correspondence of an `a{x} -> b{y}` map, with the
    /// same options.
    pub fn element_map(&self) -> Option<FieldMap> {
        let source = self.source.element.clone()?;
        let destination = self.destination.element.clone()?;
        Some(FieldMap {
            source,
            destination,
            inverse: None,
            source_inverse: None,
            direction: self.direction,
            excluded: false,
            configured: self.configured,
            converter_id: self.converter_id.clone(),
            map_nulls: self.map_nulls,
        })
    }

    pub fn describe(&self) -> String {
        format!("{} -> {}", self.source.expression, self.destination.expression)
    }
}

/// Hook that runs after the generated field mappings of a class map.
pub trait CustomMapper: Send + Sync {
    fn map_a_to_b(
        &self,
        _a: &Value,
        _b: &Value,
        _ctx: &mut MappingContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn map_b_to_a(
        &self,
        _b: &Value,
        _a: &Value,
        _ctx: &mut MappingContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Correspondence between two types.
#[derive(Clone)]
pub struct ClassMap {
    pub a_type: TypeId,
    pub b_type: TypeId,
    pub field_maps: Vec<Arc<FieldMap>>,
    pub custom: Option<Arc<dyn CustomMapper>>,
    pub map_nulls: Option<bool>,
}

impl ClassMap {
    pub fn new(a_type: TypeId, b_type: TypeId) -> Self {
        Self {
            a_type,
            b_type,
            field_maps: Vec::new(),
            custom: None,
            map_nulls: None,
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(self.a_type, self.b_type)
    }

    /// `true` when a source of `source` maps through this class map
    /// from its B side.
    pub fn is_reverse_for(&self, source: TypeId, destination: TypeId) -> bool {
        self.b_type == source && self.a_type == destination && self.a_type != self.b_type
    }
}

impl std::fmt::Debug for ClassMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassMap")
            .field("a_type", &self.a_type)
            .field("b_type", &self.b_type)
            .field("field_maps", &self.field_maps.len())
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Unordered pair of types: `(A, B)` and `(B, A)` are the same key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PairKey {
    low: TypeId,
    high: TypeId,
}

impl PairKey {
    pub fn new(a: TypeId, b: TypeId) -> Self {
        if a.0 <= b.0 {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn contains(&self, ty: TypeId) -> bool {
        self.low == ty || self.high == ty
    }

    /// The other member of the pair.
    pub fn partner(&self, ty: TypeId) -> Option<TypeId> {
        if self.low == ty {
            Some(self.high)
        } else if self.high == ty {
            Some(self.low)
        } else {
            None
        }
    }
}
