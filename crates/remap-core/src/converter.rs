//! Converters and the converter registry.
//!
//! A converter turns a value of one type into a value of another without
//! going through class maps. Lookup by type pair walks converters in
//! registration order; a later converter replaces an earlier match only when
//! its declared types are at least as specific.

use crate::coerce::{self, NumericTarget};
use crate::context::MappingContext;
use crate::error::{MappingError, Result};
use crate::value::Value;
use dashmap::DashMap;
use remap_types::{TypeId, TypeInterner};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};

pub trait Converter: Send + Sync {
    /// Declared source type.
    fn source_type(&self) -> TypeId;

    /// Declared destination type.
    fn destination_type(&self) -> TypeId;

    fn can_convert(&self, types: &TypeInterner, source: TypeId, destination: TypeId) -> bool {
        fits(types, self.source_type(), source) && fits(types, destination, self.destination_type())
    }

    fn convert(
        &self,
        value: &Value,
        destination: TypeId,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Value>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// `source` can stand where `target` is expected, boxing included.
pub(crate) fn fits(types: &TypeInterner, target: TypeId, source: TypeId) -> bool {
    target == source
        || target == TypeId::OBJECT
        || types.is_wrapper_compatible(target, source)
        || types.is_assignable_from(target, source)
}

// =============================================================================
// Closure converters
// =============================================================================

/// Converter backed by a closure.
pub struct FnConverter<F> {
    source: TypeId,
    destination: TypeId,
    convert: F,
}

impl<F> FnConverter<F>
where
    F: Fn(&Value, TypeId) -> anyhow::Result<Value> + Send + Sync,
{
    pub fn new(source: TypeId, destination: TypeId, convert: F) -> Self {
        Self {
            source,
            destination,
            convert,
        }
    }
}

impl<F> Converter for FnConverter<F>
where
    F: Fn(&Value, TypeId) -> anyhow::Result<Value> + Send + Sync,
{
    fn source_type(&self) -> TypeId {
        self.source
    }

    fn destination_type(&self) -> TypeId {
        self.destination
    }

    fn convert(
        &self,
        value: &Value,
        destination: TypeId,
        _ctx: &mut MappingContext<'_>,
    ) -> Result<Value> {
        (self.convert)(value, destination).map_err(MappingError::Custom)
    }
}

// =============================================================================
// Builtin converters
// =============================================================================

/// Between any two different numeric kinds.
pub struct NumericConverter;

impl Converter for NumericConverter {
    fn source_type(&self) -> TypeId {
        TypeId::OBJECT
    }

    fn destination_type(&self) -> TypeId {
        TypeId::OBJECT
    }

    fn can_convert(&self, types: &TypeInterner, source: TypeId, destination: TypeId) -> bool {
        match (NumericTarget::of(types, source), NumericTarget::of(types, destination)) {
            (Some(from), Some(to)) => from != to,
            _ => false,
        }
    }

    fn convert(
        &self,
        value: &Value,
        destination: TypeId,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Value> {
        let types = ctx.types();
        let target =
            NumericTarget::of(types, destination).ok_or_else(|| MappingError::ValueMismatch {
                expected: "a numeric type".to_string(),
                found: types.type_name(destination),
            })?;
        coerce::convert_numeric(value, target, ctx.config().truncate_numbers)
    }

    fn name(&self) -> &str {
        "numeric"
    }
}

/// Between strings and primitives, wrappers or big integers.
pub struct StringConverter;

impl Converter for StringConverter {
    fn source_type(&self) -> TypeId {
        TypeId::OBJECT
    }

    fn destination_type(&self) -> TypeId {
        TypeId::OBJECT
    }

    fn can_convert(&self, types: &TypeInterner, source: TypeId, destination: TypeId) -> bool {
        (types.is_string(source) && coerce::is_text_convertible(types, destination))
            || (coerce::is_text_convertible(types, source) && types.is_string(destination))
    }

    fn convert(
        &self,
        value: &Value,
        destination: TypeId,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Value> {
        let types = ctx.types();
        if let Value::Str(text) = value {
            return coerce::parse_scalar(types, text, destination);
        }
        coerce::format_scalar(value)
            .map(|s| Value::string(&s))
            .ok_or_else(|| MappingError::ValueMismatch {
                expected: "a scalar".to_string(),
                found: value.describe(types),
            })
    }

    fn name(&self) -> &str {
        "string"
    }
}

/// Enum to enum by constant name, string to enum and enum to string.
pub struct EnumConverter;

impl Converter for EnumConverter {
    fn source_type(&self) -> TypeId {
        TypeId::OBJECT
    }

    fn destination_type(&self) -> TypeId {
        TypeId::OBJECT
    }

    fn can_convert(&self, types: &TypeInterner, source: TypeId, destination: TypeId) -> bool {
        (types.is_enum(source) && types.is_enum(destination) && source != destination)
            || (types.is_string(source) && types.is_enum(destination))
            || (types.is_enum(source) && types.is_string(destination))
    }

    fn convert(
        &self,
        value: &Value,
        destination: TypeId,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Value> {
        let types = ctx.types();
        match value {
            Value::Enum(e) if types.is_string(destination) => Ok(Value::Str(e.constant.clone())),
            Value::Enum(e) => coerce::enum_by_name(types, destination, &e.constant),
            Value::Str(s) => coerce::enum_by_name(types, destination, s),
            other => Err(MappingError::ValueMismatch {
                expected: "an enum constant or string".to_string(),
                found: other.describe(types),
            }),
        }
    }

    fn name(&self) -> &str {
        "enum"
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
pub struct ConverterRegistry {
    ordered: RwLock<Vec<Arc<dyn Converter>>>,
    by_id: DashMap<Arc<str>, Arc<dyn Converter>>,
    resolved: DashMap<(TypeId, TypeId), Option<Arc<dyn Converter>>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the numeric, string and enum converters.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(NumericConverter));
        registry.register(Arc::new(StringConverter));
        registry.register(Arc::new(EnumConverter));
        registry
    }

    /// Add a converter that participates in lookup by type pair.
    pub fn register(&self, converter: Arc<dyn Converter>) {
        debug!(converter = converter.name(), "registering converter");
        self.ordered
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(converter);
        self.resolved.clear();
    }

    /// Add a converter that is only used where a field map names it.
    pub fn register_with_id(&self, id: &str, converter: Arc<dyn Converter>) {
        debug!(id, converter = converter.name(), "registering named converter");
        self.by_id.insert(Arc::from(id), converter);
    }

    pub fn by_id(&self, id: &str) -> Option<Arc<dyn Converter>> {
        self.by_id.get(id).map(|c| c.value().clone())
    }

    pub fn len(&self) -> usize {
        self.ordered.read().unwrap_or_else(PoisonError::into_inner).len() + self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best converter for `source -> destination`.
    pub fn find(
        &self,
        types: &TypeInterner,
        source: TypeId,
        destination: TypeId,
    ) -> Option<Arc<dyn Converter>> {
        if let Some(hit) = self.resolved.get(&(source, destination)) {
            return hit.value().clone();
        }
        let best = {
            let ordered = self.ordered.read().unwrap_or_else(PoisonError::into_inner);
            let mut best: Option<&Arc<dyn Converter>> = None;
            for candidate in ordered.iter() {
                if !candidate.can_convert(types, source, destination) {
                    continue;
                }
                best = match best {
                    Some(current) if !at_least_as_specific(types, candidate, current) => {
                        Some(current)
                    }
                    _ => Some(candidate),
                };
            }
            best.cloned()
        };
        trace!(
            source = source.0,
            destination = destination.0,
            found = best.as_ref().map(|c| c.name()),
            "converter lookup"
        );
        self.resolved
            .entry((source, destination))
            .or_insert(best)
            .value()
            .clone()
    }
}

fn at_least_as_specific(
    types: &TypeInterner,
    candidate: &Arc<dyn Converter>,
    current: &Arc<dyn Converter>,
) -> bool {
    fits(types, current.source_type(), candidate.source_type())
        && fits(types, current.destination_type(), candidate.destination_type())
}

#[cfg(test)]
#[path = "../tests/converter_tests.rs"]
mod tests;
