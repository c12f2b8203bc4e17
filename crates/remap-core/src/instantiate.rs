//! Creating destination instances and normalizing source values.

use crate::context::MappingContext;
use crate::error::{MappingError, Result};
use crate::property::PropertyResolver;
use crate::value::{SeqKind, SeqRef, Value};
use remap_types::{CollectionKind, TypeId, TypeInterner};

/// Produces destination instances for a type, in place of default
/// construction.
pub trait ObjectFactory: Send + Sync {
    fn create(
        &self,
        source: &Value,
        destination: TypeId,
        ctx: &mut MappingContext<'_>,
    ) -> Result<Value>;
}

/// Object factory backed by a closure.
pub struct FnObjectFactory<F>(pub F);

impl<F> ObjectFactory for FnObjectFactory<F>
where
    F: Fn(&Value, TypeId) -> anyhow::Result<Value> + Send + Sync,
{
    fn create(
        &self,
        source: &Value,
        destination: TypeId,
        _ctx: &mut MappingContext<'_>,
    ) -> Result<Value> {
        (self.0)(source, destination).map_err(MappingError::Custom)
    }
}

/// Strips wrapper layers (proxies, decorators) from source values before a
/// strategy is chosen for them.
pub trait Unenhancer: Send + Sync {
    fn unenhance(&self, value: &Value) -> Value {
        value.clone()
    }

    fn unenhance_type(&self, ty: TypeId) -> TypeId {
        ty
    }
}

/// Leaves values untouched.
pub struct IdentityUnenhancer;

impl Unenhancer for IdentityUnenhancer {}

/// Default construction: empty containers, zeroed primitives and objects
/// whose declared properties start out null.
pub(crate) fn instantiate_default(
    types: &TypeInterner,
    properties: &dyn PropertyResolver,
    ty: TypeId,
) -> Result<Value> {
    if types.is_array(ty) {
        return Ok(Value::array(ty, []));
    }
    if types.is_collection(ty) {
        let element = types.element_type(ty).unwrap_or(TypeId::OBJECT);
        return Ok(match types.collection_kind(ty) {
            Some(CollectionKind::Set) => Value::Seq(SeqRef::new(ty, SeqKind::Set)),
            Some(CollectionKind::Any) => Value::list(types.list_of(element), []),
            _ => Value::Seq(SeqRef::new(ty, SeqKind::List)),
        });
    }
    if types.is_map(ty) {
        return Ok(Value::map(ty, []));
    }
    if types.is_entry(ty) {
        return Ok(Value::object(ty, [("key", Value::Null), ("value", Value::Null)]));
    }
    if let Some(kind) = types.primitive_kind(ty).filter(|_| types.is_primitive(ty)) {
        return Ok(Value::default_for(kind));
    }
    if types.is_scalar(ty) || types.is_abstract(ty) {
        return Err(MappingError::NotInstantiable(types.type_name(ty)));
    }
    let props = properties.properties(types, ty)?;
    let obj = Value::object(ty, []);
    if let Value::Object(o) = &obj {
        for prop in props.iter() {
            let initial = types
                .primitive_kind(prop.ty)
                .filter(|_| types.is_primitive(prop.ty))
                .map(Value::default_for)
                .unwrap_or(Value::Null);
            o.set(&prop.name, initial);
        }
    }
    Ok(obj)
}
