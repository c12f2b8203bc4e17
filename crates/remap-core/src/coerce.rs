//! Scalar coercions shared by the builtin converters and the scalar rules of
//! the specification chain.

use crate::error::{MappingError, Result};
use crate::value::Value;
use remap_types::{PrimitiveKind, TypeId, TypeInterner};

/// A numeric destination.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NumericTarget {
    Primitive(PrimitiveKind),
    BigInteger,
}

impl NumericTarget {
    pub fn of(types: &TypeInterner, ty: TypeId) -> Option<Self> {
        if types.is_big_integer(ty) {
            return Some(NumericTarget::BigInteger);
        }
        types
            .primitive_kind(ty)
            .filter(|kind| kind.is_numeric())
            .map(NumericTarget::Primitive)
    }

    fn name(self) -> &'static str {
        match self {
            NumericTarget::Primitive(kind) => kind.primitive_name(),
            NumericTarget::BigInteger => "BigInteger",
        }
    }
}

fn overflow(value: impl ToString, target: NumericTarget) -> MappingError {
    MappingError::Overflow {
        value: value.to_string(),
        target: target.name().to_string(),
    }
}

macro_rules! narrow {
    ($value:expr, $ty:ty, $variant:ident, $target:expr, $truncate:expr) => {
        match <$ty>::try_from($value) {
            Ok(v) => Ok(Value::$variant(v)),
            Err(_) if $truncate => Ok(Value::$variant($value as $ty)),
            Err(_) => Err(overflow($value, $target)),
        }
    };
}

/// Convert between numeric kinds. Narrowing that loses information fails
/// unless `truncate` is set, in which case integers wrap and fractions are
/// dropped.
pub fn convert_numeric(value: &Value, target: NumericTarget, truncate: bool) -> Result<Value> {
    if let Some(int) = value.as_integer() {
        return integer_to(int, target, truncate);
    }
    if let Some(float) = value.as_float() {
        return float_to(float, target, truncate);
    }
    Err(MappingError::ValueMismatch {
        expected: target.name().to_string(),
        found: format!("{value:?}"),
    })
}

fn integer_to(value: i128, target: NumericTarget, truncate: bool) -> Result<Value> {
    match target {
        NumericTarget::BigInteger => Ok(Value::BigInt(value)),
        NumericTarget::Primitive(kind) => match kind {
            PrimitiveKind::Byte => narrow!(value, i8, Byte, target, truncate),
            PrimitiveKind::Short => narrow!(value, i16, Short, target, truncate),
            PrimitiveKind::Int => narrow!(value, i32, Int, target, truncate),
            PrimitiveKind::Long => narrow!(value, i64, Long, target, truncate),
            PrimitiveKind::Float => Ok(Value::Float(value as f32)),
            PrimitiveKind::Double => Ok(Value::Double(value as f64)),
            PrimitiveKind::Boolean | PrimitiveKind::Char => Err(overflow(value, target)),
        },
    }
}

fn float_to(value: f64, target: NumericTarget, truncate: bool) -> Result<Value> {
    match target {
        NumericTarget::Primitive(PrimitiveKind::Double) => Ok(Value::Double(value)),
        NumericTarget::Primitive(PrimitiveKind::Float) => Ok(Value::Float(value as f32)),
        _ => {
            let exact = value.is_finite()
                && value.fract() == 0.0
                && value >= i128::MIN as f64
                && value <= i128::MAX as f64;
            if exact {
                integer_to(value as i128, target, truncate)
            } else if truncate {
                integer_to(value as i128, target, true)
            } else {
                Err(overflow(value, target))
            }
        }
    }
}

/// Parse a string into a primitive, wrapper or big integer value. Big
/// integers outside the `i128` range are a `Parse` error.
pub fn parse_scalar(types: &TypeInterner, text: &str, target: TypeId) -> Result<Value> {
    let parse_err = || MappingError::Parse {
        value: text.to_string(),
        target: types.type_name(target),
    };
    if types.is_string(target) {
        return Ok(Value::string(text));
    }
    if types.is_big_integer(target) {
        return text.parse::<i128>().map(Value::BigInt).map_err(|_| parse_err());
    }
    let Some(kind) = types.primitive_kind(target) else {
        return Err(parse_err());
    };
    match kind {
        PrimitiveKind::Boolean => {
            if text.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(parse_err())
            }
        }
        PrimitiveKind::Byte => text.parse().map(Value::Byte).map_err(|_| parse_err()),
        PrimitiveKind::Short => text.parse().map(Value::Short).map_err(|_| parse_err()),
        PrimitiveKind::Int => text.parse().map(Value::Int).map_err(|_| parse_err()),
        PrimitiveKind::Long => text.parse().map(Value::Long).map_err(|_| parse_err()),
        PrimitiveKind::Float => text.parse().map(Value::Float).map_err(|_| parse_err()),
        PrimitiveKind::Double => text.parse().map(Value::Double).map_err(|_| parse_err()),
        PrimitiveKind::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(parse_err()),
            }
        }
    }
}

/// String form of a primitive, big integer or enum value.
pub fn format_scalar(value: &Value) -> Option<String> {
    Some(match value {
        Value::Bool(v) => v.to_string(),
        Value::Byte(v) => v.to_string(),
        Value::Short(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Char(v) => v.to_string(),
        Value::BigInt(v) => v.to_string(),
        Value::Str(v) => v.to_string(),
        Value::Enum(v) => v.constant.to_string(),
        _ => return None,
    })
}

/// The constant of `enum_ty` called `name`.
pub fn enum_by_name(types: &TypeInterner, enum_ty: TypeId, name: &str) -> Result<Value> {
    if types.enum_constants(enum_ty).iter().any(|c| &**c == name) {
        Ok(Value::enum_constant(enum_ty, name))
    } else {
        Err(MappingError::UnknownEnumConstant {
            enum_type: types.type_name(enum_ty),
            name: name.to_string(),
        })
    }
}

/// Types a string can be parsed into or formatted from.
pub fn is_text_convertible(types: &TypeInterner, ty: TypeId) -> bool {
    types.primitive_kind(ty).is_some() || types.is_big_integer(ty)
}

#[cfg(test)]
#[path = "../tests/coerce_tests.rs"]
mod tests;
