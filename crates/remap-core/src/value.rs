//! Dynamic values moved by the mapper.
//!
//! Scalars are plain data. Objects, sequences and maps are shared, mutable
//! references: cloning a `Value` clones the handle, never the graph, and
//! equality on references is identity. That is what lets one invocation
//! recognize a source object it has already mapped and reuse the result.
//!
//! Borrows of the inner `RefCell`s are always short: accessors copy handles
//! out, so nothing is borrowed while the mapper recurses.

use indexmap::IndexMap;
use remap_types::{PrimitiveKind, TypeId, TypeInterner};
use std::cell::{Ref, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

/// Runtime value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    /// Arbitrary-size integer, limited to the `i128` range. Wider values
    /// fail to parse.
    BigInt(i128),
    Str(Arc<str>),
    Enum(EnumValue),
    Object(ObjectRef),
    Seq(SeqRef),
    Map(MapRef),
}

/// A constant of an enum type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub ty: TypeId,
    pub constant: Arc<str>,
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    pub fn enum_constant(ty: TypeId, constant: &str) -> Self {
        Value::Enum(EnumValue {
            ty,
            constant: Arc::from(constant),
        })
    }

    /// A new object of `ty` with the given fields.
    pub fn object<'a>(ty: TypeId, fields: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        let obj = ObjectRef::new(ty);
        for (name, value) in fields {
            obj.set(name, value);
        }
        Value::Object(obj)
    }

    pub fn list(ty: TypeId, items: impl IntoIterator<Item = Value>) -> Self {
        Value::Seq(SeqRef::from_items(ty, SeqKind::List, items))
    }

    pub fn set(ty: TypeId, items: impl IntoIterator<Item = Value>) -> Self {
        Value::Seq(SeqRef::from_items(ty, SeqKind::Set, items))
    }

    pub fn array(ty: TypeId, items: impl IntoIterator<Item = Value>) -> Self {
        Value::Seq(SeqRef::from_items(ty, SeqKind::Array, items))
    }

    pub fn map(ty: TypeId, entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let map = MapRef::new(ty);
        for (k, v) in entries {
            map.insert(k, v);
        }
        Value::Map(map)
    }

    /// Zero value of a primitive kind.
    pub fn default_for(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Boolean => Value::Bool(false),
            PrimitiveKind::Byte => Value::Byte(0),
            PrimitiveKind::Short => Value::Short(0),
            PrimitiveKind::Int => Value::Int(0),
            PrimitiveKind::Long => Value::Long(0),
            PrimitiveKind::Float => Value::Float(0.0),
            PrimitiveKind::Double => Value::Double(0.0),
            PrimitiveKind::Char => Value::Char('\0'),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Address of the referenced object, for reference values.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Object(o) => Some(Rc::as_ptr(&o.0) as *const () as usize),
            Value::Seq(s) => Some(Rc::as_ptr(&s.0) as *const () as usize),
            Value::Map(m) => Some(Rc::as_ptr(&m.0) as *const () as usize),
            _ => None,
        }
    }

    /// The type this value reports at runtime. Scalars report their wrapper
    /// type, since a scalar value is always "boxed" once it stands alone.
    pub fn runtime_type(&self) -> TypeId {
        match self {
            Value::Null => TypeId::OBJECT,
            Value::Bool(_) => TypeId::BOOLEAN_WRAPPER,
            Value::Byte(_) => TypeId::BYTE_WRAPPER,
            Value::Short(_) => TypeId::SHORT_WRAPPER,
            Value::Int(_) => TypeId::INT_WRAPPER,
            Value::Long(_) => TypeId::LONG_WRAPPER,
            Value::Float(_) => TypeId::FLOAT_WRAPPER,
            Value::Double(_) => TypeId::DOUBLE_WRAPPER,
            Value::Char(_) => TypeId::CHAR_WRAPPER,
            Value::BigInt(_) => TypeId::BIG_INTEGER,
            Value::Str(_) => TypeId::STRING,
            Value::Enum(e) => e.ty,
            Value::Object(o) => o.type_id(),
            Value::Seq(s) => s.type_id(),
            Value::Map(m) => m.type_id(),
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Value::Bool(_) => PrimitiveKind::Boolean,
            Value::Byte(_) => PrimitiveKind::Byte,
            Value::Short(_) => PrimitiveKind::Short,
            Value::Int(_) => PrimitiveKind::Int,
            Value::Long(_) => PrimitiveKind::Long,
            Value::Float(_) => PrimitiveKind::Float,
            Value::Double(_) => PrimitiveKind::Double,
            Value::Char(_) => PrimitiveKind::Char,
            _ => return None,
        })
    }

    /// Integral value, for integer kinds and big integers.
    pub fn as_integer(&self) -> Option<i128> {
        Some(match self {
            Value::Byte(v) => i128::from(*v),
            Value::Short(v) => i128::from(*v),
            Value::Int(v) => i128::from(*v),
            Value::Long(v) => i128::from(*v),
            Value::BigInt(v) => *v,
            _ => return None,
        })
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&SeqRef> {
        match self {
            Value::Seq(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Field of an object value; `Null` for anything else.
    pub fn get(&self, name: &str) -> Value {
        self.as_object()
            .and_then(|o| o.get(name))
            .unwrap_or(Value::Null)
    }

    /// Elements of a sequence; empty for anything else.
    pub fn items(&self) -> Vec<Value> {
        match self {
            Value::Seq(s) => s.items(),
            _ => Vec::new(),
        }
    }

    /// Short description for error messages.
    pub fn describe(&self, types: &TypeInterner) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Str(s) => format!("{s:?}"),
            Value::Enum(e) => format!("{}.{}", types.type_name(e.ty), e.constant),
            Value::Object(_) | Value::Seq(_) | Value::Map(_) => {
                format!("an instance of `{}`", types.type_name(self.runtime_type()))
            }
            scalar => format!("{scalar:?}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Seq(a), Value::Seq(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Byte(v) => v.hash(state),
            Value::Short(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Char(v) => v.hash(state),
            Value::BigInt(v) => v.hash(state),
            Value::Str(v) => v.hash(state),
            Value::Enum(v) => v.hash(state),
            Value::Object(_) | Value::Seq(_) | Value::Map(_) => self.identity().hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::Byte(v) => write!(f, "Byte({v})"),
            Value::Short(v) => write!(f, "Short({v})"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::Long(v) => write!(f, "Long({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Double(v) => write!(f, "Double({v})"),
            Value::Char(v) => write!(f, "Char({v:?})"),
            Value::BigInt(v) => write!(f, "BigInt({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Enum(v) => write!(f, "Enum({:?}, {})", v.ty, v.constant),
            // Graphs may be cyclic: print the handle only.
            Value::Object(o) => {
                write!(f, "Object({:?} @ {:#x})", o.type_id(), self.identity().unwrap_or(0))
            }
            Value::Seq(s) => write!(f, "Seq({:?}, len {})", s.type_id(), s.len()),
            Value::Map(m) => write!(f, "Map({:?}, len {})", m.type_id(), m.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

// =============================================================================
// Objects
// =============================================================================

#[derive(Debug)]
pub struct Object {
    pub ty: TypeId,
    pub fields: IndexMap<Arc<str>, Value>,
}

/// Shared handle to an object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(ty: TypeId) -> Self {
        ObjectRef(Rc::new(RefCell::new(Object {
            ty,
            fields: IndexMap::new(),
        })))
    }

    pub fn type_id(&self) -> TypeId {
        self.0.borrow().ty
    }

    /// Field value; `None` when the field was never set.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().fields.get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) {
        let mut obj = self.0.borrow_mut();
        if let Some(slot) = obj.fields.get_mut(name) {
            *slot = value;
        } else {
            obj.fields.insert(Arc::from(name), value);
        }
    }

    pub fn field_names(&self) -> Vec<Arc<str>> {
        self.0.borrow().fields.keys().cloned().collect()
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }
}

// =============================================================================
// Sequences
// =============================================================================

/// What kind of sequence a `Seq` is. Sets reject duplicates; arrays keep the
/// length they were created with unless rebuilt.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SeqKind {
    List,
    Set,
    Array,
}

#[derive(Debug)]
pub struct Seq {
    pub ty: TypeId,
    pub kind: SeqKind,
    pub items: Vec<Value>,
}

#[derive(Clone)]
pub struct SeqRef(Rc<RefCell<Seq>>);

impl SeqRef {
    pub fn new(ty: TypeId, kind: SeqKind) -> Self {
        SeqRef(Rc::new(RefCell::new(Seq {
            ty,
            kind,
            items: Vec::new(),
        })))
    }

    pub fn from_items(ty: TypeId, kind: SeqKind, items: impl IntoIterator<Item = Value>) -> Self {
        let seq = Self::new(ty, kind);
        for item in items {
            seq.push(item);
        }
        seq
    }

    pub fn type_id(&self) -> TypeId {
        self.0.borrow().ty
    }

    pub fn kind(&self) -> SeqKind {
        self.0.borrow().kind
    }

    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().items.get(index).cloned()
    }

    /// Snapshot of the elements.
    pub fn items(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    /// Append; a set ignores an element it already holds.
    pub fn push(&self, value: Value) {
        let mut seq = self.0.borrow_mut();
        if seq.kind == SeqKind::Set && seq.items.contains(&value) {
            return;
        }
        seq.items.push(value);
    }

    /// Replace the element at `index`. Lists grow with nulls to reach it;
    /// arrays and sets report `false` when `index` is out of range.
    pub fn set(&self, index: usize, value: Value) -> bool {
        let mut seq = self.0.borrow_mut();
        if index >= seq.items.len() {
            if seq.kind != SeqKind::List {
                return false;
            }
            seq.items.resize(index + 1, Value::Null);
        }
        seq.items[index] = value;
        true
    }

    pub fn clear(&self) {
        self.0.borrow_mut().items.clear();
    }

    pub fn extend(&self, values: impl IntoIterator<Item = Value>) {
        for value in values {
            self.push(value);
        }
    }
}

// =============================================================================
// Maps
// =============================================================================

#[derive(Debug)]
pub struct MapData {
    pub ty: TypeId,
    pub entries: IndexMap<Value, Value>,
}

#[derive(Clone)]
pub struct MapRef(Rc<RefCell<MapData>>);

impl MapRef {
    pub fn new(ty: TypeId) -> Self {
        MapRef(Rc::new(RefCell::new(MapData {
            ty,
            entries: IndexMap::new(),
        })))
    }

    pub fn type_id(&self) -> TypeId {
        self.0.borrow().ty
    }

    pub fn len(&self) -> usize {
        self.0.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0.borrow().entries.get(key).cloned()
    }

    pub fn insert(&self, key: Value, value: Value) {
        self.0.borrow_mut().entries.insert(key, value);
    }

    /// Snapshot of the entries in insertion order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .borrow()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().entries.clear();
    }
}

#[cfg(test)]
#[path = "../tests/value_tests.rs"]
mod tests;
