use super::*;

#[test]
fn references_compare_by_identity() {
    let a = Value::object(TypeId::OBJECT, [("x", Value::Int(1))]);
    let b = Value::object(TypeId::OBJECT, [("x", Value::Int(1))]);
    assert_eq!(a, a.clone());
    assert_ne!(a, b);
    assert_eq!(a.identity(), a.clone().identity());
    assert_ne!(a.identity(), b.identity());
}

#[test]
fn scalars_compare_by_value() {
    assert_eq!(Value::string("abc"), Value::from("abc"));
    assert_eq!(Value::Double(1.5), Value::from(1.5));
    assert_ne!(Value::Int(1), Value::Long(1));
    assert_eq!(Value::Float(f32::NAN), Value::Float(f32::NAN));
    assert_eq!(Value::Null, Value::default());
    assert!(Value::Int(3).identity().is_none());
}

#[test]
fn scalars_report_wrapper_types() {
    assert_eq!(Value::Int(1).runtime_type(), TypeId::INT_WRAPPER);
    assert_eq!(Value::Bool(true).runtime_type(), TypeId::BOOLEAN_WRAPPER);
    assert_eq!(Value::BigInt(1).runtime_type(), TypeId::BIG_INTEGER);
    assert_eq!(Value::string("s").runtime_type(), TypeId::STRING);
    assert_eq!(Value::Null.runtime_type(), TypeId::OBJECT);
}

#[test]
fn object_fields_are_shared_through_clones() {
    let obj = Value::object(TypeId::OBJECT, [("name", Value::string("a"))]);
    let alias = obj.clone();
    alias
        .as_object()
        .expect("object")
        .set("name", Value::string("b"));
    assert_eq!(obj.get("name"), Value::string("b"));
    assert_eq!(obj.get("missing"), Value::Null);
    assert_eq!(Value::Int(1).get("name"), Value::Null);
}

#[test]
fn field_order_is_insertion_order() {
    let obj = ObjectRef::new(TypeId::OBJECT);
    obj.set("b", Value::Int(1));
    obj.set("a", Value::Int(2));
    obj.set("b", Value::Int(3));
    let names: Vec<String> = obj.field_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, ["b", "a"]);
}

#[test]
fn sets_ignore_duplicates() {
    let set = Value::set(TypeId::OBJECT, [Value::Int(1), Value::Int(2), Value::Int(1)]);
    let seq = set.as_seq().expect("seq");
    assert_eq!(seq.kind(), SeqKind::Set);
    assert_eq!(seq.len(), 2);
}

#[test]
fn list_set_grows_array_set_does_not() {
    let list = SeqRef::new(TypeId::OBJECT, SeqKind::List);
    assert!(list.set(2, Value::Int(7)));
    assert_eq!(list.items(), vec![Value::Null, Value::Null, Value::Int(7)]);

    let array = SeqRef::from_items(TypeId::OBJECT, SeqKind::Array, [Value::Int(1)]);
    assert!(array.set(0, Value::Int(9)));
    assert!(!array.set(1, Value::Int(9)));
    assert_eq!(array.get(0), Some(Value::Int(9)));
}

#[test]
fn map_entries_keep_insertion_order() {
    let map = Value::map(
        TypeId::OBJECT,
        [
            (Value::string("z"), Value::Int(1)),
            (Value::string("a"), Value::Int(2)),
        ],
    );
    let map = map.as_map().expect("map");
    map.insert(Value::string("z"), Value::Int(3));
    let keys: Vec<Value> = map.entries().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![Value::string("z"), Value::string("a")]);
    assert_eq!(map.get(&Value::string("z")), Some(Value::Int(3)));
    map.clear();
    assert!(map.is_empty());
}

#[test]
fn numeric_accessors() {
    assert_eq!(Value::Byte(-3).as_integer(), Some(-3));
    assert_eq!(
        Value::BigInt(i128::from(i64::MAX) + 1).as_integer(),
        Some(i128::from(i64::MAX) + 1)
    );
    assert_eq!(Value::Float(0.5).as_float(), Some(0.5));
    assert_eq!(Value::string("1").as_integer(), None);
    assert_eq!(Value::Short(1).primitive_kind(), Some(PrimitiveKind::Short));
    assert_eq!(Value::default_for(PrimitiveKind::Char), Value::Char('\0'));
}

#[test]
fn cyclic_graph_debug_terminates() {
    let obj = Value::object(TypeId::OBJECT, []);
    obj.as_object().expect("object").set("me", obj.clone());
    let text = format!("{obj:?}");
    assert!(text.starts_with("Object("));
}

#[test]
fn describe_values() {
    let types = TypeInterner::new();
    assert_eq!(Value::Null.describe(&types), "null");
    assert_eq!(Value::string("x").describe(&types), "\"x\"");
    assert_eq!(Value::Int(4).describe(&types), "Int(4)");
    let list = Value::list(types.list_of(TypeId::STRING), []);
    assert!(list.describe(&types).starts_with("an instance of"));
}
