use super::*;
use crate::config::MAX_MAPPING_DEPTH;
use crate::instantiate::FnObjectFactory;
use rayon::prelude::*;
use remap_types::{RawTypeDef, RawTypeId, TypeRef};
use std::sync::atomic::{AtomicUsize, Ordering};

fn declare(types: &TypeInterner, def: RawTypeDef) -> TypeId {
    let raw = types.declare(def).expect("declare");
    types.raw_type(raw)
}

/// Id the next declaration will get, for self-referencing properties.
fn next_raw(types: &TypeInterner) -> RawTypeId {
    RawTypeId(types.raw_count() as u32)
}

struct People {
    factory: MapperFactory,
    address: TypeId,
    address_dto: TypeId,
    person: TypeId,
    person_dto: TypeId,
}

fn people_with(config: MapperConfig) -> People {
    let types = Arc::new(TypeInterner::new());
    let address = declare(&types, RawTypeDef::class("Address").field("city", TypeId::STRING));
    let address_dto = declare(
        &types,
        RawTypeDef::class("AddressDto").field("city", TypeId::STRING),
    );

    let person_raw = next_raw(&types);
    let person = declare(
        &types,
        RawTypeDef::class("Person")
            .field("name", TypeId::STRING)
            .field("age", TypeId::INT)
            .field("address", address)
            .field("friend", TypeRef::raw(person_raw))
            .field("tags", TypeRef::list_of(TypeId::STRING.into())),
    );
    assert_eq!(types.raw_of(person), Some(person_raw));

    let dto_raw = next_raw(&types);
    let person_dto = declare(
        &types,
        RawTypeDef::class("PersonDto")
            .field("name", TypeId::STRING)
            .field("age", TypeId::INT_WRAPPER)
            .field("address", address_dto)
            .field("friend", TypeRef::raw(dto_raw))
            .field("tags", TypeRef::list_of(TypeId::STRING.into())),
    );
    let factory = MapperFactory::builder(types).config(config).build().expect("factory");
    People {
        factory,
        address,
        address_dto,
        person,
        person_dto,
    }
}

/// Person and PersonDto matched by name; Address pairs are left to
/// generation.
fn people() -> People {
    let p = people_with(MapperConfig::default());
    p.factory
        .class_map(p.person, p.person_dto)
        .by_default()
        .register()
        .expect("register");
    p
}

impl People {
    fn address(&self, city: &str) -> Value {
        Value::object(self.address, [("city", Value::string(city))])
    }

    fn person(&self, name: &str, age: i32) -> Value {
        Value::object(self.person, [("name", Value::string(name)), ("age", Value::Int(age))])
    }
}

fn set(value: &Value, field: &str, to: Value) {
    value.as_object().expect("object").set(field, to);
}

#[test]
fn maps_nested_objects_and_generates_missing_class_maps() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let p = people();
    assert_eq!(p.factory.class_map_count(), 1);
    let ada = p.person("Ada", 36);
    set(&ada, "address", p.address("London"));
    set(
        &ada,
        "tags",
        Value::list(p.factory.types().list_of(TypeId::STRING), [Value::string("math")]),
    );

    let dto = p.factory.map(&ada, p.person_dto).expect("map");
    assert_eq!(dto.runtime_type(), p.person_dto);
    assert_eq!(dto.get("name"), Value::string("Ada"));
    assert_eq!(dto.get("age"), Value::Int(36));
    assert_eq!(dto.get("address").runtime_type(), p.address_dto);
    assert_eq!(dto.get("address").get("city"), Value::string("London"));
    assert_eq!(dto.get("tags").items(), vec![Value::string("math")]);
    assert_ne!(dto.get("tags"), ada.get("tags"));
    assert_eq!(p.factory.class_map_count(), 2);
    assert!(p.factory.class_map_for(p.address, p.address_dto).is_some());
}

#[test]
fn generation_off_is_an_error() {
    let p = people_with(MapperConfig::default().with_auto_generate(false));
    let err = p
        .factory
        .map(&p.address("Paris"), p.address_dto)
        .expect_err("no class map");
    assert!(matches!(err, MappingError::NoStrategy { .. }));
}

#[test]
fn cycles_and_shared_references_survive() {
    let p = people();
    let home = p.address("Rome");
    let a = p.person("A", 1);
    let b = p.person("B", 2);
    set(&a, "friend", b.clone());
    set(&b, "friend", a.clone());
    set(&a, "address", home.clone());
    set(&b, "address", home);

    let dto = p.factory.map(&a, p.person_dto).expect("map");
    let friend = dto.get("friend");
    assert_eq!(friend.get("name"), Value::string("B"));
    assert_eq!(friend.get("friend"), dto);
    assert_eq!(friend.get("address"), dto.get("address"));
}

#[test]
fn depth_limit_stops_deep_graphs() {
    let p = people_with(MapperConfig::default().with_max_depth(2));
    p.factory
        .class_map(p.person, p.person_dto)
        .field("name", "name")
        .field("friend", "friend")
        .register()
        .expect("register");
    let a = p.person("A", 1);
    let b = p.person("B", 2);
    set(&a, "friend", b.clone());
    assert!(p.factory.map(&a, p.person_dto).is_ok());

    set(&b, "friend", p.person("C", 3));
    let err = p.factory.map(&a, p.person_dto).expect_err("too deep");
    assert!(matches!(err, MappingError::DepthExceeded(2)));
}

/// Breaks a `friend` chain link by link so dropping it stays shallow.
fn unlink_friends(head: Value) {
    let mut node = head;
    while let Some(obj) = node.as_object().cloned() {
        node = obj.get("friend").unwrap_or_default();
        obj.set("friend", Value::Null);
    }
}

fn friend_chain(p: &People, len: u32) -> Value {
    let head = p.person("P0", 0);
    let mut tail = head.clone();
    for i in 1..len {
        let next = p.person(&format!("P{i}"), i as i32);
        set(&tail, "friend", next.clone());
        tail = next;
    }
    head
}

#[test]
fn chains_up_to_the_default_depth_limit_map() {
    let p = people();
    let head = friend_chain(&p, MAX_MAPPING_DEPTH - 1);

    let dto = p.factory.map(&head, p.person_dto).expect("map");
    let mut node = dto.clone();
    let mut len = 0;
    while !node.is_null() {
        len += 1;
        node = node.get("friend");
    }
    assert_eq!(len, MAX_MAPPING_DEPTH - 1);
    assert_eq!(dto.get("friend").get("name"), Value::string("P1"));

    unlink_friends(dto);
    unlink_friends(head);
}

#[test]
fn chains_past_the_default_depth_limit_fail() {
    let p = people();
    let head = friend_chain(&p, MAX_MAPPING_DEPTH + 1);
    let err = p.factory.map(&head, p.person_dto).expect_err("too deep");
    assert!(matches!(err, MappingError::DepthExceeded(MAX_MAPPING_DEPTH)));
    unlink_friends(head);
}

#[test]
fn null_mapping_is_off_by_default() {
    let p = people();
    let dto = Value::object(p.person_dto, [("name", Value::string("keep"))]);
    p.factory
        .map_into(&Value::object(p.person, []), &dto)
        .expect("map into");
    assert_eq!(dto.get("name"), Value::string("keep"));
}

#[test]
fn null_mapping_globally() {
    let p = people_with(MapperConfig::default().with_map_nulls(true));
    p.factory
        .class_map(p.person, p.person_dto)
        .field("name", "name")
        .register()
        .expect("register");
    let dto = Value::object(p.person_dto, [("name", Value::string("stale"))]);
    p.factory
        .map_into(&Value::object(p.person, [("name", Value::Null)]), &dto)
        .expect("map into");
    assert_eq!(dto.get("name"), Value::Null);
}

#[test]
fn null_mapping_per_class_and_field() {
    let p = people();
    p.factory
        .class_map(p.person, p.person_dto)
        .map_nulls(true)
        .field("name", "name")
        .field("age", "age")
        .field_map("address", "address")
        .map_nulls(false)
        .add()
        .register()
        .expect("register");

    let dto = Value::object(
        p.person_dto,
        [
            ("name", Value::string("stale")),
            ("address", Value::object(p.address_dto, [])),
        ],
    );
    let source = Value::object(p.person, [("name", Value::Null), ("address", Value::Null)]);
    let kept = dto.get("address");
    p.factory.map_into(&source, &dto).expect("map into");
    assert_eq!(dto.get("name"), Value::Null);
    assert_eq!(dto.get("address"), kept);

    // Reverse: a null wrapper zeroes the primitive.
    let person = p.person("Ada", 41);
    p.factory
        .map_into(&Value::object(p.person_dto, [("age", Value::Null)]), &person)
        .expect("reverse map into");
    assert_eq!(person.get("age"), Value::Int(0));
}

#[test]
fn round_trip_through_bound_mapper() {
    let p = people();
    let bound = p.factory.bound(p.person, p.person_dto);
    assert_eq!(bound.a_type(), p.person);
    assert_eq!(bound.b_type(), p.person_dto);

    let ada = p.person("Ada", 36);
    let dto = bound.map(&ada).expect("forward");
    let back = bound.map_reverse(&dto).expect("reverse");
    assert_eq!(back.runtime_type(), p.person);
    assert_eq!(back.get("name"), ada.get("name"));
    assert_eq!(back.get("age"), ada.get("age"));

    let target = p.person("old", 0);
    bound.map_reverse_into(&dto, &target).expect("reverse into");
    assert_eq!(target.get("name"), Value::string("Ada"));

    let existing = Value::object(p.person_dto, []);
    bound.map_into(&ada, &existing).expect("into");
    assert_eq!(existing.get("age"), Value::Int(36));
}

#[test]
fn list_helpers_share_one_context() {
    let p = people();
    let home = p.address("Oslo");
    let a = p.person("A", 1);
    let b = p.person("B", 2);
    set(&a, "address", home.clone());
    set(&b, "address", home);

    let mapped = p.factory.map_as_list(&[a.clone(), b.clone()], p.person_dto).expect("list");
    assert_eq!(mapped.len(), 2);
    assert_eq!(mapped[0].get("address"), mapped[1].get("address"));

    let array = p.factory.map_as_array(&[a, b], p.person_dto).expect("array");
    let types = p.factory.types();
    assert_eq!(array.runtime_type(), types.array_of(p.person_dto));
    assert_eq!(array.items().len(), 2);
}

#[test]
fn strategies_are_cached_and_shared() {
    let p = people();
    let first = p
        .factory
        .resolve_strategy(p.person, p.person_dto, false)
        .expect("strategy");
    let again = p
        .factory
        .resolve_strategy(p.person, p.person_dto, false)
        .expect("strategy");
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(first.kind, StrategyKind::InstantiateByDefaultAndMapForward);
    assert!(p.factory.cached_strategy_count() >= 1);

    p.factory.invalidate_strategies();
    assert_eq!(p.factory.cached_strategy_count(), 0);
    let fresh = p
        .factory
        .resolve_strategy(p.person, p.person_dto, false)
        .expect("strategy");
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(fresh.kind, first.kind);

    p.factory
        .class_map(p.address, p.address_dto)
        .by_default()
        .register()
        .expect("register");
    assert_eq!(p.factory.cached_strategy_count(), 0);
}

#[test]
fn generated_class_maps_keep_cached_strategies() {
    let p = people();
    let first = p
        .factory
        .resolve_strategy(p.person, p.person_dto, false)
        .expect("strategy");
    let cached = p.factory.cached_strategy_count();
    assert_eq!(p.factory.class_map_count(), 1);

    let dto = p.factory.map(&p.address("Oslo"), p.address_dto).expect("map");
    assert_eq!(dto.get("city"), Value::string("Oslo"));
    assert_eq!(p.factory.class_map_count(), 2);
    assert!(p.factory.cached_strategy_count() > cached);

    let again = p
        .factory
        .resolve_strategy(p.person, p.person_dto, false)
        .expect("strategy");
    assert!(Arc::ptr_eq(&first, &again));
}

#[test]
fn concurrent_first_resolution_agrees() {
    let p = people();
    let resolved: Vec<Arc<Strategy>> = (0..64)
        .into_par_iter()
        .map(|_| {
            p.factory
                .resolve_strategy(p.person, p.person_dto, false)
                .expect("strategy")
        })
        .collect();
    assert!(resolved.iter().all(|s| Arc::ptr_eq(s, &resolved[0])));
}

#[test]
fn concurrent_mapping_with_per_thread_values() {
    let p = people();
    let names: Vec<String> = (0..64)
        .into_par_iter()
        .map(|i| {
            let person = p.person(&format!("p{i}"), i);
            let dto = p.factory.map(&person, p.person_dto).expect("map");
            dto.get("name").as_str().unwrap_or_default().to_string()
        })
        .collect();
    assert_eq!(names[10], "p10");
    assert_eq!(names.len(), 64);
}

#[test]
fn strategy_kinds() {
    let p = people();
    let f = &p.factory;
    let types = f.types();
    let kind = |from, to, provided| f.resolve_strategy(from, to, provided).expect("strategy").kind;
    assert_eq!(
        kind(p.person_dto, p.person, false),
        StrategyKind::InstantiateByDefaultAndMapReverse
    );
    assert_eq!(kind(p.person, p.person_dto, true), StrategyKind::MapExistingForward);
    assert_eq!(kind(p.person_dto, p.person, true), StrategyKind::MapExistingReverse);
    assert_eq!(kind(TypeId::STRING, TypeId::STRING, false), StrategyKind::CopyByReference);
    assert_eq!(kind(TypeId::INT, TypeId::INT_WRAPPER, false), StrategyKind::CopyByReference);
    assert_eq!(kind(TypeId::INT_WRAPPER, TypeId::LONG_WRAPPER, false), StrategyKind::UseConverter);
    let strings = types.list_of(TypeId::STRING);
    assert_eq!(kind(strings, types.set_of(TypeId::STRING), false), StrategyKind::MapElements);
}

#[test]
fn existing_destination_cannot_take_a_copy() {
    let p = people();
    let err = p
        .factory
        .map_into(&Value::string("x"), &Value::string("y"))
        .expect_err("strings are replaced, not filled");
    assert!(matches!(err, MappingError::NoStrategy { .. }));
}

#[test]
fn source_subtype_uses_supertype_class_map() {
    let p = people();
    let types = p.factory.types();
    let person_raw = types.raw_of(p.person).expect("raw");
    let employee = declare(
        types,
        RawTypeDef::class("Employee")
            .extends(TypeRef::raw(person_raw))
            .field("badge", TypeId::STRING),
    );
    let clerk = Value::object(
        employee,
        [("name", Value::string("Eve")), ("badge", Value::string("B-7"))],
    );
    let dto = p.factory.map(&clerk, p.person_dto).expect("map");
    assert_eq!(dto.runtime_type(), p.person_dto);
    assert_eq!(dto.get("name"), Value::string("Eve"));
    assert_eq!(p.factory.class_map_count(), 1);
}

struct Hierarchy {
    factory: MapperFactory,
    source: TypeId,
    named: TypeId,
    sup: TypeId,
    mid: TypeId,
    sub: TypeId,
}

fn hierarchy() -> Hierarchy {
    let types = Arc::new(TypeInterner::new());
    let source = declare(&types, RawTypeDef::class("Source").field("name", TypeId::STRING));
    let named_raw = types
        .declare(RawTypeDef::interface("Named"))
        .expect("declare Named");
    let named = types.raw_type(named_raw);
    let sup_raw = types
        .declare(
            RawTypeDef::class("Super")
                .extends(TypeRef::raw(named_raw))
                .field("name", TypeId::STRING),
        )
        .expect("declare Super");
    let mid_raw = types
        .declare(RawTypeDef::class("Mid").extends(TypeRef::raw(sup_raw)))
        .expect("declare Mid");
    let sub = declare(&types, RawTypeDef::class("Sub").extends(TypeRef::raw(mid_raw)));
    let (sup, mid) = (types.raw_type(sup_raw), types.raw_type(mid_raw));
    let factory = MapperFactory::new(types).expect("factory");
    for target in [sup, mid, sub] {
        factory
            .class_map(source, target)
            .by_default()
            .register()
            .expect("register");
    }
    Hierarchy {
        factory,
        source,
        named,
        sup,
        mid,
        sub,
    }
}

#[test]
fn exact_destination_registration_wins() {
    let h = hierarchy();
    let source = Value::object(h.source, [("name", Value::string("n"))]);
    let mid = h.factory.map(&source, h.mid).expect("map");
    assert_eq!(mid.runtime_type(), h.mid);
    assert_eq!(mid.get("name"), Value::string("n"));
    assert_eq!(h.factory.map(&source, h.sup).expect("map").runtime_type(), h.sup);
}

#[test]
fn abstract_destination_resolves_to_most_specific() {
    let h = hierarchy();
    let source = Value::object(h.source, [("name", Value::string("n"))]);
    let named = h.factory.map(&source, h.named).expect("map");
    assert_eq!(named.runtime_type(), h.sub);
    assert_eq!(named.get("name"), Value::string("n"));
}

#[test]
fn unrelated_candidates_are_ambiguous() {
    let h = hierarchy();
    let types = h.factory.types();
    let named_raw = types.raw_of(h.named).expect("raw");
    let other = declare(
        types,
        RawTypeDef::class("Other")
            .extends(TypeRef::raw(named_raw))
            .field("name", TypeId::STRING),
    );
    h.factory
        .class_map(h.source, other)
        .by_default()
        .register()
        .expect("register");
    let source = Value::object(h.source, [("name", Value::string("n"))]);
    let err = h.factory.map(&source, h.named).expect_err("ambiguous");
    assert!(matches!(err, MappingError::AmbiguousDestination { .. }));
    assert!(err.is_configuration());
}

#[test]
fn object_factory_creates_destinations() {
    let p = people();
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    p.factory.register_object_factory(
        p.address_dto,
        Arc::new(FnObjectFactory(move |_source: &Value, ty: TypeId| -> anyhow::Result<Value> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::object(ty, [("city", Value::string("preset"))]))
        })),
    );
    p.factory
        .class_map(p.address, p.address_dto)
        .field("city", "city")
        .register()
        .expect("register");
    let strategy = p
        .factory
        .resolve_strategy(p.address, p.address_dto, false)
        .expect("strategy");
    assert_eq!(strategy.kind, StrategyKind::InstantiateAndMapForward);

    let dto = p.factory.map(&p.address("Lima"), p.address_dto).expect("map");
    assert_eq!(dto.get("city"), Value::string("Lima"));
    let blank = p
        .factory
        .map(&Value::object(p.address, [("city", Value::Null)]), p.address_dto)
        .expect("map");
    assert_eq!(blank.get("city"), Value::string("preset"));
    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[test]
fn object_factory_errors_pass_through() {
    let p = people();
    p.factory.register_object_factory(
        p.address_dto,
        Arc::new(FnObjectFactory(|_: &Value, _: TypeId| -> anyhow::Result<Value> {
            anyhow::bail!("no addresses today")
        })),
    );
    let err = p
        .factory
        .map(&p.address("Kyiv"), p.address_dto)
        .expect_err("factory fails");
    assert!(matches!(err, MappingError::Custom(_)));
}

struct StripProxy {
    proxy: TypeId,
    target: TypeId,
}

impl Unenhancer for StripProxy {
    fn unenhance(&self, value: &Value) -> Value {
        if value.runtime_type() == self.proxy {
            value.get("target")
        } else {
            value.clone()
        }
    }

    fn unenhance_type(&self, ty: TypeId) -> TypeId {
        if ty == self.proxy { self.target } else { ty }
    }
}

#[test]
fn unenhancer_strips_proxies() {
    let types = Arc::new(TypeInterner::new());
    let address = declare(&types, RawTypeDef::class("Address").field("city", TypeId::STRING));
    let proxy = declare(&types, RawTypeDef::class("AddressProxy").field("target", address));
    let dto = declare(&types, RawTypeDef::class("AddressDto").field("city", TypeId::STRING));
    let factory = MapperFactory::builder(types)
        .unenhancer(Arc::new(StripProxy {
            proxy,
            target: address,
        }))
        .build()
        .expect("factory");

    let real = Value::object(address, [("city", Value::string("Quito"))]);
    let wrapped = Value::object(proxy, [("target", real)]);
    let mapped = factory.map(&wrapped, dto).expect("map");
    assert_eq!(mapped.get("city"), Value::string("Quito"));
    assert!(factory.class_map_for(address, dto).is_some());
    assert!(factory.class_map_for(proxy, dto).is_none());

    let strategy = factory.resolve_strategy(proxy, dto, false).expect("strategy");
    assert_eq!(strategy.source, address);
}

#[test]
fn nested_destination_objects_are_created() {
    let p = people();
    let types = p.factory.types();
    let flat = declare(
        types,
        RawTypeDef::class("Flat")
            .field("name", TypeId::STRING)
            .field("city", TypeId::STRING),
    );
    p.factory
        .class_map(flat, p.person_dto)
        .field("name", "name")
        .field("city", "address.city")
        .register()
        .expect("register");

    let source = Value::object(
        flat,
        [("name", Value::string("Bo")), ("city", Value::string("Riga"))],
    );
    let dto = p.factory.map(&source, p.person_dto).expect("map");
    assert_eq!(dto.get("address").runtime_type(), p.address_dto);
    assert_eq!(dto.get("address").get("city"), Value::string("Riga"));

    let back = p.factory.map(&dto, flat).expect("reverse");
    assert_eq!(back.get("city"), Value::string("Riga"));

    // Nothing to write: the intermediate object is not created.
    let empty = p
        .factory
        .map(&Value::object(flat, [("name", Value::string("Cy"))]), p.person_dto)
        .expect("map");
    assert_eq!(empty.get("address"), Value::Null);
}

#[test]
fn maps_convert_keys_and_values() {
    let types = Arc::new(TypeInterner::new());
    let ledger = declare(
        &types,
        RawTypeDef::class("Ledger").field(
            "totals",
            TypeRef::map_of(TypeId::STRING.into(), TypeId::INT_WRAPPER.into()),
        ),
    );
    let ledger_dto = declare(
        &types,
        RawTypeDef::class("LedgerDto").field(
            "totals",
            TypeRef::map_of(TypeId::STRING.into(), TypeId::LONG_WRAPPER.into()),
        ),
    );
    let factory = MapperFactory::new(types.clone()).expect("factory");
    let totals = Value::map(
        types.map_of(TypeId::STRING, TypeId::INT_WRAPPER),
        [
            (Value::string("a"), Value::Int(5)),
            (Value::string("b"), Value::Int(-2)),
        ],
    );
    let dto = factory
        .map(&Value::object(ledger, [("totals", totals)]), ledger_dto)
        .expect("map");
    let mapped = dto.get("totals");
    assert_eq!(mapped.runtime_type(), types.map_of(TypeId::STRING, TypeId::LONG_WRAPPER));
    let map = mapped.as_map().expect("map value");
    assert_eq!(map.get(&Value::string("a")), Some(Value::Long(5)));
    assert_eq!(map.get(&Value::string("b")), Some(Value::Long(-2)));
    let keys: Vec<Value> = map.entries().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![Value::string("a"), Value::string("b")]);
}
