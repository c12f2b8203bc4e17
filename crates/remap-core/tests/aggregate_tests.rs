use super::*;
use crate::config::MapperConfig;
use remap_types::{PropertyDecl, RawTypeDef, TypeInterner, TypeRef};

fn list_of(ty: TypeId) -> TypeRef {
    TypeRef::list_of(TypeRef::Concrete(ty))
}

fn declare(types: &TypeInterner, def: RawTypeDef) -> TypeId {
    let raw = types.declare(def).expect("declare");
    types.raw_type(raw)
}

struct Roster {
    factory: MapperFactory,
    roster: TypeId,
    person_dto: TypeId,
    roster_dto: TypeId,
}

/// `names` and `ages` side by side on one side, `people{name, age}` on the
/// other.
fn roster() -> Roster {
    let types = Arc::new(TypeInterner::new());
    let roster = declare(
        &types,
        RawTypeDef::class("Roster")
            .field("names", list_of(TypeId::STRING))
            .field("ages", list_of(TypeId::INT_WRAPPER)),
    );
    let person_dto = declare(
        &types,
        RawTypeDef::class("PersonDto")
            .field("name", TypeId::STRING)
            .field("age", TypeId::INT),
    );
    let roster_dto = declare(
        &types,
        RawTypeDef::class("RosterDto").field("people", list_of(person_dto)),
    );
    let factory = MapperFactory::new(types).expect("factory");
    factory
        .class_map(roster, roster_dto)
        .field("names{}", "people{name}")
        .field("ages{}", "people{age}")
        .register()
        .expect("register");
    Roster {
        factory,
        roster,
        person_dto,
        roster_dto,
    }
}

fn strings(types: &TypeInterner, items: &[&str]) -> Value {
    Value::list(types.list_of(TypeId::STRING), items.iter().map(|s| Value::string(s)))
}

fn ints(types: &TypeInterner, items: &[i32]) -> Value {
    Value::list(types.list_of(TypeId::INT_WRAPPER), items.iter().map(|i| Value::Int(*i)))
}

#[test]
fn parallel_sources_share_one_group() {
    let r = roster();
    let mapper = r.factory.mapper_for(r.roster, r.roster_dto).expect("mapper");
    assert!(mapper.ops(false).is_empty());
    assert!(mapper.has_aggregates(false));
    assert!(mapper.has_aggregates(true));

    let class_map = r.factory.class_map_for(r.roster, r.roster_dto).expect("class map");
    let plan = AggregatePlan::build(&class_map.field_maps, &r.factory, false).expect("plan");
    assert_eq!(plan.group_count(), 1);
}

#[test]
fn parallel_walk_stops_at_the_shortest_source() {
    let r = roster();
    let types = r.factory.types();
    let source = Value::object(
        r.roster,
        [
            ("names", strings(types, &["Ada", "Bob", "Cy"])),
            ("ages", ints(types, &[36, 41])),
        ],
    );
    let dto = r.factory.map(&source, r.roster_dto).expect("map");
    let people = dto.get("people").items();
    assert_eq!(people.len(), 2);
    assert_eq!(people[0].runtime_type(), r.person_dto);
    assert_eq!(people[0].get("name"), Value::string("Ada"));
    assert_eq!(people[0].get("age"), Value::Int(36));
    assert_eq!(people[1].get("name"), Value::string("Bob"));
    assert_eq!(people[1].get("age"), Value::Int(41));
}

#[test]
fn elements_split_back_into_parallel_containers() {
    let r = roster();
    let types = r.factory.types();
    let people = Value::list(
        types.list_of(r.person_dto),
        [
            Value::object(r.person_dto, [("name", Value::string("Ada")), ("age", Value::Int(36))]),
            Value::object(r.person_dto, [("name", Value::string("Bob")), ("age", Value::Int(41))]),
        ],
    );
    let dto = Value::object(r.roster_dto, [("people", people)]);
    let back = r.factory.map(&dto, r.roster).expect("reverse");
    assert_eq!(back.get("names").items(), vec![Value::string("Ada"), Value::string("Bob")]);
    assert_eq!(back.get("ages").items(), vec![Value::Int(36), Value::Int(41)]);
}

#[test]
fn absent_sources_leave_the_destination_alone() {
    let r = roster();
    let source = Value::object(r.roster, [("names", Value::Null), ("ages", Value::Null)]);
    let dto = r.factory.map(&source, r.roster_dto).expect("map");
    assert_eq!(dto.get("people"), Value::Null);
}

#[test]
fn nested_groups() {
    let types = Arc::new(TypeInterner::new());
    let line = declare(
        &types,
        RawTypeDef::class("Line")
            .field("sku", TypeId::STRING)
            .field("tags", list_of(TypeId::STRING)),
    );
    let order = declare(&types, RawTypeDef::class("Order").field("lines", list_of(line)));
    let item = declare(
        &types,
        RawTypeDef::class("Item")
            .field("code", TypeId::STRING)
            .field("labels", list_of(TypeId::STRING)),
    );
    let order_dto = declare(&types, RawTypeDef::class("OrderDto").field("items", list_of(item)));
    let factory = MapperFactory::new(types.clone()).expect("factory");
    factory
        .class_map(order, order_dto)
        .field_a_to_b("lines{sku}", "items{code}")
        .field_a_to_b("lines{tags{}}", "items{labels{}}")
        .register()
        .expect("register");

    let lines = Value::list(
        types.list_of(line),
        [
            Value::object(
                line,
                [("sku", Value::string("A1")), ("tags", strings(&types, &["x", "y"]))],
            ),
            Value::object(line, [("sku", Value::string("B2")), ("tags", strings(&types, &[]))]),
        ],
    );
    let source = Value::object(order, [("lines", lines)]);
    let dto = factory.map(&source, order_dto).expect("map");
    let items = dto.get("items").items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].get("code"), Value::string("A1"));
    assert_eq!(items[0].get("labels").items(), vec![Value::string("x"), Value::string("y")]);
    assert_eq!(items[1].get("code"), Value::string("B2"));
    assert!(items[1].get("labels").items().is_empty());
}

#[test]
fn map_entries_iterate_as_key_and_value() {
    let types = Arc::new(TypeInterner::new());
    let scores_ty = types.map_of(TypeId::STRING, TypeId::INT_WRAPPER);
    let card = declare(
        &types,
        RawTypeDef::class("Card").field(
            "scores",
            TypeRef::map_of(
                TypeRef::Concrete(TypeId::STRING),
                TypeRef::Concrete(TypeId::INT_WRAPPER),
            ),
        ),
    );
    let score = declare(
        &types,
        RawTypeDef::class("Score")
            .field("subject", TypeId::STRING)
            .field("points", TypeId::INT),
    );
    let card_dto = declare(&types, RawTypeDef::class("CardDto").field("rows", list_of(score)));
    let factory = MapperFactory::new(types.clone()).expect("factory");
    factory
        .class_map(card, card_dto)
        .field_a_to_b("scores{key}", "rows{subject}")
        .field_a_to_b("scores{value}", "rows{points}")
        .register()
        .expect("register");

    let scores = Value::map(
        scores_ty,
        [
            (Value::string("math"), Value::Int(9)),
            (Value::string("art"), Value::Int(7)),
        ],
    );
    let dto = factory
        .map(&Value::object(card, [("scores", scores)]), card_dto)
        .expect("map");
    let rows = dto.get("rows").items();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("subject"), Value::string("math"));
    assert_eq!(rows[0].get("points"), Value::Int(9));
    assert_eq!(rows[1].get("subject"), Value::string("art"));
}

#[test]
fn inverse_property_points_at_the_owner() {
    let types = Arc::new(TypeInterner::new());
    let member = declare(&types, RawTypeDef::class("Member").field("name", TypeId::STRING));
    let team = declare(&types, RawTypeDef::class("Team").field("members", list_of(member)));
    let member_dto = declare(
        &types,
        RawTypeDef::class("MemberDto")
            .field("name", TypeId::STRING)
            .field("team", TypeId::OBJECT),
    );
    let team_dto = declare(
        &types,
        RawTypeDef::class("TeamDto").field("members", list_of(member_dto)),
    );
    let factory = MapperFactory::new(types.clone()).expect("factory");
    factory
        .class_map(team, team_dto)
        .field_map("members{name}", "members{name}")
        .b_inverse("team")
        .a_to_b()
        .add()
        .register()
        .expect("register");

    let members = Value::list(
        types.list_of(member),
        [
            Value::object(member, [("name", Value::string("Ann"))]),
            Value::object(member, [("name", Value::string("Ben"))]),
        ],
    );
    let dto = factory
        .map(&Value::object(team, [("members", members)]), team_dto)
        .expect("map");
    let mapped = dto.get("members").items();
    assert_eq!(mapped.len(), 2);
    assert_eq!(mapped[1].get("name"), Value::string("Ben"));
    for m in &mapped {
        assert_eq!(m.get("team"), dto);
    }
}

#[test]
fn collection_inverse_is_appended_to() {
    let types = Arc::new(TypeInterner::new());
    let course = declare(&types, RawTypeDef::class("Course").field("title", TypeId::STRING));
    let student = declare(&types, RawTypeDef::class("Student").field("courses", list_of(course)));
    let course_dto = declare(
        &types,
        RawTypeDef::class("CourseDto")
            .field("title", TypeId::STRING)
            .field("students", list_of(TypeId::OBJECT)),
    );
    let student_dto = declare(
        &types,
        RawTypeDef::class("StudentDto").field("courses", list_of(course_dto)),
    );
    let factory = MapperFactory::new(types.clone()).expect("factory");
    factory
        .class_map(student, student_dto)
        .field_map("courses{title}", "courses{title}")
        .b_inverse("students")
        .a_to_b()
        .add()
        .register()
        .expect("register");

    let courses = Value::list(
        types.list_of(course),
        [Value::object(course, [("title", Value::string("Logic"))])],
    );
    let dto = factory
        .map(&Value::object(student, [("courses", courses)]), student_dto)
        .expect("map");
    let mapped = dto.get("courses").items();
    assert_eq!(mapped.len(), 1);
    assert_eq!(mapped[0].get("students").items(), vec![dto.clone()]);
}

#[test]
fn unknown_inverse_is_rejected() {
    let r = roster();
    let err = r
        .factory
        .class_map(r.roster, r.roster_dto)
        .field_map("names{}", "people{name}")
        .b_inverse("club")
        .add()
        .register()
        .expect_err("no such property");
    assert!(matches!(err, MappingError::UnknownProperty { .. }));
}

#[test]
fn shape_mismatch_is_rejected_at_registration() {
    let r = roster();
    let types = r.factory.types();
    let titled = declare(types, RawTypeDef::class("Titled").field("title", TypeId::STRING));
    let err = r
        .factory
        .class_map(r.roster, titled)
        .field_a_to_b("names{}", "title")
        .register()
        .expect_err("depth mismatch");
    assert!(matches!(err, MappingError::UnsupportedMultiOccurrence { .. }));
}

#[test]
fn plain_container_opposite_elements_is_padded() {
    let r = roster();
    let types = r.factory.types();
    let labelled = declare(
        types,
        RawTypeDef::class("Labelled").field("labels", list_of(TypeId::STRING)),
    );
    r.factory
        .class_map(r.roster, labelled)
        .field_a_to_b("names{}", "labels")
        .register()
        .expect("register");
    let source = Value::object(r.roster, [("names", strings(types, &["a", "b"]))]);
    let dto = r.factory.map(&source, labelled).expect("map");
    assert_eq!(dto.get("labels").items(), vec![Value::string("a"), Value::string("b")]);
}

#[test]
fn element_mapped_whole_and_by_parts_is_rejected() {
    let types = Arc::new(TypeInterner::new());
    let person = declare(&types, RawTypeDef::class("Person").field("name", TypeId::STRING));
    let person_dto = declare(
        &types,
        RawTypeDef::class("PersonDto")
            .field("name", TypeId::STRING)
            .field("age", TypeId::INT),
    );
    let club = declare(
        &types,
        RawTypeDef::class("Club")
            .field("people", list_of(person))
            .field("ages", list_of(TypeId::INT_WRAPPER)),
    );
    let club_dto = declare(
        &types,
        RawTypeDef::class("ClubDto").field("people", list_of(person_dto)),
    );
    let factory = MapperFactory::new(types).expect("factory");
    let err = factory
        .class_map(club, club_dto)
        .field_a_to_b("people{}", "people{}")
        .field_a_to_b("ages{}", "people{age}")
        .register()
        .expect_err("mixed element mapping");
    assert!(matches!(err, MappingError::UnsupportedMultiOccurrence { .. }));
}

#[test]
fn read_only_container_is_refilled_in_place() {
    let types = Arc::new(TypeInterner::new());
    let source_ty = declare(
        &types,
        RawTypeDef::class("Tags").field("names", list_of(TypeId::STRING)),
    );
    let dest_ty = declare(
        &types,
        RawTypeDef::class("TagView")
            .property(PropertyDecl::new("labels", list_of(TypeId::STRING)).read_only()),
    );
    let factory = MapperFactory::builder(types.clone())
        .config(MapperConfig::default())
        .build()
        .expect("factory");
    factory
        .class_map(source_ty, dest_ty)
        .field_a_to_b("names{}", "labels{}")
        .register()
        .expect("register");

    let labels = strings(&types, &["stale"]);
    let dest = Value::object(dest_ty, [("labels", labels.clone())]);
    let source = Value::object(source_ty, [("names", strings(&types, &["fresh", "new"]))]);
    factory.map_into(&source, &dest).expect("map into");
    assert_eq!(dest.get("labels"), labels);
    assert_eq!(labels.items(), vec![Value::string("fresh"), Value::string("new")]);

    // A fresh destination has no container to refill.
    let err = factory.map(&source, dest_ty).expect_err("nothing to refill");
    assert!(matches!(err, MappingError::NotWritable(_)));
}

#[test]
fn failed_element_leaves_the_destination_container_untouched() {
    let types = Arc::new(TypeInterner::new());
    let tags = declare(&types, RawTypeDef::class("Tags").field("names", list_of(TypeId::STRING)));
    let counts = declare(
        &types,
        RawTypeDef::class("Counts").field("values", list_of(TypeId::INT_WRAPPER)),
    );
    let count_view = declare(
        &types,
        RawTypeDef::class("CountView")
            .property(PropertyDecl::new("values", list_of(TypeId::INT_WRAPPER)).read_only()),
    );
    let factory = MapperFactory::new(types.clone()).expect("factory");
    for dest_ty in [counts, count_view] {
        factory
            .class_map(tags, dest_ty)
            .field_a_to_b("names{}", "values{}")
            .register()
            .expect("register");
    }

    let source = Value::object(tags, [("names", strings(&types, &["1", "x", "3"]))]);
    for dest_ty in [counts, count_view] {
        let values = ints(&types, &[7, 8]);
        let dest = Value::object(dest_ty, [("values", values.clone())]);
        let err = factory.map_into(&source, &dest).expect_err("unparseable element");
        assert!(matches!(err, MappingError::Parse { ref value, .. } if value == "x"));
        assert_eq!(dest.get("values"), values);
        assert_eq!(values.items(), vec![Value::Int(7), Value::Int(8)]);
    }
}

#[test]
fn element_plan_collects_by_parts() {
    let r = roster();
    let name_prop = r.factory.property(r.person_dto, "name").expect("name");
    let self_prop = Arc::new(Property::self_element(TypeId::STRING));
    let entries = vec![(0, FieldMap::new(self_prop, name_prop))];
    let plan = ElementPlan::build(entries, r.person_dto, &r.factory, false).expect("plan");

    let mut ctx = MappingContext::new(&r.factory);
    let owner = Value::object(r.roster_dto, []);
    let names = vec![Value::string("Ann"), Value::string("Ben")];
    let out = plan.collect(&[names], &owner, &mut ctx).expect("collect");
    assert_eq!(out.len(), 2);
    assert_eq!(out[1].get("name"), Value::string("Ben"));
    assert_eq!(out[1].runtime_type(), r.person_dto);
}
