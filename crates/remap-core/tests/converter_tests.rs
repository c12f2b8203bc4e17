use super::*;
use crate::config::MapperConfig;
use crate::factory::MapperFactory;
use remap_types::RawTypeDef;

fn factory_with(config: MapperConfig) -> MapperFactory {
    MapperFactory::builder(Arc::new(TypeInterner::new()))
        .config(config)
        .build()
        .expect("factory")
}

fn labelled(source: TypeId, destination: TypeId, label: &'static str) -> Arc<dyn Converter> {
    Arc::new(FnConverter::new(source, destination, move |_, _| Ok(Value::string(label))))
}

fn run(
    converter: &Arc<dyn Converter>,
    factory: &MapperFactory,
    value: &Value,
    to: TypeId,
) -> Result<Value> {
    let mut ctx = MappingContext::new(factory);
    converter.convert(value, to, &mut ctx)
}

#[test]
fn fits_accepts_boxing_and_subtypes() {
    let types = TypeInterner::new();
    assert!(fits(&types, TypeId::OBJECT, TypeId::INT));
    assert!(fits(&types, TypeId::INT, TypeId::INT_WRAPPER));
    assert!(fits(&types, TypeId::NUMBER, TypeId::LONG_WRAPPER));
    assert!(!fits(&types, TypeId::LONG, TypeId::INT));
    assert!(!fits(&types, TypeId::STRING, TypeId::INT_WRAPPER));
}

#[test]
fn builtins_cover_numbers_strings_and_enums() {
    let factory = factory_with(MapperConfig::default());
    let types = factory.types();
    let color = types
        .declare(RawTypeDef::enumeration("Color", ["RED"]))
        .expect("declare");
    let color = types.raw_type(color);
    let registry = ConverterRegistry::with_builtins();
    assert_eq!(registry.len(), 3);

    let numeric = registry.find(types, TypeId::INT_WRAPPER, TypeId::LONG).expect("numeric");
    assert_eq!(numeric.name(), "numeric");
    assert_eq!(
        run(&numeric, &factory, &Value::Int(4), TypeId::LONG).expect("widen"),
        Value::Long(4)
    );

    let string = registry.find(types, TypeId::STRING, TypeId::INT).expect("string");
    assert_eq!(string.name(), "string");
    assert_eq!(
        run(&string, &factory, &Value::string("17"), TypeId::INT).expect("parse"),
        Value::Int(17)
    );
    assert_eq!(
        run(&string, &factory, &Value::Double(1.5), TypeId::STRING).expect("format"),
        Value::string("1.5")
    );

    let enums = registry.find(types, color, TypeId::STRING).expect("enum");
    assert_eq!(enums.name(), "enum");
    assert_eq!(
        run(&enums, &factory, &Value::string("RED"), color).expect("by name"),
        Value::enum_constant(color, "RED")
    );

    assert!(registry.find(types, TypeId::STRING, TypeId::STRING).is_none());
    assert!(registry.find(types, TypeId::INT_WRAPPER, TypeId::INT).is_none());
}

#[test]
fn numeric_converter_honours_truncation() {
    let too_big = Value::BigInt(i128::from(i64::MAX) + 1);
    let numeric: Arc<dyn Converter> = Arc::new(NumericConverter);

    let strict = factory_with(MapperConfig::default());
    let err = run(&numeric, &strict, &too_big, TypeId::LONG).expect_err("overflow");
    assert!(matches!(err, MappingError::Overflow { .. }));

    let lenient = factory_with(MapperConfig::default().with_truncate_numbers(true));
    assert_eq!(
        run(&numeric, &lenient, &too_big, TypeId::LONG).expect("wrap"),
        Value::Long(i64::MIN)
    );
}

#[test]
fn later_converter_wins_when_as_specific() {
    let factory = factory_with(MapperConfig::default());
    let types = factory.types();
    let registry = ConverterRegistry::with_builtins();

    registry.register(labelled(TypeId::OBJECT, TypeId::STRING, "generic"));
    let found = registry.find(types, TypeId::INT_WRAPPER, TypeId::STRING).expect("generic");
    assert_eq!(
        run(&found, &factory, &Value::Int(1), TypeId::STRING).expect("run"),
        Value::string("generic")
    );

    registry.register(labelled(TypeId::INT_WRAPPER, TypeId::STRING, "specific"));
    let found = registry.find(types, TypeId::INT_WRAPPER, TypeId::STRING).expect("specific");
    assert_eq!(
        run(&found, &factory, &Value::Int(1), TypeId::STRING).expect("run"),
        Value::string("specific")
    );

    // Registered later but less specific: the specific one stays.
    registry.register(labelled(TypeId::NUMBER, TypeId::STRING, "number"));
    let found = registry.find(types, TypeId::INT_WRAPPER, TypeId::STRING).expect("specific");
    assert_eq!(
        run(&found, &factory, &Value::Int(1), TypeId::STRING).expect("run"),
        Value::string("specific")
    );

    // Unboxed source fits the wrapper declaration.
    assert!(registry.find(types, TypeId::INT, TypeId::STRING).is_some());
}

#[test]
fn named_converters_are_not_found_by_type() {
    let factory = factory_with(MapperConfig::default());
    let registry = ConverterRegistry::new();
    registry.register_with_id("upper", labelled(TypeId::STRING, TypeId::STRING, "UP"));
    assert!(registry.find(factory.types(), TypeId::STRING, TypeId::STRING).is_none());
    assert!(registry.by_id("upper").is_some());
    assert!(registry.by_id("lower").is_none());
    assert_eq!(registry.len(), 1);
}

#[test]
fn registration_clears_resolved_pairs() {
    let factory = factory_with(MapperConfig::default());
    let types = factory.types();
    let registry = ConverterRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.find(types, TypeId::STRING, TypeId::STRING).is_none());
    registry.register(labelled(TypeId::STRING, TypeId::STRING, "copy"));
    assert!(registry.find(types, TypeId::STRING, TypeId::STRING).is_some());
}

#[test]
fn closure_errors_pass_through() {
    let factory = factory_with(MapperConfig::default());
    let failing: Arc<dyn Converter> =
        Arc::new(FnConverter::new(TypeId::STRING, TypeId::INT, |value, _| {
            anyhow::bail!("cannot convert {value:?}")
        }));
    let err = run(&failing, &factory, &Value::string("x"), TypeId::INT).expect_err("custom");
    assert!(matches!(err, MappingError::Custom(_)));
    assert!(err.to_string().contains("cannot convert"));
}
