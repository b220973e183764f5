use bytes::Bytes;
use cql_codec::{
    CodecRegistry, CompositeValue, DataType, Error, PrimitiveKind, RegistryConfig, UserType, Value,
};
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr};

fn profile() -> DataType {
    UserType::new("app", "profile")
        .field("name", PrimitiveKind::Text)
        .field("age", PrimitiveKind::Int)
        .field("tags", DataType::list(PrimitiveKind::Text))
        .field("origin", DataType::tuple([PrimitiveKind::Inet, PrimitiveKind::Bigint]))
        .into()
}

fn sample_profile() -> CompositeValue {
    let origin = CompositeValue::new(DataType::tuple([PrimitiveKind::Inet, PrimitiveKind::Bigint]))
        .unwrap()
        .with(0, IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1)))
        .unwrap()
        .with(1, 7i64)
        .unwrap();
    CompositeValue::new(profile())
        .unwrap()
        .with("name", "ada")
        .unwrap()
        .with("age", Value::Null)
        .unwrap()
        .with("tags", Value::List(vec![Value::from("x"), Value::from("y")]))
        .unwrap()
        .with("origin", Value::Tuple(origin))
        .unwrap()
}

#[test]
fn test_udt_roundtrip_lazy_and_eager() {
    for lazy in [true, false] {
        let config = RegistryConfig {
            lazy_composites: lazy,
            ..RegistryConfig::default()
        };
        let registry = CodecRegistry::with_config(config).unwrap();
        let value = Value::Udt(sample_profile());
        let bytes = registry.encode(&profile(), &value).unwrap();
        let decoded = registry.decode(&profile(), bytes).unwrap();
        assert_eq!(decoded, value);

        let udt = decoded.as_composite().unwrap();
        assert_eq!(udt.get_i32("age").unwrap(), None);
        assert_eq!(udt.field_names(), vec!["name", "age", "tags", "origin"]);
    }
}

fn registry(lazy: bool) -> CodecRegistry {
    CodecRegistry::with_config(RegistryConfig {
        lazy_composites: lazy,
        ..RegistryConfig::default()
    })
    .unwrap()
}

/// Encode, decode, then encode the decoded value again; both encodings
/// must match and the decoded value must equal the original
fn assert_roundtrip(registry: &CodecRegistry, data_type: &DataType, value: Value) {
    let first = registry.encode(data_type, &value).unwrap();
    let decoded = registry.decode(data_type, first.clone()).unwrap();
    assert_eq!(decoded, value);
    let second = registry.encode(data_type, &decoded).unwrap();
    assert_eq!(second, first);
}

#[test]
fn test_nested_udt_roundtrip() {
    let udt2 = UserType::new("ks", "udt2").field("f2", PrimitiveKind::Text);
    let udt1: DataType = UserType::new("ks", "udt1").field("f1", udt2.clone()).into();
    let udt2: DataType = udt2.into();

    for lazy in [true, false] {
        let registry = registry(lazy);

        let inner = CompositeValue::new(udt2.clone()).unwrap().with("f2", "foo").unwrap();
        let outer = CompositeValue::new(udt1.clone())
            .unwrap()
            .with("f1", Value::Udt(inner))
            .unwrap();
        assert_roundtrip(&registry, &udt1, Value::Udt(outer));

        let empty_inner = CompositeValue::new(udt2.clone()).unwrap();
        let outer = CompositeValue::new(udt1.clone())
            .unwrap()
            .with("f1", Value::Udt(empty_inner))
            .unwrap();
        assert_roundtrip(&registry, &udt1, Value::Udt(outer));

        let null_inner = CompositeValue::new(udt1.clone()).unwrap();
        assert_roundtrip(&registry, &udt1, Value::Udt(null_inner));
    }
}

#[test]
fn test_nested_tuple_roundtrip() {
    let inner_type = DataType::tuple([PrimitiveKind::Text]);
    let outer_type = DataType::tuple([inner_type.clone()]);

    for lazy in [true, false] {
        let registry = registry(lazy);

        let inner = CompositeValue::new(inner_type.clone()).unwrap().with(0, "foo").unwrap();
        let outer = CompositeValue::new(outer_type.clone())
            .unwrap()
            .with(0, Value::Tuple(inner))
            .unwrap();
        assert_roundtrip(&registry, &outer_type, Value::Tuple(outer));

        let empty_inner = CompositeValue::new(inner_type.clone()).unwrap();
        let outer = CompositeValue::new(outer_type.clone())
            .unwrap()
            .with(0, Value::Tuple(empty_inner))
            .unwrap();
        assert_roundtrip(&registry, &outer_type, Value::Tuple(outer));

        let null_inner = CompositeValue::new(outer_type.clone()).unwrap();
        assert_roundtrip(&registry, &outer_type, Value::Tuple(null_inner));
    }
}

#[test]
fn test_omitted_trailing_fields_decode_as_null() {
    let registry = CodecRegistry::new().unwrap();
    let old_shape: DataType = UserType::new("app", "profile")
        .field("name", PrimitiveKind::Text)
        .into();
    let old = CompositeValue::new(old_shape.clone()).unwrap().with(0, "bob").unwrap();
    let bytes = registry.encode(&old_shape, &Value::Udt(old)).unwrap();

    let decoded = registry.decode(&profile(), bytes).unwrap();
    let udt = decoded.as_composite().unwrap();
    assert_eq!(udt.get_string("name").unwrap(), Some("bob"));
    assert!(udt.get("tags").unwrap().is_null());
    assert!(udt.get("origin").unwrap().is_null());
}

#[test]
fn test_truncated_composite_fails_top_level() {
    let registry = CodecRegistry::new().unwrap();
    let bytes = Bytes::from_static(&[0, 0, 0, 10, b'a']);
    let err = registry.decode(&profile(), Some(bytes)).unwrap_err();
    assert!(matches!(err, Error::MalformedValue(_)));
    assert!(err.is_decode_error());
}

#[test]
fn test_null_column() {
    let registry = CodecRegistry::new().unwrap();
    assert_eq!(registry.decode(&profile(), None).unwrap(), Value::Null);
}

proptest! {
    #[test]
    fn prop_int_list_roundtrip(items in proptest::collection::vec(any::<i32>(), 0..64)) {
        let registry = CodecRegistry::new().unwrap();
        let data_type = DataType::list(PrimitiveKind::Int);
        let value = Value::List(items.into_iter().map(Value::Int).collect());
        let bytes = registry.encode(&data_type, &value).unwrap();
        prop_assert_eq!(registry.decode(&data_type, bytes).unwrap(), value);
    }

    #[test]
    fn prop_tuple_roundtrip(a in any::<i64>(), b in ".{0,32}", c in any::<bool>()) {
        let registry = CodecRegistry::new().unwrap();
        let data_type = DataType::tuple([PrimitiveKind::Bigint, PrimitiveKind::Text, PrimitiveKind::Boolean]);
        let tuple = CompositeValue::new(data_type.clone())
            .unwrap()
            .with(0, a)
            .unwrap()
            .with(1, b.as_str())
            .unwrap()
            .with(2, c)
            .unwrap();
        let bytes = registry.encode(&data_type, &Value::Tuple(tuple.clone())).unwrap();
        let decoded = registry.decode(&data_type, bytes).unwrap();
        prop_assert_eq!(decoded.as_composite().unwrap().get_string(1).unwrap(), Some(b.as_str()));
        prop_assert_eq!(decoded, Value::Tuple(tuple));
    }
}
