use cql_codec::{CodecRegistry, DataType, PrimitiveKind, TypeCodec, UserType, Value};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 128;

/// Five levels of UDTs and tuples, rebuilt from scratch on every call so
/// each thread holds its own descriptor instances
fn deep_type() -> DataType {
    let level5 = UserType::new("ks", "level5").field("leaf", PrimitiveKind::Text);
    let level4 = DataType::tuple([DataType::from(level5), DataType::from(PrimitiveKind::Int)]);
    let level3 = UserType::new("ks", "level3")
        .field("inner", level4)
        .field("tags", DataType::set(PrimitiveKind::Text));
    let level2 = DataType::tuple([DataType::list(DataType::from(level3))]);
    UserType::new("ks", "level1")
        .field("body", level2)
        .field("id", PrimitiveKind::Uuid)
        .into()
}

#[test]
fn test_concurrent_first_resolution() {
    let registry = Arc::new(CodecRegistry::new().unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let data_type = deep_type();
                barrier.wait();
                registry.resolve(&data_type).unwrap()
            })
        })
        .collect();

    let codecs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // every thread sees the published winner
    for codec in &codecs[1..] {
        assert!(Arc::ptr_eq(&codecs[0], codec));
        assert!(cql_codec::codec::equivalent(&codecs[0], codec));
    }
    assert!(registry.contains(&deep_type()));

    // level1, tuple(list), list<level3>, level3, set<text>, tuple(level5, int), level5
    assert_eq!(registry.len(), 7);
    let metrics = registry.metrics();
    assert_eq!(
        metrics.codecs_built.get() - metrics.duplicate_builds.get(),
        7
    );
    assert_eq!(metrics.cache_entries.get(), 7);
}

#[test]
fn test_concurrent_decode_of_shared_lazy_value() {
    let registry = Arc::new(CodecRegistry::new().unwrap());
    let data_type: DataType = UserType::new("ks", "pair")
        .field("a", PrimitiveKind::Text)
        .field("b", PrimitiveKind::Bigint)
        .into();

    let original = cql_codec::CompositeValue::new(data_type.clone())
        .unwrap()
        .with("a", "shared")
        .unwrap()
        .with("b", 99i64)
        .unwrap();
    let bytes = registry.encode(&data_type, &Value::Udt(original)).unwrap();
    let decoded = Arc::new(registry.decode(&data_type, bytes).unwrap());

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let decoded = Arc::clone(&decoded);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let udt = decoded.as_composite().unwrap();
                if i % 2 == 0 {
                    udt.get_string("a").unwrap().map(str::to_owned)
                } else {
                    udt.get("b").unwrap().as_i64().map(|v| v.to_string())
                }
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let seen = handle.join().unwrap();
        let expected = if i % 2 == 0 { "shared" } else { "99" };
        assert_eq!(seen.as_deref(), Some(expected));
    }
}

#[test]
fn test_mixed_resolution_of_many_shapes() {
    let registry = Arc::new(CodecRegistry::new().unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let shape = match i % 4 {
                    0 => DataType::list(PrimitiveKind::Int),
                    1 => DataType::map(PrimitiveKind::Text, DataType::list(PrimitiveKind::Int)),
                    2 => DataType::tuple([DataType::list(PrimitiveKind::Int)]),
                    _ => deep_type(),
                };
                barrier.wait();
                registry.resolve(&shape).map(|codec| codec.data_type() == &shape)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().unwrap());
    }
    assert!(registry.contains(&DataType::list(PrimitiveKind::Int)));
    // list<int>, map<text, list<int>>, tuple<list<int>> and the seven from deep_type
    assert_eq!(registry.len(), 10);
}
