//! Document codec: round trips, zero omission and strict decoding.

use std::collections::HashMap;
use std::str::FromStr;

use ntest::timeout;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use orm_core::bigdecimal::BigDecimal;
use orm_core::bson::oid::ObjectId;
use orm_core::bson::{self, doc, Bson};
use orm_core::chrono::{DateTime, Utc};
use orm_core::{CodecError, DocumentCodec, Nested, Record, ValueError};

use super::helpers::{millis, registry, sample_user, Address, Everything, User};

fn populated() -> Everything {
    Everything {
        id: ObjectId::from_bytes([1; 12]),
        text: "hello".to_string(),
        flag: true,
        i8v: -8,
        i16v: -16,
        i32v: -32,
        i64v: -64,
        isizev: -1,
        u8v: 8,
        u16v: 16,
        u32v: 32,
        u64v: 64,
        usizev: 1,
        f32v: 1.5,
        f64v: -2.25,
        bytes: vec![1, 2, 3],
        at: millis(1_700_000_000_123),
        amount: BigDecimal::from_str("1234.5678").unwrap(),
        owner: ObjectId::from_bytes([2; 12]),
        tags: vec!["a".to_string(), "b".to_string()],
        scores: vec![1, -2, 3],
        big: vec![0, i64::MAX as u64],
        ratios: vec![0.5, 1e-9],
        refs: vec![ObjectId::from_bytes([3; 12])],
        times: vec![millis(0), millis(86_400_000)],
        chunks: vec![vec![9], vec![]],
        extras: vec![Bson::Int32(1), Bson::String("x".to_string())],
        labels: [("k".to_string(), "v".to_string())].into_iter().collect(),
        counts: [("n".to_string(), 5i64)].into_iter().collect(),
        weights: [("w".to_string(), 0.75)].into_iter().collect(),
        toggles: [("on".to_string(), true)].into_iter().collect(),
        aliases: [("x".to_string(), vec!["y".to_string()])].into_iter().collect(),
        meta: Bson::Document(doc! { "depth": 1 }),
        maybe_count: Some(Box::new(0)),
        maybe_name: Some(Box::new("present".to_string())),
        address: Nested::new(Address {
            street: "Main".to_string(),
            city: "Springfield".to_string(),
            zip: 12345,
        }),
        stamp: bson::DateTime::from_millis(42),
        ..Everything::default()
    }
}

#[timeout(1000)]
#[test]
fn test_round_trip_every_shape() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let original = populated();

    let doc = codec.encode(&original).unwrap();
    let decoded: Everything = codec.decode_new(&doc).unwrap();
    assert_eq!(decoded, original);
}

#[timeout(1000)]
#[test]
fn test_timestamps_truncate_to_millis() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let precise: DateTime<Utc> = "2023-11-14T22:13:20.123456789Z".parse().unwrap();
    let record = Everything {
        at: precise,
        times: vec![precise],
        ..Everything::default()
    };

    let doc = codec.encode(&record).unwrap();
    let decoded: Everything = codec.decode_new(&doc).unwrap();
    assert_eq!(decoded.at, millis(1_700_000_000_123));
    assert_eq!(decoded.times, vec![decoded.at]);
    assert_ne!(decoded.at, precise);
}

#[timeout(1000)]
#[test]
fn test_encoded_types_and_names() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let doc = codec.encode(&populated()).unwrap();

    assert_eq!(doc.get("_id"), Some(&Bson::ObjectId(ObjectId::from_bytes([1; 12]))));
    assert!(doc.get("id").is_none());
    assert_eq!(doc.get("i8v"), Some(&Bson::Int32(-8)));
    assert_eq!(doc.get("u16v"), Some(&Bson::Int32(16)));
    assert_eq!(doc.get("u32v"), Some(&Bson::Int64(32)));
    assert_eq!(doc.get("isizev"), Some(&Bson::Int64(-1)));
    assert_eq!(doc.get("f32v"), Some(&Bson::Double(1.5)));
    assert_eq!(doc.get("amount"), Some(&Bson::String("1234.5678".to_string())));
    assert!(matches!(doc.get("bytes"), Some(Bson::Binary(_))));
    assert!(matches!(doc.get("at"), Some(Bson::DateTime(_))));
    assert_eq!(doc.get("floor"), Some(&Bson::MinKey));
    assert_eq!(doc.get("maybe_count"), Some(&Bson::Int32(0)));
    assert_eq!(
        doc.get("address"),
        Some(&Bson::Document(doc! { "street": "Main", "city": "Springfield", "zip": 12345 }))
    );
}

#[timeout(1000)]
#[test]
fn test_zero_values_omitted() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let doc = codec.encode(&Everything::default()).unwrap();

    let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["_id", "owner", "floor"]);
}

#[timeout(1000)]
#[test]
fn test_map_keys_sorted() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let mut record = Everything::default();
    record.weights = [("zeta", 1.0), ("alpha", 2.0), ("mid", 3.0)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    record.labels = [("b", "2"), ("a", "1")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let doc = codec.encode(&record).unwrap();
    let weights = doc.get_document("weights").unwrap();
    assert_eq!(weights.keys().collect::<Vec<_>>(), vec!["alpha", "mid", "zeta"]);
    let labels = doc.get_document("labels").unwrap();
    assert_eq!(labels.keys().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[timeout(1000)]
#[test]
fn test_any_field_is_normalized() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let record = Everything {
        meta: Bson::Document(doc! {
            "keep": "yes",
            "legacy": Bson::Symbol("sym".to_string()),
        }),
        ..Everything::default()
    };
    let doc = codec.encode(&record).unwrap();
    assert_eq!(doc.get_document("meta").unwrap(), &doc! { "keep": "yes" });
}

#[timeout(1000)]
#[test]
fn test_user_document_names() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let user = sample_user();
    let doc = codec.encode(&user).unwrap();

    assert_eq!(doc.get_i64("_id").unwrap(), 7);
    assert_eq!(doc.get_str("full_name").unwrap(), "Ada Lovelace");
    assert!(doc.get("cache").is_none());

    let decoded: User = codec.decode_new(&doc).unwrap();
    assert_eq!(decoded, User { cache: String::new(), ..user });
}

#[timeout(1000)]
#[test]
fn test_decode_into_existing_keeps_missing_fields() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let mut user = sample_user();
    codec
        .decode(&doc! { "_id": 9i64, "email": "new@example.com" }, &mut user)
        .unwrap();
    assert_eq!(user.id, 9);
    assert_eq!(user.email, "new@example.com");
    assert_eq!(user.name, "Ada Lovelace");
}

#[timeout(1000)]
#[test]
fn test_decode_result_set_into_collection() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let documents = vec![
        doc! { "_id": 1i64, "email": "a@example.com" },
        doc! { "_id": 2i64, "email": "b@example.com", "age": 30 },
    ];

    let mut users: Vec<User> = Vec::new();
    for document in &documents {
        User::append_into(&mut users, codec.decode_new(document).unwrap());
    }
    assert_eq!(users.len(), 2);
    assert_eq!(users[1].id, 2);
    assert_eq!(users[1].age, 30);
}

#[timeout(1000)]
#[test]
fn test_decode_coercions() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let doc = doc! {
        "_id": ObjectId::from_bytes([5; 12]),
        "text": 2.5,
        "at": "2024-05-06T07:08:09.010Z",
        "amount": "",
        "times": [1_700_000_000i64, 1_700_000_000_000i64],
    };
    let decoded: Everything = codec.decode_new(&doc).unwrap();
    assert_eq!(decoded.text, "2.5");
    assert_eq!(decoded.at.timestamp_millis(), 1_714_979_289_010);
    assert_eq!(decoded.amount, BigDecimal::from(0));
    assert_eq!(decoded.times[0], decoded.times[1]);
}

#[timeout(1000)]
#[test]
fn test_decode_errors_name_field_and_element() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);

    let err = codec
        .decode_new::<Everything>(&doc! { "scores": [1, "two", 3] })
        .unwrap_err();
    assert_eq!(err.field(), Some("scores"));
    assert!(matches!(
        err.value_error(),
        Some(ValueError::Element { index: 1, .. })
    ));

    let err = codec
        .decode_new::<Everything>(&doc! { "i64v": 1.0 })
        .unwrap_err();
    assert_eq!(err.value_error().unwrap().type_names(), Some(("i64", "Double")));

    let err = codec
        .decode_new::<Everything>(&doc! { "u8v": -1 })
        .unwrap_err();
    assert!(err.value_error().unwrap().is_range_overflow());

    let err = codec
        .decode_new::<Everything>(&doc! { "floor": Bson::MaxKey })
        .unwrap_err();
    assert_eq!(err.field(), Some("floor"));
}

#[timeout(1000)]
#[test]
fn test_range_enforcement_for_narrow_ints() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);

    let err = codec.decode_new::<Everything>(&doc! { "i8v": 200 }).unwrap_err();
    assert!(matches!(err, CodecError::FieldDecode { ref field, .. } if field == "i8v"));

    let ok: Everything = codec.decode_new(&doc! { "i8v": 100 }).unwrap();
    assert_eq!(ok.i8v, 100);
}

#[timeout(1000)]
#[test]
fn test_u64_out_of_int64_range_fails_encode() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let record = Everything {
        u64v: u64::MAX,
        ..Everything::default()
    };
    let err = codec.encode(&record).unwrap_err();
    assert_eq!(err.field(), Some("u64v"));
}

#[cfg(feature = "parallel")]
#[timeout(5000)]
#[test]
fn test_encode_batch_matches_sequential() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let users: Vec<User> = (0..64)
        .map(|i| User {
            id: i,
            ..sample_user()
        })
        .collect();

    let batch = codec.encode_batch(&users).unwrap();
    let sequential: Vec<_> = users.iter().map(|u| codec.encode(u).unwrap()).collect();
    assert_eq!(batch, sequential);
}

fn arb_everything() -> impl Strategy<Value = Everything> {
    (
        any::<[u8; 12]>(),
        ".{0,12}",
        any::<i8>(),
        any::<u16>(),
        0u64..=i64::MAX as u64,
        -1e12f64..1e12,
        proptest::collection::vec(any::<u8>(), 0..16),
        -8_000_000_000_000i64..8_000_000_000_000,
        proptest::collection::vec(".{0,6}", 0..4),
        proptest::collection::hash_map("[a-z]{1,4}", any::<i64>(), 0..4),
        proptest::option::of(any::<i32>()),
        (-1_000_000i64..1_000_000, 0u32..4),
    )
        .prop_map(
            |(oid, text, i8v, u16v, u64v, f64v, bytes, at_ms, tags, counts, maybe, (units, scale))| {
                Everything {
                    id: ObjectId::from_bytes(oid),
                    text,
                    i8v,
                    u16v,
                    u64v,
                    f64v,
                    bytes,
                    at: millis(at_ms),
                    tags,
                    counts: counts.into_iter().collect::<HashMap<_, _>>(),
                    maybe_count: maybe.map(Box::new),
                    amount: BigDecimal::new(units.into(), scale.into()),
                    ..Everything::default()
                }
            },
        )
}

proptest! {
    #[test]
    fn prop_document_round_trip(record in arb_everything()) {
        let registry = registry();
        let codec = DocumentCodec::new(&registry);
        let doc = codec.encode(&record).unwrap();
        let decoded: Everything = codec.decode_new(&doc).unwrap();
        prop_assert_eq!(decoded, record);
    }
}
