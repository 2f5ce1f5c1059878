//! Shared record fixtures.

use std::collections::HashMap;
use std::sync::Once;

use orm_core::bigdecimal::BigDecimal;
use orm_core::bson::oid::ObjectId;
use orm_core::bson::{self, Bson};
use orm_core::chrono::{DateTime, Utc};
use orm_core::{field, FieldDef, IndexSpec, MinKey, Nested, Record, SchemaRegistry};
use serde::{Deserialize, Serialize};

static TRACING: Once = Once::new();

/// Installs a test subscriber once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub zip: i32,
}

/// Small user record used across suites.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: u8,
    pub password_hash: Vec<u8>,
    pub session_key: Option<Box<Vec<u8>>>,
    pub created_at: i64,
    pub birthday: i32,
    pub address: Nested<Address>,
    pub cache: String,
}

impl Record for User {
    fn table_name() -> &'static str {
        "users"
    }

    fn new_zero() -> Self {
        Self::default()
    }

    fn fields() -> Vec<FieldDef<Self>> {
        vec![
            field!(User, id).primary().auto_increment().mirror(),
            field!(User, name).doc_name("full_name").wire_name("display_name"),
            field!(User, email),
            field!(User, age),
            field!(User, password_hash).blob().sensitive(),
            field!(User, session_key).blob().sensitive(),
            field!(User, created_at).epoch_seconds(),
            field!(User, birthday).epoch_days(),
            field!(User, address),
            field!(User, cache).ignore(),
        ]
    }

    fn index_specs() -> Vec<IndexSpec> {
        vec![IndexSpec::new("users_email", &["email"]).unique()]
    }
}

/// Record covering every supported field shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Everything {
    pub id: ObjectId,
    pub text: String,
    pub flag: bool,
    pub i8v: i8,
    pub i16v: i16,
    pub i32v: i32,
    pub i64v: i64,
    pub isizev: isize,
    pub u8v: u8,
    pub u16v: u16,
    pub u32v: u32,
    pub u64v: u64,
    pub usizev: usize,
    pub f32v: f32,
    pub f64v: f64,
    pub bytes: Vec<u8>,
    pub at: DateTime<Utc>,
    pub amount: BigDecimal,
    pub owner: ObjectId,
    pub tags: Vec<String>,
    pub scores: Vec<i32>,
    pub big: Vec<u64>,
    pub ratios: Vec<f64>,
    pub refs: Vec<ObjectId>,
    pub times: Vec<DateTime<Utc>>,
    pub chunks: Vec<Vec<u8>>,
    pub extras: Vec<Bson>,
    pub labels: HashMap<String, String>,
    pub counts: HashMap<String, i64>,
    pub weights: HashMap<String, f64>,
    pub toggles: HashMap<String, bool>,
    pub aliases: HashMap<String, Vec<String>>,
    pub meta: Bson,
    pub maybe_count: Option<Box<i32>>,
    pub maybe_name: Option<Box<String>>,
    pub address: Nested<Address>,
    pub floor: MinKey,
    pub stamp: bson::DateTime,
}

impl Default for Everything {
    fn default() -> Self {
        Self {
            id: ObjectId::from_bytes([0; 12]),
            text: String::new(),
            flag: false,
            i8v: 0,
            i16v: 0,
            i32v: 0,
            i64v: 0,
            isizev: 0,
            u8v: 0,
            u16v: 0,
            u32v: 0,
            u64v: 0,
            usizev: 0,
            f32v: 0.0,
            f64v: 0.0,
            bytes: Vec::new(),
            at: DateTime::<Utc>::default(),
            amount: BigDecimal::default(),
            owner: ObjectId::from_bytes([0; 12]),
            tags: Vec::new(),
            scores: Vec::new(),
            big: Vec::new(),
            ratios: Vec::new(),
            refs: Vec::new(),
            times: Vec::new(),
            chunks: Vec::new(),
            extras: Vec::new(),
            labels: HashMap::new(),
            counts: HashMap::new(),
            weights: HashMap::new(),
            toggles: HashMap::new(),
            aliases: HashMap::new(),
            meta: Bson::Null,
            maybe_count: None,
            maybe_name: None,
            address: Nested::none(),
            floor: MinKey,
            stamp: bson::DateTime::from_millis(0),
        }
    }
}

impl Record for Everything {
    fn table_name() -> &'static str {
        "everything"
    }

    fn new_zero() -> Self {
        Self::default()
    }

    fn fields() -> Vec<FieldDef<Self>> {
        vec![
            field!(Everything, id).primary(),
            field!(Everything, text),
            field!(Everything, flag),
            field!(Everything, i8v),
            field!(Everything, i16v),
            field!(Everything, i32v),
            field!(Everything, i64v),
            field!(Everything, isizev),
            field!(Everything, u8v),
            field!(Everything, u16v),
            field!(Everything, u32v),
            field!(Everything, u64v),
            field!(Everything, usizev),
            field!(Everything, f32v),
            field!(Everything, f64v),
            field!(Everything, bytes),
            field!(Everything, at),
            field!(Everything, amount),
            field!(Everything, owner),
            field!(Everything, tags),
            field!(Everything, scores),
            field!(Everything, big),
            field!(Everything, ratios),
            field!(Everything, refs),
            field!(Everything, times),
            field!(Everything, chunks),
            field!(Everything, extras),
            field!(Everything, labels),
            field!(Everything, counts),
            field!(Everything, weights),
            field!(Everything, toggles),
            field!(Everything, aliases),
            field!(Everything, meta),
            field!(Everything, maybe_count),
            field!(Everything, maybe_name),
            field!(Everything, address),
            field!(Everything, floor),
            field!(Everything, stamp),
        ]
    }
}

/// Registry with every fixture registered.
pub fn registry() -> SchemaRegistry {
    init_tracing();
    let registry = SchemaRegistry::new();
    let duplicates = registry
        .register_all(&[
            SchemaRegistry::register::<User>,
            SchemaRegistry::register::<Everything>,
        ])
        .unwrap();
    assert!(duplicates.is_empty());
    registry
}

/// Timestamp truncated to milliseconds, the BSON datetime resolution.
pub fn millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap()
}

pub fn sample_user() -> User {
    User {
        id: 7,
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        age: 36,
        password_hash: vec![0xAB; 32],
        session_key: Some(Box::new(vec![0xCD; 16])),
        created_at: 1_700_000_000,
        birthday: -56_000,
        address: Nested::new(Address {
            street: "12 St James's Square".to_string(),
            city: "London".to_string(),
            zip: 1,
        }),
        cache: "not persisted".to_string(),
    }
}
