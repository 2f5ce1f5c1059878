//! Capacity estimation wired through the registry.

use std::collections::HashMap;

use ntest::timeout;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use orm_core::capacity::{estimate_column_capacity, DEFAULT_CAPACITY, MAX_CAPACITY, MIN_CAPACITY};
use orm_core::{CapacityError, CapacityEstimator, ColumnMeta, OrmConfig, SchemaRegistry};

use super::helpers::{init_tracing, registry, User};

fn users_columns() -> Vec<ColumnMeta> {
    vec![
        ColumnMeta::from_information_schema("id", "bigint", None, Some(19), "NO", "PRI"),
        ColumnMeta::from_information_schema("display_name", "varchar", Some(255), None, "YES", ""),
        ColumnMeta::from_information_schema("email", "varchar", Some(64), None, "NO", "UNI"),
        ColumnMeta::from_information_schema("age", "tinyint", None, Some(3), "YES", ""),
        ColumnMeta::from_information_schema("password_hash", "varbinary", Some(32), None, "YES", ""),
        ColumnMeta::from_information_schema("created_at", "datetime", None, None, "YES", ""),
        ColumnMeta::from_information_schema("address", "json", None, None, "YES", ""),
    ]
}

fn metadata() -> HashMap<String, Vec<ColumnMeta>> {
    HashMap::from([("users".to_string(), users_columns())])
}

#[timeout(1000)]
#[test]
fn test_estimates_stored_on_schema() {
    let registry = registry();
    let hints = registry.estimate_capacities("users", metadata()).unwrap();

    assert_eq!(hints["id"], 20);
    assert_eq!(hints["display_name"], 319);
    assert_eq!(hints["email"], 128);
    assert_eq!(hints["age"], 4);
    assert_eq!(hints["password_hash"], 32);
    assert_eq!(hints["created_at"], 26);
    assert_eq!(hints["address"], 512);

    let schema = registry.get("users").unwrap();
    assert_eq!(schema.capacity_hints(), Some(&hints));
    assert_eq!(schema.capacity_for("email", 999), 128);
    assert_eq!(schema.capacity_for("unknown", 999), 999);
}

#[timeout(1000)]
#[test]
fn test_hints_are_write_once() {
    let registry = registry();
    let first = registry.estimate_capacities("users", metadata()).unwrap();

    let narrow = HashMap::from([(
        "users".to_string(),
        vec![ColumnMeta::new("email", "varchar").with_length(8)],
    )]);
    let second = registry.estimate_capacities("users", narrow).unwrap();
    assert_eq!(second["email"], MIN_CAPACITY);

    let schema = registry.get("users").unwrap();
    assert_eq!(schema.capacity_hints(), Some(&first));
}

#[timeout(1000)]
#[test]
fn test_failures_leave_defaults() {
    let registry = registry();

    let err = registry
        .estimate_capacities("users", HashMap::<String, Vec<ColumnMeta>>::new())
        .unwrap_err();
    assert_eq!(
        err,
        CapacityError::NoColumnMetadata {
            table: "users".to_string()
        }
    );

    let failing = |_: &str| -> Result<Vec<ColumnMeta>, CapacityError> {
        Err(CapacityError::Source("connection refused".to_string()))
    };
    let err = registry.estimate_capacities("users", failing).unwrap_err();
    assert!(matches!(err, CapacityError::Source(_)));

    let err = registry.estimate_capacities("orders", metadata()).unwrap_err();
    assert!(matches!(err, CapacityError::UnregisteredTable { .. }));

    let schema = registry.get("users").unwrap();
    assert!(schema.capacity_hints().is_none());
    assert_eq!(schema.capacity_for("email", DEFAULT_CAPACITY), DEFAULT_CAPACITY);
}

#[timeout(1000)]
#[test]
fn test_registry_config_limits_estimates() {
    init_tracing();
    let config = OrmConfig {
        max_column_capacity: 100,
        ..OrmConfig::default()
    };
    let registry = SchemaRegistry::with_config(config);
    registry.register::<User>().unwrap();

    let hints = registry.estimate_capacities("users", metadata()).unwrap();
    assert_eq!(hints["display_name"], 100);
    assert_eq!(hints["address"], 100);
    assert_eq!(hints["age"], 4);
}

#[timeout(1000)]
#[test]
fn test_estimator_from_closure_source() {
    let source = |table: &str| -> Result<Vec<ColumnMeta>, CapacityError> {
        assert_eq!(table, "audit");
        Ok(vec![
            ColumnMeta::new("note", "text"),
            ColumnMeta::new("amount", "decimal").with_precision(18),
            ColumnMeta::new("shape", "geometry"),
        ])
    };
    let estimator = CapacityEstimator::new(source);
    let hints = estimator.estimate_column_capacities("audit").unwrap();
    assert_eq!(hints["note"], 512);
    assert_eq!(hints["amount"], 20);
    assert_eq!(hints["shape"], DEFAULT_CAPACITY);
}

proptest! {
    #[test]
    fn prop_estimates_stay_in_bounds(length in 0u64..100_000, primary in any::<bool>()) {
        let mut column = ColumnMeta::new("c", "varchar").with_length(length);
        if primary {
            column = column.primary();
        }
        let estimate = estimate_column_capacity(&column, DEFAULT_CAPACITY, MAX_CAPACITY);
        prop_assert!((MIN_CAPACITY..=MAX_CAPACITY).contains(&estimate));
    }
}
