//! Configuration loading and process-wide date formats.

use std::io::Write;

use ntest::timeout;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use orm_core::{ColumnValue, ConfigError, DateFormats, OrmConfig, RowCodec, SchemaRegistry};

use super::helpers::{init_tracing, sample_user, User};

#[timeout(1000)]
#[test]
fn test_from_file() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
default_charset = "utf8"
default_collation = "utf8_bin"
max_column_capacity = 512

[date_formats]
datetime = "%Y/%m/%d %H:%M:%S"
"#
    )?;

    let config = OrmConfig::from_file(file.path())?;
    assert_eq!(config.default_charset, "utf8");
    assert_eq!(config.default_collation, "utf8_bin");
    assert_eq!(config.max_column_capacity, 512);
    assert_eq!(config.default_column_capacity, 256);
    assert_eq!(config.date_formats.datetime, "%Y/%m/%d %H:%M:%S");
    assert_eq!(config.date_formats.date, "%Y-%m-%d");
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_missing_file() {
    let err = OrmConfig::from_file("/nonexistent/orm.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[timeout(1000)]
#[test]
fn test_malformed_toml() {
    let err = OrmConfig::from_toml("default_charset = ").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));

    let err = OrmConfig::from_toml("max_column_capacity = \"big\"").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[timeout(1000)]
#[test]
fn test_env_overrides() {
    std::env::set_var("ORM_DEFAULT_CHARSET", "ascii");
    std::env::set_var("ORM_DATE_FORMAT", "%d.%m.%Y");
    let mut config = OrmConfig::new();
    let result = config.apply_env_overrides();
    std::env::remove_var("ORM_DEFAULT_CHARSET");
    std::env::remove_var("ORM_DATE_FORMAT");

    result.unwrap();
    assert_eq!(config.default_charset, "ascii");
    assert_eq!(config.default_collation, "utf8mb4_general_ci");
    assert_eq!(config.date_formats.date, "%d.%m.%Y");
}

#[timeout(1000)]
#[test]
fn test_configured_formats_reach_row_codec() {
    init_tracing();
    let config = OrmConfig::from_toml(
        r#"
[date_formats]
datetime = "%Y/%m/%d %H:%M:%S"
date = "%d %b %Y"
"#,
    )
    .unwrap();
    let registry = SchemaRegistry::with_config(config);
    registry.register::<User>().unwrap();
    let schema = registry.get("users").unwrap();
    let codec = RowCodec::new(&registry);
    let user = sample_user();

    assert_eq!(
        codec.get_value(&user, schema.field("created_at").unwrap()).unwrap(),
        ColumnValue::Text("2023/11/14 22:13:20".into())
    );
    assert_eq!(
        codec.get_value(&user, schema.field("birthday").unwrap()).unwrap(),
        ColumnValue::Text("05 Sep 1816".into())
    );

    let mut scanned = User::default();
    codec
        .set_column(&mut scanned, "created_at", Some(&b"1970/01/01 00:01:00"[..]))
        .unwrap();
    assert_eq!(scanned.created_at, 60);
}

/// The only test in this binary that touches the process-wide formats.
#[timeout(1000)]
#[test]
fn test_install_global_formats() {
    init_tracing();
    let formats = DateFormats::new("%d.%m.%Y %H:%M:%S", "%d.%m.%Y").unwrap();
    DateFormats::install(formats.clone()).unwrap();
    assert_eq!(DateFormats::global(), &formats);

    let again = DateFormats::install(DateFormats::default()).unwrap_err();
    assert!(matches!(again, ConfigError::DateFormatsAlreadySet));

    let registry = SchemaRegistry::new();
    registry.register::<User>().unwrap();
    let schema = registry.get("users").unwrap();
    let codec = RowCodec::new(&registry);
    assert_eq!(
        codec.get_value(&sample_user(), schema.field("created_at").unwrap()).unwrap(),
        ColumnValue::Text("14.11.2023 22:13:20".into())
    );
}

#[timeout(1000)]
#[test]
fn test_invalid_formats_rejected_before_install() {
    let err = DateFormats::new("%Y-%m-%d", "").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDateFormat { ref format } if format.is_empty()));
}
