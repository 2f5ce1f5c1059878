//! Mapping engine configuration.
//!
//! Supports TOML config files, environment variable overrides, and defaults.
//!
//! Row codecs pick their date formats in this order:
//! 1. formats passed to `RowCodec::with_date_formats`
//! 2. `date_formats` of a registry built with `SchemaRegistry::with_config`
//! 3. process-wide formats from [`DateFormats::install`]
//! 4. the defaults

use std::env;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::OnceLock;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValueError};
use crate::schema::TableDefaults;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

static GLOBAL_DATE_FORMATS: OnceLock<DateFormats> = OnceLock::new();

/// Configuration for the mapping engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    /// Charset for tables whose primary key does not set one (default: "utf8mb4")
    pub default_charset: String,
    /// Collation for tables whose primary key does not set one (default: "utf8mb4_general_ci")
    pub default_collation: String,
    /// Formats for epoch-flagged integer columns
    pub date_formats: DateFormats,
    /// Capacity for columns with unknown data types, in bytes (default: 256)
    pub default_column_capacity: usize,
    /// Upper bound for estimated column capacities, in bytes (default: 1024)
    pub max_column_capacity: usize,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            default_charset: "utf8mb4".to_string(),
            default_collation: "utf8mb4_general_ci".to_string(),
            date_formats: DateFormats::default(),
            default_column_capacity: 256,
            max_column_capacity: 1024,
        }
    }
}

impl OrmConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment variable overrides.
    /// Environment variables are prefixed with `ORM_`.
    /// Example: `ORM_DEFAULT_CHARSET=latin1` overrides `default_charset`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = env::var("ORM_DEFAULT_CHARSET") {
            self.default_charset = val;
        }
        if let Ok(val) = env::var("ORM_DEFAULT_COLLATION") {
            self.default_collation = val;
        }
        if let Ok(val) = env::var("ORM_DATETIME_FORMAT") {
            self.date_formats.datetime = val;
        }
        if let Ok(val) = env::var("ORM_DATE_FORMAT") {
            self.date_formats.date = val;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.date_formats.validate()
    }

    pub(crate) fn table_defaults(&self) -> TableDefaults {
        TableDefaults {
            charset: self.default_charset.clone(),
            collation: self.default_collation.clone(),
        }
    }
}

/// strftime-style formats for integer fields stored as dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormats {
    /// Format for epoch-seconds fields (default: "%Y-%m-%d %H:%M:%S")
    pub datetime: String,
    /// Format for epoch-days fields (default: "%Y-%m-%d")
    pub date: String,
}

impl Default for DateFormats {
    fn default() -> Self {
        Self {
            datetime: "%Y-%m-%d %H:%M:%S".to_string(),
            date: "%Y-%m-%d".to_string(),
        }
    }
}

impl DateFormats {
    pub fn new(datetime: &str, date: &str) -> Result<Self, ConfigError> {
        let formats = Self {
            datetime: datetime.to_string(),
            date: date.to_string(),
        };
        formats.validate()?;
        Ok(formats)
    }

    /// Installs the process-wide formats.
    ///
    /// Fails if formats were already installed or already read by a row codec.
    pub fn install(formats: DateFormats) -> Result<(), ConfigError> {
        formats.validate()?;
        GLOBAL_DATE_FORMATS
            .set(formats)
            .map_err(|_| ConfigError::DateFormatsAlreadySet)?;
        tracing::debug!("Installed process-wide date formats");
        Ok(())
    }

    /// Process-wide formats; the defaults if none were installed.
    pub fn global() -> &'static DateFormats {
        GLOBAL_DATE_FORMATS.get_or_init(DateFormats::default)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for format in [&self.datetime, &self.date] {
            let invalid = format.is_empty()
                || StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
            if invalid {
                return Err(ConfigError::InvalidDateFormat {
                    format: format.clone(),
                });
            }
        }
        Ok(())
    }

    /// Formats epoch seconds with the datetime format.
    pub fn format_epoch_seconds(&self, seconds: i64) -> Result<String, ValueError> {
        let instant = DateTime::<Utc>::from_timestamp(seconds, 0).ok_or(ValueError::RangeOverflow {
            value: seconds.to_string(),
            target: "datetime",
        })?;
        render(instant.naive_utc(), &self.datetime)
    }

    /// Formats days since the Unix epoch with the date format.
    pub fn format_epoch_days(&self, days: i64) -> Result<String, ValueError> {
        let date = i32::try_from(days)
            .ok()
            .and_then(|d| d.checked_add(UNIX_EPOCH_DAYS_FROM_CE))
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .ok_or(ValueError::RangeOverflow {
                value: days.to_string(),
                target: "date",
            })?;
        render(date.and_time(chrono::NaiveTime::MIN), &self.date)
    }

    /// Parses text in the datetime format into epoch seconds.
    pub fn parse_epoch_seconds(&self, text: &str) -> Result<i64, ValueError> {
        let parsed = NaiveDateTime::parse_from_str(text.trim(), &self.datetime)
            .map_err(|e| ValueError::parse("datetime", text.as_bytes(), e))?;
        Ok(parsed.and_utc().timestamp())
    }

    /// Parses text in the date format into days since the Unix epoch.
    pub fn parse_epoch_days(&self, text: &str) -> Result<i64, ValueError> {
        let parsed = NaiveDate::parse_from_str(text.trim(), &self.date)
            .map_err(|e| ValueError::parse("date", text.as_bytes(), e))?;
        Ok(i64::from(parsed.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE))
    }

    /// Parses a timestamp column: datetime format, RFC 3339, then the date format.
    pub fn parse_timestamp(&self, text: &str) -> Result<DateTime<Utc>, ValueError> {
        let text = text.trim();
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, &self.datetime) {
            return Ok(parsed.and_utc());
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(text, &self.date)
            .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
            .map_err(|e| ValueError::parse("timestamp", text.as_bytes(), e))
    }
}

fn render(value: NaiveDateTime, format: &str) -> Result<String, ValueError> {
    let mut out = String::new();
    write!(out, "{}", value.format(format))
        .map_err(|e| ValueError::parse("date format", format.as_bytes(), e))?;
    Ok(out)
}
