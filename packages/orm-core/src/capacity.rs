//! Column capacity estimation from relational schema metadata.
//!
//! Capacities are initial buffer sizes, in bytes, for scanning a column.
//! They come from `information_schema.columns` through a
//! [`ColumnMetadataSource`]. Long character columns are shrunk in tiers,
//! so a `varchar(4000)` does not reserve 8 KiB per row.

use std::collections::HashMap;

use crate::config::OrmConfig;
use crate::error::CapacityError;

/// Query a metadata source is expected to run, bound to `(schema, table)`.
pub const COLUMN_METADATA_QUERY: &str = "SELECT column_name, data_type, character_maximum_length, \
     numeric_precision, is_nullable, column_key \
     FROM information_schema.columns \
     WHERE table_schema = ? AND table_name = ? \
     ORDER BY ordinal_position";

/// Lower bound for sized character and binary columns.
pub const MIN_CAPACITY: usize = 16;
/// Default upper bound for any estimate.
pub const MAX_CAPACITY: usize = 1024;
/// Capacity for data types the heuristics do not know.
pub const DEFAULT_CAPACITY: usize = 256;

const DEFAULT_DECIMAL_CAPACITY: usize = 12;

/// One row of column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    /// Lower-case SQL data type without length, e.g. `varchar`
    pub data_type: String,
    /// Declared length in characters (or bytes for binary types)
    pub max_length: Option<u64>,
    pub numeric_precision: Option<u64>,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnMeta {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_ascii_lowercase(),
            max_length: None,
            numeric_precision: None,
            nullable: true,
            primary_key: false,
        }
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: u64) -> Self {
        self.numeric_precision = Some(precision);
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Builds metadata from raw `information_schema.columns` values.
    pub fn from_information_schema(
        name: &str,
        data_type: &str,
        max_length: Option<u64>,
        numeric_precision: Option<u64>,
        is_nullable: &str,
        column_key: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.trim().to_ascii_lowercase(),
            max_length,
            numeric_precision,
            nullable: is_nullable.eq_ignore_ascii_case("YES"),
            primary_key: column_key.eq_ignore_ascii_case("PRI"),
        }
    }
}

/// Supplies column metadata for a table, typically by running
/// [`COLUMN_METADATA_QUERY`].
pub trait ColumnMetadataSource {
    fn column_metadata(&self, table: &str) -> Result<Vec<ColumnMeta>, CapacityError>;
}

impl<F> ColumnMetadataSource for F
where
    F: Fn(&str) -> Result<Vec<ColumnMeta>, CapacityError>,
{
    fn column_metadata(&self, table: &str) -> Result<Vec<ColumnMeta>, CapacityError> {
        self(table)
    }
}

impl ColumnMetadataSource for HashMap<String, Vec<ColumnMeta>> {
    fn column_metadata(&self, table: &str) -> Result<Vec<ColumnMeta>, CapacityError> {
        Ok(self.get(table).cloned().unwrap_or_default())
    }
}

/// Estimates per-column capacities for a table.
#[derive(Debug, Clone)]
pub struct CapacityEstimator<S> {
    source: S,
    default_capacity: usize,
    max_capacity: usize,
}

impl<S: ColumnMetadataSource> CapacityEstimator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            default_capacity: DEFAULT_CAPACITY,
            max_capacity: MAX_CAPACITY,
        }
    }

    /// Creates an estimator using the configured default and maximum capacities.
    pub fn with_config(source: S, config: &OrmConfig) -> Self {
        Self {
            source,
            default_capacity: config.default_column_capacity,
            max_capacity: config.max_column_capacity.max(MIN_CAPACITY),
        }
    }

    /// Maps each column of `table` to an estimated capacity in bytes.
    ///
    /// # Arguments
    /// * `table` - Table name passed to the metadata source
    ///
    /// # Returns
    /// Capacity per column name, `NoColumnMetadata` if the source knows no
    /// columns for the table, or the source's own error.
    pub fn estimate_column_capacities(&self, table: &str) -> Result<HashMap<String, usize>, CapacityError> {
        let columns = self.source.column_metadata(table)?;
        if columns.is_empty() {
            return Err(CapacityError::NoColumnMetadata {
                table: table.to_string(),
            });
        }
        let capacities: HashMap<String, usize> = columns
            .iter()
            .map(|column| (column.name.clone(), self.estimate(column)))
            .collect();
        tracing::debug!(
            "Estimated capacities for {} columns of table '{}'",
            capacities.len(),
            table
        );
        Ok(capacities)
    }

    /// Estimates the capacity of a single column.
    pub fn estimate(&self, column: &ColumnMeta) -> usize {
        estimate_column_capacity(column, self.default_capacity, self.max_capacity)
    }
}

/// Estimates the capacity of `column` in bytes.
///
/// Fixed-width types use fixed tiers; sized character and binary types are
/// clamped to `[MIN_CAPACITY, max_capacity]`.
///
/// # Arguments
/// * `column` - Column metadata
/// * `default_capacity` - Result for data types without a known tier
/// * `max_capacity` - Upper bound for sized types
///
/// # Returns
/// The estimate in bytes, at most `max_capacity`.
pub fn estimate_column_capacity(column: &ColumnMeta, default_capacity: usize, max_capacity: usize) -> usize {
    let max_capacity = max_capacity.max(MIN_CAPACITY);
    let estimate = match column.data_type.as_str() {
        "date" => 10,
        "time" => 16,
        "datetime" | "timestamp" => 26,
        "year" => 4,
        "tinyint" => 4,
        "smallint" => 6,
        "mediumint" => 9,
        "int" | "integer" => 11,
        "bigint" => 20,
        "decimal" | "numeric" => column
            .numeric_precision
            .map(|p| to_usize(p).saturating_add(2))
            .unwrap_or(DEFAULT_DECIMAL_CAPACITY),
        "float" => 24,
        "double" | "real" => 32,
        "bit" | "bool" | "boolean" => 8,
        "char" | "varchar" => sized(column, 2, max_capacity),
        "binary" | "varbinary" => sized(column, 1, max_capacity),
        "tinytext" | "tinyblob" => 256,
        "text" | "blob" | "json" => 512,
        "mediumtext" | "mediumblob" | "longtext" | "longblob" => 1024,
        "enum" | "set" => 64,
        _ => default_capacity,
    };
    estimate.min(max_capacity)
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn sized(column: &ColumnMeta, bytes_per_unit: usize, max_capacity: usize) -> usize {
    let bytes = to_usize(column.max_length.unwrap_or(0)).saturating_mul(bytes_per_unit);
    let estimate = if column.primary_key { bytes } else { shrink(bytes) };
    estimate.clamp(MIN_CAPACITY, max_capacity)
}

/// Tiered shrink of a declared byte length; continuous and non-decreasing.
fn shrink(bytes: usize) -> usize {
    match bytes {
        0..=128 => bytes,
        129..=512 => 128 + (bytes - 128) / 2,
        513..=2048 => 320 + (bytes - 512) / 4,
        _ => 704 + (bytes - 2048) / 8,
    }
}
