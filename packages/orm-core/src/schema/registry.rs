//! Registry of table schemas keyed by table name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use super::table::{TableDefaults, TableSchema};
use crate::capacity::{CapacityEstimator, ColumnMetadataSource};
use crate::config::{DateFormats, OrmConfig};
use crate::error::{CapacityError, CodecError, RegistrationError};
use crate::record::Record;

/// Registration entry point for one record type, as accepted by
/// [`SchemaRegistry::register_all`].
pub type Registration = fn(&SchemaRegistry) -> Result<Arc<TableSchema>, RegistrationError>;

type SchemaMap = HashMap<String, Arc<TableSchema>>;

/// Registry for table schemas.
///
/// Readers load an immutable snapshot of the map without locking. Writers
/// analyze the record outside any lock and take the writer mutex only to
/// publish a new snapshot.
#[derive(Debug)]
pub struct SchemaRegistry {
    tables: ArcSwap<SchemaMap>,
    writer: Mutex<()>,
    config: OrmConfig,
    explicit_config: bool,
    defaults: TableDefaults,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// Creates an empty registry with default configuration.
    ///
    /// Row codecs over this registry use the process-wide date formats.
    pub fn new() -> Self {
        Self {
            explicit_config: false,
            ..Self::with_config(OrmConfig::default())
        }
    }

    /// Creates an empty registry using `config` for table defaults, capacity
    /// estimation and row codec date formats.
    ///
    /// # Arguments
    /// * `config` - Engine configuration, usually from [`OrmConfig::from_file`]
    ///
    /// # Returns
    /// An empty registry whose row codecs use `config.date_formats` instead of
    /// the process-wide formats.
    pub fn with_config(config: OrmConfig) -> Self {
        Self {
            tables: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
            explicit_config: true,
            defaults: config.table_defaults(),
            config,
        }
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    /// Date formats used by [`RowCodec::new`](crate::RowCodec::new).
    ///
    /// # Returns
    /// The configured formats for a registry built with [`Self::with_config`],
    /// otherwise [`DateFormats::global`].
    pub fn date_formats(&self) -> &DateFormats {
        if self.explicit_config {
            &self.config.date_formats
        } else {
            DateFormats::global()
        }
    }

    /// Registers record type `R`.
    ///
    /// The record is analyzed and validated before the writer lock is taken.
    ///
    /// # Returns
    /// The published schema, `DuplicateTable` if the table name is taken
    /// (the existing schema is kept), or `InvalidRecord`.
    pub fn register<R: Record>(&self) -> Result<Arc<TableSchema>, RegistrationError> {
        let table = R::table_name();
        if self.contains(table) {
            return Err(self.duplicate(table));
        }

        let schema = Arc::new(TableSchema::build::<R>(&self.defaults)?);

        let _guard = self
            .writer
            .lock()
            .map_err(|_| RegistrationError::invalid(schema.record_type, "failed to acquire registry lock"))?;

        let current = self.tables.load();
        if current.contains_key(table) {
            return Err(self.duplicate(table));
        }
        let mut next = SchemaMap::clone(&current);
        next.insert(table.to_string(), Arc::clone(&schema));
        self.tables.store(Arc::new(next));

        tracing::debug!(
            "Registered table '{}' ({}, {} fields)",
            table,
            schema.record_type,
            schema.fields.len()
        );
        Ok(schema)
    }

    fn duplicate(&self, table: &str) -> RegistrationError {
        tracing::warn!("Table '{}' already registered; keeping existing schema", table);
        RegistrationError::DuplicateTable {
            table: table.to_string(),
        }
    }

    /// Registers a batch of record types in order.
    ///
    /// # Arguments
    /// * `registrations` - Entry points, usually `Record::register` of each type
    ///
    /// # Returns
    /// Table names that were already registered. The first fatal error aborts
    /// the batch, leaving earlier registrations in place.
    pub fn register_all(&self, registrations: &[Registration]) -> Result<Vec<String>, RegistrationError> {
        let mut duplicates = Vec::new();
        for register in registrations {
            match register(self) {
                Ok(_) => {}
                Err(RegistrationError::DuplicateTable { table }) => duplicates.push(table),
                Err(err) => return Err(err),
            }
        }
        Ok(duplicates)
    }

    /// Retrieves a schema by table name.
    pub fn get(&self, table: &str) -> Option<Arc<TableSchema>> {
        self.tables.load().get(table).cloned()
    }

    /// Checks if a table is registered.
    pub fn contains(&self, table: &str) -> bool {
        self.tables.load().contains_key(table)
    }

    /// Returns all registered table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Retrieves the schema registered for record type `R`.
    ///
    /// # Returns
    /// The schema, `UnregisteredTable` if `R` was never registered, or
    /// `RecordTypeMismatch` if another type registered its table name.
    pub fn schema_for<R: Record>(&self) -> Result<Arc<TableSchema>, CodecError> {
        let table = R::table_name();
        let schema = self.get(table).ok_or_else(|| CodecError::UnregisteredTable {
            table: table.to_string(),
        })?;
        schema.check_record::<R>()?;
        Ok(schema)
    }

    /// Returns the number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.load().is_empty()
    }

    /// Estimates column capacities for `table` and stores them on its schema.
    ///
    /// Hints are write-once per schema; a second call returns the fresh
    /// estimate without replacing the stored hints.
    ///
    /// # Arguments
    /// * `table` - Registered table name
    /// * `source` - Column metadata provider, e.g. an information_schema query
    ///
    /// # Returns
    /// Byte capacity per column name. On error the schema keeps no hints and
    /// callers fall back to their defaults.
    pub fn estimate_capacities<S: ColumnMetadataSource>(
        &self,
        table: &str,
        source: S,
    ) -> Result<HashMap<String, usize>, CapacityError> {
        let schema = self.get(table).ok_or_else(|| CapacityError::UnregisteredTable {
            table: table.to_string(),
        })?;
        let estimator = CapacityEstimator::with_config(source, &self.config);
        let hints = match estimator.estimate_column_capacities(table) {
            Ok(hints) => hints,
            Err(err) => {
                tracing::warn!(
                    "Capacity estimation failed for table '{}', using defaults: {}",
                    table,
                    err
                );
                return Err(err);
            }
        };
        if !schema.set_capacity_hints(hints.clone()) {
            tracing::debug!("Capacity hints for table '{}' already set", table);
        }
        Ok(hints)
    }
}
