//! Record mapping engine for relational rows and BSON documents.
//!
//! Provides a schema registry that analyzes record types once, an offset
//! accessor that reads and writes fields through per-field vtables, the
//! document and row codecs built on top of it, secure erasure of sensitive
//! byte fields, and a column-capacity estimator for row-scan buffers.

pub mod accessor;
pub mod capacity;
pub mod codec;
pub mod config;
pub mod erasure;
pub mod error;
pub mod record;
pub mod schema;
pub mod types;

pub use capacity::{CapacityEstimator, ColumnMeta, ColumnMetadataSource, COLUMN_METADATA_QUERY};
pub use codec::{ColumnValue, DocumentCodec, RowCodec};
pub use config::{DateFormats, OrmConfig};
pub use erasure::erase_sensitive;
pub use error::{CapacityError, CodecError, ConfigError, RegistrationError, ValueError};
pub use record::{IndexSpec, Record};
pub use schema::{FieldDef, FieldDescriptor, SchemaRegistry, TableSchema};
pub use types::{
    FieldType, FieldValue, Kind, MapValue, MaxKey, MinKey, Nested, NullValue, SeqValue, Shape,
    Undefined,
};

// Re-exported so record definitions only need this crate.
pub use bigdecimal;
pub use bson;
pub use chrono;
