//! Error types for registration, field access, codecs and capacity estimation.

use thiserror::Error;

use crate::types::Kind;

/// Errors raised while registering a record type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Table already registered; the existing schema is left untouched.
    #[error("Table '{table}' already registered")]
    DuplicateTable { table: String },

    /// Record definition cannot produce a usable schema.
    #[error("Invalid record '{record}': {reason}")]
    InvalidRecord { record: String, reason: String },
}

impl RegistrationError {
    /// Returns `true` if the registry must not be used after this error.
    ///
    /// Duplicates are reported but harmless; every other registration
    /// failure leaves a record type without a schema.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RegistrationError::DuplicateTable { .. })
    }

    pub(crate) fn invalid(record: &str, reason: impl Into<String>) -> Self {
        RegistrationError::InvalidRecord {
            record: record.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors converting a single value to or from a field.
#[derive(Error, Debug)]
pub enum ValueError {
    /// Source value type does not match the destination type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Narrowing conversion would lose information
    #[error("Value {value} out of range for {target}")]
    RangeOverflow { value: String, target: &'static str },

    /// Element of a sequence failed to convert
    #[error("Element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<ValueError>,
    },

    /// Map entry failed to convert
    #[error("Entry '{key}': {source}")]
    Entry {
        key: String,
        #[source]
        source: Box<ValueError>,
    },

    /// Shape outside the recognized set for this operation
    #[error("Unsupported shape: {shape}")]
    UnsupportedShape { shape: String },

    /// Textual input could not be parsed
    #[error("Cannot parse {input:?} as {target}: {reason}")]
    Parse {
        target: &'static str,
        input: String,
        reason: String,
    },

    /// Descriptor used with a record type it was not derived from
    #[error("Descriptor belongs to {expected}, not {actual}")]
    ForeignRecord {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON serialization error: {0}")]
    BsonSer(#[from] bson::ser::Error),

    #[error("BSON deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),
}

impl ValueError {
    pub(crate) fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        ValueError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn parse(target: &'static str, input: &[u8], reason: impl ToString) -> Self {
        ValueError::Parse {
            target,
            input: String::from_utf8_lossy(input).into_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn at_index(self, index: usize) -> Self {
        ValueError::Element {
            index,
            source: Box::new(self),
        }
    }

    pub(crate) fn at_key(self, key: &str) -> Self {
        ValueError::Entry {
            key: key.to_string(),
            source: Box::new(self),
        }
    }

    /// Returns `(expected, actual)` type names of the innermost mismatch.
    pub fn type_names(&self) -> Option<(&str, &str)> {
        match self {
            ValueError::TypeMismatch { expected, actual } => Some((expected, actual)),
            ValueError::Element { source, .. } | ValueError::Entry { source, .. } => {
                source.type_names()
            }
            _ => None,
        }
    }

    /// Returns `true` if the innermost cause is a range overflow.
    pub fn is_range_overflow(&self) -> bool {
        match self {
            ValueError::RangeOverflow { .. } => true,
            ValueError::Element { source, .. } | ValueError::Entry { source, .. } => {
                source.is_range_overflow()
            }
            _ => false,
        }
    }
}

/// Errors from the document and row codecs.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Encode or decode attempted for a table that was never registered
    #[error("Table '{table}' is not registered")]
    UnregisteredTable { table: String },

    /// Record type differs from the type the schema was built from
    #[error("Record type {actual} does not match schema of table '{table}' ({expected})")]
    RecordTypeMismatch {
        table: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Field could not be encoded
    #[error("Failed to encode field '{field}': {source}")]
    FieldEncode {
        field: String,
        #[source]
        source: ValueError,
    },

    /// Field could not be decoded
    #[error("Failed to decode field '{field}': {source}")]
    FieldDecode {
        field: String,
        #[source]
        source: ValueError,
    },

    /// Field kind has no representation in this codec
    #[error("Field '{field}' of kind {kind} is not supported")]
    UnsupportedKind { field: String, kind: Kind },

    /// Column name does not map to any field
    #[error("Column '{column}' not found in table '{table}'")]
    UnknownColumn { table: String, column: String },
}

impl CodecError {
    /// Name of the field the error is attached to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            CodecError::FieldEncode { field, .. }
            | CodecError::FieldDecode { field, .. }
            | CodecError::UnsupportedKind { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Underlying value error of a field failure.
    pub fn value_error(&self) -> Option<&ValueError> {
        match self {
            CodecError::FieldEncode { source, .. } | CodecError::FieldDecode { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// Errors from column capacity estimation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    /// Table absent or introspection returned nothing
    #[error("No column metadata for table '{table}'")]
    NoColumnMetadata { table: String },

    /// Hints computed for a table with no registered schema
    #[error("Table '{table}' is not registered")]
    UnregisteredTable { table: String },

    /// Metadata source failed
    #[error("Column metadata source error: {0}")]
    Source(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid date format '{format}'")]
    InvalidDateFormat { format: String },

    /// Process-wide date formats were already installed or used
    #[error("Date formats already initialized")]
    DateFormatsAlreadySet,
}
