//! Frozen per-table schema.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::mem::size_of;
use std::sync::OnceLock;

use super::field::{FieldDescriptor, DOCUMENT_ID};
use super::validation;
use crate::error::{CodecError, RegistrationError};
use crate::record::{IndexSpec, Record};
use crate::types::Kind;

/// Primary key summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    /// Index into [`TableSchema::fields`]
    pub field_index: usize,
    pub offset: usize,
    pub kind: Kind,
    pub declared_type: &'static str,
}

/// Charset and collation applied when the primary key does not override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefaults {
    pub charset: String,
    pub collation: String,
}

impl Default for TableDefaults {
    fn default() -> Self {
        Self {
            charset: "utf8mb4".to_string(),
            collation: "utf8mb4_general_ci".to_string(),
        }
    }
}

/// Registered schema for one record type. Immutable once published, apart
/// from the write-once column capacity hints.
#[derive(Debug)]
pub struct TableSchema {
    pub table_name: String,
    /// Rust type name of the record
    pub record_type: &'static str,
    /// Size of the record in bytes
    pub record_size: usize,
    /// Fields in declaration order
    pub fields: Vec<FieldDescriptor>,
    pub primary_key: PrimaryKey,
    pub charset: String,
    pub collation: String,
    pub auto_increment: bool,
    pub mirror_to_document_store: bool,
    pub index_specs: Vec<IndexSpec>,
    type_id: TypeId,
    column_capacity_hints: OnceLock<HashMap<String, usize>>,
}

impl TableSchema {
    /// Analyzes and validates `R`.
    pub(crate) fn build<R: Record>(defaults: &TableDefaults) -> Result<Self, RegistrationError> {
        let record = type_name::<R>();
        let table_name = R::table_name();
        validation::validate_table_name(record, table_name)?;

        let defs = R::fields();
        if defs.is_empty() {
            return Err(RegistrationError::invalid(record, "record has no fields"));
        }

        let zero = R::new_zero();
        validation::verify_offsets(record, &zero, &defs)?;
        for def in &defs {
            validation::validate_annotations(record, def)?;
        }

        let key_options = defs
            .iter()
            .find(|d| d.annotations.primary)
            .map(|d| d.annotations.clone())
            .unwrap_or_default();

        let fields: Vec<FieldDescriptor> = defs.into_iter().map(|d| d.freeze(record)).collect();
        validation::validate_names(record, &fields)?;
        validation::validate_field_layout(record, &fields)?;
        let key_index = validation::find_primary_key(record, &fields)?;
        let key = &fields[key_index];
        let primary_key = PrimaryKey {
            field_index: key_index,
            offset: key.offset,
            kind: key.kind,
            declared_type: key.declared_type,
        };

        Ok(Self {
            table_name: table_name.to_string(),
            record_type: record,
            record_size: size_of::<R>(),
            primary_key,
            charset: key_options
                .charset
                .unwrap_or_else(|| defaults.charset.clone()),
            collation: key_options
                .collation
                .unwrap_or_else(|| defaults.collation.clone()),
            auto_increment: key_options.auto_increment,
            mirror_to_document_store: key_options.mirror,
            index_specs: R::index_specs(),
            fields,
            type_id: TypeId::of::<R>(),
            column_capacity_hints: OnceLock::new(),
        })
    }

    /// Returns `true` if this schema was built from `R`.
    pub fn is_record<R: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<R>()
    }

    pub(crate) fn check_record<R: 'static>(&self) -> Result<(), CodecError> {
        if self.is_record::<R>() {
            Ok(())
        } else {
            Err(CodecError::RecordTypeMismatch {
                table: self.table_name.clone(),
                expected: self.record_type,
                actual: type_name::<R>(),
            })
        }
    }

    /// Looks up a field by its Rust name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a non-ignored field by its document key.
    pub fn field_by_document_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| !f.ignored && f.document_name() == name)
    }

    /// Looks up a non-ignored field by its column name.
    pub fn field_by_column(&self, column: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| !f.ignored && f.column_name() == column)
    }

    pub fn primary_key_field(&self) -> &FieldDescriptor {
        &self.fields[self.primary_key.field_index]
    }

    /// Document key of the primary key.
    pub fn id_key(&self) -> &'static str {
        DOCUMENT_ID
    }

    /// Fields mapped by the codecs.
    pub fn mapped_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.ignored)
    }

    pub fn sensitive_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.sensitive)
    }

    /// Stores column capacity hints. Returns `false` if hints were already set.
    pub(crate) fn set_capacity_hints(&self, hints: HashMap<String, usize>) -> bool {
        self.column_capacity_hints.set(hints).is_ok()
    }

    pub fn capacity_hints(&self) -> Option<&HashMap<String, usize>> {
        self.column_capacity_hints.get()
    }

    /// Capacity hint for a column, or `default` when none was estimated.
    pub fn capacity_for(&self, column: &str, default: usize) -> usize {
        self.capacity_hints()
            .and_then(|hints| hints.get(column).copied())
            .unwrap_or(default)
    }
}
