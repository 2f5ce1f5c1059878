//! Validation of record definitions at registration.

use std::collections::HashSet;
use std::mem::size_of;

use super::field::{FieldDef, FieldDescriptor, DOCUMENT_ID};
use crate::error::RegistrationError;
use crate::types::Shape;

pub(crate) fn validate_table_name(record: &str, table: &str) -> Result<(), RegistrationError> {
    if table.trim().is_empty() {
        return Err(RegistrationError::invalid(record, "table name is empty"));
    }
    Ok(())
}

/// Confirms every declared offset against a projection into the zero instance.
pub(crate) fn verify_offsets<R: 'static>(
    record: &str,
    zero: &R,
    defs: &[FieldDef<R>],
) -> Result<(), RegistrationError> {
    for def in defs {
        let observed = def.observed_offset(zero);
        if observed != def.offset {
            return Err(RegistrationError::invalid(
                record,
                format!(
                    "field '{}' declared at offset {} but located at {}",
                    def.name, def.offset, observed
                ),
            ));
        }
        let end = def.offset.checked_add(def.size).ok_or_else(|| {
            RegistrationError::invalid(record, format!("field '{}' bounds overflow", def.name))
        })?;
        if end > size_of::<R>() {
            return Err(RegistrationError::invalid(
                record,
                format!(
                    "field '{}' (offset {}, size {}) exceeds record size {}",
                    def.name,
                    def.offset,
                    def.size,
                    size_of::<R>()
                ),
            ));
        }
    }
    Ok(())
}

/// Checks annotation combinations that cannot be honored.
pub(crate) fn validate_annotations<R>(record: &str, def: &FieldDef<R>) -> Result<(), RegistrationError> {
    let a = &def.annotations;
    let fail = |reason: String| Err(RegistrationError::invalid(record, reason));

    if a.epoch_seconds && a.epoch_days {
        return fail(format!(
            "field '{}' cannot be both a datetime and a date",
            def.name
        ));
    }
    if (a.epoch_seconds || a.epoch_days) && !def.shape.is_integer() {
        return fail(format!(
            "date annotation on non-integer field '{}' ({})",
            def.name,
            def.shape.describe()
        ));
    }
    if a.blob && !def.shape.holds_bytes() {
        return fail(format!(
            "blob annotation on non-bytes field '{}' ({})",
            def.name,
            def.shape.describe()
        ));
    }
    if a.primary && a.ignore {
        return fail(format!("primary key '{}' cannot be ignored", def.name));
    }
    if !a.primary && (a.charset.is_some() || a.collation.is_some() || a.auto_increment || a.mirror)
    {
        return fail(format!(
            "table options on non-primary field '{}'",
            def.name
        ));
    }
    if a.doc_name.as_deref() == Some(DOCUMENT_ID) && !a.primary {
        return fail(format!(
            "field '{}' cannot use the document id name",
            def.name
        ));
    }
    Ok(())
}

/// Checks name uniqueness across field, document and column names.
pub(crate) fn validate_names(record: &str, fields: &[FieldDescriptor]) -> Result<(), RegistrationError> {
    let mut names = HashSet::new();
    let mut doc_names = HashSet::new();
    let mut columns = HashSet::new();

    for field in fields {
        if !names.insert(field.name.as_str()) {
            return Err(RegistrationError::invalid(
                record,
                format!("duplicate field name '{}'", field.name),
            ));
        }
        if field.ignored {
            continue;
        }
        if !doc_names.insert(field.document_name()) {
            return Err(RegistrationError::invalid(
                record,
                format!("duplicate document name '{}'", field.document_name()),
            ));
        }
        if !columns.insert(field.column_name()) {
            return Err(RegistrationError::invalid(
                record,
                format!("duplicate column name '{}'", field.column_name()),
            ));
        }
    }
    Ok(())
}

/// Validates field alignment and overlapping fields.
pub(crate) fn validate_field_layout(
    record: &str,
    fields: &[FieldDescriptor],
) -> Result<(), RegistrationError> {
    for field in fields {
        if field.align != 0 && field.offset % field.align != 0 {
            return Err(RegistrationError::invalid(
                record,
                format!(
                    "field '{}' offset {} not aligned to {}",
                    field.name, field.offset, field.align
                ),
            ));
        }
    }

    let mut ranges: Vec<(usize, usize)> = fields
        .iter()
        .filter(|f| f.size > 0)
        .map(|f| (f.offset, f.end_offset()))
        .collect();
    ranges.sort_by_key(|&(start, _)| start);

    for pair in ranges.windows(2) {
        if pair[0].1 > pair[1].0 {
            return Err(RegistrationError::invalid(
                record,
                "overlapping field ranges detected",
            ));
        }
    }
    Ok(())
}

/// Returns the index of the single primary key field.
pub(crate) fn find_primary_key(
    record: &str,
    fields: &[FieldDescriptor],
) -> Result<usize, RegistrationError> {
    let mut keys = fields.iter().enumerate().filter(|(_, f)| f.primary);
    let (index, key) = keys
        .next()
        .ok_or_else(|| RegistrationError::invalid(record, "no primary key field"))?;
    if let Some((_, second)) = keys.next() {
        return Err(RegistrationError::invalid(
            record,
            format!(
                "multiple primary keys: '{}' and '{}'",
                key.name, second.name
            ),
        ));
    }
    if matches!(key.shape, Shape::Seq(_) | Shape::Map(_) | Shape::Nested) {
        return Err(RegistrationError::invalid(
            record,
            format!(
                "primary key '{}' has unsupported shape {}",
                key.name,
                key.shape.describe()
            ),
        ));
    }
    Ok(index)
}
