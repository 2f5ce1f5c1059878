//! Secure erasure of sensitive byte buffers.

use zeroize::Zeroize;

use crate::accessor;
use crate::error::{CodecError, ValueError};
use crate::record::Record;
use crate::schema::{FieldDescriptor, SchemaRegistry, TableSchema};
use crate::types::Shape;

/// Zeroes every non-empty byte buffer in the sensitive fields of `record`.
///
/// Buffers keep their length; only their contents are overwritten.
///
/// # Returns
/// `true` if at least one buffer was overwritten.
pub fn erase_sensitive<R: Record>(registry: &SchemaRegistry, record: &mut R) -> Result<bool, CodecError> {
    let schema = registry.schema_for::<R>()?;
    erase_with_schema(&schema, record)
}

/// Erases with an already resolved schema.
pub fn erase_with_schema<R: 'static>(schema: &TableSchema, record: &mut R) -> Result<bool, CodecError> {
    schema.check_record::<R>()?;
    let mut erased = false;
    for field in schema.sensitive_fields() {
        let wiped = erase_field(record, field).map_err(|source| CodecError::FieldEncode {
            field: field.name.clone(),
            source,
        })?;
        if wiped {
            tracing::trace!("Erased sensitive field '{}' of '{}'", field.name, schema.table_name);
        }
        erased |= wiped;
    }
    Ok(erased)
}

fn erase_field<R: 'static>(record: &mut R, field: &FieldDescriptor) -> Result<bool, ValueError> {
    let buffer = match field.shape {
        Shape::Bytes => Some(accessor::field_mut::<R, Vec<u8>>(record, field)?),
        Shape::Pointer(Shape::Bytes) => {
            accessor::field_mut::<R, Option<Box<Vec<u8>>>>(record, field)?.as_deref_mut()
        }
        _ => None,
    };
    match buffer {
        Some(bytes) if !bytes.is_empty() => {
            bytes.as_mut_slice().zeroize();
            Ok(true)
        }
        _ => Ok(false),
    }
}
