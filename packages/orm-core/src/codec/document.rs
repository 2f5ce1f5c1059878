//! Record ⇄ BSON document codec.

use bson::{Bson, Document};

use super::convert;
use crate::accessor;
use crate::error::{CodecError, ValueError};
use crate::record::Record;
use crate::schema::{FieldDescriptor, SchemaRegistry, TableSchema};
use crate::types::{FieldValue, Kind};

/// Converts registered records to and from BSON documents.
#[derive(Debug, Clone, Copy)]
pub struct DocumentCodec<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> DocumentCodec<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Encodes `record` into a document keyed by resolved document names.
    pub fn encode<R: Record>(&self, record: &R) -> Result<Document, CodecError> {
        let schema = self.registry.schema_for::<R>()?;
        encode_with_schema(&schema, record)
    }

    /// Decodes `document` into an existing record.
    ///
    /// Fields absent from the document (or `Null`) keep their current value.
    /// A failure aborts the decode; fields decoded before it stay written.
    pub fn decode<R: Record>(&self, document: &Document, record: &mut R) -> Result<(), CodecError> {
        let schema = self.registry.schema_for::<R>()?;
        decode_with_schema(&schema, document, record)
    }

    /// Decodes `document` into a fresh zero-valued record.
    pub fn decode_new<R: Record>(&self, document: &Document) -> Result<R, CodecError> {
        let mut record = R::new_zero();
        self.decode(document, &mut record)?;
        Ok(record)
    }

    /// Primary key value as it appears under `_id`.
    pub fn primary_key<R: Record>(&self, record: &R) -> Result<Bson, CodecError> {
        let schema = self.registry.schema_for::<R>()?;
        let key = schema.primary_key_field();
        let value = read_field(record, key)?;
        convert::to_bson(value).map_err(|source| encode_error(key, source))
    }

    /// Encodes many records in parallel.
    #[cfg(feature = "parallel")]
    pub fn encode_batch<R: Record + Sync>(&self, records: &[R]) -> Result<Vec<Document>, CodecError> {
        use rayon::prelude::*;

        let schema = self.registry.schema_for::<R>()?;
        records
            .par_iter()
            .map(|record| encode_with_schema(&schema, record))
            .collect()
    }
}

fn encode_error(field: &FieldDescriptor, source: ValueError) -> CodecError {
    CodecError::FieldEncode {
        field: field.name.clone(),
        source,
    }
}

fn decode_error(field: &FieldDescriptor, source: ValueError) -> CodecError {
    CodecError::FieldDecode {
        field: field.name.clone(),
        source,
    }
}

fn read_field<R: 'static>(record: &R, field: &FieldDescriptor) -> Result<FieldValue, CodecError> {
    accessor::read(record, field).map_err(|source| encode_error(field, source))
}

/// Whether a read value appears in the encoded document.
///
/// Zero values are omitted except for the primary key, present pointers and
/// values whose presence is the value (object ids, unit wrappers).
fn is_encoded(field: &FieldDescriptor, value: &FieldValue) -> bool {
    match value {
        FieldValue::Absent => field.primary,
        value => field.primary || field.kind == Kind::Pointer || !value.is_zero(),
    }
}

/// Encodes with an already resolved schema.
pub fn encode_with_schema<R: 'static>(schema: &TableSchema, record: &R) -> Result<Document, CodecError> {
    schema.check_record::<R>()?;
    let mut document = Document::new();
    for field in schema.mapped_fields() {
        let value = read_field(record, field)?;
        if !is_encoded(field, &value) {
            continue;
        }
        let bson = convert::to_bson(value).map_err(|source| encode_error(field, source))?;
        document.insert(field.document_name(), bson);
    }
    Ok(document)
}

/// Decodes with an already resolved schema.
pub fn decode_with_schema<R: 'static>(
    schema: &TableSchema,
    document: &Document,
    record: &mut R,
) -> Result<(), CodecError> {
    schema.check_record::<R>()?;
    for field in schema.mapped_fields() {
        let Some(bson) = document.get(field.document_name()) else {
            continue;
        };
        if matches!(bson, Bson::Null) {
            continue;
        }
        let value = convert::from_bson(&field.shape, bson).map_err(|source| decode_error(field, source))?;
        accessor::write(record, field, value).map_err(|source| decode_error(field, source))?;
    }
    Ok(())
}
