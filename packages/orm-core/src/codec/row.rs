//! Record ⇄ relational column codec.
//!
//! Values leave a record as backend-neutral [`ColumnValue`]s and enter it
//! from the raw bytes a driver hands back for a column. Raw input is always
//! copied; nothing in a record aliases a driver buffer.

use chrono::{DateTime, Utc};

use super::convert::parse_decimal;
use crate::accessor;
use crate::config::DateFormats;
use crate::error::{CodecError, ValueError};
use crate::record::Record;
use crate::schema::{FieldDescriptor, SchemaRegistry, TableSchema};
use crate::types::{FieldValue, Kind, Shape};

/// Column value handed to a relational driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

/// Converts field values to column values and raw column bytes to fields.
#[derive(Debug, Clone, Copy)]
pub struct RowCodec<'r> {
    registry: &'r SchemaRegistry,
    formats: &'r DateFormats,
}

impl<'r> RowCodec<'r> {
    /// Creates a codec using the registry's date formats.
    ///
    /// A registry built with [`SchemaRegistry::with_config`] supplies its
    /// configured formats; otherwise the process-wide formats apply.
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            formats: registry.date_formats(),
        }
    }

    /// Creates a codec with explicit date formats, overriding the registry's.
    pub fn with_date_formats(registry: &'r SchemaRegistry, formats: &'r DateFormats) -> Self {
        Self { registry, formats }
    }

    /// Column value of a field.
    ///
    /// # Arguments
    /// * `record` - Record the descriptor was registered for
    /// * `field` - Descriptor from the record's schema
    ///
    /// # Returns
    /// The driver-ready value: JSON text for sequences, maps and nested
    /// documents, formatted text for epoch-flagged integers, or
    /// `UnsupportedKind` for document-only fields.
    pub fn get_value<R: 'static>(
        &self,
        record: &R,
        field: &FieldDescriptor,
    ) -> Result<ColumnValue, CodecError> {
        let encode_err = |source| CodecError::FieldEncode {
            field: field.name.clone(),
            source,
        };
        match &field.shape {
            shape if is_json(shape) => self.json_column(record, field).map_err(encode_err),
            Shape::Pointer(inner) if is_json(inner) => {
                self.json_column(record, field).map_err(encode_err)
            }
            _ => {
                let value = accessor::read(record, field).map_err(encode_err)?;
                self.scalar_column(field, value)
            }
        }
    }

    fn json_column<R: 'static>(
        &self,
        record: &R,
        field: &FieldDescriptor,
    ) -> Result<ColumnValue, ValueError> {
        let json = accessor::to_json(record, field)?;
        if json == "null" {
            Ok(ColumnValue::Null)
        } else {
            Ok(ColumnValue::Text(json))
        }
    }

    fn scalar_column(&self, field: &FieldDescriptor, value: FieldValue) -> Result<ColumnValue, CodecError> {
        if field.is_epoch_date() {
            if let Some(wide) = value.as_i128() {
                return self.epoch_text(field, wide);
            }
        }
        Ok(match value {
            FieldValue::Absent => ColumnValue::Null,
            FieldValue::Bool(b) => ColumnValue::Bool(b),
            FieldValue::I8(v) => ColumnValue::Int(v.into()),
            FieldValue::I16(v) => ColumnValue::Int(v.into()),
            FieldValue::I32(v) => ColumnValue::Int(v.into()),
            FieldValue::I64(v) => ColumnValue::Int(v),
            FieldValue::Isize(v) => ColumnValue::Int(v as i64),
            FieldValue::U8(v) => ColumnValue::UInt(v.into()),
            FieldValue::U16(v) => ColumnValue::UInt(v.into()),
            FieldValue::U32(v) => ColumnValue::UInt(v.into()),
            FieldValue::U64(v) => ColumnValue::UInt(v),
            FieldValue::Usize(v) => ColumnValue::UInt(v as u64),
            FieldValue::F32(v) => ColumnValue::Float(v.into()),
            FieldValue::F64(v) => ColumnValue::Float(v),
            FieldValue::String(s) => ColumnValue::Text(s),
            FieldValue::Bytes(b) => ColumnValue::Bytes(b),
            FieldValue::Timestamp(t) => ColumnValue::Timestamp(t),
            FieldValue::Decimal(d) => ColumnValue::Text(d.to_string()),
            _ => return Err(unsupported(field)),
        })
    }

    fn epoch_text(&self, field: &FieldDescriptor, wide: i128) -> Result<ColumnValue, CodecError> {
        let encode_err = |source| CodecError::FieldEncode {
            field: field.name.clone(),
            source,
        };
        let value = i64::try_from(wide).map_err(|_| {
            encode_err(ValueError::RangeOverflow {
                value: wide.to_string(),
                target: "i64",
            })
        })?;
        let text = if field.epoch_seconds {
            self.formats.format_epoch_seconds(value)
        } else {
            self.formats.format_epoch_days(value)
        };
        text.map(ColumnValue::Text).map_err(encode_err)
    }

    /// Borrows a byte field (or the pointee of a pointer-to-bytes field).
    ///
    /// Returns `None` for an absent pointer.
    pub fn bytes_value<'a, R: 'static>(
        &self,
        record: &'a R,
        field: &FieldDescriptor,
    ) -> Result<Option<&'a [u8]>, CodecError> {
        let encode_err = |source| CodecError::FieldEncode {
            field: field.name.clone(),
            source,
        };
        match field.shape {
            Shape::Bytes => accessor::field_ref::<R, Vec<u8>>(record, field)
                .map(|bytes| Some(bytes.as_slice()))
                .map_err(encode_err),
            Shape::Pointer(Shape::Bytes) => accessor::field_ref::<R, Option<Box<Vec<u8>>>>(record, field)
                .map(|ptr| ptr.as_deref().map(Vec::as_slice))
                .map_err(encode_err),
            _ => Err(unsupported(field)),
        }
    }

    /// Column value of a pointer field; `Null` when absent.
    pub fn pointer_value<R: 'static>(
        &self,
        record: &R,
        field: &FieldDescriptor,
    ) -> Result<ColumnValue, CodecError> {
        if field.kind != Kind::Pointer {
            return Err(unsupported(field));
        }
        self.get_value(record, field)
    }

    /// Assigns a field from raw column bytes, copying them.
    ///
    /// # Arguments
    /// * `record` - Record to modify
    /// * `field` - Descriptor from the record's schema
    /// * `raw` - Column bytes as returned by the driver
    ///
    /// # Returns
    /// `FieldDecode` naming the field if the bytes do not parse or do not fit
    /// the field type; the field is left unchanged in that case.
    pub fn set_value<R: 'static>(
        &self,
        record: &mut R,
        field: &FieldDescriptor,
        raw: &[u8],
    ) -> Result<(), CodecError> {
        self.assign_raw(record, field, raw)
            .map_err(|source| CodecError::FieldDecode {
                field: field.name.clone(),
                source,
            })
    }

    fn assign_raw<R: 'static>(
        &self,
        record: &mut R,
        field: &FieldDescriptor,
        raw: &[u8],
    ) -> Result<(), ValueError> {
        let target: &Shape = match &field.shape {
            Shape::Pointer(inner) => inner,
            shape => shape,
        };
        if is_json(target) {
            return accessor::assign_json(record, field, raw);
        }
        let value = self.parse_scalar(field, target, raw)?;
        accessor::write(record, field, value)
    }

    fn parse_scalar(
        &self,
        field: &FieldDescriptor,
        shape: &Shape,
        raw: &[u8],
    ) -> Result<FieldValue, ValueError> {
        if field.epoch_seconds {
            return Ok(FieldValue::I64(self.formats.parse_epoch_seconds(text(raw, "datetime")?)?));
        }
        if field.epoch_days {
            return Ok(FieldValue::I64(self.formats.parse_epoch_days(text(raw, "date")?)?));
        }
        Ok(match shape {
            Shape::String => FieldValue::String(text(raw, "string")?.to_string()),
            Shape::Bool => FieldValue::Bool(parse_bool(raw)?),
            Shape::Bytes => FieldValue::Bytes(raw.to_vec()),
            Shape::Timestamp => FieldValue::Timestamp(self.formats.parse_timestamp(text(raw, "timestamp")?)?),
            Shape::Decimal => FieldValue::Decimal(parse_decimal(text(raw, "decimal")?)?),
            shape if shape.kind().is_signed() => {
                let digits = text(raw, "integer")?.trim();
                FieldValue::I64(digits.parse().map_err(|e| ValueError::parse("integer", raw, e))?)
            }
            shape if shape.kind().is_unsigned() => {
                let digits = text(raw, "unsigned integer")?.trim();
                FieldValue::U64(digits.parse().map_err(|e| ValueError::parse("unsigned integer", raw, e))?)
            }
            shape if shape.kind().is_float() => {
                let digits = text(raw, "float")?.trim();
                FieldValue::F64(digits.parse().map_err(|e| ValueError::parse("float", raw, e))?)
            }
            other => {
                return Err(ValueError::UnsupportedShape {
                    shape: other.describe(),
                })
            }
        })
    }

    /// Clears a nullable field. Pointers become absent and `Bson` fields
    /// become `Null`; other fields are left untouched.
    pub fn set_null<R: 'static>(&self, record: &mut R, field: &FieldDescriptor) -> Result<(), CodecError> {
        let value = match field.shape {
            Shape::Pointer(_) | Shape::Nested | Shape::Any => FieldValue::Absent,
            _ => return Ok(()),
        };
        accessor::write(record, field, value).map_err(|source| CodecError::FieldDecode {
            field: field.name.clone(),
            source,
        })
    }

    /// Assigns the field mapped to `column`; `None` is SQL NULL.
    pub fn set_column<R: Record>(
        &self,
        record: &mut R,
        column: &str,
        raw: Option<&[u8]>,
    ) -> Result<(), CodecError> {
        let schema = self.registry.schema_for::<R>()?;
        set_column_with_schema(self, &schema, record, column, raw)
    }

    /// Assigns every `(column, raw)` pair of a result row.
    ///
    /// # Arguments
    /// * `record` - Record to fill, usually `R::new_zero()`
    /// * `columns` - Column names with their raw bytes; `None` is SQL NULL
    ///
    /// # Returns
    /// The first error encountered. Columns assigned before it stay written;
    /// a column with no mapped field fails with `UnknownColumn`.
    pub fn scan_row<'c, R, I>(&self, record: &mut R, columns: I) -> Result<(), CodecError>
    where
        R: Record,
        I: IntoIterator<Item = (&'c str, Option<&'c [u8]>)>,
    {
        let schema = self.registry.schema_for::<R>()?;
        for (column, raw) in columns {
            set_column_with_schema(self, &schema, record, column, raw)?;
        }
        Ok(())
    }

    /// Every mapped relational field as `(column name, value)`, in
    /// declaration order. Document-only fields (object ids, BSON
    /// primitives) are skipped.
    ///
    /// # Returns
    /// Parameters for an insert or update statement, or `UnregisteredTable`
    /// if `R` has no schema in the codec's registry.
    pub fn to_params<R: Record>(&self, record: &R) -> Result<Vec<(String, ColumnValue)>, CodecError> {
        let schema = self.registry.schema_for::<R>()?;
        schema
            .mapped_fields()
            .filter(|field| !is_document_only(&field.shape))
            .map(|field| Ok((field.column_name().to_string(), self.get_value(record, field)?)))
            .collect()
    }
}

fn set_column_with_schema<R: 'static>(
    codec: &RowCodec<'_>,
    schema: &TableSchema,
    record: &mut R,
    column: &str,
    raw: Option<&[u8]>,
) -> Result<(), CodecError> {
    let field = schema
        .field_by_column(column)
        .ok_or_else(|| CodecError::UnknownColumn {
            table: schema.table_name.clone(),
            column: column.to_string(),
        })?;
    match raw {
        Some(raw) => codec.set_value(record, field, raw),
        None => codec.set_null(record, field),
    }
}

fn unsupported(field: &FieldDescriptor) -> CodecError {
    CodecError::UnsupportedKind {
        field: field.name.clone(),
        kind: field.kind,
    }
}

/// Shapes stored as JSON text in a column.
fn is_json(shape: &Shape) -> bool {
    matches!(shape, Shape::Seq(_) | Shape::Map(_) | Shape::Any | Shape::Nested)
}

fn is_document_only(shape: &Shape) -> bool {
    match shape {
        Shape::ObjectId | Shape::Primitive(_) => true,
        Shape::Pointer(inner) => is_document_only(inner),
        _ => false,
    }
}

fn text<'a>(raw: &'a [u8], target: &'static str) -> Result<&'a str, ValueError> {
    std::str::from_utf8(raw).map_err(|e| ValueError::parse(target, raw, e))
}

fn parse_bool(raw: &[u8]) -> Result<bool, ValueError> {
    match text(raw, "bool")?.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other if other.eq_ignore_ascii_case("true") => Ok(true),
        other if other.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(ValueError::parse("bool", raw, "expected 1, 0, true or false")),
    }
}
