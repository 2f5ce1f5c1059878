//! Conversions between field values and BSON.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Document};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::ValueError;
use crate::types::{Elem, FieldValue, MapElem, MapValue, Primitive, SeqValue, Shape};

/// Epoch integers below this magnitude are seconds, otherwise milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Type name of a BSON value for error messages.
pub(crate) fn bson_type_name(value: &Bson) -> String {
    format!("{:?}", value.element_type())
}

fn mismatch(expected: &str, actual: &Bson) -> ValueError {
    ValueError::mismatch(expected, bson_type_name(actual))
}

fn out_of_range(value: impl ToString, target: &'static str) -> ValueError {
    ValueError::RangeOverflow {
        value: value.to_string(),
        target,
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Converts a field value into BSON.
pub(crate) fn to_bson(value: FieldValue) -> Result<Bson, ValueError> {
    Ok(match value {
        FieldValue::Absent => Bson::Null,
        FieldValue::String(s) => Bson::String(s),
        FieldValue::Bool(b) => Bson::Boolean(b),
        FieldValue::I8(v) => Bson::Int32(v.into()),
        FieldValue::I16(v) => Bson::Int32(v.into()),
        FieldValue::I32(v) => Bson::Int32(v),
        FieldValue::U8(v) => Bson::Int32(v.into()),
        FieldValue::U16(v) => Bson::Int32(v.into()),
        FieldValue::I64(v) => Bson::Int64(v),
        FieldValue::Isize(v) => Bson::Int64(i64::try_from(v).map_err(|_| out_of_range(v, "int64"))?),
        FieldValue::U32(v) => Bson::Int64(v.into()),
        FieldValue::U64(v) => Bson::Int64(i64::try_from(v).map_err(|_| out_of_range(v, "int64"))?),
        FieldValue::Usize(v) => Bson::Int64(i64::try_from(v).map_err(|_| out_of_range(v, "int64"))?),
        FieldValue::F32(v) => Bson::Double(v.into()),
        FieldValue::F64(v) => Bson::Double(v),
        FieldValue::Bytes(bytes) => binary(bytes),
        FieldValue::Timestamp(t) => Bson::DateTime(bson::DateTime::from_chrono(t)),
        FieldValue::Decimal(d) => Bson::String(d.to_string()),
        FieldValue::ObjectId(oid) => Bson::ObjectId(oid),
        FieldValue::Primitive(p) => p,
        FieldValue::Seq(seq) => Bson::Array(seq_to_bson(seq)?),
        FieldValue::Map(map) => Bson::Document(map_to_document(map)?),
        FieldValue::Any(any) => normalize(any).unwrap_or(Bson::Null),
        FieldValue::Embedded(doc) => Bson::Document(doc),
    })
}

fn binary(bytes: Vec<u8>) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Generic,
        bytes,
    })
}

fn each_to_bson<T>(
    items: Vec<T>,
    convert: impl Fn(T) -> Result<Bson, ValueError>,
) -> Result<Vec<Bson>, ValueError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| convert(item).map_err(|e| e.at_index(i)))
        .collect()
}

fn seq_to_bson(seq: SeqValue) -> Result<Vec<Bson>, ValueError> {
    match seq {
        SeqValue::String(v) => each_to_bson(v, |s| Ok(Bson::String(s))),
        SeqValue::Bool(v) => each_to_bson(v, |b| Ok(Bson::Boolean(b))),
        SeqValue::I8(v) => each_to_bson(v, |n| Ok(Bson::Int32(n.into()))),
        SeqValue::I16(v) => each_to_bson(v, |n| Ok(Bson::Int32(n.into()))),
        SeqValue::I32(v) => each_to_bson(v, |n| Ok(Bson::Int32(n))),
        SeqValue::I64(v) => each_to_bson(v, |n| Ok(Bson::Int64(n))),
        SeqValue::U16(v) => each_to_bson(v, |n| Ok(Bson::Int32(n.into()))),
        SeqValue::U32(v) => each_to_bson(v, |n| Ok(Bson::Int64(n.into()))),
        SeqValue::U64(v) => each_to_bson(v, |n| {
            i64::try_from(n)
                .map(Bson::Int64)
                .map_err(|_| out_of_range(n, "int64"))
        }),
        SeqValue::F32(v) => each_to_bson(v, |n| Ok(Bson::Double(n.into()))),
        SeqValue::F64(v) => each_to_bson(v, |n| Ok(Bson::Double(n))),
        SeqValue::ObjectId(v) => each_to_bson(v, |oid| Ok(Bson::ObjectId(oid))),
        SeqValue::Timestamp(v) => {
            each_to_bson(v, |t| Ok(Bson::DateTime(bson::DateTime::from_chrono(t))))
        }
        SeqValue::Bytes(v) => each_to_bson(v, |b| Ok(binary(b))),
        SeqValue::Any(v) => Ok(v.into_iter().filter_map(normalize).collect()),
        SeqValue::Map(v) => each_to_bson(v, |m| Ok(Bson::Document(sorted_document(m, Some)))),
    }
}

fn map_to_document(map: MapValue) -> Result<Document, ValueError> {
    match map {
        MapValue::String(m) => Ok(sorted_document(m, |s| Some(Bson::String(s)))),
        MapValue::I32(m) => Ok(sorted_document(m, |n| Some(Bson::Int32(n)))),
        MapValue::I64(m) => Ok(sorted_document(m, |n| Some(Bson::Int64(n)))),
        MapValue::Any(m) => Ok(sorted_document(m, Some)),
        MapValue::F64(m) => normalized_document(m),
        MapValue::Bool(m) => normalized_document(m),
        MapValue::Strings(m) => normalized_document(m),
    }
}

/// Builds a document with keys in sorted order, skipping values `convert`
/// maps to `None`.
fn sorted_document<V>(map: HashMap<String, V>, convert: impl Fn(V) -> Option<Bson>) -> Document {
    let mut entries: Vec<(String, V)> = map.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    let mut doc = Document::new();
    for (key, value) in entries {
        if let Some(value) = convert(value) {
            doc.insert(key, value);
        }
    }
    doc
}

/// Generic path for map values: serialize through serde, then normalize.
fn normalized_document<V: Serialize>(map: HashMap<String, V>) -> Result<Document, ValueError> {
    let mut converted = HashMap::with_capacity(map.len());
    for (key, value) in map {
        let bson = bson::to_bson(&value).map_err(|e| ValueError::from(e).at_key(&key))?;
        converted.insert(key, bson);
    }
    Ok(sorted_document(converted, normalize))
}

/// Recursively normalizes a BSON value, dropping deprecated leaf kinds.
///
/// Arrays and documents are rebuilt from their normalized children; symbols
/// and DB pointers yield `None`.
pub(crate) fn normalize(value: Bson) -> Option<Bson> {
    match value {
        Bson::Array(items) => Some(Bson::Array(items.into_iter().filter_map(normalize).collect())),
        Bson::Document(doc) => {
            let mut out = Document::new();
            for (key, value) in doc {
                if let Some(value) = normalize(value) {
                    out.insert(key, value);
                }
            }
            Some(Bson::Document(out))
        }
        Bson::Symbol(_) | Bson::DbPointer(_) => None,
        other => Some(other),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Converts a BSON value into a field value of `shape`.
///
/// `Null` is never passed in for pointer shapes; callers skip it.
pub(crate) fn from_bson(shape: &Shape, value: &Bson) -> Result<FieldValue, ValueError> {
    Ok(match shape {
        Shape::String => FieldValue::String(decode_string(value)?),
        Shape::Bool => FieldValue::Bool(decode_bool(value)?),
        Shape::I8 => FieldValue::I8(integer(value, "i8")?),
        Shape::I16 => FieldValue::I16(integer(value, "i16")?),
        Shape::I32 => FieldValue::I32(integer(value, "i32")?),
        Shape::I64 => FieldValue::I64(integer(value, "i64")?),
        Shape::Isize => FieldValue::Isize(integer(value, "isize")?),
        Shape::U8 => FieldValue::U8(integer(value, "u8")?),
        Shape::U16 => FieldValue::U16(integer(value, "u16")?),
        Shape::U32 => FieldValue::U32(integer(value, "u32")?),
        Shape::U64 => FieldValue::U64(integer(value, "u64")?),
        Shape::Usize => FieldValue::Usize(integer(value, "usize")?),
        Shape::F32 => FieldValue::F32(decode_f32(value)?),
        Shape::F64 => FieldValue::F64(decode_f64(value)?),
        Shape::Bytes => FieldValue::Bytes(decode_bytes(value)?),
        Shape::Timestamp => FieldValue::Timestamp(decode_timestamp(value)?),
        Shape::Decimal => FieldValue::Decimal(decode_decimal(value)?),
        Shape::ObjectId => match value {
            Bson::ObjectId(oid) => FieldValue::ObjectId(*oid),
            other => return Err(mismatch("objectId", other)),
        },
        Shape::Primitive(primitive) => FieldValue::Primitive(decode_primitive(*primitive, value)?),
        Shape::Seq(elem) => match value {
            Bson::Array(items) => FieldValue::Seq(decode_seq(*elem, items)?),
            other => return Err(mismatch(&shape.describe(), other)),
        },
        Shape::Map(elem) => match value {
            Bson::Document(doc) => FieldValue::Map(decode_map(*elem, doc)?),
            other => return Err(mismatch(&shape.describe(), other)),
        },
        Shape::Any => FieldValue::Any(value.clone()),
        Shape::Pointer(inner) => from_bson(inner, value)?,
        Shape::Nested => match value {
            Bson::Document(doc) => FieldValue::Embedded(doc.clone()),
            other => return Err(mismatch("document", other)),
        },
    })
}

fn decode_string(value: &Bson) -> Result<String, ValueError> {
    match value {
        Bson::String(s) => Ok(s.clone()),
        Bson::Int32(n) => Ok(n.to_string()),
        Bson::Int64(n) => Ok(n.to_string()),
        // `Display` for f64 is the shortest round-trip decimal form.
        Bson::Double(n) => Ok(n.to_string()),
        other => Err(mismatch("string", other)),
    }
}

fn decode_bool(value: &Bson) -> Result<bool, ValueError> {
    match value {
        Bson::Boolean(b) => Ok(*b),
        other => Err(mismatch("bool", other)),
    }
}

fn integer<T: TryFrom<i64>>(value: &Bson, target: &'static str) -> Result<T, ValueError> {
    let wide = match value {
        Bson::Int32(n) => i64::from(*n),
        Bson::Int64(n) => *n,
        other => return Err(mismatch(target, other)),
    };
    T::try_from(wide).map_err(|_| out_of_range(wide, target))
}

fn decode_f64(value: &Bson) -> Result<f64, ValueError> {
    match value {
        Bson::Double(n) => Ok(*n),
        other => Err(mismatch("f64", other)),
    }
}

fn decode_f32(value: &Bson) -> Result<f32, ValueError> {
    let wide = match value {
        Bson::Double(n) => *n,
        other => return Err(mismatch("f32", other)),
    };
    if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
        return Err(out_of_range(wide, "f32"));
    }
    Ok(wide as f32)
}

fn decode_bytes(value: &Bson) -> Result<Vec<u8>, ValueError> {
    match value {
        Bson::Binary(bin) => Ok(bin.bytes.clone()),
        other => Err(mismatch("bytes", other)),
    }
}

fn decode_timestamp(value: &Bson) -> Result<DateTime<Utc>, ValueError> {
    match value {
        Bson::DateTime(dt) => Ok(dt.to_chrono()),
        Bson::String(s) => parse_iso_timestamp(s),
        Bson::Int32(n) => epoch_timestamp(i64::from(*n)),
        Bson::Int64(n) => epoch_timestamp(*n),
        other => Err(mismatch("timestamp", other)),
    }
}

fn parse_iso_timestamp(text: &str) -> Result<DateTime<Utc>, ValueError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| ValueError::parse("timestamp", text.as_bytes(), e))
}

/// Interprets an epoch integer as seconds or milliseconds by magnitude.
fn epoch_timestamp(value: i64) -> Result<DateTime<Utc>, ValueError> {
    let parsed = if value.unsigned_abs() < EPOCH_MILLIS_THRESHOLD.unsigned_abs() {
        DateTime::<Utc>::from_timestamp(value, 0)
    } else {
        DateTime::<Utc>::from_timestamp_millis(value)
    };
    parsed.ok_or_else(|| out_of_range(value, "timestamp"))
}

pub(crate) fn parse_decimal(text: &str) -> Result<BigDecimal, ValueError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(BigDecimal::zero());
    }
    BigDecimal::from_str(trimmed).map_err(|e| ValueError::parse("decimal", text.as_bytes(), e))
}

fn decode_decimal(value: &Bson) -> Result<BigDecimal, ValueError> {
    match value {
        Bson::String(s) => parse_decimal(s),
        Bson::Double(n) if n.is_finite() => parse_decimal(&n.to_string()),
        Bson::Double(n) => Err(ValueError::parse("decimal", n.to_string().as_bytes(), "not finite")),
        Bson::Int32(n) => Ok(BigDecimal::from(*n)),
        Bson::Int64(n) => Ok(BigDecimal::from(*n)),
        other => Err(mismatch("decimal", other)),
    }
}

fn decode_primitive(primitive: Primitive, value: &Bson) -> Result<Bson, ValueError> {
    let matches = matches!(
        (primitive, value),
        (Primitive::DateTime, Bson::DateTime(_))
            | (Primitive::Binary, Bson::Binary(_))
            | (Primitive::Regex, Bson::RegularExpression(_))
            | (Primitive::MinKey, Bson::MinKey)
            | (Primitive::MaxKey, Bson::MaxKey)
            | (Primitive::Null, Bson::Null)
            | (Primitive::Undefined, Bson::Undefined)
            | (Primitive::CodeWithScope, Bson::JavaScriptCodeWithScope(_))
    );
    if matches {
        Ok(value.clone())
    } else {
        Err(mismatch(primitive.as_str(), value))
    }
}

fn each_from_bson<T>(
    items: &[Bson],
    convert: impl Fn(&Bson) -> Result<T, ValueError>,
) -> Result<Vec<T>, ValueError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| convert(item).map_err(|e| e.at_index(i)))
        .collect()
}

fn decode_seq(elem: Elem, items: &[Bson]) -> Result<SeqValue, ValueError> {
    Ok(match elem {
        Elem::String => SeqValue::String(each_from_bson(items, decode_string)?),
        Elem::Bool => SeqValue::Bool(each_from_bson(items, decode_bool)?),
        Elem::I8 => SeqValue::I8(each_from_bson(items, |b| integer(b, "i8"))?),
        Elem::I16 => SeqValue::I16(each_from_bson(items, |b| integer(b, "i16"))?),
        Elem::I32 => SeqValue::I32(each_from_bson(items, |b| integer(b, "i32"))?),
        Elem::I64 => SeqValue::I64(each_from_bson(items, |b| integer(b, "i64"))?),
        Elem::U16 => SeqValue::U16(each_from_bson(items, |b| integer(b, "u16"))?),
        Elem::U32 => SeqValue::U32(each_from_bson(items, |b| integer(b, "u32"))?),
        Elem::U64 => SeqValue::U64(each_from_bson(items, |b| integer(b, "u64"))?),
        Elem::F32 => SeqValue::F32(each_from_bson(items, decode_f32)?),
        Elem::F64 => SeqValue::F64(each_from_bson(items, decode_f64)?),
        Elem::ObjectId => SeqValue::ObjectId(each_from_bson(items, |b| match b {
            Bson::ObjectId(oid) => Ok(*oid),
            other => Err(mismatch("objectId", other)),
        })?),
        Elem::Timestamp => SeqValue::Timestamp(each_from_bson(items, decode_timestamp)?),
        Elem::Bytes => SeqValue::Bytes(each_from_bson(items, decode_bytes)?),
        Elem::Any => SeqValue::Any(items.to_vec()),
        Elem::Map => SeqValue::Map(each_from_bson(items, |b| match b {
            Bson::Document(doc) => Ok(doc
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            other => Err(mismatch("document", other)),
        })?),
    })
}

fn each_entry<T>(
    doc: &Document,
    convert: impl Fn(&Bson) -> Result<T, ValueError>,
) -> Result<HashMap<String, T>, ValueError> {
    doc.iter()
        .map(|(key, value)| {
            convert(value)
                .map(|v| (key.clone(), v))
                .map_err(|e| e.at_key(key))
        })
        .collect()
}

fn decode_map(elem: MapElem, doc: &Document) -> Result<MapValue, ValueError> {
    Ok(match elem {
        MapElem::String => MapValue::String(each_entry(doc, decode_string)?),
        MapElem::I32 => MapValue::I32(each_entry(doc, |b| integer(b, "i32"))?),
        MapElem::I64 => MapValue::I64(each_entry(doc, |b| integer(b, "i64"))?),
        MapElem::Any => MapValue::Any(each_entry(doc, |b| Ok(b.clone()))?),
        MapElem::F64 => MapValue::F64(each_entry(doc, decode_f64)?),
        MapElem::Bool => MapValue::Bool(each_entry(doc, decode_bool)?),
        MapElem::Strings => MapValue::Strings(each_entry(doc, |b| match b {
            Bson::Array(items) => each_from_bson(items, decode_string),
            other => Err(mismatch("[string]", other)),
        })?),
    })
}
