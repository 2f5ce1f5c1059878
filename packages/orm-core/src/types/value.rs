//! Owned values moved in and out of record fields.

use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use bson::oid::ObjectId;
use bson::{Bson, Document};
use chrono::{DateTime, Utc};

/// Value of one field, as read or written by the accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent pointer
    Absent,
    String(String),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Decimal(BigDecimal),
    ObjectId(ObjectId),
    /// BSON primitive wrapper (datetime, binary, regex, keys, null, code)
    Primitive(Bson),
    Seq(SeqValue),
    Map(MapValue),
    Any(Bson),
    /// Serialized form of a `Nested<T>` pointee
    Embedded(Document),
}

/// Typed contents of a non-byte slice field.
#[derive(Debug, Clone, PartialEq)]
pub enum SeqValue {
    String(Vec<String>),
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    ObjectId(Vec<ObjectId>),
    Timestamp(Vec<DateTime<Utc>>),
    Bytes(Vec<Vec<u8>>),
    Any(Vec<Bson>),
    Map(Vec<HashMap<String, Bson>>),
}

/// Typed contents of a `HashMap<String, _>` field.
#[derive(Debug, Clone, PartialEq)]
pub enum MapValue {
    String(HashMap<String, String>),
    I32(HashMap<String, i32>),
    I64(HashMap<String, i64>),
    Any(HashMap<String, Bson>),
    F64(HashMap<String, f64>),
    Bool(HashMap<String, bool>),
    Strings(HashMap<String, Vec<String>>),
}

impl SeqValue {
    pub fn len(&self) -> usize {
        match self {
            SeqValue::String(v) => v.len(),
            SeqValue::Bool(v) => v.len(),
            SeqValue::I8(v) => v.len(),
            SeqValue::I16(v) => v.len(),
            SeqValue::I32(v) => v.len(),
            SeqValue::I64(v) => v.len(),
            SeqValue::U16(v) => v.len(),
            SeqValue::U32(v) => v.len(),
            SeqValue::U64(v) => v.len(),
            SeqValue::F32(v) => v.len(),
            SeqValue::F64(v) => v.len(),
            SeqValue::ObjectId(v) => v.len(),
            SeqValue::Timestamp(v) => v.len(),
            SeqValue::Bytes(v) => v.len(),
            SeqValue::Any(v) => v.len(),
            SeqValue::Map(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MapValue {
    pub fn len(&self) -> usize {
        match self {
            MapValue::String(m) => m.len(),
            MapValue::I32(m) => m.len(),
            MapValue::I64(m) => m.len(),
            MapValue::Any(m) => m.len(),
            MapValue::F64(m) => m.len(),
            MapValue::Bool(m) => m.len(),
            MapValue::Strings(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FieldValue {
    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Absent => "absent",
            FieldValue::String(_) => "string",
            FieldValue::Bool(_) => "bool",
            FieldValue::I8(_) => "i8",
            FieldValue::I16(_) => "i16",
            FieldValue::I32(_) => "i32",
            FieldValue::I64(_) => "i64",
            FieldValue::Isize(_) => "isize",
            FieldValue::U8(_) => "u8",
            FieldValue::U16(_) => "u16",
            FieldValue::U32(_) => "u32",
            FieldValue::U64(_) => "u64",
            FieldValue::Usize(_) => "usize",
            FieldValue::F32(_) => "f32",
            FieldValue::F64(_) => "f64",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::ObjectId(_) => "objectId",
            FieldValue::Primitive(_) => "primitive",
            FieldValue::Seq(_) => "slice",
            FieldValue::Map(_) => "map",
            FieldValue::Any(_) => "any",
            FieldValue::Embedded(_) => "embedded",
        }
    }

    /// Returns `true` if this is the zero value of its type.
    ///
    /// Unit primitives (min/max key, null, undefined) and object ids are
    /// never zero: their presence is the value.
    pub fn is_zero(&self) -> bool {
        match self {
            FieldValue::Absent => true,
            FieldValue::String(s) => s.is_empty(),
            FieldValue::Bool(b) => !*b,
            FieldValue::I8(v) => *v == 0,
            FieldValue::I16(v) => *v == 0,
            FieldValue::I32(v) => *v == 0,
            FieldValue::I64(v) => *v == 0,
            FieldValue::Isize(v) => *v == 0,
            FieldValue::U8(v) => *v == 0,
            FieldValue::U16(v) => *v == 0,
            FieldValue::U32(v) => *v == 0,
            FieldValue::U64(v) => *v == 0,
            FieldValue::Usize(v) => *v == 0,
            FieldValue::F32(v) => *v == 0.0,
            FieldValue::F64(v) => *v == 0.0,
            FieldValue::Bytes(b) => b.is_empty(),
            FieldValue::Timestamp(t) => *t == DateTime::<Utc>::default(),
            FieldValue::Decimal(d) => d.is_zero(),
            FieldValue::ObjectId(_) => false,
            FieldValue::Primitive(p) => match p {
                Bson::DateTime(dt) => dt.timestamp_millis() == 0,
                Bson::Binary(bin) => bin.bytes.is_empty(),
                Bson::RegularExpression(re) => re.pattern.is_empty(),
                Bson::JavaScriptCodeWithScope(code) => {
                    code.code.is_empty() && code.scope.is_empty()
                }
                _ => false,
            },
            FieldValue::Seq(s) => s.is_empty(),
            FieldValue::Map(m) => m.is_empty(),
            FieldValue::Any(b) => matches!(b, Bson::Null),
            FieldValue::Embedded(_) => false,
        }
    }

    /// Widens any integer value to `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            FieldValue::I8(v) => Some(v.into()),
            FieldValue::I16(v) => Some(v.into()),
            FieldValue::I32(v) => Some(v.into()),
            FieldValue::I64(v) => Some(v.into()),
            FieldValue::Isize(v) => Some(v as i128),
            FieldValue::U8(v) => Some(v.into()),
            FieldValue::U16(v) => Some(v.into()),
            FieldValue::U32(v) => Some(v.into()),
            FieldValue::U64(v) => Some(v.into()),
            FieldValue::Usize(v) => Some(v as i128),
            _ => None,
        }
    }

    /// Widens any floating point value to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::F32(v) => Some(v.into()),
            FieldValue::F64(v) => Some(v),
            _ => None,
        }
    }
}
