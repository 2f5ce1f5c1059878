//! Field kinds, supported shapes and the value model moved by the accessor.
//!
//! Every Rust type that can appear as a record field implements
//! [`FieldType`], which pins its [`Shape`] at compile time. Types outside the
//! closed set simply do not implement the trait, so unsupported fields are
//! rejected before a record can be registered.

mod field_type;
mod primitive;
mod value;

pub use field_type::FieldType;
pub use primitive::{MaxKey, MinKey, Nested, NullValue, Undefined};
pub use value::{FieldValue, MapValue, SeqValue};

use std::fmt;

/// Declared kind of a field, as seen by the codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Slice,
    Map,
    Struct,
    Pointer,
    Any,
}

impl Kind {
    /// Returns `true` for signed integer kinds.
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            Kind::I8 | Kind::I16 | Kind::I32 | Kind::I64 | Kind::Isize
        )
    }

    /// Returns `true` for unsigned integer kinds.
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            Kind::U8 | Kind::U16 | Kind::U32 | Kind::U64 | Kind::Usize
        )
    }

    /// Returns `true` for any integer kind.
    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Returns `true` for floating point kinds.
    pub fn is_float(&self) -> bool {
        matches!(self, Kind::F32 | Kind::F64)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Bool => "bool",
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::Isize => "isize",
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::Usize => "usize",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::Slice => "slice",
            Kind::Map => "map",
            Kind::Struct => "struct",
            Kind::Pointer => "pointer",
            Kind::Any => "any",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BSON primitive wrapper types usable as fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    DateTime,
    Binary,
    Regex,
    MinKey,
    MaxKey,
    Null,
    Undefined,
    CodeWithScope,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::DateTime => "datetime",
            Primitive::Binary => "binary",
            Primitive::Regex => "regex",
            Primitive::MinKey => "minKey",
            Primitive::MaxKey => "maxKey",
            Primitive::Null => "null",
            Primitive::Undefined => "undefined",
            Primitive::CodeWithScope => "javascriptWithScope",
        }
    }

    /// Unit wrappers carry no data; their presence is the value.
    pub fn is_unit(&self) -> bool {
        matches!(
            self,
            Primitive::MinKey | Primitive::MaxKey | Primitive::Null | Primitive::Undefined
        )
    }
}

/// Element type of a non-byte slice field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Elem {
    String,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U16,
    U32,
    U64,
    F32,
    F64,
    ObjectId,
    Timestamp,
    Bytes,
    Any,
    Map,
}

impl Elem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Elem::String => "string",
            Elem::Bool => "bool",
            Elem::I8 => "i8",
            Elem::I16 => "i16",
            Elem::I32 => "i32",
            Elem::I64 => "i64",
            Elem::U16 => "u16",
            Elem::U32 => "u32",
            Elem::U64 => "u64",
            Elem::F32 => "f32",
            Elem::F64 => "f64",
            Elem::ObjectId => "objectId",
            Elem::Timestamp => "timestamp",
            Elem::Bytes => "bytes",
            Elem::Any => "any",
            Elem::Map => "map",
        }
    }
}

/// Value type of a `HashMap<String, _>` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapElem {
    String,
    I32,
    I64,
    Any,
    F64,
    Bool,
    Strings,
}

impl MapElem {
    /// Value types the document codec converts without the normalizer.
    pub fn is_native(&self) -> bool {
        matches!(
            self,
            MapElem::String | MapElem::I32 | MapElem::I64 | MapElem::Any
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MapElem::String => "string",
            MapElem::I32 => "i32",
            MapElem::I64 => "i64",
            MapElem::Any => "any",
            MapElem::F64 => "f64",
            MapElem::Bool => "bool",
            MapElem::Strings => "[string]",
        }
    }
}

/// Closed set of concrete field shapes, resolved once per field at registration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    String,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    /// `Vec<u8>`
    Bytes,
    /// `chrono::DateTime<Utc>`
    Timestamp,
    /// `bigdecimal::BigDecimal`
    Decimal,
    /// 12-byte `bson::oid::ObjectId`
    ObjectId,
    Primitive(Primitive),
    Seq(Elem),
    Map(MapElem),
    /// `bson::Bson`
    Any,
    /// `Option<Box<T>>`
    Pointer(&'static Shape),
    /// `Nested<T>`: pointer to an arbitrary serde struct
    Nested,
}

impl Shape {
    /// Kind this shape is declared as.
    pub fn kind(&self) -> Kind {
        match self {
            Shape::String => Kind::String,
            Shape::Bool => Kind::Bool,
            Shape::I8 => Kind::I8,
            Shape::I16 => Kind::I16,
            Shape::I32 => Kind::I32,
            Shape::I64 => Kind::I64,
            Shape::Isize => Kind::Isize,
            Shape::U8 => Kind::U8,
            Shape::U16 => Kind::U16,
            Shape::U32 => Kind::U32,
            Shape::U64 => Kind::U64,
            Shape::Usize => Kind::Usize,
            Shape::F32 => Kind::F32,
            Shape::F64 => Kind::F64,
            Shape::Bytes | Shape::Seq(_) => Kind::Slice,
            Shape::Timestamp | Shape::Decimal | Shape::ObjectId | Shape::Primitive(_) => {
                Kind::Struct
            }
            Shape::Map(_) => Kind::Map,
            Shape::Any => Kind::Any,
            Shape::Pointer(_) | Shape::Nested => Kind::Pointer,
        }
    }

    /// Returns `true` for `Vec<u8>` or a pointer to one.
    pub fn holds_bytes(&self) -> bool {
        match self {
            Shape::Bytes => true,
            Shape::Pointer(inner) => inner.holds_bytes(),
            _ => false,
        }
    }

    /// Returns `true` for integer shapes, looking through pointers.
    pub fn is_integer(&self) -> bool {
        match self {
            Shape::Pointer(inner) => inner.is_integer(),
            other => other.kind().is_integer(),
        }
    }

    /// Human-readable name used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Shape::Bytes => "bytes".to_string(),
            Shape::Timestamp => "timestamp".to_string(),
            Shape::Decimal => "decimal".to_string(),
            Shape::ObjectId => "objectId".to_string(),
            Shape::Primitive(p) => p.as_str().to_string(),
            Shape::Seq(elem) => format!("[{}]", elem.as_str()),
            Shape::Map(elem) => format!("map<string, {}>", elem.as_str()),
            Shape::Pointer(inner) => format!("*{}", inner.describe()),
            Shape::Nested => "*struct".to_string(),
            other => other.kind().as_str().to_string(),
        }
    }
}
