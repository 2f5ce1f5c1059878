//! `FieldType` implementations for every supported field shape.

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use bson::oid::ObjectId;
use bson::{Binary, Bson, JavaScriptCodeWithScope, Regex};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    Elem, FieldValue, MapElem, MapValue, MaxKey, MinKey, Nested, NullValue, Primitive, SeqValue,
    Shape, Undefined,
};
use crate::error::ValueError;

mod sealed {
    pub trait Sealed {}
}

/// A Rust type that can be stored in a record field.
///
/// The shape is fixed per type; the read/assign methods are monomorphized
/// into the field's vtable when the record is registered. The trait is
/// sealed: the implementations in this module are the complete set.
///
/// ```compile_fail
/// use orm_core::{FieldType, FieldValue, Shape, ValueError};
///
/// struct Celsius(f64);
///
/// impl FieldType for Celsius {
///     const SHAPE: Shape = Shape::F64;
///
///     fn read_value(&self) -> Result<FieldValue, ValueError> {
///         Ok(FieldValue::F64(self.0))
///     }
///
///     fn assign_value(&mut self, _: FieldValue) -> Result<(), ValueError> {
///         Ok(())
///     }
/// }
/// ```
pub trait FieldType: sealed::Sealed + Sized + 'static {
    /// Concrete shape of this type.
    const SHAPE: Shape;

    /// Reads the current value.
    fn read_value(&self) -> Result<FieldValue, ValueError>;

    /// Replaces the current value, converting within the same kind family.
    ///
    /// Integer targets accept any integer value and range-check it; `f32`
    /// rejects doubles outside single precision. Everything else must match
    /// exactly.
    fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError>;

    /// Serializes JSON-backed shapes (slices, maps, any, nested structs).
    fn to_json(&self) -> Result<String, ValueError> {
        Err(ValueError::UnsupportedShape {
            shape: Self::SHAPE.describe(),
        })
    }

    /// Replaces the value from a JSON document, copying out of `raw`.
    fn assign_json(&mut self, raw: &[u8]) -> Result<(), ValueError> {
        let _ = raw;
        Err(ValueError::UnsupportedShape {
            shape: Self::SHAPE.describe(),
        })
    }
}

fn mismatch<T: FieldType>(value: &FieldValue) -> ValueError {
    ValueError::mismatch(T::SHAPE.describe(), value.type_name())
}

fn is_json_null(raw: &[u8]) -> bool {
    raw.trim_ascii() == b"null"
}

macro_rules! impl_integer_field {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl FieldType for $ty {
                const SHAPE: Shape = Shape::$variant;

                fn read_value(&self) -> Result<FieldValue, ValueError> {
                    Ok(FieldValue::$variant(*self))
                }

                fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
                    let wide = value.as_i128().ok_or_else(|| mismatch::<Self>(&value))?;
                    *self = <$ty>::try_from(wide).map_err(|_| ValueError::RangeOverflow {
                        value: wide.to_string(),
                        target: stringify!($ty),
                    })?;
                    Ok(())
                }
            }
        )*
    };
}

impl_integer_field!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
);

impl sealed::Sealed for f32 {}

impl FieldType for f32 {
    const SHAPE: Shape = Shape::F32;

    fn read_value(&self) -> Result<FieldValue, ValueError> {
        Ok(FieldValue::F32(*self))
    }

    fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
        let wide = value.as_f64().ok_or_else(|| mismatch::<Self>(&value))?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(ValueError::RangeOverflow {
                value: wide.to_string(),
                target: "f32",
            });
        }
        *self = wide as f32;
        Ok(())
    }
}

impl sealed::Sealed for f64 {}

impl FieldType for f64 {
    const SHAPE: Shape = Shape::F64;

    fn read_value(&self) -> Result<FieldValue, ValueError> {
        Ok(FieldValue::F64(*self))
    }

    fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
        *self = value.as_f64().ok_or_else(|| mismatch::<Self>(&value))?;
        Ok(())
    }
}

macro_rules! impl_exact_field {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl FieldType for $ty {
                const SHAPE: Shape = Shape::$variant;

                fn read_value(&self) -> Result<FieldValue, ValueError> {
                    Ok(FieldValue::$variant(self.clone()))
                }

                fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
                    match value {
                        FieldValue::$variant(v) => {
                            *self = v;
                            Ok(())
                        }
                        other => Err(mismatch::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

impl_exact_field!(
    String => String,
    bool => Bool,
    Vec<u8> => Bytes,
    DateTime<Utc> => Timestamp,
    BigDecimal => Decimal,
    ObjectId => ObjectId,
);

macro_rules! impl_wrapper_field {
    ($($ty:ty => $prim:ident, $bson:ident);* $(;)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl FieldType for $ty {
                const SHAPE: Shape = Shape::Primitive(Primitive::$prim);

                fn read_value(&self) -> Result<FieldValue, ValueError> {
                    Ok(FieldValue::Primitive(Bson::$bson(self.clone())))
                }

                fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
                    match value {
                        FieldValue::Primitive(Bson::$bson(v)) => {
                            *self = v;
                            Ok(())
                        }
                        other => Err(mismatch::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

impl_wrapper_field!(
    bson::DateTime => DateTime, DateTime;
    Binary => Binary, Binary;
    Regex => Regex, RegularExpression;
    JavaScriptCodeWithScope => CodeWithScope, JavaScriptCodeWithScope;
);

macro_rules! impl_unit_field {
    ($($ty:ty => $prim:ident, $bson:ident);* $(;)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl FieldType for $ty {
                const SHAPE: Shape = Shape::Primitive(Primitive::$prim);

                fn read_value(&self) -> Result<FieldValue, ValueError> {
                    Ok(FieldValue::Primitive(Bson::$bson))
                }

                fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
                    match value {
                        FieldValue::Primitive(Bson::$bson) => Ok(()),
                        other => Err(mismatch::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

impl_unit_field!(
    MinKey => MinKey, MinKey;
    MaxKey => MaxKey, MaxKey;
    NullValue => Null, Null;
    Undefined => Undefined, Undefined;
);

macro_rules! impl_seq_field {
    ($($elem:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for Vec<$elem> {}

            impl FieldType for Vec<$elem> {
                const SHAPE: Shape = Shape::Seq(Elem::$variant);

                fn read_value(&self) -> Result<FieldValue, ValueError> {
                    Ok(FieldValue::Seq(SeqValue::$variant(self.clone())))
                }

                fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
                    match value {
                        FieldValue::Seq(SeqValue::$variant(v)) => {
                            *self = v;
                            Ok(())
                        }
                        other => Err(mismatch::<Self>(&other)),
                    }
                }

                fn to_json(&self) -> Result<String, ValueError> {
                    Ok(serde_json::to_string(self)?)
                }

                fn assign_json(&mut self, raw: &[u8]) -> Result<(), ValueError> {
                    *self = serde_json::from_slice(raw)?;
                    Ok(())
                }
            }
        )*
    };
}

impl_seq_field!(
    String => String,
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    ObjectId => ObjectId,
    DateTime<Utc> => Timestamp,
    Vec<u8> => Bytes,
    Bson => Any,
    HashMap<String, Bson> => Map,
);

macro_rules! impl_map_field {
    ($($val:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for HashMap<String, $val> {}

            impl FieldType for HashMap<String, $val> {
                const SHAPE: Shape = Shape::Map(MapElem::$variant);

                fn read_value(&self) -> Result<FieldValue, ValueError> {
                    Ok(FieldValue::Map(MapValue::$variant(self.clone())))
                }

                fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
                    match value {
                        FieldValue::Map(MapValue::$variant(m)) => {
                            *self = m;
                            Ok(())
                        }
                        other => Err(mismatch::<Self>(&other)),
                    }
                }

                fn to_json(&self) -> Result<String, ValueError> {
                    Ok(serde_json::to_string(self)?)
                }

                fn assign_json(&mut self, raw: &[u8]) -> Result<(), ValueError> {
                    *self = serde_json::from_slice(raw)?;
                    Ok(())
                }
            }
        )*
    };
}

impl_map_field!(
    String => String,
    i32 => I32,
    i64 => I64,
    Bson => Any,
    f64 => F64,
    bool => Bool,
    Vec<String> => Strings,
);

impl sealed::Sealed for Bson {}

impl FieldType for Bson {
    const SHAPE: Shape = Shape::Any;

    fn read_value(&self) -> Result<FieldValue, ValueError> {
        Ok(FieldValue::Any(self.clone()))
    }

    fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
        match value {
            FieldValue::Any(v) => *self = v,
            FieldValue::Absent => *self = Bson::Null,
            other => return Err(mismatch::<Self>(&other)),
        }
        Ok(())
    }

    fn to_json(&self) -> Result<String, ValueError> {
        Ok(serde_json::to_string(self)?)
    }

    fn assign_json(&mut self, raw: &[u8]) -> Result<(), ValueError> {
        *self = serde_json::from_slice(raw)?;
        Ok(())
    }
}

impl<T: FieldType + Default> sealed::Sealed for Option<Box<T>> {}

impl<T: FieldType + Default> FieldType for Option<Box<T>> {
    const SHAPE: Shape = Shape::Pointer(&T::SHAPE);

    fn read_value(&self) -> Result<FieldValue, ValueError> {
        match self {
            Some(inner) => inner.read_value(),
            None => Ok(FieldValue::Absent),
        }
    }

    fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
        if matches!(value, FieldValue::Absent) {
            *self = None;
            return Ok(());
        }
        match self {
            Some(inner) => inner.assign_value(value),
            None => {
                let mut fresh = Box::<T>::default();
                fresh.assign_value(value)?;
                *self = Some(fresh);
                Ok(())
            }
        }
    }

    fn to_json(&self) -> Result<String, ValueError> {
        match self {
            Some(inner) => inner.to_json(),
            None => Ok("null".to_string()),
        }
    }

    fn assign_json(&mut self, raw: &[u8]) -> Result<(), ValueError> {
        if is_json_null(raw) {
            *self = None;
            return Ok(());
        }
        let mut fresh = Box::<T>::default();
        fresh.assign_json(raw)?;
        *self = Some(fresh);
        Ok(())
    }
}

impl<T> sealed::Sealed for Nested<T> where T: Serialize + DeserializeOwned + 'static {}

impl<T> FieldType for Nested<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    const SHAPE: Shape = Shape::Nested;

    fn read_value(&self) -> Result<FieldValue, ValueError> {
        match self.get() {
            Some(inner) => Ok(FieldValue::Embedded(bson::to_document(inner)?)),
            None => Ok(FieldValue::Absent),
        }
    }

    fn assign_value(&mut self, value: FieldValue) -> Result<(), ValueError> {
        match value {
            FieldValue::Absent => self.0 = None,
            FieldValue::Embedded(doc) => self.0 = Some(Box::new(bson::from_document(doc)?)),
            other => return Err(mismatch::<Self>(&other)),
        }
        Ok(())
    }

    fn to_json(&self) -> Result<String, ValueError> {
        Ok(serde_json::to_string(&self.0)?)
    }

    fn assign_json(&mut self, raw: &[u8]) -> Result<(), ValueError> {
        self.0 = serde_json::from_slice(raw)?;
        Ok(())
    }
}
