//! Document and row codecs built on the field accessor.

mod convert;
mod document;
mod row;

pub use document::{decode_with_schema, encode_with_schema, DocumentCodec};
pub use row::{ColumnValue, RowCodec};
