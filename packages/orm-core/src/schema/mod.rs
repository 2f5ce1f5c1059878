//! Table schemas, field descriptors and the schema registry.

mod field;
mod registry;
mod table;
pub(crate) mod validation;

pub use field::{FieldAnnotations, FieldDef, FieldDescriptor, DOCUMENT_ID};
pub use registry::{Registration, SchemaRegistry};
pub use table::{PrimaryKey, TableDefaults, TableSchema};
