//! Record capability implemented by every persistable type.

use crate::schema::FieldDef;

/// A persistable record type.
///
/// `fields` is called once at registration; the returned definitions are
/// verified against `new_zero()` and frozen into the table schema.
///
/// # Example
/// ```
/// use orm_core::{field, FieldDef, Record};
///
/// #[derive(Default)]
/// struct User {
///     id: i64,
///     name: String,
///     token: Vec<u8>,
/// }
///
/// impl Record for User {
///     fn table_name() -> &'static str {
///         "users"
///     }
///
///     fn new_zero() -> Self {
///         Self::default()
///     }
///
///     fn fields() -> Vec<FieldDef<Self>> {
///         vec![
///             field!(User, id).primary().auto_increment(),
///             field!(User, name).wire_name("user_name"),
///             field!(User, token).sensitive(),
///         ]
///     }
/// }
/// ```
pub trait Record: Sized + 'static {
    /// Table (or collection) name; the registry key.
    fn table_name() -> &'static str;

    /// Zero-valued instance used to discover and verify the field layout.
    fn new_zero() -> Self;

    /// Field definitions in declaration order.
    fn fields() -> Vec<FieldDef<Self>>;

    /// Appends an instance to a row collection.
    fn append_into(collection: &mut Vec<Self>, instance: Self) {
        collection.push(instance);
    }

    /// Index definitions for the index manager.
    fn index_specs() -> Vec<IndexSpec> {
        Vec::new()
    }
}

/// Index over one or more fields of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    /// Field names in index order
    pub fields: Vec<String>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(name: &str, fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Builds a [`FieldDef`] for a named field of a record struct.
///
/// Expands to the field's name, its `offset_of!` offset and a projection
/// that lets registration verify the offset and infer the field type.
#[macro_export]
macro_rules! field {
    ($record:ty, $field:ident) => {
        $crate::schema::FieldDef::<$record>::new(
            stringify!($field),
            ::core::mem::offset_of!($record, $field),
            |r: &$record| &r.$field,
        )
    };
}
