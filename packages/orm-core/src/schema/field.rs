//! Field definitions supplied by records and the descriptors frozen from them.

use std::any::{type_name, TypeId};
use std::fmt;
use std::mem::{align_of, size_of};

use crate::accessor::FieldOps;
use crate::types::{FieldType, Kind, Shape};

/// Name the document codec uses for the primary key.
pub const DOCUMENT_ID: &str = "_id";

/// Per-field annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAnnotations {
    pub primary: bool,
    pub ignore: bool,
    /// Document-store name override
    pub doc_name: Option<String>,
    /// Relational column name override
    pub wire_name: Option<String>,
    /// Integer column stored as a formatted datetime
    pub epoch_seconds: bool,
    /// Integer column stored as a formatted date
    pub epoch_days: bool,
    pub blob: bool,
    /// Zeroized by secure erasure
    pub sensitive: bool,
    /// Table charset (valid on the primary key only)
    pub charset: Option<String>,
    /// Table collation (valid on the primary key only)
    pub collation: Option<String>,
    pub auto_increment: bool,
    /// Mirror writes to the document store
    pub mirror: bool,
}

/// Field definition for record type `R`, produced by [`crate::field!`].
pub struct FieldDef<R> {
    pub(crate) name: &'static str,
    pub(crate) offset: usize,
    pub(crate) size: usize,
    pub(crate) align: usize,
    pub(crate) shape: Shape,
    pub(crate) declared_type: &'static str,
    pub(crate) value_type: TypeId,
    pub(crate) ops: FieldOps,
    pub(crate) locate: Box<dyn Fn(&R) -> *const u8>,
    pub(crate) annotations: FieldAnnotations,
}

impl<R: 'static> FieldDef<R> {
    /// Creates a definition from a field offset and a projection to the field.
    ///
    /// The projection is evaluated on the zero instance at registration to
    /// confirm the offset.
    pub fn new<T: FieldType>(name: &'static str, offset: usize, project: fn(&R) -> &T) -> Self {
        Self {
            name,
            offset,
            size: size_of::<T>(),
            align: align_of::<T>(),
            shape: T::SHAPE,
            declared_type: type_name::<T>(),
            value_type: TypeId::of::<T>(),
            ops: FieldOps::of::<T>(),
            locate: Box::new(move |record: &R| (project(record) as *const T).cast::<u8>()),
            annotations: FieldAnnotations::default(),
        }
    }

    pub fn primary(mut self) -> Self {
        self.annotations.primary = true;
        self
    }

    pub fn ignore(mut self) -> Self {
        self.annotations.ignore = true;
        self
    }

    pub fn doc_name(mut self, name: &str) -> Self {
        self.annotations.doc_name = Some(name.to_string());
        self
    }

    pub fn wire_name(mut self, name: &str) -> Self {
        self.annotations.wire_name = Some(name.to_string());
        self
    }

    pub fn epoch_seconds(mut self) -> Self {
        self.annotations.epoch_seconds = true;
        self
    }

    pub fn epoch_days(mut self) -> Self {
        self.annotations.epoch_days = true;
        self
    }

    pub fn blob(mut self) -> Self {
        self.annotations.blob = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.annotations.sensitive = true;
        self
    }

    pub fn charset(mut self, charset: &str) -> Self {
        self.annotations.charset = Some(charset.to_string());
        self
    }

    pub fn collation(mut self, collation: &str) -> Self {
        self.annotations.collation = Some(collation.to_string());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.annotations.auto_increment = true;
        self
    }

    pub fn mirror(mut self) -> Self {
        self.annotations.mirror = true;
        self
    }

    pub fn annotations(&self) -> &FieldAnnotations {
        &self.annotations
    }

    /// Offset observed by projecting into `record`.
    pub(crate) fn observed_offset(&self, record: &R) -> usize {
        let base = (record as *const R).cast::<u8>() as usize;
        ((self.locate)(record) as usize).wrapping_sub(base)
    }

    pub(crate) fn freeze(self, owner_name: &'static str) -> FieldDescriptor {
        FieldDescriptor {
            name: self.name.to_string(),
            offset: self.offset,
            size: self.size,
            align: self.align,
            kind: self.shape.kind(),
            shape: self.shape,
            declared_type: self.declared_type,
            primary: self.annotations.primary,
            ignored: self.annotations.ignore,
            doc_name: self.annotations.doc_name,
            wire_name: self.annotations.wire_name,
            epoch_seconds: self.annotations.epoch_seconds,
            epoch_days: self.annotations.epoch_days,
            blob: self.annotations.blob,
            sensitive: self.annotations.sensitive,
            owner: TypeId::of::<R>(),
            owner_name,
            value_type: self.value_type,
            ops: self.ops,
        }
    }
}

impl<R> fmt::Debug for FieldDef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("declared_type", &self.declared_type)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

/// Immutable description of one registered field.
///
/// Only registration constructs descriptors; the offset and operations are
/// valid for the record type the descriptor was registered with. The layout
/// is read-only outside this crate, so a cloned descriptor always points at
/// the field it was registered for:
///
/// ```compile_fail
/// # use orm_core::FieldDescriptor;
/// fn shift(field: &FieldDescriptor) {
///     let mut forged = field.clone();
///     forged.offset = 0;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,
    pub(crate) offset: usize,
    pub(crate) size: usize,
    pub(crate) align: usize,
    pub(crate) shape: Shape,
    pub kind: Kind,
    /// Rust type name of the field
    pub declared_type: &'static str,
    pub primary: bool,
    pub ignored: bool,
    pub doc_name: Option<String>,
    pub wire_name: Option<String>,
    pub epoch_seconds: bool,
    pub epoch_days: bool,
    pub blob: bool,
    pub sensitive: bool,
    pub(crate) owner: TypeId,
    pub(crate) owner_name: &'static str,
    pub(crate) value_type: TypeId,
    pub(crate) ops: FieldOps,
}

impl FieldDescriptor {
    /// Byte offset within the record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Field size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Field alignment requirement.
    pub fn align(&self) -> usize {
        self.align
    }

    /// Storage shape of the field type.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Key used in documents: `_id` for the primary key, else the doc name,
    /// the wire name or the field name, in that order.
    pub fn document_name(&self) -> &str {
        if self.primary {
            return DOCUMENT_ID;
        }
        self.doc_name
            .as_deref()
            .or(self.wire_name.as_deref())
            .unwrap_or(&self.name)
    }

    /// Relational column name.
    pub fn column_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }

    /// Returns `true` if the field is stored as a formatted date or datetime.
    pub fn is_epoch_date(&self) -> bool {
        self.epoch_seconds || self.epoch_days
    }

    /// Returns the end offset of this field (offset + size).
    pub fn end_offset(&self) -> usize {
        self.offset + self.size
    }

    /// Rust type name of the record this field belongs to.
    pub fn record_type(&self) -> &'static str {
        self.owner_name
    }
}
