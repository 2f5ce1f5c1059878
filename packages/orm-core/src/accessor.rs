//! Offset-based field access.
//!
//! This is the only module that turns a record reference plus a descriptor
//! offset into a field address. Every entry point first checks that the
//! record is the type the descriptor was registered for; the typed helpers
//! additionally check the field type. Offsets and vtables are produced only
//! by registration and cannot be changed outside the crate, so a descriptor
//! that passes the owner check always describes a live, aligned field of the
//! record.

use std::any::{type_name, TypeId};
use std::fmt;

use crate::error::ValueError;
use crate::schema::FieldDescriptor;
use crate::types::{FieldType, FieldValue};

/// Monomorphized operations for one field type.
///
/// Each function takes the address of a field of that type.
#[derive(Clone, Copy)]
pub(crate) struct FieldOps {
    read: unsafe fn(*const u8) -> Result<FieldValue, ValueError>,
    assign: unsafe fn(*mut u8, FieldValue) -> Result<(), ValueError>,
    to_json: unsafe fn(*const u8) -> Result<String, ValueError>,
    assign_json: unsafe fn(*mut u8, &[u8]) -> Result<(), ValueError>,
}

impl FieldOps {
    pub(crate) fn of<T: FieldType>() -> Self {
        Self {
            read: read_thunk::<T>,
            assign: assign_thunk::<T>,
            to_json: to_json_thunk::<T>,
            assign_json: assign_json_thunk::<T>,
        }
    }
}

impl fmt::Debug for FieldOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldOps").finish_non_exhaustive()
    }
}

unsafe fn read_thunk<T: FieldType>(field: *const u8) -> Result<FieldValue, ValueError> {
    // SAFETY: caller passes the address of a live, aligned `T`.
    unsafe { (*field.cast::<T>()).read_value() }
}

unsafe fn assign_thunk<T: FieldType>(field: *mut u8, value: FieldValue) -> Result<(), ValueError> {
    // SAFETY: caller passes the address of a live, aligned `T` it may mutate.
    unsafe { (*field.cast::<T>()).assign_value(value) }
}

unsafe fn to_json_thunk<T: FieldType>(field: *const u8) -> Result<String, ValueError> {
    // SAFETY: see `read_thunk`.
    unsafe { (*field.cast::<T>()).to_json() }
}

unsafe fn assign_json_thunk<T: FieldType>(field: *mut u8, raw: &[u8]) -> Result<(), ValueError> {
    // SAFETY: see `assign_thunk`.
    unsafe { (*field.cast::<T>()).assign_json(raw) }
}

fn check_owner<R: 'static>(descriptor: &FieldDescriptor) -> Result<(), ValueError> {
    if descriptor.owner == TypeId::of::<R>() {
        Ok(())
    } else {
        Err(ValueError::ForeignRecord {
            expected: descriptor.owner_name,
            actual: type_name::<R>(),
        })
    }
}

fn check_value_type<T: 'static>(descriptor: &FieldDescriptor) -> Result<(), ValueError> {
    if descriptor.value_type == TypeId::of::<T>() {
        Ok(())
    } else {
        Err(ValueError::mismatch(
            descriptor.declared_type,
            type_name::<T>(),
        ))
    }
}

/// Address of the described field inside `record`.
///
/// # Safety
/// The descriptor must belong to `R` (checked by `check_owner`).
unsafe fn field_addr<R>(record: &R, descriptor: &FieldDescriptor) -> *const u8 {
    // SAFETY: registration verified `offset + size <= size_of::<R>()`.
    unsafe { (record as *const R).cast::<u8>().add(descriptor.offset) }
}

/// Mutable address of the described field inside `record`.
///
/// # Safety
/// The descriptor must belong to `R` (checked by `check_owner`).
unsafe fn field_addr_mut<R>(record: &mut R, descriptor: &FieldDescriptor) -> *mut u8 {
    // SAFETY: as in `field_addr`; the pointer carries the provenance of `&mut R`.
    unsafe { (record as *mut R).cast::<u8>().add(descriptor.offset) }
}

/// Reads the described field.
pub fn read<R: 'static>(record: &R, descriptor: &FieldDescriptor) -> Result<FieldValue, ValueError> {
    check_owner::<R>(descriptor)?;
    // SAFETY: owner checked; `ops` was built for the field's declared type.
    unsafe { (descriptor.ops.read)(field_addr(record, descriptor)) }
}

/// Assigns the described field. On error the field is left unchanged.
pub fn write<R: 'static>(
    record: &mut R,
    descriptor: &FieldDescriptor,
    value: FieldValue,
) -> Result<(), ValueError> {
    check_owner::<R>(descriptor)?;
    // SAFETY: owner checked; `ops` was built for the field's declared type.
    unsafe { (descriptor.ops.assign)(field_addr_mut(record, descriptor), value) }
}

/// Serializes a JSON-backed field.
pub fn to_json<R: 'static>(record: &R, descriptor: &FieldDescriptor) -> Result<String, ValueError> {
    check_owner::<R>(descriptor)?;
    // SAFETY: as in `read`.
    unsafe { (descriptor.ops.to_json)(field_addr(record, descriptor)) }
}

/// Replaces a JSON-backed field from raw JSON, copying out of `raw`.
pub fn assign_json<R: 'static>(
    record: &mut R,
    descriptor: &FieldDescriptor,
    raw: &[u8],
) -> Result<(), ValueError> {
    check_owner::<R>(descriptor)?;
    // SAFETY: as in `write`.
    unsafe { (descriptor.ops.assign_json)(field_addr_mut(record, descriptor), raw) }
}

/// Borrows the described field as its concrete type.
pub fn field_ref<'r, R: 'static, T: 'static>(
    record: &'r R,
    descriptor: &FieldDescriptor,
) -> Result<&'r T, ValueError> {
    check_owner::<R>(descriptor)?;
    check_value_type::<T>(descriptor)?;
    // SAFETY: owner and field type checked; the borrow is tied to `record`.
    unsafe { Ok(&*field_addr(record, descriptor).cast::<T>()) }
}

/// Mutably borrows the described field as its concrete type.
pub fn field_mut<'r, R: 'static, T: 'static>(
    record: &'r mut R,
    descriptor: &FieldDescriptor,
) -> Result<&'r mut T, ValueError> {
    check_owner::<R>(descriptor)?;
    check_value_type::<T>(descriptor)?;
    // SAFETY: owner and field type checked; the exclusive borrow is tied to `record`.
    unsafe { Ok(&mut *field_addr_mut(record, descriptor).cast::<T>()) }
}
