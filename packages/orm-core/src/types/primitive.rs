//! Unit BSON wrappers and the pointer form for embedded structs.

use serde::{Deserialize, Serialize};

/// BSON min key marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinKey;

/// BSON max key marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaxKey;

/// Explicit BSON null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NullValue;

/// Deprecated BSON undefined marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Undefined;

/// Optional boxed struct stored as an embedded document or JSON column.
///
/// Arbitrary structs are only mapped through this pointer form; writes
/// allocate a fresh instance when the pointer is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Nested<T>(pub Option<Box<T>>);

impl<T> Nested<T> {
    pub fn new(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.0.as_deref_mut()
    }

    pub fn set(&mut self, value: T) {
        self.0 = Some(Box::new(value));
    }

    pub fn take(&mut self) -> Option<T> {
        self.0.take().map(|b| *b)
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }
}

impl<T> Default for Nested<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> From<T> for Nested<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
