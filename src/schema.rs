//! Schema Module
//!
//! Schema descriptors are carried per store but never interpreted by the
//! persistence layer. Validation plugs in through [`RecordValidator`], which
//! a store calls before committing a `create` or `set`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::record::Record;

/// Opaque schema descriptor (indices, property constraints, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDescriptor(Value);

impl SchemaDescriptor {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Raw descriptor value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for SchemaDescriptor {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// The mutation a record is being validated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Set,
}

/// Hook invoked before a record is committed to a store
///
/// The record passed in already carries its final `id`. Returning an error
/// (typically `ShelfError::Validation`) aborts the write and leaves the store
/// untouched.
pub trait RecordValidator: Send + Sync {
    fn validate(
        &self,
        store: &str,
        schema: Option<&SchemaDescriptor>,
        record: &Record,
        op: WriteOp,
    ) -> Result<()>;
}
