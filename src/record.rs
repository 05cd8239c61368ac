//! Record definitions
//!
//! A record is a JSON object with a mandatory string `id` field. Everything
//! else about it is schemaless at the storage layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Result, ShelfError};

/// Name of the identity field
pub const ID_FIELD: &str = "id";

/// A single stored item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record (no fields, no id)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ShelfError::InvalidRecord(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// The record's id, if present and a string
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Set the id field
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.fields.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    /// Get a field by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Insert or replace a field, returning the previous value
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Make sure a record about to be created carries a usable id
    ///
    /// A missing, `null` or empty-string id is replaced with a fresh UUID v4.
    /// Any other non-string id is rejected.
    pub(crate) fn ensure_id(&mut self) -> Result<String> {
        match self.fields.get(ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => return Ok(id.clone()),
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => {
                return Err(ShelfError::InvalidRecord(format!(
                    "id must be a string, got {}",
                    kind_of(other)
                )))
            }
        }

        let id = generate_id();
        self.set_id(id.clone());
        Ok(id)
    }

    /// Bind a record passed to `set` to the key it is stored under
    ///
    /// An absent id takes the key. A differing id is an `IdMismatch`.
    pub(crate) fn bind_id(&mut self, key: &str) -> Result<()> {
        match self.fields.get(ID_FIELD) {
            None | Some(Value::Null) => {
                self.set_id(key);
                Ok(())
            }
            Some(Value::String(id)) if id == key => Ok(()),
            Some(other) => Err(ShelfError::IdMismatch {
                expected: key.to_string(),
                found: match other {
                    Value::String(s) => s.clone(),
                    v => v.to_string(),
                },
            }),
        }
    }
}

impl TryFrom<Value> for Record {
    type Error = ShelfError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

/// Generate a fresh record id (random UUID v4, hyphenated lowercase)
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
