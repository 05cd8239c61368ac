//! Record Store
//!
//! One named collection of records backed by a directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, ShelfError};
use crate::record::Record;
use crate::schema::{RecordValidator, SchemaDescriptor, WriteOp};

use super::files::StoreFiles;
use super::RecordIndex;

/// In-memory data guarded by the store lock
#[derive(Debug, Default)]
struct StoreData {
    /// Records in append order
    records: Vec<Record>,

    /// id → position in `records`
    index: RecordIndex,
}

/// A named collection of schemaless records
///
/// ## Concurrency
/// - Reads (`get`, `get_all`) take the read lock and never touch disk
/// - Writes (`create`, `set`, `save`) hold the lock for the mutation and the
///   full rewrite, so only one mutation is in flight per store
/// - All methods use `&self`; share a store as `Arc<Store>`
pub struct Store {
    name: String,
    files: StoreFiles,
    schema: Option<SchemaDescriptor>,
    validator: Option<Arc<dyn RecordValidator>>,
    sync_writes: bool,

    /// Reason this store refuses writes (failed load, unsafe name)
    unavailable: Option<String>,

    data: RwLock<StoreData>,
}

impl Store {
    /// Create an empty store rooted at `dir`
    ///
    /// Nothing is written until the first save.
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self::with_data(name, dir, Vec::new(), RecordIndex::new())
    }

    /// Create a store from already-loaded records and index
    pub fn with_data(
        name: impl Into<String>,
        dir: impl Into<PathBuf>,
        records: Vec<Record>,
        index: RecordIndex,
    ) -> Self {
        Self {
            name: name.into(),
            files: StoreFiles::new(dir),
            schema: None,
            validator: None,
            sync_writes: true,
            unavailable: None,
            data: RwLock::new(StoreData { records, index }),
        }
    }

    /// Read a store from its directory
    ///
    /// Missing files read as empty. An index that is corrupt or does not
    /// match the rows is rebuilt. Returns the store and whether the index
    /// had to be rebuilt.
    pub fn open(name: impl Into<String>, dir: impl Into<PathBuf>) -> Result<(Self, bool)> {
        let name = name.into();
        let files = StoreFiles::new(dir);
        let loaded = files.read()?;

        let (index, repaired) = match loaded.index {
            Some(index) if index.is_consistent_with(&loaded.records) => (index, false),
            _ => {
                warn!(store = %name, records = loaded.records.len(), "Rebuilding index from rows");
                (RecordIndex::rebuild(&loaded.records), true)
            }
        };

        debug!(store = %name, records = loaded.records.len(), "Loaded store");

        let store = Self::with_data(name, files.dir(), loaded.records, index);
        Ok((store, repaired))
    }

    // =========================================================================
    // Builder-style Settings
    // =========================================================================

    pub fn with_schema(mut self, schema: Option<SchemaDescriptor>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_validator(mut self, validator: Option<Arc<dyn RecordValidator>>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Mark the store as refusing all writes
    pub fn quarantined(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a record by id
    pub fn get(&self, id: &str) -> Option<Record> {
        let data = self.data.read();
        data.index
            .get(id)
            .and_then(|pos| data.records.get(pos))
            .cloned()
    }

    /// All records in their stored order
    pub fn get_all(&self) -> Vec<Record> {
        self.data.read().records.clone()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of records held, orphaned duplicates included
    pub fn len(&self) -> usize {
        self.data.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().records.is_empty()
    }

    /// Snapshot of the current index
    pub fn index(&self) -> RecordIndex {
        self.data.read().index.clone()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append a new record and persist the store
    ///
    /// A missing id is replaced with a fresh UUID v4. Returns the id.
    ///
    /// An explicit id that is already present is not rejected: the index
    /// moves to the new record and the old one stays in the rows, unindexed.
    pub fn create(&self, data: impl Into<Value>) -> Result<String> {
        self.check_writable()?;

        let mut record = Record::from_value(data.into())?;
        let id = record.ensure_id()?;
        self.validate(&record, WriteOp::Create)?;

        let mut guard = self.data.write();
        guard.records.push(record);
        let pos = guard.records.len() - 1;
        if let Some(previous) = guard.index.insert(id.clone(), pos) {
            warn!(store = %self.name, %id, previous, "Duplicate id, previous record orphaned");
        }

        debug!(store = %self.name, %id, pos, "Created record");
        self.persist(&guard)?;
        Ok(id)
    }

    /// Replace the record stored under `id` and persist the store
    ///
    /// Fails with `NotFound` for an unknown id. The new data may omit `id`
    /// (it is filled in) but must not carry a different one.
    pub fn set(&self, id: &str, data: impl Into<Value>) -> Result<String> {
        self.check_writable()?;

        let mut record = Record::from_value(data.into())?;
        record.bind_id(id)?;

        let mut guard = self.data.write();
        let pos = guard
            .index
            .get(id)
            .filter(|&pos| pos < guard.records.len())
            .ok_or_else(|| ShelfError::not_found(&self.name, id))?;

        self.validate(&record, WriteOp::Set)?;
        guard.records[pos] = record;

        debug!(store = %self.name, %id, pos, "Updated record");
        self.persist(&guard)?;
        Ok(id.to_string())
    }

    /// Rewrite both files from the current in-memory state
    ///
    /// Takes the write lock: saves share the same temp file paths.
    pub fn save(&self) -> Result<()> {
        self.check_writable()?;
        let guard = self.data.write();
        self.persist(&guard)
    }

    /// Recompute the index from the records, last write wins on duplicates
    ///
    /// In-memory only; call `save` to persist. Returns the number of
    /// indexed ids.
    pub fn rebuild_index(&self) -> usize {
        let mut guard = self.data.write();
        guard.index = RecordIndex::rebuild(&guard.records);
        guard.index.len()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory backing this store
    pub fn dir(&self) -> &Path {
        self.files.dir()
    }

    pub fn schema(&self) -> Option<&SchemaDescriptor> {
        self.schema.as_ref()
    }

    /// Why the store refuses writes, if it does
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_writable(&self) -> Result<()> {
        match &self.unavailable {
            Some(reason) => Err(ShelfError::unavailable(&self.name, reason.as_str())),
            None => Ok(()),
        }
    }

    fn validate(&self, record: &Record, op: WriteOp) -> Result<()> {
        match &self.validator {
            Some(validator) => validator.validate(&self.name, self.schema.as_ref(), record, op),
            None => Ok(()),
        }
    }

    fn persist(&self, data: &StoreData) -> Result<()> {
        self.files
            .write(&data.records, &data.index, self.sync_writes)?;
        debug!(store = %self.name, records = data.records.len(), "Saved store");
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("dir", &self.files.dir())
            .field("records", &self.len())
            .field("unavailable", &self.unavailable)
            .finish()
    }
}
