//! Configuration for ShelfDB
//!
//! Centralized configuration with sensible defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Result, ShelfError};
use crate::schema::SchemaDescriptor;

/// Main configuration for a ShelfDB storage instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Parent directory holding one directory per named database
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {name}/              (storage root)
    ///         └── {store}/
    ///             ├── rows         (newline-delimited JSON records)
    ///             └── index        (JSON object: id -> position)
    pub data_dir: PathBuf,

    /// Database name, the storage root is `data_dir/name`
    pub name: String,

    // -------------------------------------------------------------------------
    // Schema Configuration
    // -------------------------------------------------------------------------
    /// Opaque schema descriptors keyed by store name
    pub schemas: HashMap<String, SchemaDescriptor>,

    // -------------------------------------------------------------------------
    // Load / Save Behavior
    // -------------------------------------------------------------------------
    /// What `Storage::load` does when a single store fails to load
    pub load_failure_policy: LoadFailurePolicy,

    /// fsync temp files before renaming them into place
    pub sync_writes: bool,
}

/// Behavior of `Storage::load` when one store cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailurePolicy {
    /// Record the failure, quarantine the store, keep loading the others
    Isolate,

    /// Fail the whole load with the first error
    Abort,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./.dbs"),
            name: "default".to_string(),
            schemas: HashMap::new(),
            load_failure_policy: LoadFailurePolicy::Isolate,
            sync_writes: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Root directory holding one subdirectory per store
    pub fn root_dir(&self) -> PathBuf {
        self.data_dir.join(&self.name)
    }

    /// Schema descriptor configured for a store, if any
    pub fn schema(&self, store: &str) -> Option<&SchemaDescriptor> {
        self.schemas.get(store)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the parent data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the database name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Attach a schema descriptor to a store
    pub fn schema(mut self, store: impl Into<String>, descriptor: impl Into<SchemaDescriptor>) -> Self {
        self.config.schemas.insert(store.into(), descriptor.into());
        self
    }

    /// Replace all schema descriptors
    pub fn schemas(mut self, schemas: HashMap<String, SchemaDescriptor>) -> Self {
        self.config.schemas = schemas;
        self
    }

    /// Set the load failure policy
    pub fn load_failure_policy(mut self, policy: LoadFailurePolicy) -> Self {
        self.config.load_failure_policy = policy;
        self
    }

    /// Enable or disable fsync on save
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.config.sync_writes = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Read schema descriptors from a JSON file of the form
/// `{ "<store>": <descriptor>, ... }`
pub fn load_schemas(path: &Path) -> Result<HashMap<String, SchemaDescriptor>> {
    let contents = fs::read_to_string(path).map_err(|e| ShelfError::file_io(path, e))?;

    let value: Value = serde_json::from_str(&contents)
        .map_err(|e| ShelfError::Config(format!("invalid schema file {}: {}", path.display(), e)))?;

    let Value::Object(entries) = value else {
        return Err(ShelfError::Config(format!(
            "schema file {} must contain a JSON object",
            path.display()
        )));
    };

    Ok(entries
        .into_iter()
        .map(|(store, descriptor)| (store, SchemaDescriptor::new(descriptor)))
        .collect())
}
