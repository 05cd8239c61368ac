//! Storage Manager
//!
//! Discovers stores on startup and hands them out by name.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{Config, LoadFailurePolicy};
use crate::error::{Result, ShelfError};
use crate::schema::RecordValidator;
use crate::store::Store;

use super::LoadReport;

/// Root registry of stores within one directory tree
///
/// ## Concurrency:
/// - `stores`: Protected by RwLock (lookups share, first access inserts)
/// - All methods use `&self`; stores are handed out as `Arc<Store>`
pub struct Storage {
    config: Config,

    /// Directory holding one subdirectory per store
    root_dir: PathBuf,

    /// Hook passed to every store this registry creates
    validator: Option<Arc<dyn RecordValidator>>,

    /// Loaded or lazily created stores, by name
    stores: RwLock<HashMap<String, Arc<Store>>>,
}

/// Result of loading one directory entry
type StoreLoad = Result<Option<(Store, bool)>>;

impl Storage {
    /// Upper bound on stores read at the same time during `load`
    pub const MAX_CONCURRENT_LOADS: usize = 16;

    /// Create a storage registry; nothing is read until `load`
    pub fn new(config: Config) -> Self {
        let root_dir = config.root_dir();
        Self {
            config,
            root_dir,
            validator: None,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Create and load in one step
    pub fn open(config: Config) -> Result<Self> {
        let storage = Self::new(config);
        storage.load()?;
        Ok(storage)
    }

    /// Install a validation hook for stores created after this call
    pub fn with_validator(mut self, validator: Arc<dyn RecordValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Discover and load every store under the root directory
    ///
    /// 1. Create the root directory if missing
    /// 2. List entries in name order, skipping non-directories
    /// 3. Load new stores in batches of `MAX_CONCURRENT_LOADS`, one thread each
    /// 4. Register results; failures follow `load_failure_policy`
    ///
    /// Names already registered (an earlier load, or `store()`) are skipped,
    /// so calling this twice does not replace live stores.
    pub fn load(&self) -> Result<LoadReport> {
        self.ensure_root_dir()?;

        let mut report = LoadReport::default();
        let mut pending = Vec::new();
        {
            let stores = self.stores.read();
            for name in self.list_entries()? {
                if stores.contains_key(&name) {
                    report.skipped.push(name);
                } else {
                    pending.push(name);
                }
            }
        }

        let mut outcomes: Vec<(String, StoreLoad)> = Vec::with_capacity(pending.len());
        for batch in pending.chunks(Self::MAX_CONCURRENT_LOADS) {
            outcomes.extend(self.load_batch(batch)?);
        }

        if self.config.load_failure_policy == LoadFailurePolicy::Abort {
            if let Some(failed) = outcomes.iter().position(|(_, outcome)| outcome.is_err()) {
                let (name, outcome) = outcomes.swap_remove(failed);
                if let Err(e) = outcome {
                    error!(store = %name, error = %e, "Store failed to load, aborting");
                    return Err(e);
                }
            }
        }

        let mut stores = self.stores.write();
        for (name, outcome) in outcomes {
            let outcome = match outcome {
                Ok(None) => continue,
                Ok(Some(loaded)) => Ok(loaded),
                Err(e) => Err(e),
            };
            if stores.contains_key(&name) {
                // Registered through store() while this load was running
                report.skipped.push(name);
                continue;
            }

            let store = match outcome {
                Ok((store, repaired)) => {
                    if repaired {
                        report.repaired.push(name.clone());
                    }
                    report.loaded.push(name.clone());
                    store
                }
                Err(e) => {
                    warn!(store = %name, error = %e, "Store failed to load, quarantining");
                    let store = self.new_store(&name).quarantined(e.to_string());
                    report.failed.push((name.clone(), e));
                    store
                }
            };
            stores.insert(name, Arc::new(store));
        }

        info!(
            root = %self.root_dir.display(),
            loaded = report.loaded.len(),
            repaired = report.repaired.len(),
            failed = report.failed.len(),
            "Storage loaded"
        );

        Ok(report)
    }

    /// Get a store by name, creating an empty one if unseen
    ///
    /// Never fails. A new store's directory is created on its first save.
    /// A name that is not a single plain path component yields a store that
    /// refuses writes.
    pub fn store(&self, name: &str) -> Arc<Store> {
        if let Some(store) = self.stores.read().get(name) {
            return Arc::clone(store);
        }

        let mut stores = self.stores.write();
        let store = stores.entry(name.to_string()).or_insert_with(|| {
            debug!(store = %name, "Creating store");
            Arc::new(self.new_store(name))
        });
        Arc::clone(store)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Names of all registered stores, sorted
    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of registered stores that refuse writes, sorted
    pub fn failed_stores(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .stores
            .read()
            .iter()
            .filter(|(_, store)| store.unavailable_reason().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Get the root directory path
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Create the root directory unless it already exists
    fn ensure_root_dir(&self) -> Result<()> {
        match fs::metadata(&self.root_dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ShelfError::Config(format!(
                "storage root {} is not a directory",
                self.root_dir.display()
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(root = %self.root_dir.display(), "Creating storage root");
                fs::create_dir_all(&self.root_dir)
                    .map_err(|e| ShelfError::file_io(&self.root_dir, e))
            }
            Err(e) => Err(ShelfError::file_io(&self.root_dir, e)),
        }
    }

    /// Entry names under the root, sorted
    fn list_entries(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries =
            fs::read_dir(&self.root_dir).map_err(|e| ShelfError::file_io(&self.root_dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| ShelfError::file_io(&self.root_dir, e))?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(entry = ?raw, "Skipping non UTF-8 entry"),
            }
        }

        names.sort();
        Ok(names)
    }

    /// Load a batch of entries concurrently, results in input order
    fn load_batch(&self, batch: &[String]) -> Result<Vec<(String, StoreLoad)>> {
        crossbeam::thread::scope(|s| {
            let handles: Vec<_> = batch
                .iter()
                .map(|name| (name, s.spawn(move |_| self.load_store(name))))
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| {
                    let outcome = handle
                        .join()
                        .map_err(|_| ShelfError::WorkerPanicked(format!("loader for {}", name)))
                        .and_then(|r| r);
                    (name.clone(), outcome)
                })
                .collect::<Vec<_>>()
        })
        .map_err(|_| ShelfError::WorkerPanicked("storage loader".to_string()))
    }

    /// Load one directory entry; `Ok(None)` for anything but a directory
    fn load_store(&self, name: &str) -> StoreLoad {
        let dir = self.root_dir.join(name);
        let meta = fs::metadata(&dir).map_err(|e| ShelfError::file_io(&dir, e))?;
        if !meta.is_dir() {
            return Ok(None);
        }

        let (store, repaired) = Store::open(name, &dir)?;
        Ok(Some((self.configure(store), repaired)))
    }

    /// Build an empty, configured store for `name`
    fn new_store(&self, name: &str) -> Store {
        let store = self.configure(Store::new(name, self.root_dir.join(name)));
        if is_valid_store_name(name) {
            store
        } else {
            store.quarantined("store name must be a single path component")
        }
    }

    fn configure(&self, store: Store) -> Store {
        let schema = self.config.schema(store.name()).cloned();
        store
            .with_schema(schema)
            .with_validator(self.validator.clone())
            .with_sync_writes(self.config.sync_writes)
    }
}

/// A store name must map to exactly one normal path component
fn is_valid_store_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(c)), None) if c == name
    ) && !name.contains(['/', '\\'])
}
