//! # ShelfDB
//!
//! A minimal embedded record store:
//! - Named collections ("stores") of schemaless JSON records
//! - Newline-delimited JSON rows plus an id → position index per store
//! - Stores discovered from a directory tree at startup, loaded concurrently
//! - Single-process, single-writer per store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Storage                              │
//! │        (root dir discovery, lazy store registry)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ store(name)
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Store A   │          │   Store B   │
//!   │  (RwLock)   │          │  (RwLock)   │
//!   └──────┬──────┘          └──────┬──────┘
//!          │ full rewrite on        │
//!          ▼ every mutation         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ rows, index │          │ rows, index │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::json;
//! use shelfdb::{Config, Storage};
//!
//! # fn main() -> shelfdb::Result<()> {
//! let storage = Storage::new(Config::builder().data_dir("./.dbs").name("test").build());
//! storage.load()?;
//!
//! let contacts = storage.store("contacts");
//! let id = contacts.create(json!({ "name": { "first": "Piet", "last": "Pietsma" } }))?;
//! assert!(contacts.get(&id).is_some());
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod schema;
pub mod store;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, ShelfError};
pub use config::{Config, LoadFailurePolicy};
pub use record::Record;
pub use schema::{RecordValidator, SchemaDescriptor, WriteOp};
pub use store::{RecordIndex, Store};
pub use storage::{LoadReport, Storage};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ShelfDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
