//! Storage Module
//!
//! Registry of stores under one root directory.
//!
//! ## Responsibilities
//! - Create the root directory on first load
//! - Discover one store per subdirectory and load them concurrently
//! - Hand out stores by name, creating empty ones on first access
//! - Keep a store that failed to load from being overwritten

mod manager;

pub use manager::Storage;

use crate::error::ShelfError;

/// Outcome of `Storage::load`
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Stores read from disk and registered, in name order
    pub loaded: Vec<String>,

    /// Stores whose index was corrupt or stale and got rebuilt
    pub repaired: Vec<String>,

    /// Directories already registered before this load, left untouched
    pub skipped: Vec<String>,

    /// Stores that failed to load and were quarantined
    pub failed: Vec<(String, ShelfError)>,
}

impl LoadReport {
    /// True if every discovered store loaded
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
