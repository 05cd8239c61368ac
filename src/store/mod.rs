//! Store Module
//!
//! One named collection of records persisted as two files.
//!
//! ## Responsibilities
//! - Serve reads from memory (`get`, `get_all`)
//! - Append and replace records (`create`, `set`)
//! - Keep the id → position index consistent with the records
//! - Rewrite both files in full on every mutation
//!
//! ## Directory Layout
//! ```text
//! {root}/{store}/
//!   ├── rows     # one JSON object per line, in record order
//!   └── index    # {"<id>": <position>, ...}, zero-based positions
//! ```
//!
//! An empty `rows` file holds zero records; an empty `index` file is read
//! as `{}`. Positions are offsets into the record sequence, not byte
//! offsets.

mod files;
mod index;
mod record_store;

pub use index::RecordIndex;
pub use record_store::Store;

/// File name of the newline-delimited records
pub const ROWS_FILENAME: &str = files::StoreFiles::ROWS_FILENAME;

/// File name of the id → position index
pub const INDEX_FILENAME: &str = files::StoreFiles::INDEX_FILENAME;
