//! Record index
//!
//! Maps record id → zero-based position in the store's record sequence.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::record::Record;

/// In-memory id → position mapping
///
/// ## Invariant
/// For every `(id, pos)` entry, `records[pos].id() == Some(id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordIndex {
    positions: HashMap<String, usize>,
}

impl RecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of a record, if indexed
    pub fn get(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Point `id` at `pos`, returning the previous position
    pub fn insert(&mut self, id: impl Into<String>, pos: usize) -> Option<usize> {
        self.positions.insert(id.into(), pos)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterate over `(id, position)` pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.positions.iter().map(|(id, pos)| (id.as_str(), *pos))
    }

    /// Build an index from scratch by scanning `records` in order
    ///
    /// Duplicate ids resolve last-write-wins. Records without a string id
    /// are not indexed.
    pub fn rebuild(records: &[Record]) -> Self {
        let mut index = Self::new();
        for (pos, record) in records.iter().enumerate() {
            if let Some(id) = record.id() {
                index.insert(id, pos);
            }
        }
        index
    }

    /// Check the index against the records it describes
    ///
    /// Consistent means every entry points in range at a record carrying
    /// that id, and every distinct record id has exactly one entry.
    pub fn is_consistent_with(&self, records: &[Record]) -> bool {
        let entries_valid = self.positions.iter().all(|(id, &pos)| {
            records
                .get(pos)
                .and_then(Record::id)
                .is_some_and(|found| found == id)
        });
        if !entries_valid {
            return false;
        }

        let distinct: HashSet<&str> = records.iter().filter_map(Record::id).collect();
        distinct.len() == self.positions.len()
    }

    /// Sorted view used for serialization
    pub(crate) fn to_sorted(&self) -> BTreeMap<&str, usize> {
        self.iter().collect()
    }
}

impl From<HashMap<String, usize>> for RecordIndex {
    fn from(positions: HashMap<String, usize>) -> Self {
        Self { positions }
    }
}
