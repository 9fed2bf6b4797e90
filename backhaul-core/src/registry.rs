//! Per-file records and the lazily-populated registry that owns them.
//!
//! The registry is pure data: every lifecycle handler reads and writes it,
//! but it has no behavior of its own. Records are created on first
//! reference and live for the whole run.

use std::collections::HashMap;
use std::fmt;

/// Identifier of a file in the origin-server population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    /// Creates a file identifier.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw index value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// Mutable per-file state threaded through the request lifecycle.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Identifier this record belongs to.
    pub id: FileId,
    /// Size in MB, drawn once on first reference and immutable after.
    pub size_mb: f64,
    /// Whether the file's entry is currently present in the cache store.
    /// Every cache mutation path keeps this in step with membership.
    pub in_cache: bool,
    /// Whether a request for this file is currently in flight. At most one
    /// request per file may be in flight at any time.
    pub in_flight: bool,
    /// Simulated time at which the file entered the access queue.
    pub queue_entered: f64,
    /// Latency accumulated so far for the current request cycle.
    pub latency: f64,
}

impl FileRecord {
    fn new(id: FileId, size_mb: f64) -> Self {
        Self {
            id,
            size_mb,
            in_cache: false,
            in_flight: false,
            queue_entered: 0.0,
            latency: 0.0,
        }
    }
}

/// Owner of all per-file records for one run.
///
/// Records are never destroyed during a run; the registry's lifetime is the
/// run's lifetime.
#[derive(Debug, Default)]
pub struct FileRegistry {
    files: HashMap<FileId, FileRecord>,
}

impl FileRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when a record exists for `id`.
    pub fn contains(&self, id: FileId) -> bool {
        self.files.contains_key(&id)
    }

    /// Creates the record for a first-referenced file with its permanent
    /// size draw. Returns the existing record untouched if one is already
    /// present, so a size can never be re-drawn.
    pub fn insert(&mut self, id: FileId, size_mb: f64) -> &mut FileRecord {
        self.files
            .entry(id)
            .or_insert_with(|| FileRecord::new(id, size_mb))
    }

    /// Returns the record for `id`, if the file has been referenced.
    pub fn get(&self, id: FileId) -> Option<&FileRecord> {
        self.files.get(&id)
    }

    /// Returns the mutable record for `id`, if the file has been referenced.
    pub fn get_mut(&mut self, id: FileId) -> Option<&mut FileRecord> {
        self.files.get_mut(&id)
    }

    /// Returns true when a request for `id` is currently in flight.
    /// A never-referenced file has no record and is trivially eligible.
    pub fn is_in_flight(&self, id: FileId) -> bool {
        self.files.get(&id).is_some_and(|record| record.in_flight)
    }

    /// Returns the number of files referenced so far.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true when no file has been referenced yet.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterates over all records.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_creates_record_once() {
        let mut registry = FileRegistry::new();
        let id = FileId::new(3);

        registry.insert(id, 1.5);
        // A second insert must not overwrite the permanent size draw.
        registry.insert(id, 9.9);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).unwrap().size_mb, 1.5);
    }

    #[test]
    fn test_unknown_file_is_not_in_flight() {
        let registry = FileRegistry::new();
        assert!(!registry.is_in_flight(FileId::new(42)));
    }

    #[test]
    fn test_in_flight_tracks_record_flag() {
        let mut registry = FileRegistry::new();
        let id = FileId::new(1);
        registry.insert(id, 1.0).in_flight = true;
        assert!(registry.is_in_flight(id));

        registry.get_mut(id).unwrap().in_flight = false;
        assert!(!registry.is_in_flight(id));
    }

    #[test]
    fn test_new_record_defaults() {
        let mut registry = FileRegistry::new();
        let record = registry.insert(FileId::new(0), 2.0);

        assert!(!record.in_cache);
        assert!(!record.in_flight);
        assert_eq!(record.latency, 0.0);
        assert_eq!(record.queue_entered, 0.0);
    }
}
