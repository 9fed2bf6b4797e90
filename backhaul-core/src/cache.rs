//! Size-bounded cache store with interchangeable eviction policies.
//!
//! Entries live in an index-addressed ordered sequence: `front` is the next
//! entry to evict, `rear` the most protected. Capacity is a MB budget, not
//! an item count, and `full()` holds strictly when the summed size exceeds
//! it — an entry that lands exactly on the budget does not make the store
//! full.
//!
//! The store tracks membership only. Callers reconcile each file's
//! `in_cache` flag from the [`Admission`] outcome, so the flag and the
//! member set can never drift apart across a mutation.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::FileId;

/// Replacement policy applied by [`CacheStore::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum EvictionPolicy {
    /// Least-recently-touched entry is evicted first; a hit relocates the
    /// entry to the protected rear.
    RecencyBiased,
    /// Entries kept sorted descending by size; the largest is evicted
    /// first. An offered file larger than every member is rejected outright
    /// when the store is already full.
    LargestFirst,
    /// Insertion order is eviction order; hits never reorder.
    Fifo,
    /// No caching at all: every admit is a no-op and every request takes
    /// the miss path.
    Disabled,
}

impl EvictionPolicy {
    /// Returns string representation of the policy for reports and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::RecencyBiased => "recency-biased",
            EvictionPolicy::LargestFirst => "largest-first",
            EvictionPolicy::Fifo => "fifo",
            EvictionPolicy::Disabled => "disabled",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recency-biased" | "recency" | "lpf" => Ok(EvictionPolicy::RecencyBiased),
            "largest-first" | "largest" => Ok(EvictionPolicy::LargestFirst),
            "fifo" => Ok(EvictionPolicy::Fifo),
            "disabled" | "none" => Ok(EvictionPolicy::Disabled),
            _ => Err(format!("Invalid eviction policy: {s}")),
        }
    }
}

/// One cached file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    /// File this entry caches.
    pub file: FileId,
    /// Size of the cached file in MB.
    pub size_mb: f64,
}

/// Outcome of a single [`CacheStore::admit`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// The file was inserted. `evicted` lists every entry removed by the
    /// follow-up eviction pass, front first; it may include the admitted
    /// file itself when a single file exceeds the whole budget.
    Admitted {
        /// Files whose entries were evicted, in eviction order.
        evicted: Vec<FileId>,
    },
    /// The file was already cached; RecencyBiased relocated it to the rear,
    /// the other policies left the order untouched.
    Refreshed,
    /// LargestFirst refused the insertion: the file was strictly larger
    /// than every member while the store was already full. The file stays
    /// uncached for this cycle.
    Rejected,
    /// The policy is [`EvictionPolicy::Disabled`]; nothing was consulted or
    /// mutated.
    Bypassed,
}

impl Admission {
    /// Returns true when the call inserted the file. The follow-up eviction
    /// pass may still have removed it again; `evicted` is authoritative.
    pub fn was_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Size-bounded ordered collection of cached file entries.
#[derive(Debug)]
pub struct CacheStore {
    entries: VecDeque<CacheEntry>,
    size_mb: f64,
    capacity_mb: f64,
}

impl CacheStore {
    /// Creates an empty store with the given MB budget.
    pub fn new(capacity_mb: f64) -> Self {
        Self {
            entries: VecDeque::new(),
            size_mb: 0.0,
            capacity_mb: 0.0_f64.max(capacity_mb),
        }
    }

    /// Returns true strictly when the summed entry size exceeds capacity.
    pub fn full(&self) -> bool {
        self.size_mb > self.capacity_mb
    }

    /// Returns the summed size of all member entries in MB.
    pub fn size_mb(&self) -> f64 {
        self.size_mb
    }

    /// Returns the configured MB budget.
    pub fn capacity_mb(&self) -> f64 {
        self.capacity_mb
    }

    /// Returns the number of member entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true when `file` currently has an entry in the store.
    pub fn contains(&self, file: FileId) -> bool {
        self.position(file).is_some()
    }

    /// Iterates over entries from front (next to evict) to rear.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter()
    }

    /// Returns the entry next in line for eviction.
    pub fn front(&self) -> Option<&CacheEntry> {
        self.entries.front()
    }

    /// Returns the most protected entry.
    pub fn rear(&self) -> Option<&CacheEntry> {
        self.entries.back()
    }

    /// Offers `file` to the store under `policy`. This is the single cache
    /// entry point; hit/miss classification, ordering, and the follow-up
    /// eviction pass are all policy-driven.
    pub fn admit(&mut self, policy: EvictionPolicy, file: FileId, size_mb: f64) -> Admission {
        match policy {
            EvictionPolicy::RecencyBiased => self.admit_recency_biased(file, size_mb),
            EvictionPolicy::LargestFirst => self.admit_largest_first(file, size_mb),
            EvictionPolicy::Fifo => self.admit_fifo(file, size_mb),
            EvictionPolicy::Disabled => Admission::Bypassed,
        }
    }

    /// Hit: relocate to rear. Miss: append to rear, then evict while full.
    /// Net effect: front is always the least-recently-touched entry.
    fn admit_recency_biased(&mut self, file: FileId, size_mb: f64) -> Admission {
        if let Some(index) = self.position(file) {
            // VecDeque::remove cannot fail for an index from position().
            if let Some(entry) = self.entries.remove(index) {
                self.entries.push_back(entry);
            }
            return Admission::Refreshed;
        }

        self.push_rear(file, size_mb);
        Admission::Admitted {
            evicted: self.evict_while_full(),
        }
    }

    /// Keeps entries sorted descending by size, front = largest.
    fn admit_largest_first(&mut self, file: FileId, size_mb: f64) -> Admission {
        // Earlier insertions already placed a cached file correctly; a hit
        // needs no reorder.
        if self.contains(file) {
            return Admission::Refreshed;
        }

        if self.entries.is_empty() {
            self.push_rear(file, size_mb);
            return Admission::Admitted {
                evicted: self.evict_while_full(),
            };
        }

        let largest = self.entries.front().map_or(0.0, |e| e.size_mb);
        let smallest = self.entries.back().map_or(0.0, |e| e.size_mb);

        if size_mb < smallest {
            self.push_rear(file, size_mb);
        } else if size_mb > largest {
            // Admitting a file bigger than everything already held would
            // only evict space to hold an even larger one; refuse instead
            // when the budget is already blown.
            if self.full() {
                return Admission::Rejected;
            }
            self.entries.push_front(CacheEntry { file, size_mb });
            self.size_mb += size_mb;
        } else {
            // First existing entry strictly smaller than the new file wins;
            // an equal-size newcomer therefore lands ahead of it. No
            // strictly-smaller entry means the newcomer ties the smallest
            // and belongs at the rear.
            match self.entries.iter().position(|e| e.size_mb < size_mb) {
                Some(index) => {
                    self.entries.insert(index, CacheEntry { file, size_mb });
                    self.size_mb += size_mb;
                }
                None => self.push_rear(file, size_mb),
            }
        }

        Admission::Admitted {
            evicted: self.evict_while_full(),
        }
    }

    /// Append not-yet-cached files to the rear; never reorder on a hit.
    fn admit_fifo(&mut self, file: FileId, size_mb: f64) -> Admission {
        if self.contains(file) {
            return Admission::Refreshed;
        }

        self.push_rear(file, size_mb);
        Admission::Admitted {
            evicted: self.evict_while_full(),
        }
    }

    fn position(&self, file: FileId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.file == file)
    }

    fn push_rear(&mut self, file: FileId, size_mb: f64) {
        self.entries.push_back(CacheEntry { file, size_mb });
        self.size_mb += size_mb;
    }

    /// Removes front entries until the store is no longer over budget.
    fn evict_while_full(&mut self) -> Vec<FileId> {
        let mut evicted = Vec::new();
        while self.full() {
            match self.entries.pop_front() {
                Some(entry) => {
                    self.size_mb -= entry.size_mb;
                    evicted.push(entry.file);
                }
                None => break,
            }
        }
        if self.entries.is_empty() {
            // Drop accumulated float drift once the store drains.
            self.size_mb = 0.0;
        }
        evicted
    }
}
