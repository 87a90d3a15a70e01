//! Fixed-capacity ring buffer of outcome feedback.
//!
//! Appends overwrite the oldest record once the buffer is full. Records are
//! validated on the way in and never modified afterwards.

use std::collections::HashMap;

use referral_model::{FeedbackKind, FeedbackRecord, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 1000;

/// How repeated feedback for the same match is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Every delivery counts, replays included (at-least-once)
    #[default]
    CountReplays,
    /// A `(match_id, kind)` already buffered is acknowledged but not stored again
    DropDuplicates,
}

/// Buffer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferConfig {
    pub capacity: usize,
    pub dedup: DedupPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            dedup: DedupPolicy::CountReplays,
        }
    }
}

/// Whether an ingested record was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Accepted,
    Duplicate,
}

/// Acknowledgement returned by `FeedbackBuffer::ingest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub status: IngestStatus,
    /// Records held after this call
    pub buffer_len: usize,
    /// Whether the oldest record was evicted to make room
    pub evicted: bool,
}

impl IngestReceipt {
    pub fn accepted(&self) -> bool {
        self.status == IngestStatus::Accepted
    }
}

type DedupKey = (String, FeedbackKind);

/// Bounded FIFO of feedback records.
#[derive(Debug, Clone)]
pub struct FeedbackBuffer {
    slots: Vec<Option<FeedbackRecord>>,
    /// Index of the oldest record
    head: usize,
    len: usize,
    dedup: DedupPolicy,
    /// Buffered count per `(match_id, kind)`
    keys: HashMap<DedupKey, usize>,
    total_accepted: u64,
}

impl FeedbackBuffer {
    /// Create an empty buffer. A zero capacity is raised to one.
    pub fn new(config: &BufferConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
            dedup: config.dedup,
            keys: HashMap::new(),
            total_accepted: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        self.dedup
    }

    /// Records accepted since creation, evicted ones included.
    pub fn total_accepted(&self) -> u64 {
        self.total_accepted
    }

    /// Validate and append a record, evicting the oldest when full.
    ///
    /// Out-of-range outcomes are rejected, not clamped.
    pub fn ingest(&mut self, record: FeedbackRecord) -> Result<IngestReceipt, ValidationError> {
        record.validate()?;

        let key = (record.match_id.clone(), record.kind);
        if self.dedup == DedupPolicy::DropDuplicates && self.keys.contains_key(&key) {
            debug!(match_id = %record.match_id, "Duplicate feedback dropped");
            return Ok(IngestReceipt {
                status: IngestStatus::Duplicate,
                buffer_len: self.len,
                evicted: false,
            });
        }

        *self.keys.entry(key).or_insert(0) += 1;
        let evicted = self.push(record);
        if let Some(old) = &evicted {
            self.forget(old);
        }
        self.total_accepted += 1;

        Ok(IngestReceipt {
            status: IngestStatus::Accepted,
            buffer_len: self.len,
            evicted: evicted.is_some(),
        })
    }

    fn push(&mut self, record: FeedbackRecord) -> Option<FeedbackRecord> {
        let capacity = self.capacity();
        if self.len == capacity {
            let evicted = self.slots[self.head].replace(record);
            self.head = (self.head + 1) % capacity;
            evicted
        } else {
            let idx = (self.head + self.len) % capacity;
            self.slots[idx] = Some(record);
            self.len += 1;
            None
        }
    }

    fn forget(&mut self, record: &FeedbackRecord) {
        let key = (record.match_id.clone(), record.kind);
        if let Some(count) = self.keys.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.keys.remove(&key);
            }
        }
    }

    /// Records from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &FeedbackRecord> + '_ {
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % capacity].as_ref())
    }

    /// Copy of the newest `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<FeedbackRecord> {
        let skip = self.len.saturating_sub(n);
        self.iter().skip(skip).cloned().collect()
    }
}
