//! Copy-on-write publication of weight snapshots.
//!
//! Readers load an `Arc` to the current snapshot without locking and keep
//! using it for as long as they like. Writers build the next snapshot off to
//! the side and install it with a compare-and-swap, retrying if another
//! writer got there first.

use std::convert::Infallible;
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use chrono::{DateTime, Utc};
use referral_model::WeightVector;
use serde::Serialize;
use tracing::info;

/// An immutable, versioned weight vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightSnapshot {
    pub version: u64,
    pub weights: WeightVector,
    pub published_at: DateTime<Utc>,
}

impl WeightSnapshot {
    fn new(version: u64, weights: WeightVector) -> Self {
        Self {
            version,
            weights,
            published_at: Utc::now(),
        }
    }
}

/// Holder of the current weight snapshot.
#[derive(Debug)]
pub struct WeightStore {
    current: ArcSwap<WeightSnapshot>,
}

impl Default for WeightStore {
    fn default() -> Self {
        Self::new(WeightVector::default())
    }
}

impl WeightStore {
    pub fn new(weights: WeightVector) -> Self {
        Self::with_version(weights, 0)
    }

    /// Resume from a persisted snapshot version.
    pub fn with_version(weights: WeightVector, version: u64) -> Self {
        Self {
            current: ArcSwap::from_pointee(WeightSnapshot::new(version, weights)),
        }
    }

    /// The snapshot in effect right now. Never blocks.
    pub fn snapshot(&self) -> Arc<WeightSnapshot> {
        self.current.load_full()
    }

    /// Replace the current snapshot. Returns the new one.
    pub fn publish(&self, weights: WeightVector) -> Arc<WeightSnapshot> {
        let (_, next) = self
            .swap_in(|current| Ok::<_, Infallible>(WeightSnapshot::new(current.version + 1, weights)))
            .unwrap_or_else(|never| match never {});
        info!(version = next.version, "Published weight snapshot");
        next
    }

    /// Adopt persisted weights. The version never goes backwards.
    pub fn restore(&self, weights: WeightVector, version: u64) -> Arc<WeightSnapshot> {
        let (_, next) = self
            .swap_in(|current| {
                Ok::<_, Infallible>(WeightSnapshot::new(version.max(current.version + 1), weights))
            })
            .unwrap_or_else(|never| match never {});
        info!(version = next.version, "Restored weight snapshot");
        next
    }

    /// Derive and publish a new snapshot from whatever is current.
    ///
    /// `derive` runs without any lock held. If another writer publishes in
    /// the meantime, `derive` runs again against the newer weights.
    /// Returns `(previous, published)`. If `derive` fails nothing is published.
    pub fn update<E>(
        &self,
        mut derive: impl FnMut(&WeightVector) -> Result<WeightVector, E>,
    ) -> Result<(Arc<WeightSnapshot>, Arc<WeightSnapshot>), E> {
        let (previous, next) = self.swap_in(|current| {
            Ok(WeightSnapshot::new(current.version + 1, derive(&current.weights)?))
        })?;
        info!(version = next.version, "Published weight snapshot");
        Ok((previous, next))
    }

    fn swap_in<E>(
        &self,
        mut build: impl FnMut(&WeightSnapshot) -> Result<WeightSnapshot, E>,
    ) -> Result<(Arc<WeightSnapshot>, Arc<WeightSnapshot>), E> {
        let mut current = self.current.load_full();
        loop {
            let next = Arc::new(build(&current)?);
            let seen = self.current.compare_and_swap(&current, Arc::clone(&next));
            if Arc::ptr_eq(&*seen, &current) {
                return Ok((current, next));
            }
            current = Guard::into_inner(seen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use referral_model::ValidationError;
    use std::sync::mpsc;
    use std::time::Duration;

    fn alt_weights() -> WeightVector {
        WeightVector::new([0.3, 0.3, 0.2, 0.15, 0.05]).unwrap()
    }

    #[test]
    fn test_held_snapshot_survives_publish() {
        let store = WeightStore::default();
        let held = store.snapshot();
        assert_eq!(held.version, 0);

        let published = store.publish(alt_weights());
        assert_eq!(published.version, 1);

        // The reader's snapshot is untouched
        assert_eq!(held.weights, WeightVector::default());
        assert_eq!(store.snapshot().weights, alt_weights());
    }

    #[test]
    fn test_update_failure_publishes_nothing() {
        let store = WeightStore::default();
        let result: Result<_, ValidationError> =
            store.update(|_| Err(ValidationError::WeightSum(2.0)));
        assert!(result.is_err());
        assert_eq!(store.snapshot().version, 0);
    }

    #[test]
    fn test_update_sees_current() {
        let store = WeightStore::with_version(WeightVector::default(), 7);
        store.publish(alt_weights());
        let (previous, next) = store
            .update(|w| -> Result<_, ValidationError> {
                assert_eq!(*w, alt_weights());
                Ok(WeightVector::default())
            })
            .unwrap();
        assert_eq!(previous.version, 8);
        assert_eq!(next.version, 9);
    }

    #[test]
    fn test_restore_keeps_version_monotonic() {
        let store = WeightStore::with_version(WeightVector::default(), 10);
        assert_eq!(store.restore(alt_weights(), 3).version, 11);
        assert_eq!(store.restore(WeightVector::default(), 40).version, 40);
    }

    #[test]
    fn test_reader_not_blocked_while_update_derives() {
        let store = Arc::new(WeightStore::default());
        let reader_store = Arc::clone(&store);

        store
            .update(|w| -> Result<_, ValidationError> {
                let (tx, rx) = mpsc::channel();
                let store = Arc::clone(&reader_store);
                std::thread::spawn(move || {
                    let _ = tx.send(store.snapshot().version);
                });
                let seen = rx.recv_timeout(Duration::from_secs(5));
                assert_eq!(seen, Ok(0));
                Ok(*w)
            })
            .unwrap();

        assert_eq!(store.snapshot().version, 1);
    }

    #[test]
    fn test_concurrent_updates_lose_nothing() {
        let store = Arc::new(WeightStore::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| {
                            let (previous, next) = store
                                .update(|w| -> Result<_, ValidationError> { Ok(*w) })
                                .unwrap();
                            assert_eq!(next.version, previous.version + 1);
                            next.version
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut versions: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, (1..=200).collect::<Vec<u64>>());
    }

    #[test]
    fn test_concurrent_readers() {
        let store = Arc::new(WeightStore::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if i == 0 {
                            store.publish(alt_weights());
                        }
                        let snap = store.snapshot();
                        assert!((snap.weights.sum() - 1.0).abs() < 1e-6);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.snapshot().version, 100);
    }
}
