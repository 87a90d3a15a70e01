//! Bounded audit trail of adaptations.

use std::collections::VecDeque;

use crate::adapter::AdaptationEvent;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Most recent adaptation events, oldest first.
#[derive(Debug, Clone)]
pub struct AdaptationHistory {
    events: VecDeque<AdaptationEvent>,
    limit: usize,
}

impl Default for AdaptationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl AdaptationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            events: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Restore from persisted events, keeping only the newest `limit`.
    pub fn from_events(events: Vec<AdaptationEvent>, limit: usize) -> Self {
        let mut history = Self::new(limit);
        for event in events {
            history.record(event);
        }
        history
    }

    pub fn record(&mut self, event: AdaptationEvent) {
        if self.events.len() == self.limit {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn latest(&self) -> Option<&AdaptationEvent> {
        self.events.back()
    }

    pub fn to_vec(&self) -> Vec<AdaptationEvent> {
        self.events.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdaptationStrength;
    use chrono::Utc;
    use referral_model::WeightVector;

    fn event(version: u64) -> AdaptationEvent {
        AdaptationEvent {
            timestamp: Utc::now(),
            version,
            previous: WeightVector::default(),
            updated: WeightVector::default(),
            sample_count: 5,
            strength: AdaptationStrength::Auto,
            performances: Vec::new(),
        }
    }

    #[test]
    fn test_bounded() {
        let mut history = AdaptationHistory::new(2);
        for v in 1..=3 {
            history.record(event(v));
        }
        let versions: Vec<_> = history.to_vec().iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![2, 3]);
        assert_eq!(history.latest().map(|e| e.version), Some(3));
    }

    #[test]
    fn test_from_events_truncates() {
        let history = AdaptationHistory::from_events((1..=5).map(event).collect(), 3);
        assert_eq!(history.len(), 3);
        assert_eq!(history.to_vec()[0].version, 3);
    }
}
