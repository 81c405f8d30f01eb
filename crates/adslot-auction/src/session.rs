//! Per-session auction state.

use std::collections::HashMap;

use adslot_core::AdId;
use serde::{Deserialize, Serialize};

/// Impression counts for one reading session.
///
/// Owned by whoever drives the auction and passed by reference to scoring.
/// Lives as long as the page session; call [`SessionState::reset`] to start
/// over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    impressions: HashMap<AdId, u32>,
}

impl SessionState {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more impression of `id`, returning the new count.
    pub fn record_impression(&mut self, id: &AdId) -> u32 {
        let count = self.impressions.entry(id.clone()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Impressions of `id` so far in this session.
    pub fn impression_count(&self, id: &AdId) -> u32 {
        self.impressions.get(id).copied().unwrap_or(0)
    }

    /// Impressions across all ads.
    pub fn total_impressions(&self) -> u64 {
        self.impressions.values().map(|&c| u64::from(c)).sum()
    }

    /// Number of distinct ads seen.
    pub fn distinct_ads(&self) -> usize {
        self.impressions.len()
    }

    /// Forget one ad's count.
    pub fn reset_ad(&mut self, id: &AdId) {
        self.impressions.remove(id);
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.impressions.clear();
    }

    /// Iterate over `(ad, count)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&AdId, u32)> {
        self.impressions.iter().map(|(id, &c)| (id, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let mut session = SessionState::new();
        let id = AdId::new("a");

        assert_eq!(session.impression_count(&id), 0);
        assert_eq!(session.record_impression(&id), 1);
        assert_eq!(session.record_impression(&id), 2);
        assert_eq!(session.impression_count(&id), 2);
    }

    #[test]
    fn test_counts_are_per_ad() {
        let mut session = SessionState::new();
        session.record_impression(&AdId::new("a"));
        session.record_impression(&AdId::new("b"));
        session.record_impression(&AdId::new("b"));

        assert_eq!(session.impression_count(&AdId::new("a")), 1);
        assert_eq!(session.impression_count(&AdId::new("b")), 2);
        assert_eq!(session.total_impressions(), 3);
        assert_eq!(session.distinct_ads(), 2);

        let mut counts: Vec<(String, u32)> =
            session.iter().map(|(id, n)| (id.to_string(), n)).collect();
        counts.sort();
        assert_eq!(counts, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }

    #[test]
    fn test_reset() {
        let mut session = SessionState::new();
        session.record_impression(&AdId::new("a"));
        session.record_impression(&AdId::new("b"));

        session.reset_ad(&AdId::new("a"));
        assert_eq!(session.impression_count(&AdId::new("a")), 0);
        assert_eq!(session.impression_count(&AdId::new("b")), 1);

        session.reset();
        assert_eq!(session.total_impressions(), 0);
    }
}
