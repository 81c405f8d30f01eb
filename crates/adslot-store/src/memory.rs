//! In-process campaign store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use adslot_core::{AdId, Clock, SystemClock};
use async_trait::async_trait;

use crate::{CampaignRow, CampaignStore, Counter, StoreError};

/// Campaign store held in memory.
///
/// Applies the same activity rules as the hosted store and keeps counters
/// locally. `set_unavailable` makes every call fail, to exercise degraded
/// paths.
pub struct MemoryCampaignStore {
    rows: Mutex<Vec<CampaignRow>>,
    counters: Mutex<HashMap<(AdId, Counter), u64>>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
    fetches: AtomicUsize,
}

impl Default for MemoryCampaignStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryCampaignStore {
    /// Create a store holding `rows`, using the wall clock.
    pub fn new(rows: Vec<CampaignRow>) -> Self {
        Self::with_clock(rows, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source.
    pub fn with_clock(rows: Vec<CampaignRow>, clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Mutex::new(rows),
            counters: Mutex::new(HashMap::new()),
            clock,
            unavailable: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replace all rows.
    pub fn replace_rows(&self, rows: Vec<CampaignRow>) {
        *lock(&self.rows) = rows;
    }

    /// Add a row.
    pub fn insert(&self, row: CampaignRow) {
        lock(&self.rows).push(row);
    }

    /// Make subsequent calls fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of campaign fetches served or attempted.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Current value of a counter.
    pub fn counter(&self, id: &AdId, counter: Counter) -> u64 {
        lock(&self.counters)
            .get(&(id.clone(), counter))
            .copied()
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn fetch_active_campaigns(
        &self,
        placement: Option<&str>,
    ) -> Result<Vec<CampaignRow>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let now = self.clock.now();
        Ok(lock(&self.rows)
            .iter()
            .filter(|row| row.is_active_at(now))
            .filter(|row| placement.map_or(true, |slug| row.placement_slug() == Some(slug)))
            .cloned()
            .collect())
    }

    async fn increment(&self, id: &AdId, counter: Counter) -> Result<(), StoreError> {
        self.check_available()?;
        *lock(&self.counters).entry((id.clone(), counter)).or_insert(0) += 1;
        Ok(())
    }
}
