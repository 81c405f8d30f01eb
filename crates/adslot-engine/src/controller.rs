//! The auction controller.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use adslot_auction::{AuctionResult, Auctioneer, SessionState};
use adslot_cache::{AdCache, CacheStatus, CacheStorage};
use adslot_core::{AdId, AuctionAd, EngineConfig, UserLocation};
use adslot_store::{CampaignStore, Counter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Mutable state shared with background tasks.
struct AuctionState {
    ads: Vec<AuctionAd>,
    slot_counter: u64,
    session: SessionState,
    status: Option<CacheStatus>,
    rng: StdRng,
}

/// What `load()` / `refresh()` did.
#[derive(Debug)]
pub struct LoadOutcome {
    /// Where the ads came from: `Hit`/`Stale` from cache, `Miss` from the store.
    pub status: CacheStatus,
    /// Ads now available for drawing.
    pub ad_count: usize,
    /// True when the store fetch failed and the ad list was emptied.
    pub fetch_failed: bool,
    /// Background refetch started for a stale entry. Dropping it detaches.
    pub revalidation: Option<JoinHandle<()>>,
}

/// Cache-first ad auction for one placement.
///
/// All methods that spawn work (`load` on a stale entry, `track_*`) must be
/// called from within a Tokio runtime.
pub struct AdAuction<S, C> {
    store: Arc<S>,
    cache: AdCache<C>,
    auctioneer: Auctioneer,
    placement: Option<String>,
    revalidate_on_stale: bool,
    state: Arc<Mutex<AuctionState>>,
}

impl<S, C> AdAuction<S, C>
where
    S: CampaignStore + 'static,
    C: CacheStorage + 'static,
{
    /// Create a controller over a store and cache.
    pub fn new(store: S, cache: AdCache<C>, config: &EngineConfig) -> Self {
        Self::with_shared_store(Arc::new(store), cache, config)
    }

    /// Create a controller over a store shared with other owners.
    pub fn with_shared_store(store: Arc<S>, cache: AdCache<C>, config: &EngineConfig) -> Self {
        Self {
            store,
            cache,
            auctioneer: Auctioneer::from_config(config),
            placement: None,
            revalidate_on_stale: config.cache.revalidate_on_stale,
            state: Arc::new(Mutex::new(AuctionState {
                ads: Vec::new(),
                slot_counter: 0,
                session: SessionState::new(),
                status: None,
                rng: StdRng::from_entropy(),
            })),
        }
    }

    /// Restrict to one placement.
    pub fn with_placement(mut self, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        let slug = slug.trim();
        self.placement = (!slug.is_empty()).then(|| slug.to_string());
        self
    }

    /// Seed the draw, for reproducible runs.
    pub fn with_seed(self, seed: u64) -> Self {
        self.lock().rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Placement this controller serves.
    pub fn placement(&self) -> Option<&str> {
        self.placement.as_deref()
    }

    /// Load ads, cache first.
    ///
    /// A fresh entry is served as is. A stale entry is served and, unless
    /// disabled, refetched in the background; the refetch replaces the ad list
    /// and the cache when it succeeds. On a miss the store is queried and the
    /// result cached; if that fails the ad list is emptied.
    pub async fn load(&self) -> LoadOutcome {
        let lookup = self.cache.get(self.placement());

        match lookup.status {
            CacheStatus::Hit | CacheStatus::Stale => {
                let status = lookup.status;
                let ad_count = lookup.ads.len();
                self.install(lookup.ads, status);

                let revalidation = (status == CacheStatus::Stale && self.revalidate_on_stale)
                    .then(|| self.spawn_revalidation());

                info!(
                    placement = ?self.placement,
                    %status,
                    ads = ad_count,
                    revalidating = revalidation.is_some(),
                    "ads loaded from cache"
                );
                LoadOutcome {
                    status,
                    ad_count,
                    fetch_failed: false,
                    revalidation,
                }
            }
            CacheStatus::Miss => self.refresh().await,
        }
    }

    /// Fetch from the store, bypassing the cache, and cache the result.
    pub async fn refresh(&self) -> LoadOutcome {
        let fetched = fetch_and_cache(&*self.store, &self.cache, self.placement()).await;
        let fetch_failed = fetched.is_none();
        let ads = fetched.unwrap_or_default();
        let ad_count = ads.len();
        self.install(ads, CacheStatus::Miss);

        info!(placement = ?self.placement, ads = ad_count, fetch_failed, "ads loaded from store");
        LoadOutcome {
            status: CacheStatus::Miss,
            ad_count,
            fetch_failed,
            revalidation: None,
        }
    }

    fn spawn_revalidation(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let cache = self.cache.clone();
        let state = Arc::clone(&self.state);
        let placement = self.placement.clone();

        tokio::spawn(async move {
            // A failed refetch keeps serving the stale list.
            if let Some(ads) = fetch_and_cache(&*store, &cache, placement.as_deref()).await {
                debug!(placement = ?placement, ads = ads.len(), "stale ads revalidated");
                let mut state = lock_state(&state);
                state.ads = ads;
                state.status = Some(CacheStatus::Hit);
            }
        })
    }

    fn install(&self, ads: Vec<AuctionAd>, status: CacheStatus) {
        let mut state = self.lock();
        state.ads = ads;
        state.status = Some(status);
    }

    /// Draw the ad for the next slot.
    ///
    /// Every call consumes a slot, even when nothing is eligible. The winner's
    /// session impression count is incremented.
    pub fn get_next_ad(&self, location: &UserLocation) -> Option<AuctionResult> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.slot_counter += 1;

        let result = self.auctioneer.run(
            &state.ads,
            location,
            state.slot_counter,
            &state.session,
            &mut state.rng,
        )?;
        state.session.record_impression(&result.ad.id);
        Some(result)
    }

    /// Draw ads for up to `count` consecutive slots with no repeats.
    ///
    /// Stops early when no unused candidate is left; the slot that found
    /// nothing is not consumed.
    pub fn get_ads_for_feed(&self, count: usize, location: &UserLocation) -> Vec<AuctionResult> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut picked: HashSet<AdId> = HashSet::new();
        // A batch without repeats never exceeds the ad list.
        let mut results = Vec::with_capacity(count.min(state.ads.len()));

        for _ in 0..count {
            let slot = state.slot_counter + 1;
            let Some(result) = self.auctioneer.run_excluding(
                &state.ads,
                location,
                slot,
                &state.session,
                &picked,
                &mut state.rng,
            ) else {
                break;
            };

            state.slot_counter = slot;
            state.session.record_impression(&result.ad.id);
            picked.insert(result.ad.id.clone());
            results.push(result);
        }

        debug!(requested = count, drawn = results.len(), "feed ads drawn");
        results
    }

    /// Report an impression to the store in the background.
    pub fn track_impression(&self, id: &AdId) -> JoinHandle<()> {
        self.spawn_counter(id, Counter::Impressions)
    }

    /// Report a click to the store in the background.
    pub fn track_click(&self, id: &AdId) -> JoinHandle<()> {
        self.spawn_counter(id, Counter::Clicks)
    }

    fn spawn_counter(&self, id: &AdId, counter: Counter) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let id = id.clone();
        tokio::spawn(async move {
            if let Err(e) = store.increment(&id, counter).await {
                warn!(ad_id = %id, %counter, error = %e, "tracking failed");
            }
        })
    }

    /// Forget session impressions and restart slot numbering.
    pub fn reset_session(&self) {
        let mut state = self.lock();
        state.session.reset();
        state.slot_counter = 0;
    }

    /// Ads currently available for drawing.
    pub fn ads(&self) -> Vec<AuctionAd> {
        self.lock().ads.clone()
    }

    /// Slots consumed so far.
    pub fn slot_counter(&self) -> u64 {
        self.lock().slot_counter
    }

    /// Session impressions of one ad.
    pub fn impression_count(&self, id: &AdId) -> u32 {
        self.lock().session.impression_count(id)
    }

    /// Snapshot of the session state.
    pub fn session(&self) -> SessionState {
        self.lock().session.clone()
    }

    /// Source of the current ad list, `None` before the first load.
    pub fn status(&self) -> Option<CacheStatus> {
        self.lock().status
    }

    fn lock(&self) -> MutexGuard<'_, AuctionState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<AuctionState>) -> MutexGuard<'_, AuctionState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Fetch ads and write them to the cache. `None` means the fetch failed.
async fn fetch_and_cache<S, C>(
    store: &S,
    cache: &AdCache<C>,
    placement: Option<&str>,
) -> Option<Vec<AuctionAd>>
where
    S: CampaignStore + ?Sized,
    C: CacheStorage,
{
    match store.fetch_ads(placement).await {
        Ok(ads) => {
            if let Err(e) = cache.set(&ads, placement) {
                warn!(placement = ?placement, error = %e, "failed to cache ads");
            }
            Some(ads)
        }
        Err(e) => {
            warn!(placement = ?placement, error = %e, "failed to fetch ads");
            None
        }
    }
}
