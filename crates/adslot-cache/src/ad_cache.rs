//! Placement-keyed ad cache.

use std::sync::Arc;
use std::time::Duration;

use adslot_core::{AuctionAd, CacheConfig, Clock, SystemClock};
use tracing::{debug, warn};

use crate::envelope::CacheEnvelope;
use crate::freshness::{CacheLookup, Freshness};
use crate::storage::CacheStorage;
use crate::CacheError;

/// Build the storage key for a placement.
///
/// ```rust,ignore
/// assert_eq!(cache_key("ad_auction_cache", None), "ad_auction_cache");
/// assert_eq!(cache_key("ad_auction_cache", Some("feed")), "ad_auction_cache_feed");
/// ```
pub fn cache_key(prefix: &str, placement: Option<&str>) -> String {
    match placement.map(str::trim).filter(|p| !p.is_empty()) {
        Some(slug) => format!("{}_{}", prefix, slug),
        None => prefix.to_string(),
    }
}

/// Versioned, TTL-classified ad cache over a [`CacheStorage`].
///
/// Cheap to clone; clones share storage and clock.
pub struct AdCache<S> {
    storage: Arc<S>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl<S> Clone for AdCache<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<S: CacheStorage> AdCache<S> {
    /// Create a cache using the wall clock.
    pub fn new(storage: S, config: CacheConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit time source.
    pub fn with_clock(storage: S, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage: Arc::new(storage),
            clock,
            config,
        }
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Cache settings.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Storage key for a placement.
    pub fn key(&self, placement: Option<&str>) -> String {
        cache_key(&self.config.key_prefix, placement)
    }

    /// Read cached ads for a placement.
    ///
    /// Unreadable, outdated or expired entries are removed and reported as a
    /// miss. Storage errors are logged and also reported as a miss.
    pub fn get(&self, placement: Option<&str>) -> CacheLookup {
        let key = self.key(placement);

        let raw = match self.storage.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "ad cache miss");
                return CacheLookup::miss();
            }
            Err(e) => {
                warn!(key = %key, error = %e, "ad cache read failed");
                return CacheLookup::miss();
            }
        };

        let envelope: CacheEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(key = %key, error = %e, "discarding unreadable ad cache entry");
                self.discard(&key);
                return CacheLookup::miss();
            }
        };

        if !envelope.is_current() {
            debug!(key = %key, version = envelope.version, "discarding outdated ad cache entry");
            self.discard(&key);
            return CacheLookup::miss();
        }

        if envelope.placement_slug.as_deref() != placement.map(str::trim).filter(|p| !p.is_empty())
        {
            debug!(key = %key, "ad cache entry belongs to another placement");
            self.discard(&key);
            return CacheLookup::miss();
        }

        let age = self.age_of(envelope.timestamp);
        match Freshness::classify(age, &self.config) {
            Freshness::Fresh => {
                debug!(key = %key, age_secs = age.as_secs(), ads = envelope.ads.len(), "ad cache hit");
                CacheLookup::hit(envelope.ads, age)
            }
            Freshness::Stale => {
                debug!(key = %key, age_secs = age.as_secs(), ads = envelope.ads.len(), "ad cache stale");
                CacheLookup::stale(envelope.ads, age)
            }
            Freshness::Expired => {
                debug!(key = %key, age_secs = age.as_secs(), "ad cache entry expired");
                self.discard(&key);
                CacheLookup::miss()
            }
        }
    }

    /// Write ads for a placement, stamped with the current time.
    pub fn set(&self, ads: &[AuctionAd], placement: Option<&str>) -> Result<(), CacheError> {
        let key = self.key(placement);
        let envelope = CacheEnvelope::new(
            ads.to_vec(),
            self.clock.now_millis(),
            placement
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
        );
        let json = serde_json::to_string(&envelope)?;
        self.storage.set_item(&key, &json)?;
        debug!(key = %key, ads = ads.len(), "ad cache written");
        Ok(())
    }

    /// Remove the entry for a placement.
    pub fn clear(&self, placement: Option<&str>) -> Result<(), CacheError> {
        self.storage.remove_item(&self.key(placement))
    }

    /// Remove every entry under this cache's prefix, returning how many.
    pub fn clear_all(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for key in self.storage.keys()? {
            if self.owns_key(&key) {
                self.storage.remove_item(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// True for keys this cache writes: the bare prefix or `<prefix>_<slug>`.
    pub fn owns_key(&self, key: &str) -> bool {
        let prefix = self.config.key_prefix.as_str();
        key == prefix
            || key
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('_'))
    }

    /// Raw envelope for a placement, without freshness checks.
    pub fn peek(&self, placement: Option<&str>) -> Result<Option<CacheEnvelope>, CacheError> {
        match self.storage.get_item(&self.key(placement))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn age_of(&self, timestamp: i64) -> Duration {
        let elapsed = self.clock.now_millis().saturating_sub(timestamp);
        Duration::from_millis(u64::try_from(elapsed).unwrap_or(0))
    }

    fn discard(&self, key: &str) {
        if let Err(e) = self.storage.remove_item(key) {
            warn!(key = %key, error = %e, "failed to remove ad cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheStatus, MemoryStorage, CACHE_VERSION};
    use adslot_core::ManualClock;

    const T0: i64 = 1_700_000_000_000;

    fn minutes(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    fn cache() -> (AdCache<MemoryStorage>, ManualClock) {
        let clock = ManualClock::new(T0);
        let cache = AdCache::with_clock(
            MemoryStorage::new(),
            CacheConfig::default(),
            Arc::new(clock.clone()),
        );
        (cache, clock)
    }

    fn ads() -> Vec<AuctionAd> {
        vec![
            AuctionAd::national("n1", 2.0),
            AuctionAd::local("l1", 3.0).with_voivodeship("podlaskie"),
        ]
    }

    fn ids(ads: &[AuctionAd]) -> Vec<&str> {
        ads.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("ad_auction_cache", None), "ad_auction_cache");
        assert_eq!(cache_key("ad_auction_cache", Some("feed")), "ad_auction_cache_feed");
        assert_eq!(cache_key("ad_auction_cache", Some("  ")), "ad_auction_cache");
    }

    #[test]
    fn test_round_trip_while_fresh() {
        let (cache, _clock) = cache();
        cache.set(&ads(), None).unwrap();

        let lookup = cache.get(None);
        assert_eq!(lookup.status, CacheStatus::Hit);
        assert_eq!(ids(&lookup.ads), vec!["n1", "l1"]);
        assert_eq!(lookup.ads, ads());
    }

    #[test]
    fn test_fresh_stale_expired_timeline() {
        let (cache, clock) = cache();
        cache.set(&ads(), Some("feed")).unwrap();

        clock.set(T0 + minutes(14).as_millis() as i64);
        assert_eq!(cache.get(Some("feed")).status, CacheStatus::Hit);

        clock.set(T0 + minutes(30).as_millis() as i64);
        let stale = cache.get(Some("feed"));
        assert_eq!(stale.status, CacheStatus::Stale);
        assert!(stale.needs_revalidation());
        assert_eq!(ids(&stale.ads), vec!["n1", "l1"]);

        clock.set(T0 + minutes(61).as_millis() as i64);
        assert_eq!(cache.get(Some("feed")).status, CacheStatus::Miss);
        // Expired entries are dropped from storage.
        assert!(cache.storage().is_empty());
    }

    #[test]
    fn test_placements_are_isolated() {
        let (cache, _clock) = cache();
        cache.set(&ads(), Some("sidebar")).unwrap();

        assert_eq!(cache.get(Some("sidebar")).status, CacheStatus::Hit);
        assert_eq!(cache.get(Some("feed")).status, CacheStatus::Miss);
        assert_eq!(cache.get(None).status, CacheStatus::Miss);
    }

    #[test]
    fn test_version_mismatch_is_miss_and_cleared() {
        let (cache, _clock) = cache();
        let stale_schema = format!(
            r#"{{"version":{},"timestamp":{},"ads":[]}}"#,
            CACHE_VERSION + 1,
            T0
        );
        cache.storage().set_item("ad_auction_cache", &stale_schema).unwrap();

        assert_eq!(cache.get(None).status, CacheStatus::Miss);
        assert!(cache.storage().get_item("ad_auction_cache").unwrap().is_none());
    }

    #[test]
    fn test_garbage_is_miss_and_cleared() {
        let (cache, _clock) = cache();
        cache.storage().set_item("ad_auction_cache_feed", "{not json").unwrap();

        assert_eq!(cache.get(Some("feed")).status, CacheStatus::Miss);
        assert!(cache.storage().is_empty());
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let (cache, clock) = cache();
        cache.set(&ads(), None).unwrap();
        clock.set(T0 - 5_000);

        let lookup = cache.get(None);
        assert_eq!(lookup.status, CacheStatus::Hit);
        assert_eq!(lookup.age, Some(Duration::ZERO));
    }

    #[test]
    fn test_clear_and_clear_all() {
        let (cache, _clock) = cache();
        cache.set(&ads(), None).unwrap();
        cache.set(&ads(), Some("feed")).unwrap();
        cache.set(&ads(), Some("sidebar")).unwrap();
        cache.storage().set_item("theme", "dark").unwrap();

        cache.clear(Some("feed")).unwrap();
        assert_eq!(cache.get(Some("feed")).status, CacheStatus::Miss);

        cache.storage().set_item("ad_auction_cachefoo", "x").unwrap();
        assert!(cache.owns_key("ad_auction_cache"));
        assert!(cache.owns_key("ad_auction_cache_sidebar"));
        assert!(!cache.owns_key("ad_auction_cachefoo"));

        assert_eq!(cache.clear_all().unwrap(), 2);
        assert_eq!(
            cache.storage().keys().unwrap(),
            vec!["ad_auction_cachefoo".to_string(), "theme".to_string()]
        );
    }

    #[test]
    fn test_peek_ignores_freshness() {
        let (cache, clock) = cache();
        cache.set(&ads(), None).unwrap();
        clock.advance(minutes(120));

        let envelope = cache.peek(None).unwrap().unwrap();
        assert_eq!(envelope.timestamp, T0);
        assert_eq!(envelope.ads.len(), 2);
    }

    #[test]
    fn test_file_backed_placements_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AdCache::new(
            crate::FileStorage::open(dir.path()).unwrap(),
            CacheConfig::default(),
        );
        cache.set(&ads()[..1], Some("top.banner")).unwrap();
        cache.set(&ads(), Some("top_banner")).unwrap();

        let dotted = cache.get(Some("top.banner"));
        let underscored = cache.get(Some("top_banner"));
        assert_eq!(dotted.status, CacheStatus::Hit);
        assert_eq!(underscored.status, CacheStatus::Hit);
        assert_eq!(ids(&dotted.ads), vec!["n1"]);
        assert_eq!(ids(&underscored.ads), vec!["n1", "l1"]);

        assert_eq!(cache.clear_all().unwrap(), 2);
    }
}
