//! The store interface the engine talks to.

use std::sync::Arc;

use adslot_core::{AdId, AuctionAd};
use async_trait::async_trait;
use tracing::warn;

use crate::{CampaignRow, StoreError};

/// Remote per-campaign counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Impressions,
    Clicks,
}

impl Counter {
    /// Name of the stored procedure that increments this counter.
    pub fn rpc_name(&self) -> &'static str {
        match self {
            Self::Impressions => "increment_ad_impressions",
            Self::Clicks => "increment_ad_clicks",
        }
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Impressions => write!(f, "impressions"),
            Self::Clicks => write!(f, "clicks"),
        }
    }
}

/// Source of active campaigns and sink for their counters.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Active campaigns, optionally restricted to one placement.
    async fn fetch_active_campaigns(
        &self,
        placement: Option<&str>,
    ) -> Result<Vec<CampaignRow>, StoreError>;

    /// Increment a campaign counter by one.
    async fn increment(&self, id: &AdId, counter: Counter) -> Result<(), StoreError>;

    /// Active campaigns as auction ads. Rows that do not convert are skipped.
    async fn fetch_ads(&self, placement: Option<&str>) -> Result<Vec<AuctionAd>, StoreError> {
        let rows = self.fetch_active_campaigns(placement).await?;
        Ok(rows_to_ads(&rows))
    }

    async fn increment_impressions(&self, id: &AdId) -> Result<(), StoreError> {
        self.increment(id, Counter::Impressions).await
    }

    async fn increment_clicks(&self, id: &AdId) -> Result<(), StoreError> {
        self.increment(id, Counter::Clicks).await
    }
}

#[async_trait]
impl<S: CampaignStore + ?Sized> CampaignStore for Arc<S> {
    async fn fetch_active_campaigns(
        &self,
        placement: Option<&str>,
    ) -> Result<Vec<CampaignRow>, StoreError> {
        (**self).fetch_active_campaigns(placement).await
    }

    async fn increment(&self, id: &AdId, counter: Counter) -> Result<(), StoreError> {
        (**self).increment(id, counter).await
    }
}

/// Convert rows, logging and skipping the ones that are malformed.
pub fn rows_to_ads(rows: &[CampaignRow]) -> Vec<AuctionAd> {
    rows.iter()
        .filter_map(|row| match row.to_ad() {
            Ok(ad) => Some(ad),
            Err(e) => {
                warn!(error = %e, "skipping campaign");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adslot_core::AdType;

    #[test]
    fn test_rpc_names() {
        assert_eq!(Counter::Impressions.rpc_name(), "increment_ad_impressions");
        assert_eq!(Counter::Clicks.rpc_name(), "increment_ad_clicks");
    }

    #[test]
    fn test_rows_to_ads_skips_bad_rows() {
        let mut bad = CampaignRow::new("bad", AdType::Local, 1.0);
        bad.ad_type = "popup".to_string();
        let rows = vec![
            CampaignRow::new("a", AdType::National, 1.0),
            bad,
            CampaignRow::new("b", AdType::Local, 2.0),
        ];

        let ads = rows_to_ads(&rows);
        let ids: Vec<&str> = ads.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
