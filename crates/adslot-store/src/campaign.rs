//! Campaign rows and their conversion into auction ads.

use adslot_core::{AdType, AuctionAd};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Campaign status that makes a row eligible.
pub const ACTIVE_STATUS: &str = "active";

/// Placement joined onto a campaign row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRef {
    pub slug: String,
}

/// A campaign as stored in the hosted database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRow {
    pub id: String,
    #[serde(alias = "type")]
    pub ad_type: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub bid_price: f64,
    #[serde(default)]
    pub priority_multiplier: Option<f64>,
    #[serde(default)]
    pub ctr_score: Option<f64>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub target_voivodeship: Option<String>,
    #[serde(default)]
    pub target_powiat: Option<String>,
    #[serde(default)]
    pub target_gmina: Option<String>,
    #[serde(default)]
    pub target_cities: Option<Vec<String>>,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub content_text: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub placement: Option<PlacementRef>,
}

fn default_status() -> String {
    ACTIVE_STATUS.to_string()
}

impl CampaignRow {
    /// Create an active, unbounded, untargeted row.
    pub fn new(id: impl Into<String>, ad_type: AdType, bid_price: f64) -> Self {
        Self {
            id: id.into(),
            ad_type: ad_type.as_str().to_string(),
            status: default_status(),
            bid_price,
            priority_multiplier: None,
            ctr_score: None,
            start_date: None,
            end_date: None,
            target_voivodeship: None,
            target_powiat: None,
            target_gmina: None,
            target_cities: None,
            content_url: None,
            content_text: None,
            target_url: None,
            placement: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_placement(mut self, slug: impl Into<String>) -> Self {
        self.placement = Some(PlacementRef { slug: slug.into() });
        self
    }

    pub fn with_voivodeship(mut self, v: impl Into<String>) -> Self {
        self.target_voivodeship = Some(v.into());
        self
    }

    /// Placement slug, if the row is booked on one.
    pub fn placement_slug(&self) -> Option<&str> {
        self.placement.as_ref().map(|p| p.slug.as_str())
    }

    /// Check if the campaign should run at `now`. Missing bounds are open.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status.eq_ignore_ascii_case(ACTIVE_STATUS)
            && self.start_date.map_or(true, |start| start <= now)
            && self.end_date.map_or(true, |end| now <= end)
    }

    /// Convert into an auction ad.
    pub fn to_ad(&self) -> Result<AuctionAd, StoreError> {
        let ad_type = AdType::parse(&self.ad_type).ok_or_else(|| StoreError::InvalidCampaign {
            id: self.id.clone(),
            reason: format!("unknown ad type {:?}", self.ad_type),
        })?;
        if !self.bid_price.is_finite() {
            return Err(StoreError::InvalidCampaign {
                id: self.id.clone(),
                reason: "bid price is not a number".to_string(),
            });
        }

        Ok(AuctionAd {
            id: self.id.as_str().into(),
            ad_type,
            bid_price: self.bid_price,
            priority_multiplier: self.priority_multiplier.unwrap_or(1.0),
            ctr_score: self.ctr_score.unwrap_or(1.0),
            target_voivodeship: non_blank(&self.target_voivodeship),
            target_powiat: non_blank(&self.target_powiat),
            target_gmina: non_blank(&self.target_gmina),
            target_cities: self
                .target_cities
                .iter()
                .flatten()
                .filter(|c| !c.trim().is_empty())
                .cloned()
                .collect(),
            content_url: self.content_url.clone(),
            content_text: self.content_text.clone(),
            target_url: self.target_url.clone(),
            placement_slug: self.placement_slug().map(String::from),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_active_window() {
        let row = CampaignRow::new("c", AdType::Local, 1.0).with_window(Some(at(10)), Some(at(20)));

        assert!(!row.is_active_at(at(9)));
        assert!(row.is_active_at(at(10)));
        assert!(row.is_active_at(at(15)));
        assert!(row.is_active_at(at(20)));
        assert!(!row.is_active_at(at(21)));
    }

    #[test]
    fn test_open_window_and_status() {
        let row = CampaignRow::new("c", AdType::National, 1.0);
        assert!(row.is_active_at(at(1)));
        assert!(!row.with_status("paused").is_active_at(at(1)));
    }

    #[test]
    fn test_to_ad_defaults_and_blank_targets() {
        let mut row = CampaignRow::new("c1", AdType::Local, 2.5).with_placement("feed");
        row.target_powiat = Some("  ".to_string());
        row.target_cities = Some(vec!["Łódź".to_string(), "".to_string()]);

        let ad = row.to_ad().unwrap();
        assert_eq!(ad.id.as_str(), "c1");
        assert_eq!(ad.ad_type, AdType::Local);
        assert_eq!(ad.priority_multiplier, 1.0);
        assert_eq!(ad.ctr_score, 1.0);
        assert!(ad.target_powiat.is_none());
        assert_eq!(ad.target_cities, vec!["Łódź".to_string()]);
        assert_eq!(ad.placement_slug.as_deref(), Some("feed"));
    }

    #[test]
    fn test_to_ad_rejects_unknown_type() {
        let mut row = CampaignRow::new("c1", AdType::Local, 1.0);
        row.ad_type = "banner".to_string();
        assert!(matches!(row.to_ad(), Err(StoreError::InvalidCampaign { .. })));
    }

    #[test]
    fn test_deserialize_store_json() {
        let row: CampaignRow = serde_json::from_str(
            r#"{
                "id": "8d7f",
                "type": "local",
                "status": "active",
                "bid_price": 4.2,
                "ctr_score": 1.1,
                "start_date": "2024-05-01T00:00:00+00:00",
                "end_date": null,
                "target_voivodeship": "małopolskie",
                "target_cities": ["Kraków"],
                "placement": { "slug": "sidebar" }
            }"#,
        )
        .unwrap();

        assert_eq!(row.ad_type, "local");
        assert_eq!(row.placement_slug(), Some("sidebar"));
        assert!(row.is_active_at(at(2)));
        assert_eq!(row.to_ad().unwrap().ctr_score, 1.1);
    }
}
