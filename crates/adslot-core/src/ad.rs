//! Sponsored creatives and the user location they target.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::AdId;

/// Reach of an ad campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    /// Shown country-wide; eligible for forced national slots.
    #[default]
    National,
    /// Regional campaign, usually geo-targeted.
    Local,
}

impl AdType {
    /// Parse the store's string form, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "national" => Some(Self::National),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::National => "national",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sponsored creative competing in the slot auction.
///
/// Built once per fetch from a campaign row and not mutated afterwards.
/// Session impression counts live in the auction's `SessionState`, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionAd {
    /// Campaign id.
    pub id: AdId,
    /// National or local reach.
    #[serde(rename = "type")]
    pub ad_type: AdType,
    /// Advertiser bid (eCPM).
    pub bid_price: f64,
    /// Manual boost applied by sales.
    #[serde(default = "default_multiplier")]
    pub priority_multiplier: f64,
    /// Historical click-through quality score.
    #[serde(default = "default_multiplier")]
    pub ctr_score: f64,
    /// Targeted voivodeship (region).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_voivodeship: Option<String>,
    /// Targeted powiat (county).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_powiat: Option<String>,
    /// Targeted gmina (municipality).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_gmina: Option<String>,
    /// Targeted cities; the user's city must be one of them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_cities: Vec<String>,
    /// Creative image or media URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    /// Creative text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_text: Option<String>,
    /// Click-through destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    /// Placement the campaign is booked on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_slug: Option<String>,
}

fn default_multiplier() -> f64 {
    1.0
}

impl AuctionAd {
    /// Create an untargeted ad with neutral priority and CTR.
    pub fn new(id: impl Into<AdId>, ad_type: AdType, bid_price: f64) -> Self {
        Self {
            id: id.into(),
            ad_type,
            bid_price,
            priority_multiplier: 1.0,
            ctr_score: 1.0,
            target_voivodeship: None,
            target_powiat: None,
            target_gmina: None,
            target_cities: Vec::new(),
            content_url: None,
            content_text: None,
            target_url: None,
            placement_slug: None,
        }
    }

    /// Create a national ad.
    pub fn national(id: impl Into<AdId>, bid_price: f64) -> Self {
        Self::new(id, AdType::National, bid_price)
    }

    /// Create a local ad.
    pub fn local(id: impl Into<AdId>, bid_price: f64) -> Self {
        Self::new(id, AdType::Local, bid_price)
    }

    pub fn with_priority(mut self, multiplier: f64) -> Self {
        self.priority_multiplier = multiplier;
        self
    }

    pub fn with_ctr(mut self, ctr: f64) -> Self {
        self.ctr_score = ctr;
        self
    }

    pub fn with_voivodeship(mut self, v: impl Into<String>) -> Self {
        self.target_voivodeship = Some(v.into());
        self
    }

    pub fn with_powiat(mut self, p: impl Into<String>) -> Self {
        self.target_powiat = Some(p.into());
        self
    }

    pub fn with_gmina(mut self, g: impl Into<String>) -> Self {
        self.target_gmina = Some(g.into());
        self
    }

    pub fn with_cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_cities = cities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_placement(mut self, slug: impl Into<String>) -> Self {
        self.placement_slug = Some(slug.into());
        self
    }

    pub fn with_content(mut self, url: Option<String>, text: Option<String>) -> Self {
        self.content_url = url;
        self.content_text = text;
        self
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    /// Check if the ad is a national campaign.
    pub fn is_national(&self) -> bool {
        self.ad_type == AdType::National
    }

    /// Check if any targeting dimension is set.
    pub fn has_targeting(&self) -> bool {
        self.target_voivodeship.is_some()
            || self.target_powiat.is_some()
            || self.target_gmina.is_some()
            || !self.target_cities.is_empty()
    }
}

/// Where the current reader is, at the granularity ads can target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voivodeship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powiat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gmina: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl UserLocation {
    /// A location with nothing known.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn with_voivodeship(mut self, v: impl Into<String>) -> Self {
        self.voivodeship = Some(v.into());
        self
    }

    pub fn with_powiat(mut self, p: impl Into<String>) -> Self {
        self.powiat = Some(p.into());
        self
    }

    pub fn with_gmina(mut self, g: impl Into<String>) -> Self {
        self.gmina = Some(g.into());
        self
    }

    pub fn with_city(mut self, c: impl Into<String>) -> Self {
        self.city = Some(c.into());
        self
    }

    /// True when no level is known. Blank strings count as unknown.
    pub fn is_empty(&self) -> bool {
        [&self.voivodeship, &self.powiat, &self.gmina, &self.city]
            .iter()
            .all(|level| level.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ad_type_parse() {
        assert_eq!(AdType::parse("National"), Some(AdType::National));
        assert_eq!(AdType::parse(" local "), Some(AdType::Local));
        assert_eq!(AdType::parse("regional"), None);
    }

    #[test]
    fn test_has_targeting() {
        assert!(!AuctionAd::local("a", 1.0).has_targeting());
        assert!(AuctionAd::local("a", 1.0).with_gmina("Kraków").has_targeting());
        assert!(AuctionAd::local("a", 1.0)
            .with_cities(["Gdańsk"])
            .has_targeting());
    }

    #[test]
    fn test_ad_json_uses_camel_case() {
        let ad = AuctionAd::local("camp-1", 2.5)
            .with_voivodeship("mazowieckie")
            .with_placement("feed");
        let json = serde_json::to_value(&ad).unwrap();

        assert_eq!(json["type"], "local");
        assert_eq!(json["bidPrice"], 2.5);
        assert_eq!(json["targetVoivodeship"], "mazowieckie");
        assert_eq!(json["placementSlug"], "feed");
        assert!(json.get("targetPowiat").is_none());
    }

    #[test]
    fn test_ad_json_carries_creative() {
        let ad = AuctionAd::national("camp-2", 1.0)
            .with_content(
                Some("https://cdn.example.com/a.png".to_string()),
                Some("Nowa oferta".to_string()),
            )
            .with_target_url("https://example.com/landing");
        let json = serde_json::to_value(&ad).unwrap();

        assert_eq!(json["contentUrl"], "https://cdn.example.com/a.png");
        assert_eq!(json["contentText"], "Nowa oferta");
        assert_eq!(json["targetUrl"], "https://example.com/landing");
    }

    #[test]
    fn test_ad_json_defaults_multipliers() {
        let ad: AuctionAd =
            serde_json::from_str(r#"{"id":"x","type":"national","bidPrice":3.0}"#).unwrap();
        assert_eq!(ad.priority_multiplier, 1.0);
        assert_eq!(ad.ctr_score, 1.0);
        assert!(ad.target_cities.is_empty());
    }

    #[test]
    fn test_location_is_empty() {
        assert!(UserLocation::unknown().is_empty());
        assert!(UserLocation::unknown().with_city("  ").is_empty());
        assert!(!UserLocation::unknown().with_powiat("krakowski").is_empty());
    }
}
