//! Per-ad score computation.

use std::fmt;

use adslot_core::{AdType, AuctionAd, ScoringConfig, UserLocation};
use serde::Serialize;

/// How an ad's geographic targeting related to the user's location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingOutcome {
    /// National ad, or local ad with no targeting; no adjustment.
    Untargeted,
    /// Every targeted level equals the user's.
    Matched,
    /// The ad is targeted but the user's location is unknown.
    NoLocation,
    /// At least one targeted level differs from (or is missing in) the user's.
    Mismatched,
}

impl fmt::Display for TargetingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Untargeted => write!(f, "untargeted"),
            Self::Matched => write!(f, "matched"),
            Self::NoLocation => write!(f, "no-location"),
            Self::Mismatched => write!(f, "mismatched"),
        }
    }
}

/// Debug breakdown of one ad's score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// `bid_price x priority_multiplier x ctr_score`.
    pub base_score: f64,
    /// Signed targeting adjustment added to the base score.
    pub targeting_bonus: f64,
    /// Amount removed by frequency capping.
    pub frequency_penalty: f64,
    /// Score used by the draw, never negative.
    pub final_score: f64,
    /// Targeting tier the ad fell into.
    pub targeting: TargetingOutcome,
    /// Session impressions considered.
    pub impressions: u32,
}

/// Classify an ad's targeting against a user location.
pub fn targeting_outcome(ad: &AuctionAd, location: &UserLocation) -> TargetingOutcome {
    if ad.ad_type != AdType::Local || !ad.has_targeting() {
        return TargetingOutcome::Untargeted;
    }
    if location.is_empty() {
        return TargetingOutcome::NoLocation;
    }

    let levels = [
        (&ad.target_voivodeship, &location.voivodeship),
        (&ad.target_powiat, &location.powiat),
        (&ad.target_gmina, &location.gmina),
    ];
    for (target, user) in levels {
        if let Some(target) = target {
            if !user.as_deref().is_some_and(|u| same_place(target, u)) {
                return TargetingOutcome::Mismatched;
            }
        }
    }

    if !ad.target_cities.is_empty() {
        let in_list = location
            .city
            .as_deref()
            .is_some_and(|city| ad.target_cities.iter().any(|t| same_place(t, city)));
        if !in_list {
            return TargetingOutcome::Mismatched;
        }
    }

    TargetingOutcome::Matched
}

fn same_place(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// Score one ad for one user.
///
/// `impressions` is the number of times the ad has already been shown in this
/// session.
pub fn score_ad(
    ad: &AuctionAd,
    location: &UserLocation,
    impressions: u32,
    config: &ScoringConfig,
) -> ScoreBreakdown {
    let base_score = finite_or_zero(ad.bid_price * ad.priority_multiplier * ad.ctr_score);

    let targeting = targeting_outcome(ad, location);
    let targeting_bonus = match targeting {
        TargetingOutcome::Untargeted => 0.0,
        TargetingOutcome::Matched => base_score * config.match_bonus,
        TargetingOutcome::NoLocation => base_score * (config.no_location_factor - 1.0),
        TargetingOutcome::Mismatched => base_score * (config.mismatch_factor - 1.0),
    };
    let targeted = base_score + targeting_bonus;

    let excess = impressions.saturating_sub(config.free_impressions);
    let factor = (1.0 - config.impression_penalty * f64::from(excess)).max(0.0);
    let frequency_penalty = targeted * (1.0 - factor);
    let final_score = (targeted - frequency_penalty).max(0.0);

    ScoreBreakdown {
        base_score,
        targeting_bonus,
        frequency_penalty,
        final_score,
        targeting,
        impressions,
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn mazowsze() -> UserLocation {
        UserLocation::unknown()
            .with_voivodeship("mazowieckie")
            .with_powiat("warszawski")
            .with_gmina("Warszawa")
            .with_city("Warszawa")
    }

    #[test]
    fn test_base_score_is_product() {
        let ad = AuctionAd::national("a", 2.0).with_priority(1.5).with_ctr(0.8);
        let score = score_ad(&ad, &UserLocation::unknown(), 0, &config());

        assert!((score.base_score - 2.4).abs() < EPS);
        assert!((score.final_score - 2.4).abs() < EPS);
        assert_eq!(score.targeting, TargetingOutcome::Untargeted);
    }

    #[test]
    fn test_bid_only_ad_scores_bid() {
        let ad = AuctionAd::national("a", 3.0);
        let score = score_ad(&ad, &mazowsze(), 0, &config());
        assert!((score.final_score - 3.0).abs() < EPS);
    }

    #[test]
    fn test_voivodeship_match_gets_bonus() {
        let ad = AuctionAd::local("a", 2.0).with_voivodeship("mazowieckie");
        let score = score_ad(&ad, &mazowsze(), 0, &config());

        assert_eq!(score.targeting, TargetingOutcome::Matched);
        assert!((score.final_score - 3.0).abs() < EPS);
        assert!((score.targeting_bonus - 1.0).abs() < EPS);
    }

    #[test]
    fn test_voivodeship_mismatch_is_penalized() {
        let ad = AuctionAd::local("a", 2.0).with_voivodeship("pomorskie");
        let score = score_ad(&ad, &mazowsze(), 0, &config());

        assert_eq!(score.targeting, TargetingOutcome::Mismatched);
        assert!((score.final_score - 0.6).abs() < EPS);
    }

    #[test]
    fn test_match_vs_mismatch_ratio() {
        let ad = AuctionAd::local("a", 5.0).with_voivodeship("mazowieckie");
        let matched = score_ad(&ad, &mazowsze(), 0, &config()).final_score;
        let other = UserLocation::unknown().with_voivodeship("śląskie");
        let mismatched = score_ad(&ad, &other, 0, &config()).final_score;

        assert!((matched - 7.5).abs() < EPS);
        assert!((mismatched - 1.5).abs() < EPS);
    }

    #[test]
    fn test_unknown_location_reduces_targeted_ad() {
        let ad = AuctionAd::local("a", 10.0).with_gmina("Warszawa");
        let score = score_ad(&ad, &UserLocation::unknown(), 0, &config());

        assert_eq!(score.targeting, TargetingOutcome::NoLocation);
        assert!((score.final_score - 7.0).abs() < EPS);
    }

    #[test]
    fn test_untargeted_local_ad_matches_everyone() {
        let ad = AuctionAd::local("a", 4.0);
        for location in [UserLocation::unknown(), mazowsze()] {
            let score = score_ad(&ad, &location, 0, &config());
            assert_eq!(score.targeting, TargetingOutcome::Untargeted);
            assert!((score.final_score - 4.0).abs() < EPS);
        }
    }

    #[test]
    fn test_national_ad_ignores_targeting_fields() {
        let ad = AuctionAd::national("a", 4.0).with_voivodeship("pomorskie");
        let score = score_ad(&ad, &mazowsze(), 0, &config());
        assert_eq!(score.targeting, TargetingOutcome::Untargeted);
    }

    #[test]
    fn test_full_chain_must_match() {
        let ad = AuctionAd::local("a", 1.0)
            .with_voivodeship("mazowieckie")
            .with_powiat("warszawski")
            .with_gmina("Legionowo");
        assert_eq!(targeting_outcome(&ad, &mazowsze()), TargetingOutcome::Mismatched);

        let ad = ad.with_gmina("warszawa");
        assert_eq!(targeting_outcome(&ad, &mazowsze()), TargetingOutcome::Matched);
    }

    #[test]
    fn test_missing_user_level_is_mismatch() {
        let ad = AuctionAd::local("a", 1.0).with_powiat("krakowski");
        let location = UserLocation::unknown().with_voivodeship("małopolskie");
        assert_eq!(targeting_outcome(&ad, &location), TargetingOutcome::Mismatched);
    }

    #[test]
    fn test_city_list() {
        let ad = AuctionAd::local("a", 1.0).with_cities(["Gdańsk", "Sopot", "Gdynia"]);

        let sopot = UserLocation::unknown().with_city(" sopot ");
        assert_eq!(targeting_outcome(&ad, &sopot), TargetingOutcome::Matched);

        let elsewhere = UserLocation::unknown().with_city("Poznań");
        assert_eq!(targeting_outcome(&ad, &elsewhere), TargetingOutcome::Mismatched);
    }

    #[test]
    fn test_frequency_penalty_starts_after_second_impression() {
        let ad = AuctionAd::national("a", 10.0);
        let cfg = config();

        let first = score_ad(&ad, &UserLocation::unknown(), 1, &cfg).final_score;
        let second = score_ad(&ad, &UserLocation::unknown(), 2, &cfg).final_score;
        let third = score_ad(&ad, &UserLocation::unknown(), 3, &cfg).final_score;
        let fourth = score_ad(&ad, &UserLocation::unknown(), 4, &cfg).final_score;

        assert!((first - 10.0).abs() < EPS);
        assert!((second - 10.0).abs() < EPS);
        assert!((third - 6.0).abs() < EPS);
        assert!((fourth - 2.0).abs() < EPS);
    }

    #[test]
    fn test_frequency_penalty_floors_at_zero() {
        let ad = AuctionAd::national("a", 10.0);
        let score = score_ad(&ad, &UserLocation::unknown(), 9, &config());

        assert_eq!(score.final_score, 0.0);
        assert!((score.frequency_penalty - 10.0).abs() < EPS);
    }

    #[test]
    fn test_frequency_applies_after_targeting() {
        let ad = AuctionAd::local("a", 2.0).with_voivodeship("mazowieckie");
        let score = score_ad(&ad, &mazowsze(), 3, &config());

        // 2.0 * 1.5 = 3.0, then 40% off
        assert!((score.frequency_penalty - 1.2).abs() < EPS);
        assert!((score.final_score - 1.8).abs() < EPS);
    }

    #[test]
    fn test_non_finite_bid_scores_zero() {
        let ad = AuctionAd::national("a", f64::NAN);
        assert_eq!(score_ad(&ad, &UserLocation::unknown(), 0, &config()).final_score, 0.0);
    }

    #[test]
    fn test_negative_bid_floors_at_zero() {
        let ad = AuctionAd::national("a", -3.0);
        assert_eq!(score_ad(&ad, &UserLocation::unknown(), 0, &config()).final_score, 0.0);
    }
}
