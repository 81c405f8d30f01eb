//! Slot selection: forced national slots and the weighted draw.

use std::collections::HashSet;

use adslot_core::{AdId, AuctionAd, EngineConfig, ScoringConfig, SelectionConfig, UserLocation};
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::scoring::{score_ad, ScoreBreakdown};
use crate::session::SessionState;

/// An ad with its computed score.
#[derive(Debug, Clone, Copy)]
pub struct ScoredAd<'a> {
    pub ad: &'a AuctionAd,
    pub breakdown: ScoreBreakdown,
}

impl ScoredAd<'_> {
    pub fn score(&self) -> f64 {
        self.breakdown.final_score
    }
}

/// Outcome of one slot auction.
#[derive(Debug, Clone, Serialize)]
pub struct AuctionResult {
    /// The winning ad.
    pub ad: AuctionAd,
    /// Winner's final score.
    pub final_score: f64,
    /// Slot the auction was run for.
    pub slot_index: u64,
    /// True when the slot was reserved for the best national ad.
    pub forced_national: bool,
    /// Score components of the winner.
    pub breakdown: ScoreBreakdown,
}

/// Runs slot auctions with a fixed scoring and selection policy.
#[derive(Debug, Clone, Default)]
pub struct Auctioneer {
    scoring: ScoringConfig,
    selection: SelectionConfig,
}

impl Auctioneer {
    /// Create an auctioneer.
    pub fn new(scoring: ScoringConfig, selection: SelectionConfig) -> Self {
        Self { scoring, selection }
    }

    /// Create from the engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.scoring.clone(), config.selection.clone())
    }

    /// Scoring coefficients in use.
    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Check if a slot is reserved for a national ad.
    pub fn is_national_slot(&self, slot_index: u64) -> bool {
        let interval = u64::from(self.selection.national_slot_interval);
        interval > 0 && slot_index > 0 && slot_index % interval == 0
    }

    /// Score every ad, keeping only those with a positive score.
    pub fn score_all<'a>(
        &self,
        ads: &'a [AuctionAd],
        location: &UserLocation,
        session: &SessionState,
    ) -> Vec<ScoredAd<'a>> {
        ads.iter()
            .map(|ad| ScoredAd {
                ad,
                breakdown: score_ad(
                    ad,
                    location,
                    session.impression_count(&ad.id),
                    &self.scoring,
                ),
            })
            .filter(|scored| scored.score() > 0.0)
            .collect()
    }

    /// Pick the ad for one slot.
    ///
    /// Does not record the impression; the caller does that once the ad is
    /// actually shown.
    pub fn run<R: Rng + ?Sized>(
        &self,
        ads: &[AuctionAd],
        location: &UserLocation,
        slot_index: u64,
        session: &SessionState,
        rng: &mut R,
    ) -> Option<AuctionResult> {
        self.run_excluding(ads, location, slot_index, session, &HashSet::new(), rng)
    }

    /// Like [`Auctioneer::run`], skipping the given ids.
    pub fn run_excluding<R: Rng + ?Sized>(
        &self,
        ads: &[AuctionAd],
        location: &UserLocation,
        slot_index: u64,
        session: &SessionState,
        exclude: &HashSet<AdId>,
        rng: &mut R,
    ) -> Option<AuctionResult> {
        let candidates: Vec<ScoredAd<'_>> = self
            .score_all(ads, location, session)
            .into_iter()
            .filter(|scored| !exclude.contains(&scored.ad.id))
            .collect();

        if candidates.is_empty() {
            debug!(slot_index, "no positive-score candidates");
            return None;
        }

        if self.is_national_slot(slot_index) {
            if let Some(best) = best_national(&candidates) {
                debug!(slot_index, ad_id = %best.ad.id, score = best.score(), "forced national slot");
                return Some(to_result(best, slot_index, true));
            }
        }

        let winner = weighted_pick(&candidates, ScoredAd::score, rng)?;
        debug!(
            slot_index,
            ad_id = %winner.ad.id,
            score = winner.score(),
            candidates = candidates.len(),
            "weighted draw"
        );
        Some(to_result(winner, slot_index, false))
    }
}

fn to_result(scored: &ScoredAd<'_>, slot_index: u64, forced_national: bool) -> AuctionResult {
    AuctionResult {
        ad: scored.ad.clone(),
        final_score: scored.score(),
        slot_index,
        forced_national,
        breakdown: scored.breakdown,
    }
}

/// Highest-scoring national candidate; the first one wins ties.
fn best_national<'a, 'b>(candidates: &'b [ScoredAd<'a>]) -> Option<&'b ScoredAd<'a>> {
    candidates
        .iter()
        .filter(|c| c.ad.is_national())
        .fold(None, |best: Option<&ScoredAd<'a>>, c| match best {
            Some(b) if b.score() >= c.score() => Some(b),
            _ => Some(c),
        })
}

/// Draw one item with probability proportional to its weight.
///
/// A single uniform draw in `[0, total)` is walked down by each weight in
/// order. Returns `None` when there is nothing with positive weight.
pub fn weighted_pick<'a, T, R, F>(items: &'a [T], weight: F, rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f64,
{
    let total: f64 = items.iter().map(|item| weight(item).max(0.0)).sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }

    let mut remaining = rng.gen_range(0.0..total);
    let mut last = None;
    for item in items {
        let w = weight(item).max(0.0);
        if w == 0.0 {
            continue;
        }
        remaining -= w;
        if remaining <= 0.0 {
            return Some(item);
        }
        last = Some(item);
    }

    // Float rounding can leave a sliver; give it to the last weighted item.
    last
}
