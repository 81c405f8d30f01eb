//! Simulate command - load campaigns and draw ads slot by slot.

use std::collections::BTreeMap;

use adslot_cache::{AdCache, CacheStorage, MemoryStorage};
use adslot_engine::{AdAuction, AuctionResult, CacheStatus};
use adslot_store::CampaignStore;
use anyhow::Result;
use serde::Serialize;

use super::{open_store, SimulateArgs};
use crate::context::Context;
use crate::output::status_badge;

#[derive(Serialize)]
struct SlotRecord {
    slot: u64,
    ad: String,
    ad_type: String,
    score: f64,
    forced_national: bool,
}

#[derive(Serialize)]
struct SimulationReport {
    placement: Option<String>,
    status: CacheStatus,
    ad_count: usize,
    fetch_failed: bool,
    slots: Vec<SlotRecord>,
    wins: BTreeMap<String, u32>,
}

/// Slots shown one per line; longer runs only print the summary.
const SLOT_TABLE_LIMIT: usize = 24;

/// Run the simulate command.
pub async fn run(args: SimulateArgs, ctx: &Context) -> Result<()> {
    let store = open_store(&args.source, ctx)?;

    if args.no_cache {
        let cache = AdCache::new(MemoryStorage::new(), ctx.config.cache.clone());
        simulate(store, cache, args, ctx).await
    } else {
        let cache = ctx.open_cache()?;
        ctx.output.debug(&format!(
            "Cache directory: {}",
            super::display_path(&ctx.cache_dir(), ctx)
        ));
        simulate(store, cache, args, ctx).await
    }
}

async fn simulate<S, C>(store: S, cache: AdCache<C>, args: SimulateArgs, ctx: &Context) -> Result<()>
where
    S: CampaignStore + 'static,
    C: CacheStorage + 'static,
{
    let mut auction = AdAuction::new(store, cache, &ctx.config);
    if let Some(placement) = &args.source.placement {
        auction = auction.with_placement(placement.clone());
    }
    if let Some(seed) = args.seed {
        auction = auction.with_seed(seed);
    }

    let outcome = auction.load().await;
    if let Some(handle) = outcome.revalidation {
        ctx.output.debug("Waiting for background revalidation");
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "revalidation task failed");
        }
    }

    if outcome.fetch_failed {
        ctx.output.warn("Campaign fetch failed; no ads available");
    }

    let location = args.location.to_location();
    let results = if args.feed {
        auction.get_ads_for_feed(args.slots, &location)
    } else {
        draw_slots(&auction, args.slots, &location, ctx)
    };

    if args.track {
        let handles: Vec<_> = results
            .iter()
            .map(|result| auction.track_impression(&result.ad.id))
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    let report = SimulationReport {
        placement: auction.placement().map(str::to_string),
        status: outcome.status,
        ad_count: auction.ads().len(),
        fetch_failed: outcome.fetch_failed,
        slots: results.iter().map(slot_record).collect(),
        wins: tally(&results),
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    print_report(&report, &args, ctx);
    Ok(())
}

fn draw_slots<S, C>(
    auction: &AdAuction<S, C>,
    slots: usize,
    location: &adslot_core::UserLocation,
    ctx: &Context,
) -> Vec<AuctionResult>
where
    S: CampaignStore + 'static,
    C: CacheStorage + 'static,
{
    let pb = ctx.output.progress(slots as u64, "drawing");
    let mut results = Vec::new();
    for _ in 0..slots {
        if let Some(result) = auction.get_next_ad(location) {
            results.push(result);
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    results
}

fn slot_record(result: &AuctionResult) -> SlotRecord {
    SlotRecord {
        slot: result.slot_index,
        ad: result.ad.id.to_string(),
        ad_type: result.ad.ad_type.to_string(),
        score: result.final_score,
        forced_national: result.forced_national,
    }
}

fn tally(results: &[AuctionResult]) -> BTreeMap<String, u32> {
    let mut wins = BTreeMap::new();
    for result in results {
        *wins.entry(result.ad.id.to_string()).or_insert(0) += 1;
    }
    wins
}

fn print_report(report: &SimulationReport, args: &SimulateArgs, ctx: &Context) {
    ctx.output.header("Auction simulation");
    ctx.output
        .kv("Placement", report.placement.as_deref().unwrap_or("(all)"));
    ctx.output.kv("Location", &args.location.describe());
    ctx.output.kv("Cache", &status_badge(report.status));
    ctx.output.kv("Ads", &report.ad_count.to_string());

    if report.slots.is_empty() {
        ctx.output.warn("No ad won any slot");
        return;
    }

    if report.slots.len() <= SLOT_TABLE_LIMIT || ctx.output.is_verbose() {
        ctx.output.header("Slots");
        let widths = [6, 24, 10, 10, 6];
        ctx.output
            .table_header(&["SLOT", "AD", "TYPE", "SCORE", "FORCED"], &widths);
        for slot in &report.slots {
            ctx.output.table_row(
                &[
                    &slot.slot.to_string(),
                    &slot.ad,
                    &slot.ad_type,
                    &format!("{:.3}", slot.score),
                    if slot.forced_national { "yes" } else { "" },
                ],
                &widths,
            );
        }
    }

    ctx.output.header("Wins");
    let total = report.slots.len() as f64;
    let widths = [24, 6, 8];
    ctx.output.table_header(&["AD", "WINS", "SHARE"], &widths);
    for (ad, wins) in &report.wins {
        ctx.output.table_row(
            &[
                ad,
                &wins.to_string(),
                &format!("{:.1}%", f64::from(*wins) / total * 100.0),
            ],
            &widths,
        );
    }

    ctx.output.success(&format!(
        "Drew {} of {} requested slots",
        report.slots.len(),
        args.slots
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use adslot_core::AuctionAd;
    use adslot_engine::ScoreBreakdown;

    fn result(id: &str, slot: u64) -> AuctionResult {
        let ad = AuctionAd::national(id, 1.0);
        let breakdown = ScoreBreakdown {
            base_score: 1.0,
            targeting_bonus: 0.0,
            frequency_penalty: 0.0,
            final_score: 1.0,
            targeting: adslot_engine::TargetingOutcome::Untargeted,
            impressions: 0,
        };
        AuctionResult {
            ad,
            final_score: 1.0,
            slot_index: slot,
            forced_national: false,
            breakdown,
        }
    }

    #[test]
    fn test_tally_counts_wins() {
        let results = vec![result("a", 1), result("b", 2), result("a", 3)];
        let wins = tally(&results);
        assert_eq!(wins.get("a"), Some(&2));
        assert_eq!(wins.get("b"), Some(&1));
    }

    #[test]
    fn test_slot_record() {
        let record = slot_record(&result("a", 4));
        assert_eq!(record.slot, 4);
        assert_eq!(record.ad_type, "national");
    }
}
