//! Score command - show how every campaign scores for one location.

use adslot_auction::{score_ad, ScoreBreakdown, SessionState};
use adslot_core::AdId;
use adslot_store::CampaignStore;
use anyhow::{anyhow, Context as _, Result};
use serde::Serialize;

use super::{open_store, ScoreArgs};
use crate::context::Context;

#[derive(Serialize)]
struct ScoreRow {
    id: String,
    ad_type: String,
    #[serde(flatten)]
    breakdown: ScoreBreakdown,
    /// Probability of winning an ordinary (non-national) slot.
    share: f64,
}

/// Run the score command.
pub async fn run(args: ScoreArgs, ctx: &Context) -> Result<()> {
    let store = open_store(&args.source, ctx)?;
    let ads = store
        .fetch_ads(args.source.placement.as_deref())
        .await
        .context("Failed to fetch campaigns")?;

    let session = parse_impressions(&args.impressions)?;
    let location = args.location.to_location();

    let mut rows: Vec<ScoreRow> = ads
        .iter()
        .map(|ad| ScoreRow {
            id: ad.id.to_string(),
            ad_type: ad.ad_type.to_string(),
            breakdown: score_ad(
                ad,
                &location,
                session.impression_count(&ad.id),
                &ctx.config.scoring,
            ),
            share: 0.0,
        })
        .collect();

    let total: f64 = rows.iter().map(|row| row.breakdown.final_score).sum();
    if total > 0.0 {
        for row in &mut rows {
            row.share = row.breakdown.final_score / total;
        }
    }
    rows.sort_by(|a, b| b.breakdown.final_score.total_cmp(&a.breakdown.final_score));

    if ctx.output.is_json() {
        ctx.output.json(&rows);
        return Ok(());
    }

    ctx.output.header("Scores");
    ctx.output.kv("Location", &args.location.describe());
    ctx.output.kv("Ads", &rows.len().to_string());

    if rows.is_empty() {
        ctx.output.warn("No active campaigns");
        return Ok(());
    }

    println!();
    let widths = [20, 9, 8, 11, 8, 8, 8, 7];
    ctx.output.table_header(
        &["AD", "TYPE", "BASE", "TARGETING", "BONUS", "PENALTY", "FINAL", "SHARE"],
        &widths,
    );
    for row in &rows {
        let b = &row.breakdown;
        ctx.output.table_row(
            &[
                &row.id,
                &row.ad_type,
                &format!("{:.3}", b.base_score),
                &b.targeting.to_string(),
                &format!("{:+.3}", b.targeting_bonus),
                &format!("{:.3}", b.frequency_penalty),
                &format!("{:.3}", b.final_score),
                &format!("{:.1}%", row.share * 100.0),
            ],
            &widths,
        );
    }

    Ok(())
}

/// Parse `id=count` pairs into a session.
fn parse_impressions(pairs: &[String]) -> Result<SessionState> {
    let mut session = SessionState::new();
    for pair in pairs {
        let (id, count) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid impressions '{}', expected ID=COUNT", pair))?;
        let count: u32 = count
            .trim()
            .parse()
            .with_context(|| format!("Invalid impression count in '{}'", pair))?;
        let id = AdId::new(id.trim());
        for _ in 0..count {
            session.record_impression(&id);
        }
    }
    Ok(session)
}
