//! Cache command - inspect or clear cached ads.

use adslot_cache::CacheStorage;
use anyhow::{Context as _, Result};
use dialoguer::Confirm;
use serde::Serialize;

use super::{CacheArgs, CacheCommand};
use crate::context::Context;
use crate::output::{format_age, status_badge};

#[derive(Serialize)]
struct CacheReport {
    key: String,
    status: adslot_cache::CacheStatus,
    age_secs: Option<u64>,
    #[serde(skip)]
    age: Option<std::time::Duration>,
    version: Option<u32>,
    ads: Vec<String>,
}

/// Run the cache command.
pub async fn run(args: CacheArgs, ctx: &Context) -> Result<()> {
    match args.command {
        CacheCommand::Show { placement, ads } => show(placement.as_deref(), ads, ctx),
        CacheCommand::Clear {
            placement,
            all,
            yes,
        } => clear(placement.as_deref(), all, yes, ctx),
    }
}

fn show(placement: Option<&str>, list_ads: bool, ctx: &Context) -> Result<()> {
    let cache = ctx.open_cache()?;
    let key = cache.key(placement);

    // peek first: get() removes expired or unreadable entries
    let version = cache.peek(placement).ok().flatten().map(|env| env.version);
    let lookup = cache.get(placement);

    let report = CacheReport {
        key,
        status: lookup.status,
        age_secs: lookup.age.map(|age| age.as_secs()),
        age: lookup.age,
        version,
        ads: lookup.ads.iter().map(|ad| ad.id.to_string()).collect(),
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.header("Ad cache");
    ctx.output.kv("Directory", &super::display_path(&ctx.cache_dir(), ctx));
    ctx.output.kv("Key", &report.key);
    ctx.output.kv("Status", &status_badge(report.status));
    if let Some(age) = report.age {
        ctx.output.kv("Age", &format_age(age));
    }
    ctx.output.kv("Ads", &report.ads.len().to_string());

    let other_keys = cache
        .storage()
        .keys()
        .unwrap_or_default()
        .into_iter()
        .filter(|k| cache.owns_key(k) && *k != report.key)
        .count();
    if other_keys > 0 {
        ctx.output
            .debug(&format!("{} other placement entries cached", other_keys));
    }

    if list_ads {
        for id in &report.ads {
            println!("    {}", id);
        }
    }

    Ok(())
}

fn clear(placement: Option<&str>, all: bool, yes: bool, ctx: &Context) -> Result<()> {
    let cache = ctx.open_cache()?;

    if all {
        if !yes && !ctx.output.is_json() {
            let confirmed = Confirm::new()
                .with_prompt("Remove every cached placement?")
                .default(false)
                .interact()
                .context("Failed to read confirmation")?;
            if !confirmed {
                ctx.output.info("Aborted");
                return Ok(());
            }
        }

        let removed = cache.clear_all().context("Failed to clear cache")?;
        if ctx.output.is_json() {
            ctx.output.json(&serde_json::json!({ "removed": removed }));
        } else {
            ctx.output.success(&format!("Removed {} cache entries", removed));
        }
        return Ok(());
    }

    let key = cache.key(placement);
    cache.clear(placement).context("Failed to clear cache")?;
    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "cleared": key }));
    } else {
        ctx.output.success(&format!("Cleared {}", key));
    }
    Ok(())
}
