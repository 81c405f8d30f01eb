//! CLI command implementations.

pub mod cache;
pub mod config;
pub mod score;
pub mod simulate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use adslot_core::UserLocation;
use adslot_store::{CampaignStore, MemoryCampaignStore, RestCampaignStore};
use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};

use crate::context::Context;

/// Campaign source shared by `simulate` and `score`.
#[derive(Args, Clone)]
pub struct SourceArgs {
    /// Campaign fixture file (JSON array or TOML `[[campaigns]]`).
    /// Without it the configured REST store is used.
    #[arg(long)]
    pub campaigns: Option<PathBuf>,

    /// Placement slug to restrict campaigns to
    #[arg(short, long)]
    pub placement: Option<String>,
}

/// User location used for targeting.
#[derive(Args, Clone, Default)]
pub struct LocationArgs {
    /// User voivodeship
    #[arg(long)]
    pub voivodeship: Option<String>,

    /// User powiat
    #[arg(long)]
    pub powiat: Option<String>,

    /// User gmina
    #[arg(long)]
    pub gmina: Option<String>,

    /// User city
    #[arg(long)]
    pub city: Option<String>,
}

impl LocationArgs {
    pub fn to_location(&self) -> UserLocation {
        UserLocation {
            voivodeship: self.voivodeship.clone(),
            powiat: self.powiat.clone(),
            gmina: self.gmina.clone(),
            city: self.city.clone(),
        }
    }

    pub fn describe(&self) -> String {
        let parts: Vec<&str> = [&self.voivodeship, &self.powiat, &self.gmina, &self.city]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();
        if parts.is_empty() {
            "unknown".to_string()
        } else {
            parts.join(" / ")
        }
    }
}

/// Arguments for `adslot simulate`.
#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub location: LocationArgs,

    /// Number of slots to draw
    #[arg(short = 'n', long, default_value = "12")]
    pub slots: usize,

    /// Draw one feed batch (no repeats) instead of independent slots
    #[arg(long)]
    pub feed: bool,

    /// Seed for a reproducible draw
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep the cache in memory instead of the cache directory
    #[arg(long)]
    pub no_cache: bool,

    /// Report impressions of the winners to the store
    #[arg(long)]
    pub track: bool,
}

/// Arguments for `adslot score`.
#[derive(Args)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub location: LocationArgs,

    /// Session impressions already served, as `id=count` (repeatable)
    #[arg(long = "impressions", value_name = "ID=COUNT")]
    pub impressions: Vec<String>,
}

/// Arguments for `adslot cache`.
#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// Show the cached entry for a placement
    Show {
        /// Placement slug (default: the placement-less entry)
        #[arg(short, long)]
        placement: Option<String>,

        /// List the cached ads
        #[arg(long)]
        ads: bool,
    },

    /// Remove cached ads
    Clear {
        /// Placement slug (default: the placement-less entry)
        #[arg(short, long)]
        placement: Option<String>,

        /// Remove every cached placement
        #[arg(long, conflicts_with = "placement")]
        all: bool,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for `adslot config`.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Write a default adslot.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (default: the loaded config)
        path: Option<String>,
    },
}

/// Open the campaign store selected by the arguments.
pub fn open_store(source: &SourceArgs, ctx: &Context) -> Result<Arc<dyn CampaignStore>> {
    if let Some(path) = &source.campaigns {
        let path = ctx.resolve_path(path);
        let rows = crate::campaigns::load(&path)?;
        ctx.output
            .debug(&format!("Loaded {} campaign rows from {}", rows.len(), path.display()));
        return Ok(Arc::new(MemoryCampaignStore::new(rows)));
    }

    if ctx.config.store.base_url.is_none() {
        bail!("No campaign source: pass --campaigns or set store.base_url in adslot.toml");
    }

    let store =
        RestCampaignStore::from_config(&ctx.config.store).context("Failed to create REST store")?;
    ctx.output.debug("Using the REST campaign store");
    Ok(Arc::new(store))
}

/// Display a path relative to the working directory when possible.
pub fn display_path(path: &Path, ctx: &Context) -> String {
    path.strip_prefix(&ctx.cwd)
        .unwrap_or(path)
        .display()
        .to_string()
}
