//! Campaign fixture files.
//!
//! A JSON file holds an array of campaign rows; a TOML file holds them under
//! `[[campaigns]]`.

use std::path::Path;

use adslot_store::CampaignRow;
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Deserialize)]
struct CampaignFile {
    #[serde(default)]
    campaigns: Vec<CampaignRow>,
}

/// Load campaign rows from a JSON or TOML file.
pub fn load(path: &Path) -> Result<Vec<CampaignRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read campaigns file: {}", path.display()))?;
    parse(&content, path.extension().is_some_and(|ext| ext == "json"))
        .with_context(|| format!("Failed to parse campaigns file: {}", path.display()))
}

fn parse(content: &str, json: bool) -> Result<Vec<CampaignRow>> {
    if json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(toml::from_str::<CampaignFile>(content)?.campaigns)
    }
}
