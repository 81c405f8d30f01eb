//! Config command - show, create or validate configuration.

use adslot_core::EngineConfig;
use anyhow::{bail, Context as _, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::context::{Context, CONFIG_NAMES};

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Init { force } => init(force, ctx),
        ConfigCommand::Validate { path } => validate(path.as_deref(), ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("File", &super::display_path(path, ctx)),
        None => ctx.output.kv("File", "(defaults)"),
    }
    println!();
    let rendered = toml::to_string_pretty(&ctx.config).context("Failed to render config")?;
    println!("{}", rendered);
    Ok(())
}

fn init(force: bool, ctx: &Context) -> Result<()> {
    let path = ctx.cwd.join(CONFIG_NAMES[0]);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    EngineConfig::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    ctx.output.success(&format!("Wrote {}", path.display()));
    Ok(())
}

fn validate(path: Option<&str>, ctx: &Context) -> Result<()> {
    match path {
        Some(path) => {
            EngineConfig::load(ctx.resolve_path(path))
                .with_context(|| format!("{} is invalid", path))?;
        }
        None => ctx.config.validate().context("Loaded config is invalid")?,
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "valid": true }));
    } else {
        ctx.output.success("Configuration is valid");
    }
    Ok(())
}
