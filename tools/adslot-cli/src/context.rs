//! CLI execution context.

use std::path::{Path, PathBuf};

use adslot_cache::{AdCache, FileStorage};
use adslot_core::EngineConfig;
use anyhow::{Context as _, Result};

use crate::output::Output;

/// Config file names searched from the working directory upwards.
pub const CONFIG_NAMES: [&str; 3] = ["adslot.toml", ".adslot.toml", "adslot.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Engine configuration.
    pub config: EngineConfig,
    /// Where the configuration came from, if a file was found.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from a config file, or search for one.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match config_path {
            Some(path) => {
                let config = EngineConfig::load(path)
                    .with_context(|| format!("Failed to load config {}", path))?;
                (config, Some(PathBuf::from(path)))
            }
            None => match find_config(&cwd) {
                Some((config, path)) => (config, Some(path)),
                None => (EngineConfig::default(), None),
            },
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Directory of the file-backed ad cache.
    pub fn cache_dir(&self) -> PathBuf {
        match &self.config.cache.dir {
            Some(dir) => self.resolve_path(dir),
            None => data_dir().join("adslot").join("cache"),
        }
    }

    /// Open the file-backed ad cache.
    pub fn open_cache(&self) -> Result<AdCache<FileStorage>> {
        let dir = self.cache_dir();
        let storage = FileStorage::open(&dir)
            .with_context(|| format!("Failed to open cache directory {}", dir.display()))?;
        Ok(AdCache::new(storage, self.config.cache.clone()))
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Find a config file in the directory tree.
fn find_config(start: &Path) -> Option<(EngineConfig, PathBuf)> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                match EngineConfig::load(&path) {
                    Ok(config) => return Some((config, path)),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring config"),
                }
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Get the platform-specific data directory.
fn data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local").join("share")
    } else {
        std::env::temp_dir()
    }
}
