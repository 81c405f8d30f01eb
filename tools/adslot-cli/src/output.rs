//! Terminal and JSON output.

use std::time::Duration;

use adslot_cache::CacheStatus;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Writes human-readable messages, or nothing but JSON documents in `--json`
/// mode.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn info(&self, msg: &str) {
        if !self.json {
            println!("{} {}", style("•").cyan(), msg);
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.json {
            println!("{} {}", style("✓").green().bold(), msg);
        }
    }

    /// Warnings go to stderr so piped tables stay clean.
    pub fn warn(&self, msg: &str) {
        if !self.json {
            eprintln!("{} {}", style("!").yellow().bold(), style(msg).yellow());
        }
    }

    /// Errors are printed in JSON mode too, as `{"error": ...}` on stderr.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        } else {
            eprintln!("{} {}", style("error:").red().bold(), msg);
        }
    }

    /// Only shown with `--verbose`.
    pub fn debug(&self, msg: &str) {
        if self.verbose && !self.json {
            eprintln!("  {}", style(msg).dim());
        }
    }

    pub fn header(&self, title: &str) {
        if !self.json {
            println!("\n{}", style(title).bold());
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if !self.json {
            println!("  {:<10} {}", style(key).dim(), value);
        }
    }

    /// Print one row of a fixed-width table.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        if !self.json {
            println!("  {}", pad_columns(cols, widths));
        }
    }

    pub fn table_header(&self, cols: &[&str], widths: &[usize]) {
        if !self.json {
            println!("  {}", style(pad_columns(cols, widths)).dim());
        }
    }

    /// Pretty-print a value as the command's JSON result.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(doc) => println!("{}", doc),
            Err(e) => self.error(&format!("Failed to encode JSON output: {}", e)),
        }
    }

    /// Progress bar for long draws; hidden in JSON mode.
    pub fn progress(&self, len: u64, msg: &str) -> ProgressBar {
        if self.json {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(bar) = ProgressStyle::with_template("{msg} [{bar:32.green/dim}] {pos}/{len}") {
            pb.set_style(bar.progress_chars("=> "));
        }
        pb.set_message(msg.to_string());
        pb
    }
}

fn pad_columns(cols: &[&str], widths: &[usize]) -> String {
    let line = cols
        .iter()
        .zip(widths)
        .map(|(col, &width)| format!("{col:<width$}"))
        .collect::<Vec<_>>()
        .join(" ");
    line.trim_end().to_string()
}

/// Cache status coloured by freshness.
pub fn status_badge(status: CacheStatus) -> String {
    let label = status.to_string();
    match status {
        CacheStatus::Hit => style(label).green().to_string(),
        CacheStatus::Stale => style(label).yellow().to_string(),
        CacheStatus::Miss => style(label).red().to_string(),
    }
}

/// Cache age as `42s`, `14m 05s` or `1h 02m`.
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}h {:02}m", secs / 3600, secs % 3600 / 60),
    }
}
