//! memolog demo
//!
//! Reads `<category> <Level> <message>` lines from stdin and routes each one
//! through the per-category handler. The config file is re-read before every
//! line, so `log_level` edits apply immediately when `cache_settings` is off.
//!
//! Usage: `memolog-demo [config.yaml] [storage.jsonl]`

use std::fs::OpenOptions;
use std::io::{self, BufRead};
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use memolog_core::{Level, MemologError, Result};
use memolog_provider::config::{ConfigSource, SharedConfig};
use memolog_provider::event::EventId;
use memolog_provider::sink::{AnsiConsole, JsonLinesStorage, SharedSinks, Sinks};
use memolog_provider::LogProvider;

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "memolog.yaml".to_string());
    let storage_path = args.next();

    let config = Arc::new(SharedConfig::from_file(&config_path)?);

    let mut sinks = Sinks::default().with_console(AnsiConsole::stdout());
    if let Some(path) = &storage_path {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| MemologError::Config(format!("open storage {path} failed: {e}")))?;
        sinks = sinks.with_storage(JsonLinesStorage::new(file));
    }

    let source: Arc<dyn ConfigSource> = config.clone();
    let provider = LogProvider::new(source, SharedSinks::new(sinks));
    tracing::info!(config = %config_path, storage = ?storage_path, "memolog-demo ready");

    for (n, line) in io::stdin().lock().lines().enumerate() {
        let line = line.map_err(|e| MemologError::Internal(format!("read stdin failed: {e}")))?;
        if let Err(e) = config.reload_from_file(&config_path) {
            tracing::warn!(error = %e, "config reload failed, keeping previous settings");
        }

        let Some((category, level, message)) = parse_line(&line) else {
            tracing::warn!(line = n + 1, "expected `<category> <Level> <message>`");
            continue;
        };
        let event_id = i32::try_from(n + 1).unwrap_or(i32::MAX);
        provider
            .handler(category)
            .emit(level, EventId::new(event_id), message, None, |m, _| m.to_string())?;
    }

    provider.close()
}

fn parse_line(line: &str) -> Option<(&str, Level, &str)> {
    let mut parts = line.trim().splitn(3, ' ');
    let category = parts.next().filter(|c| !c.is_empty())?;
    let level = Level::from_name(parts.next()?)?;
    Some((category, level, parts.next().unwrap_or("")))
}
