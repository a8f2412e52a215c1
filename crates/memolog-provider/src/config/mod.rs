//! Logging config loader (strict parsing) and live configuration access.

pub mod schema;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use memolog_core::error::{MemologError, Result};

pub use schema::{CategoryRule, LevelSection, LogSection};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<LogSection> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|e| {
        MemologError::Config(format!("read config failed ({}): {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<LogSection> {
    // an empty document is a section with every option at its default
    if s.trim().is_empty() {
        return Ok(LogSection::default());
    }
    serde_yaml::from_str(s).map_err(|e| MemologError::Config(format!("invalid yaml: {e}")))
}

/// Live configuration accessor.
///
/// Every call returns the snapshot current at that moment; callers never hold
/// a lock while reading it.
pub trait ConfigSource: Send + Sync {
    fn snapshot(&self) -> Arc<LogSection>;
}

/// A fixed snapshot.
impl ConfigSource for Arc<LogSection> {
    fn snapshot(&self) -> Arc<LogSection> {
        Arc::clone(self)
    }
}

/// Swappable configuration shared between the host and live policies.
pub struct SharedConfig {
    current: ArcSwap<LogSection>,
}

impl SharedConfig {
    pub fn new(section: LogSection) -> Self {
        Self {
            current: ArcSwap::from_pointee(section),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(load_from_file(path)?))
    }

    /// Publish a new snapshot. Live policies see it on their next check.
    pub fn replace(&self, section: LogSection) {
        self.current.store(Arc::new(section));
    }

    /// Re-read `path`. On failure the previous snapshot stays in effect.
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let section = load_from_file(path)?;
        tracing::debug!(
            cache_settings = section.cache_settings,
            has_log_level = section.log_level.is_some(),
            "log config reloaded"
        );
        self.replace(section);
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(LogSection::default())
    }
}

impl ConfigSource for SharedConfig {
    fn snapshot(&self) -> Arc<LogSection> {
        self.current.load_full()
    }
}
