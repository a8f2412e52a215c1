use std::sync::Arc;

use memolog_core::Level;

use crate::config::{ConfigSource, LogSection};

use super::table::Rules;

/// Decides whether an event at `level` for `category` is emitted.
pub trait PolicyResolver: Send + Sync {
    fn is_enabled(&self, category: &str, level: Level) -> bool;
}

/// Rules compiled once; later configuration edits are not observed.
#[derive(Debug, Clone)]
pub struct FrozenPolicy {
    rules: Rules,
}

impl FrozenPolicy {
    pub fn new(rules: Rules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }
}

impl PolicyResolver for FrozenPolicy {
    fn is_enabled(&self, category: &str, level: Level) -> bool {
        self.rules.is_enabled(category, level)
    }
}

/// Rules recompiled from the current snapshot on every check.
pub struct LivePolicy {
    source: Arc<dyn ConfigSource>,
    owner: String,
}

impl LivePolicy {
    pub fn new(source: Arc<dyn ConfigSource>, owner: impl Into<String>) -> Self {
        Self {
            source,
            owner: owner.into(),
        }
    }
}

impl PolicyResolver for LivePolicy {
    fn is_enabled(&self, category: &str, level: Level) -> bool {
        if category.trim().is_empty() || level == Level::None {
            return false;
        }
        let snapshot = self.source.snapshot();
        Rules::compile(&snapshot, &self.owner).is_enabled(category, level)
    }
}

/// Pick the resolver variant for `owner` from `snapshot.cache_settings`.
/// The choice is fixed for the lifetime of the returned resolver.
pub fn build_policy(
    source: &Arc<dyn ConfigSource>,
    snapshot: &LogSection,
    owner: &str,
) -> Arc<dyn PolicyResolver> {
    if snapshot.cache_settings {
        Arc::new(FrozenPolicy::new(Rules::compile(snapshot, owner)))
    } else {
        Arc::new(LivePolicy::new(Arc::clone(source), owner))
    }
}
