//! Compiled level rules for one configuration snapshot.

use std::collections::HashMap;

use memolog_core::Level;

use crate::config::{LevelSection, LogSection};

/// `log_level` compiled into ordinal lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelTable {
    default: Option<Level>,
    categories: HashMap<String, Level>,
}

impl LevelTable {
    /// Unrecognized tokens and nameless rules are dropped; the last rule for a name wins.
    pub fn compile(section: &LevelSection) -> Self {
        let default = section.default.as_deref().and_then(Level::from_name);

        let mut categories = HashMap::with_capacity(section.category.len());
        for rule in &section.category {
            let (Some(name), Some(level)) = (rule.name.as_deref(), rule.level.as_deref()) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            if let Some(level) = Level::from_name(level) {
                categories.insert(name.to_string(), level);
            }
        }

        Self { default, categories }
    }

    pub fn default_level(&self) -> Option<Level> {
        self.default
    }

    pub fn rule(&self, category: &str) -> Option<Level> {
        self.categories.get(category).copied()
    }

    pub fn is_enabled(&self, category: &str, level: Level) -> bool {
        if is_never_enabled(category, level) {
            return false;
        }
        match self.rule(category).or(self.default) {
            Some(threshold) => level >= threshold,
            None => false,
        }
    }
}

/// Rules derived from one snapshot, bound to the category that requested them.
#[derive(Debug, Clone, PartialEq)]
pub enum Rules {
    /// No `log_level` section at all: Information and above, owner category only.
    Fallback { owner: String },
    Table(LevelTable),
}

impl Rules {
    pub fn compile(section: &LogSection, owner: &str) -> Self {
        match &section.log_level {
            None => Rules::Fallback {
                owner: owner.to_string(),
            },
            Some(levels) => Rules::Table(LevelTable::compile(levels)),
        }
    }

    pub fn is_enabled(&self, category: &str, level: Level) -> bool {
        match self {
            Rules::Fallback { owner } => {
                !is_never_enabled(category, level)
                    && level >= Level::Information
                    && owner == category
            }
            Rules::Table(table) => table.is_enabled(category, level),
        }
    }
}

fn is_never_enabled(category: &str, level: Level) -> bool {
    category.trim().is_empty() || level == Level::None
}
