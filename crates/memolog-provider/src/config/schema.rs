use serde::Deserialize;

/// Root logging section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// Turns storage output off. Console output is governed by `log_to_console` alone.
    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub log_to_console: bool,

    /// Statement handed to the storage sink with every record.
    #[serde(default)]
    pub log_query: Option<String>,

    /// `true` compiles `log_level` once per category; `false` re-reads it on every check.
    #[serde(default)]
    pub cache_settings: bool,

    /// `None` (missing or null) selects the owner-only fallback rule.
    #[serde(default)]
    pub log_level: Option<LevelSection>,
}

impl LogSection {
    /// Non-blank storage statement, if any.
    pub fn storage_query(&self) -> Option<&str> {
        self.log_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LevelSection {
    /// Severity token; unrecognized tokens count as unset.
    #[serde(default)]
    pub default: Option<String>,

    #[serde(default)]
    pub category: Vec<CategoryRule>,
}

/// One `{ name, level }` override. Either field may be missing; such rules are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CategoryRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

impl CategoryRule {
    pub fn new(name: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            level: Some(level.into()),
        }
    }
}
