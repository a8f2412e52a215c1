//! Level policy layer.
//!
//! Compiles the `log_level` configuration into per-category thresholds and
//! exposes them as a `PolicyResolver`, either frozen at construction
//! (`cache_settings: true`) or recompiled from the live source on each check.

pub mod resolver;
pub mod table;

pub use resolver::{build_policy, FrozenPolicy, LivePolicy, PolicyResolver};
pub use table::{LevelTable, Rules};
