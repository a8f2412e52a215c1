//! Level policy vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]


use std::sync::Arc;

use memolog_core::Level;
use memolog_provider::config::{self, ConfigSource, LogSection};
use memolog_provider::policy::build_policy;
use memolog_provider::sink::SharedSinks;
use memolog_provider::LogProvider;

use vector_loader::PolicyVector;

fn section(v: &PolicyVector) -> LogSection {
    config::load_from_str(&v.config)
        .unwrap_or_else(|e| panic!("{}: bad config: {e}", v.description))
}

fn level(v: &PolicyVector, token: &str) -> Level {
    Level::from_name(token).unwrap_or_else(|| panic!("{}: bad level {token}", v.description))
}

#[test]
fn resolver_cases() {
    let vectors = vector_loader::load("policy_cases.json");
    assert!(!vectors.is_empty());

    for v in &vectors {
        let source: Arc<dyn ConfigSource> = Arc::new(Arc::new(section(v)));
        let policy = build_policy(&source, &source.snapshot(), &v.owner);

        for c in &v.checks {
            assert_eq!(
                policy.is_enabled(&c.category, level(v, &c.level)),
                c.enabled,
                "{}: {} at {}",
                v.description,
                c.category,
                c.level
            );
        }
    }
}

#[test]
fn owner_handler_cases() {
    for v in &vector_loader::load("policy_cases.json") {
        let provider = LogProvider::from_section(section(v), SharedSinks::default());
        let handler = provider.handler(&v.owner);

        for c in v.checks.iter().filter(|c| c.category == v.owner) {
            assert_eq!(
                handler.is_enabled(level(v, &c.level)),
                c.enabled,
                "{}: owner at {}",
                v.description,
                c.level
            );
        }
    }
}
