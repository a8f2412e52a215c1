//! Handler provider.
//!
//! One handler per category, created on first request and reused for the
//! provider's lifetime. Options other than `log_level` are read once, when
//! the category's handler is built.

use std::sync::Arc;

use memolog_core::{MemoMap, Result};

use crate::config::{ConfigSource, LogSection};
use crate::handler::Handler;
use crate::policy::build_policy;
use crate::sink::SharedSinks;

pub struct LogProvider {
    source: Arc<dyn ConfigSource>,
    sinks: SharedSinks,
    handlers: MemoMap<String, Arc<Handler>>,
}

impl LogProvider {
    pub fn new(source: Arc<dyn ConfigSource>, sinks: SharedSinks) -> Self {
        Self {
            source,
            sinks,
            handlers: MemoMap::new(),
        }
    }

    /// Provider over a fixed configuration snapshot.
    pub fn from_section(section: LogSection, sinks: SharedSinks) -> Self {
        Self::new(Arc::new(Arc::new(section)), sinks)
    }

    /// Handler for `category`, built on first request. Later calls return the same `Arc`.
    pub fn handler(&self, category: &str) -> Arc<Handler> {
        let mut created = false;
        let handler = self.handlers.add_or_update(
            category.to_string(),
            |name| {
                created = true;
                Arc::new(self.build_handler(name))
            },
            |_, existing| existing,
        );
        // logged outside the factory: a tracing bridge may call back into `handler`
        if created {
            tracing::debug!(
                category,
                console = handler.writes_console(),
                storage = handler.storage_query().is_some(),
                "handler created"
            );
        }
        handler
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn categories(&self) -> Vec<String> {
        self.handlers.keys()
    }

    /// Close the storage sink. Handlers stay usable; storage writes stop.
    pub fn close(&self) -> Result<()> {
        self.sinks.close()
    }

    fn build_handler(&self, category: &str) -> Handler {
        let snapshot = self.source.snapshot();
        let policy = build_policy(&self.source, &snapshot, category);

        // no sink or no statement means storage is off, whatever `disabled` says
        let storage_query = if snapshot.disabled || !self.sinks.has_storage() {
            None
        } else {
            snapshot.storage_query().map(str::to_string)
        };

        Handler::new(
            category,
            policy,
            snapshot.log_to_console,
            storage_query,
            self.sinks.clone(),
        )
    }
}
