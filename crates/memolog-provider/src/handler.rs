//! Per-category handler: an enablement predicate bound to the shared sinks.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;

use memolog_core::{Level, Result};

use crate::event::{EventId, EventState};
use crate::policy::PolicyResolver;
use crate::sink::{SharedSinks, StorageRecord};

pub struct Handler {
    category: String,
    policy: Arc<dyn PolicyResolver>,
    console: bool,
    storage_query: Option<String>,
    sinks: SharedSinks,
}

impl Handler {
    /// `storage_query` is `None` when storage is off for this category.
    pub fn new(
        category: impl Into<String>,
        policy: Arc<dyn PolicyResolver>,
        console: bool,
        storage_query: Option<String>,
        sinks: SharedSinks,
    ) -> Self {
        Self {
            category: category.into(),
            policy,
            console,
            storage_query,
            sinks,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn writes_console(&self) -> bool {
        self.console
    }

    pub fn storage_query(&self) -> Option<&str> {
        self.storage_query.as_deref()
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        self.policy.is_enabled(&self.category, level)
    }

    /// Format and write one event.
    ///
    /// Nothing is formatted for a disabled level, and an empty formatted
    /// message writes nothing. Sink errors are returned as-is.
    pub fn emit<S, F>(
        &self,
        level: Level,
        event_id: impl Into<EventId>,
        state: &S,
        error: Option<&dyn Error>,
        formatter: F,
    ) -> Result<()>
    where
        S: EventState + ?Sized,
        F: FnOnce(&S, Option<&dyn Error>) -> String,
    {
        if !self.is_enabled(level) {
            return Ok(());
        }

        let message = formatter(state, error);
        if message.is_empty() {
            return Ok(());
        }
        let event_id = event_id.into();

        self.sinks.with(|sinks| -> Result<()> {
            if self.console {
                if let Some(console) = sinks.console.as_mut() {
                    console.write_console(level, &event_id, &self.category, &message, error)?;
                }
            }

            if let (Some(query), Some(storage)) =
                (self.storage_query.as_deref(), sinks.storage.as_mut())
            {
                let exception = error.map(|e| e.to_string());
                // storage gets the error text appended to the message
                let message = match &exception {
                    Some(e) => format!("{message}\n{e}"),
                    None => message.clone(),
                };
                let record = StorageRecord {
                    level,
                    event_id: event_id.clone(),
                    category: self.category.clone(),
                    message,
                    timestamp: OffsetDateTime::now_utc(),
                    exception,
                    fields: state.fields(),
                };
                storage.write_storage(query, &record)?;
            }
            Ok(())
        })
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("category", &self.category)
            .field("console", &self.console)
            .field("storage_query", &self.storage_query)
            .finish_non_exhaustive()
    }
}
