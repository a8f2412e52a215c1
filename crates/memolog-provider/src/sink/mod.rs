//! Output sinks and the shared, exclusively-locked sink set.
//!
//! Sinks are not required to be thread-safe: every write goes through
//! [`SharedSinks::with`], which grants exclusive access for the duration of
//! one event (console line and storage record together).

mod console;
mod storage;

use std::error::Error;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use memolog_core::{Level, Result};

use crate::event::EventId;

pub use console::AnsiConsole;
pub use storage::JsonLinesStorage;

pub trait ConsoleSink: Send {
    fn write_console(
        &mut self,
        level: Level,
        event_id: &EventId,
        category: &str,
        message: &str,
        error: Option<&dyn Error>,
    ) -> Result<()>;
}

pub trait StorageSink: Send {
    fn write_storage(&mut self, query: &str, record: &StorageRecord) -> Result<()>;

    /// Release the underlying resource. Called once by `SharedSinks::close`.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One event as handed to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageRecord {
    pub level: Level,
    pub event_id: EventId,
    pub category: String,
    pub message: String,
    pub timestamp: OffsetDateTime,
    pub exception: Option<String>,
    pub fields: Map<String, Value>,
}

impl StorageRecord {
    /// Named statement parameters. Extra fields cannot shadow the built-in names.
    pub fn params(&self) -> Map<String, Value> {
        let mut params = self.fields.clone();
        params.insert("log_level".into(), Value::from(self.level.as_str()));
        params.insert("log_event_id".into(), Value::from(self.event_id.id));
        params.insert("log_message".into(), Value::from(self.message.as_str()));
        params.insert(
            "log_date".into(),
            self.timestamp
                .format(&Rfc3339)
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        params.insert("log_category_name".into(), Value::from(self.category.as_str()));
        params.insert(
            "log_exception".into(),
            self.exception.clone().map(Value::String).unwrap_or(Value::Null),
        );
        params
    }
}

#[derive(Default)]
pub struct Sinks {
    pub console: Option<Box<dyn ConsoleSink>>,
    pub storage: Option<Box<dyn StorageSink>>,
}

impl Sinks {
    pub fn with_console(mut self, console: impl ConsoleSink + 'static) -> Self {
        self.console = Some(Box::new(console));
        self
    }

    pub fn with_storage(mut self, storage: impl StorageSink + 'static) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }
}

/// Injected sink set shared by every handler of one provider.
#[derive(Clone, Default)]
pub struct SharedSinks {
    inner: Arc<Mutex<Sinks>>,
}

impl SharedSinks {
    pub fn new(sinks: Sinks) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sinks)),
        }
    }

    pub fn has_storage(&self) -> bool {
        self.inner.lock().storage.is_some()
    }

    /// Run `f` with exclusive access to the sinks.
    pub fn with<R>(&self, f: impl FnOnce(&mut Sinks) -> R) -> R {
        let mut sinks = self.inner.lock();
        f(&mut sinks)
    }

    /// Close and detach the storage sink. Later storage writes are skipped.
    pub fn close(&self) -> Result<()> {
        let storage = self.inner.lock().storage.take();
        match storage {
            Some(mut storage) => storage.close(),
            None => Ok(()),
        }
    }
}
