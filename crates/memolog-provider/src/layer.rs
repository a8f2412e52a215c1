//! Bridge from `tracing` events to provider handlers.
//!
//! Installing [`ProviderLayer`] makes every `tracing` event an event of the
//! category named by its target:
//!
//! ```rust,ignore
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! tracing_subscriber::registry()
//!     .with(ProviderLayer::new(provider))
//!     .init();
//!
//! tracing::warn!(target: "db", rows = 0, "nothing to sync");
//! ```
//!
//! The `message` field becomes the formatted message; every other field is
//! passed to storage as an extra parameter.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use memolog_core::Level;

use crate::event::EventId;
use crate::provider::LogProvider;

pub struct ProviderLayer {
    provider: Arc<LogProvider>,
}

impl ProviderLayer {
    pub fn new(provider: Arc<LogProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<LogProvider> {
        &self.provider
    }

    /// Our own diagnostics are never routed back into the provider.
    fn is_own_target(target: &str) -> bool {
        target == "memolog" || target.starts_with("memolog_")
    }
}

impl<S: Subscriber> Layer<S> for ProviderLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if Self::is_own_target(target) {
            return;
        }

        let level = Level::from(*metadata.level());
        let handler = self.provider.handler(target);
        if !handler.is_enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let FieldVisitor { message, fields } = visitor;

        let written = handler.emit(level, EventId::default(), &fields, None, move |_, _| {
            message.unwrap_or_default()
        });
        if let Err(e) = written {
            // a layer has no caller to hand the error to
            eprintln!("memolog: {target}: {e}");
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.put(field, Value::String(format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            self.put(field, Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::from(value));
    }
}
