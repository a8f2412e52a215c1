#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::error::Error;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use serde_json::{json, Map, Value};

use memolog_core::{Level, MemologError, Result};
use memolog_provider::config::{self, ConfigSource, SharedConfig};
use memolog_provider::event::EventId;
use memolog_provider::sink::{ConsoleSink, SharedSinks, Sinks, StorageRecord, StorageSink};
use memolog_provider::LogProvider;

#[derive(Clone, Default)]
struct ConsoleLog(Arc<Mutex<Vec<String>>>);

impl ConsoleLog {
    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl ConsoleSink for ConsoleLog {
    fn write_console(
        &mut self,
        level: Level,
        event_id: &EventId,
        category: &str,
        message: &str,
        error: Option<&dyn Error>,
    ) -> Result<()> {
        let mut line = format!("{level} {event_id} {category} {message}");
        if let Some(e) = error {
            line.push_str(&format!(" [{e}]"));
        }
        self.0.lock().unwrap().push(line);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct StorageLog {
    records: Arc<Mutex<Vec<(String, StorageRecord)>>>,
    closed: Arc<AtomicBool>,
}

impl StorageLog {
    fn records(&self) -> Vec<(String, StorageRecord)> {
        self.records.lock().unwrap().clone()
    }
}

impl StorageSink for StorageLog {
    fn write_storage(&mut self, query: &str, record: &StorageRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .push((query.to_string(), record.clone()));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct BrokenStorage;

impl StorageSink for BrokenStorage {
    fn write_storage(&mut self, _query: &str, _record: &StorageRecord) -> Result<()> {
        Err(MemologError::Sink("connection reset".into()))
    }
}

const FULL: &str = r#"
log_to_console: true
log_query: "insert into logs values (@log_level, @log_message)"
log_level:
  default: Information
"#;

fn provider(yaml: &str) -> (LogProvider, ConsoleLog, StorageLog) {
    let console = ConsoleLog::default();
    let storage = StorageLog::default();
    let sinks = Sinks::default()
        .with_console(console.clone())
        .with_storage(storage.clone());
    let section = config::load_from_str(yaml).unwrap();
    (
        LogProvider::from_section(section, SharedSinks::new(sinks)),
        console,
        storage,
    )
}

fn plain(msg: &str) -> impl FnOnce(&str, Option<&dyn Error>) -> String + '_ {
    move |_, _| msg.to_string()
}

#[test]
fn repeated_requests_return_the_same_handler() {
    let (provider, _, _) = provider(FULL);
    let a = provider.handler("X");
    let b = provider.handler("X");
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(provider.handler_count(), 1);
    assert_eq!(provider.categories(), vec!["X".to_string()]);

    let c = provider.handler("Y");
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(provider.handler_count(), 2);
}

#[test]
fn concurrent_requests_converge_on_one_handler() {
    let (provider, _, _) = provider(FULL);
    let barrier = Barrier::new(8);

    let handlers: Vec<_> = thread::scope(|s| {
        let spawned: Vec<_> = (0..8)
            .map(|_| {
                let (provider, barrier) = (&provider, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    provider.handler("shared")
                })
            })
            .collect();
        spawned.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(provider.handler_count(), 1);
    assert!(handlers.iter().all(|h| Arc::ptr_eq(h, &handlers[0])));
}

#[test]
fn enabled_event_reaches_console_and_storage() {
    let (provider, console, storage) = provider(FULL);
    let handler = provider.handler("db");

    let mut state = Map::new();
    state.insert("rows".into(), json!(3));
    handler
        .emit(Level::Warning, EventId::new(9), &state, None, |s, _| {
            format!("synced {} rows", s["rows"])
        })
        .unwrap();

    assert_eq!(console.lines(), vec!["Warning 9 db synced 3 rows".to_string()]);

    let records = storage.records();
    assert_eq!(records.len(), 1);
    let (query, record) = &records[0];
    assert_eq!(query, "insert into logs values (@log_level, @log_message)");
    assert_eq!(record.category, "db");
    assert_eq!(record.message, "synced 3 rows");
    assert_eq!(record.exception, None);
    let params = record.params();
    assert_eq!(params["rows"], 3);
    assert_eq!(params["log_level"], "Warning");
}

#[test]
fn disabled_level_skips_formatting_and_sinks() {
    let (provider, console, storage) = provider(FULL);
    let formatted = AtomicBool::new(false);
    provider
        .handler("db")
        .emit(Level::Debug, 1, "state", None, |_, _| {
            formatted.store(true, Ordering::SeqCst);
            "never".to_string()
        })
        .unwrap();

    assert!(!formatted.load(Ordering::SeqCst));
    assert!(console.lines().is_empty());
    assert!(storage.records().is_empty());
}

#[test]
fn empty_message_writes_nothing() {
    let (provider, console, storage) = provider(FULL);
    provider
        .handler("db")
        .emit(Level::Error, 1, "", None, plain(""))
        .unwrap();
    assert!(console.lines().is_empty());
    assert!(storage.records().is_empty());
}

#[test]
fn error_text_is_appended_for_storage() {
    let (provider, console, storage) = provider(FULL);
    let err = io::Error::new(io::ErrorKind::Other, "timeout");
    provider
        .handler("net")
        .emit(Level::Error, 4, "", Some(&err), plain("request failed"))
        .unwrap();

    assert_eq!(
        console.lines(),
        vec!["Error 4 net request failed [timeout]".to_string()]
    );
    let records = storage.records();
    assert_eq!(records[0].1.message, "request failed\ntimeout");
    assert_eq!(records[0].1.exception.as_deref(), Some("timeout"));
}

#[test]
fn disabled_flag_turns_storage_off_only() {
    let (provider, console, storage) = provider(&format!("disabled: true\n{FULL}"));
    let handler = provider.handler("db");
    assert_eq!(handler.storage_query(), None);
    assert!(handler.writes_console());

    handler.emit(Level::Error, 1, "", None, plain("x")).unwrap();
    assert_eq!(console.lines().len(), 1);
    assert!(storage.records().is_empty());
}

#[test]
fn blank_query_or_missing_sink_turns_storage_off() {
    let (provider, _, storage) = provider(
        "log_query: \"  \"\nlog_level:\n  default: Trace\n",
    );
    let handler = provider.handler("db");
    assert_eq!(handler.storage_query(), None);
    handler.emit(Level::Error, 1, "", None, plain("x")).unwrap();
    assert!(storage.records().is_empty());

    let section = config::load_from_str(FULL).unwrap();
    let provider = LogProvider::from_section(section, SharedSinks::default());
    assert_eq!(provider.handler("db").storage_query(), None);
    // no sinks installed at all: emitting is a no-op, not an error
    provider
        .handler("db")
        .emit(Level::Error, 1, "", None, plain("x"))
        .unwrap();
}

#[test]
fn console_output_requires_log_to_console() {
    let (provider, console, storage) = provider(
        "log_query: q\nlog_level:\n  default: Trace\n",
    );
    provider
        .handler("db")
        .emit(Level::Information, 1, "", None, plain("x"))
        .unwrap();
    assert!(console.lines().is_empty());
    assert_eq!(storage.records().len(), 1);
}

#[test]
fn sink_failures_propagate() {
    let sinks = Sinks::default().with_storage(BrokenStorage);
    let section = config::load_from_str(FULL).unwrap();
    let provider = LogProvider::from_section(section, SharedSinks::new(sinks));
    let err = provider
        .handler("db")
        .emit(Level::Error, 1, "", None, plain("x"))
        .unwrap_err();
    assert_eq!(err, MemologError::Sink("connection reset".into()));
}

#[test]
fn close_detaches_storage() {
    let (provider, console, storage) = provider(FULL);
    let handler = provider.handler("db");
    provider.close().unwrap();
    assert!(storage.closed.load(Ordering::SeqCst));

    handler.emit(Level::Error, 1, "", None, plain("after close")).unwrap();
    assert!(storage.records().is_empty());
    assert_eq!(console.lines().len(), 1);
}

#[test]
fn extra_fields_travel_with_the_record() {
    let (provider, _, storage) = provider(FULL);
    let state: Vec<(String, Value)> = vec![("user".into(), json!("ada"))];
    provider
        .handler("auth")
        .emit(Level::Information, EventId::named(2, "login"), &state, None, |_, _| {
            "login ok".to_string()
        })
        .unwrap();
    let records = storage.records();
    assert_eq!(records[0].1.event_id, EventId::named(2, "login"));
    assert_eq!(records[0].1.params()["user"], "ada");
}

#[test]
fn live_handler_follows_config_edits() {
    let shared = Arc::new(SharedConfig::new(
        config::load_from_str("log_level:\n  default: Error\n").unwrap(),
    ));
    let source: Arc<dyn ConfigSource> = shared.clone();
    let provider = LogProvider::new(source, SharedSinks::default());
    let handler = provider.handler("app");
    assert!(!handler.is_enabled(Level::Information));

    shared.replace(config::load_from_str("log_level:\n  default: Information\n").unwrap());
    assert!(handler.is_enabled(Level::Information));

    // the same handler is handed out; it was not rebuilt
    assert!(Arc::ptr_eq(&handler, &provider.handler("app")));
}

#[test]
fn cached_handler_ignores_config_edits() {
    let shared = Arc::new(SharedConfig::new(
        config::load_from_str("cache_settings: true\nlog_level:\n  default: Error\n").unwrap(),
    ));
    let source: Arc<dyn ConfigSource> = shared.clone();
    let provider = LogProvider::new(source, SharedSinks::default());
    let handler = provider.handler("app");

    shared.replace(
        config::load_from_str("cache_settings: true\nlog_level:\n  default: Trace\n").unwrap(),
    );
    assert!(!handler.is_enabled(Level::Information));
    assert!(!provider.handler("app").is_enabled(Level::Information));

    // a category first seen after the edit compiles the new rules
    assert!(provider.handler("late").is_enabled(Level::Information));
}
