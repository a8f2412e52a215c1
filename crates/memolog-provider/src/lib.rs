//! memolog provider library entry.
//!
//! This crate wires configuration, the level policy, sinks, and the
//! per-category handler cache into a logging provider. It is intended to be
//! consumed by the demo binary (`main.rs`), by hosts through the `tracing`
//! bridge, and by integration tests.

pub mod config;
pub mod event;
pub mod handler;
pub mod layer;
pub mod policy;
pub mod provider;
pub mod sink;

pub use handler::Handler;
pub use layer::ProviderLayer;
pub use provider::LogProvider;
