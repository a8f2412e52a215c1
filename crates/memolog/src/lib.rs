//! Top-level facade crate for memolog.
//!
//! Re-exports the core types and the provider library so users can depend on a single crate.

pub mod core {
    pub use memolog_core::*;
}

pub mod provider {
    pub use memolog_provider::*;
}

pub use memolog_core::{Level, MemoMap, MemologError, Result};
pub use memolog_provider::{Handler, LogProvider, ProviderLayer};
