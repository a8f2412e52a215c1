//! memolog core: severity levels, the memoizing map, and the shared error type.
//!
//! This crate carries no I/O. The provider crate builds per-category handlers
//! on top of [`MemoMap`] and resolves enablement against [`Level`].
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Absence is reported through `Option`, failures through `MemologError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod level;
pub mod memo_map;

/// Shared result type.
pub use error::{MemologError, Result};
pub use level::Level;
pub use memo_map::MemoMap;
