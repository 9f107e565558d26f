//! Live-state tracking engine for livewatch
//!
//! This crate is the heart of livewatchd, containing:
//! - The watch registry (watched channels + dedup ledger, persisted on every change)
//! - The notification policy (offline -> live transitions, one notification per session)
//! - The sweeper (sequential, non-overlapping passes over the watch list)
//! - The command-facing [`WatchService`]

mod events;
mod policy;
mod registry;
mod service;
mod sweep;

pub use events::*;
pub use policy::*;
pub use registry::*;
pub use service::*;
pub use sweep::*;
