//! Shared types and IPC protocol for livewatch
//!
//! This crate defines:
//! - Domain types shared by the store, core and clients (watched channels,
//!   live state, the persisted watch state)
//! - Commands (requests from clients)
//! - Responses
//! - Events (service -> clients)

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
