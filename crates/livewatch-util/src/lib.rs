//! Shared utilities for livewatch
//!
//! This crate provides:
//! - ID types (ChannelId, ClientId)
//! - Time utilities (wall clock with mock support, monotonic time, formatting)
//! - Rate limiting helpers
//! - Default paths for socket, data, and config

mod ids;
mod paths;
mod rate_limit;
mod time;

pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
