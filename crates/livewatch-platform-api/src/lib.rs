//! Platform interfaces for livewatch
//!
//! This crate defines the seam between the live-state engine and the outside
//! world: where snapshots come from ([`StreamSource`]) and where go-live
//! announcements go ([`NotificationSink`]). It contains no HTTP code itself.

mod mock;
mod notification;
mod sink;
mod source;

pub use mock::*;
pub use notification::*;
pub use sink::*;
pub use source::*;
