//! Turning raw foreground transitions into usage totals.
//!
//! [reconcile::reconcile] is the pure core. [settle] builds the daily reports on top of it using
//! an [EventLog](crate::storage::event_log::EventLog) as the source of events.

pub mod entities;
pub mod reconcile;
pub mod settle;
