//! Screen time accounting for usage quests.
//!
//! Raw foreground/background events are kept in a day partitioned [storage::event_log], turned into
//! per application durations by [usage::reconcile] and settled into daily reports. Quests compare
//! that usage against goals, and [recommend] suggests the next application to build a quest around
//! by clustering the application catalog.

pub mod cli;
pub mod error;
pub mod quest;
pub mod recommend;
pub mod storage;
pub mod usage;
pub mod utils;
