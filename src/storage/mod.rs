//!  Local stand-ins for the collaborators that feed and persist usage data.
//!  The basic idea is:
//!   - There is a directory with raw usage events, one json lines file per UTC day.
//!   - Settled daily reports are stored as one json file per local day.

pub mod event_log;
pub mod report_storage;
