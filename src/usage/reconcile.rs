use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{instrument, trace};

use crate::error::UsageError;

use super::entities::{AggregatedUsage, EventKind, UsageEvent, UsageWindow};

/// Converts a chronological stream of foreground transitions into accumulated foreground time per
/// application.
///
/// Events are expected to be in non-decreasing timestamp order and to be already limited to the
/// window by the caller (sessions that started before the window may be included as their start
/// events). A repeated start without an end in between replaces the previous start. Sessions still
/// open after the last event are closed at `window.end`.
///
/// Malformed events are skipped. The only failure is a window with `start > end`.
#[instrument(skip(events))]
pub fn reconcile<'a>(
    events: impl IntoIterator<Item = &'a UsageEvent>,
    window: &UsageWindow,
) -> Result<AggregatedUsage, UsageError> {
    window.validate()?;

    let mut open_sessions = HashMap::<Arc<str>, DateTime<Utc>>::new();
    let mut usage = AggregatedUsage::new();

    for event in events {
        if let Err(e) = event.validate() {
            trace!("Skipping event: {e}");
            continue;
        }
        match event.kind {
            EventKind::SessionStart => {
                open_sessions.insert(event.identifier.clone(), event.timestamp);
            }
            EventKind::SessionEnd => {
                if let Some(start) = open_sessions.remove(&event.identifier) {
                    usage.add(event.identifier.clone(), event.timestamp - start);
                } else {
                    trace!("Ignoring unmatched end for {}", event.identifier);
                }
            }
            EventKind::Unknown => {}
        }
    }

    for (identifier, start) in open_sessions {
        if window.end > start {
            trace!("Closing open session of {identifier} at window end");
            usage.add(identifier, window.end - start);
        }
    }

    Ok(usage)
}

/// Foreground time of a single application within `window`, in whole minutes.
pub fn measure_app_usage<'a>(
    events: impl IntoIterator<Item = &'a UsageEvent>,
    window: &UsageWindow,
    identifier: &str,
) -> Result<i64, UsageError> {
    let usage = reconcile(
        events.into_iter().filter(|v| &*v.identifier == identifier),
        window,
    )?;
    Ok(usage
        .get(identifier)
        .map(|v| v.num_minutes())
        .unwrap_or_default())
}
