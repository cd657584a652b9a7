use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use fs4::tokio::AsyncFileExt;
use futures::{stream, StreamExt, TryStreamExt};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, instrument, warn};

use crate::{
    usage::entities::{EventKind, UsageEvent, UsageWindow},
    utils::time::date_to_record_name,
};

/// Interface for abstracting storage of raw usage events. Events are grouped into one file per UTC
/// day.
pub trait EventLog {
    /// Appends events to the files of the days they happened on.
    fn append(&self, events: Vec<UsageEvent>) -> impl Future<Output = Result<()>>;

    /// Retrieves events of a certain UTC day, in the order they were appended.
    fn get_events_for(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<UsageEvent>>> + Send;
}

impl<T: Deref> EventLog for T
where
    T::Target: EventLog,
{
    fn append(&self, events: Vec<UsageEvent>) -> impl Future<Output = Result<()>> {
        self.deref().append(events)
    }

    fn get_events_for(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<UsageEvent>>> + Send {
        self.deref().get_events_for(date)
    }
}

/// The main realization of [EventLog]. Stores events as json lines.
pub struct EventLogImpl {
    event_dir: PathBuf,
}

impl EventLogImpl {
    pub fn new(event_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&event_dir)?;

        Ok(Self { event_dir })
    }

    async fn read_day(path: &Path) -> Result<Vec<UsageEvent>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<UsageEvent>, std::io::Error> {
            debug!("Extracting {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let mut buffer = BufReader::new(file);
            let mut line = Vec::new();
            let mut events = vec![];
            loop {
                line.clear();
                match buffer.read_until(b'\n', &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Stopped reading {path:?}: {e}");
                        break;
                    }
                }
                let Some(event) = parse_line(path, &line) else {
                    continue;
                };
                events.push(event);
            }

            buffer.into_inner().unlock_async().await?;

            Ok(events)
        }

        match extract(path).await {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
            Err(e) => Err(e)?,
        }
    }

    async fn append_day(&self, date: NaiveDate, events: Vec<UsageEvent>) -> Result<()> {
        let path = self.event_dir.join(date_to_record_name(date));

        let mut buffer = Vec::<u8>::new();
        for event in &events {
            serde_json::to_writer(&mut buffer, event)?;
            buffer.push(b'\n');
        }

        let mut file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        file.lock_exclusive()?;
        let result = async {
            file.write_all(&buffer).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        result?;
        Ok(())
    }
}

impl EventLog for EventLogImpl {
    async fn append(&self, events: Vec<UsageEvent>) -> Result<()> {
        let mut days = BTreeMap::<NaiveDate, Vec<UsageEvent>>::new();
        for event in events {
            days.entry(event.timestamp.date_naive())
                .or_default()
                .push(event);
        }
        for (date, events) in days {
            self.append_day(date, events).await?;
        }
        Ok(())
    }

    async fn get_events_for(&self, date: NaiveDate) -> Result<Vec<UsageEvent>> {
        let path = self.event_dir.join(date_to_record_name(date));
        Self::read_day(&path).await
    }
}

/// Parses one stored line. Blank lines are skipped silently, anything else that isn't a valid event
/// is reported and skipped. Partially written lines can show up after a crash.
fn parse_line(path: &Path, line: &[u8]) -> Option<UsageEvent> {
    let line = match std::str::from_utf8(line) {
        Ok(v) => v.trim(),
        Err(e) => {
            warn!("During parsing in path {path:?} found a line that isn't utf-8: {e}");
            return None;
        }
    };
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<UsageEvent>(line) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("During parsing in path {path:?} found illegal json string {line}:  {e}");
            None
        }
    }
}

/// How far back sessions that are still open at the start of a window are searched for.
const LOOKBACK: Duration = Duration::days(1);

/// Events read for a window, split by whether they happened before it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowEvents {
    /// Start events of sessions opened before the window and not closed before it, oldest first.
    pub carried: Vec<UsageEvent>,
    /// Events inside the window in stored order.
    pub events: Vec<UsageEvent>,
}

impl WindowEvents {
    /// Joins both parts with carried sessions moved to start at `window.start`, so that only the
    /// part of a session inside the window gets counted.
    pub fn clipped(self, window: &UsageWindow) -> Vec<UsageEvent> {
        let mut result = self
            .carried
            .into_iter()
            .map(|v| UsageEvent {
                timestamp: window.start,
                ..v
            })
            .collect::<Vec<_>>();
        result.extend(self.events);
        result
    }
}

/// Reads everything inside the window plus the start events of sessions that were opened during
/// the day before the window and never closed before it. Day files are read concurrently but the
/// result keeps chronological file order.
#[instrument(skip(log))]
pub async fn read_window(log: impl EventLog, window: &UsageWindow) -> Result<WindowEvents> {
    window.validate()?;
    let log = Arc::new(log);

    let days = date_range((window.start - LOOKBACK).date_naive(), window.end.date_naive());

    let files = stream::iter(days)
        .map(move |day| {
            let log = log.clone();
            async move { log.get_events_for(day).await }
        })
        .buffered(4);

    let all_events = files.try_concat().await?;

    let mut carried = HashMap::<Arc<str>, UsageEvent>::new();
    let mut events = vec![];

    for event in all_events {
        if event.timestamp < window.start {
            match event.kind {
                EventKind::SessionStart => {
                    carried.insert(event.identifier.clone(), event);
                }
                EventKind::SessionEnd => {
                    carried.remove(&event.identifier);
                }
                EventKind::Unknown => {}
            }
        } else if window.contains(event.timestamp) {
            events.push(event);
        }
    }

    let mut carried = carried.into_values().collect::<Vec<_>>();
    carried.sort_by_key(|v| v.timestamp);
    debug!(
        "Extracted {} events and {} carried sessions",
        events.len(),
        carried.len()
    );
    Ok(WindowEvents { carried, events })
}

/// Events to reconcile for `window`. Sessions still open at the window start are counted from the
/// start of the window, so adjacent windows never share usage.
pub async fn extract_window(log: impl EventLog, window: &UsageWindow) -> Result<Vec<UsageEvent>> {
    Ok(read_window(log, window).await?.clipped(window))
}

/// Returns the dates between start (inclusive) and end (inclusive).
fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|v| *v <= end).collect()
}
