use std::{collections::BTreeMap, fmt::Display, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UsageError;

/// Kind of a foreground transition. Stored logs may use either the canonical names or the names
/// reported by the platform usage api, anything else ends up as [EventKind::Unknown].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    SessionStart,
    SessionEnd,
    Unknown,
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SessionStart" | "MOVE_TO_FOREGROUND" | "ACTIVITY_RESUMED" => EventKind::SessionStart,
            "SessionEnd" | "MOVE_TO_BACKGROUND" | "ACTIVITY_PAUSED" => EventKind::SessionEnd,
            _ => EventKind::Unknown,
        }
    }
}

impl From<EventKind> for String {
    fn from(value: EventKind) -> Self {
        value.to_string()
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::SessionStart => write!(f, "SessionStart"),
            EventKind::SessionEnd => write!(f, "SessionEnd"),
            EventKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A single foreground/background transition of an application.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct UsageEvent {
    /// Package name or any other opaque identifier of the application.
    #[serde(default = "empty_identifier", alias = "packageName")]
    pub identifier: Arc<str>,
    pub kind: EventKind,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

fn empty_identifier() -> Arc<str> {
    "".into()
}

impl UsageEvent {
    pub fn start(identifier: impl Into<Arc<str>>, timestamp: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: EventKind::SessionStart,
            timestamp,
        }
    }

    pub fn end(identifier: impl Into<Arc<str>>, timestamp: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: EventKind::SessionEnd,
            timestamp,
        }
    }

    /// Checks that the event can take part in reconciliation.
    pub fn validate(&self) -> Result<(), UsageError> {
        if self.identifier.trim().is_empty() {
            return Err(UsageError::MalformedEvent(format!(
                "missing identifier at {}",
                self.timestamp
            )));
        }
        if self.kind == EventKind::Unknown {
            return Err(UsageError::MalformedEvent(format!(
                "unknown kind for {} at {}",
                self.identifier, self.timestamp
            )));
        }
        Ok(())
    }
}

/// Closed interval `[start, end]` usage gets aggregated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageWindow {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
}

impl UsageWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, UsageError> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), UsageError> {
        if self.start > self.end {
            Err(UsageError::InvalidWindow {
                start: self.start,
                end: self.end,
            })
        } else {
            Ok(())
        }
    }

    pub fn contains(&self, moment: DateTime<Utc>) -> bool {
        self.start <= moment && moment <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Accumulated foreground time per application. Only strictly positive durations are ever stored,
/// so an application without usage simply has no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedUsage {
    durations: BTreeMap<Arc<str>, Duration>,
}

impl AggregatedUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `duration` to the total of `identifier`. Non-positive durations are ignored.
    pub fn add(&mut self, identifier: Arc<str>, duration: Duration) {
        if duration <= Duration::zero() {
            return;
        }
        *self.durations.entry(identifier).or_insert_with(Duration::zero) += duration;
    }

    pub fn get(&self, identifier: &str) -> Option<Duration> {
        self.durations.get(identifier).copied()
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Duration)> {
        self.durations.iter()
    }

    pub fn total(&self) -> Duration {
        self.durations
            .values()
            .fold(Duration::zero(), |ac, next| ac + *next)
    }

    /// Entries ordered from the most used application to the least used one.
    pub fn sorted(&self) -> Vec<(Arc<str>, Duration)> {
        let mut usages = self
            .durations
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect::<Vec<_>>();
        usages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        usages
    }

    /// Drops applications used for less than `min`.
    pub fn above(self, min: Duration) -> Self {
        Self {
            durations: self
                .durations
                .into_iter()
                .filter(|(_, v)| *v >= min)
                .collect(),
        }
    }
}

impl IntoIterator for AggregatedUsage {
    type Item = (Arc<str>, Duration);
    type IntoIter = std::collections::btree_map::IntoIter<Arc<str>, Duration>;

    fn into_iter(self) -> Self::IntoIter {
        self.durations.into_iter()
    }
}
