//! Usage goals set by the user for a single application, played alone ([Quest]) or together with
//! other people ([room::Room]).

pub mod ranking;
pub mod room;

use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::UsageError,
    usage::{
        entities::{UsageEvent, UsageWindow},
        reconcile::measure_app_usage,
    },
};

/// Points granted for a successful quest without a minute goal.
const DEFAULT_REWARD: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestCondition {
    /// Use the application no more than the goal.
    #[serde(alias = "≤")]
    AtMost,
    /// Use the application at least the goal.
    #[serde(alias = "≥")]
    AtLeast,
}

impl Display for QuestCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestCondition::AtMost => write!(f, "≤"),
            QuestCondition::AtLeast => write!(f, "≥"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    #[serde(alias = "targetPackage")]
    pub target: Arc<str>,
    #[serde(default)]
    pub app_name: String,
    #[serde(alias = "conditionType")]
    pub condition: QuestCondition,
    pub goal_minutes: i64,
    #[serde(with = "chrono::serde::ts_milliseconds", alias = "startTime")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds", alias = "endTime")]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestStatus {
    Active,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgress {
    pub progress_minutes: i64,
    pub status: QuestStatus,
}

impl Quest {
    /// Measures usage of the target since the quest started and decides its status at `now`.
    ///
    /// An "at most" quest fails as soon as the goal is exceeded. Otherwise the outcome is only
    /// decided once the quest has ended.
    pub fn evaluate<'a>(
        &self,
        events: impl IntoIterator<Item = &'a UsageEvent>,
        now: DateTime<Utc>,
    ) -> Result<QuestProgress, UsageError> {
        if now < self.start {
            return Ok(QuestProgress {
                progress_minutes: 0,
                status: QuestStatus::Active,
            });
        }

        let progress_minutes = measure_progress(events, &self.target, self.start, self.end, now)?;
        let finished = now >= self.end;

        let status = match self.condition {
            QuestCondition::AtMost if progress_minutes > self.goal_minutes => QuestStatus::Failed,
            _ if !finished => QuestStatus::Active,
            QuestCondition::AtMost => QuestStatus::Succeeded,
            QuestCondition::AtLeast if progress_minutes >= self.goal_minutes => {
                QuestStatus::Succeeded
            }
            QuestCondition::AtLeast => QuestStatus::Failed,
        };
        debug!(
            "Quest {} for {}: {progress_minutes}/{} {status:?}",
            self.id, self.target, self.goal_minutes
        );

        Ok(QuestProgress {
            progress_minutes,
            status,
        })
    }

    pub fn reward_points(&self) -> i64 {
        if self.goal_minutes > 0 {
            self.goal_minutes
        } else {
            DEFAULT_REWARD
        }
    }
}

/// Whole minutes `target` spent in the foreground between `start` and `min(now, end)`. Only
/// sessions started at or after `start` count. Zero before `start`.
pub fn measure_progress<'a>(
    events: impl IntoIterator<Item = &'a UsageEvent>,
    target: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<i64, UsageError> {
    if now < start {
        return Ok(0);
    }
    let window = UsageWindow::new(start, now.min(end))?;
    let events = events
        .into_iter()
        .filter(|v| v.timestamp >= start && v.timestamp <= window.end);
    measure_app_usage(events, &window, target)
}
