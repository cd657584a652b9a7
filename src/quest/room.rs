use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{error::UsageError, usage::entities::UsageEvent};

use super::{measure_progress, QuestCondition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomMode {
    /// Usage of all participants adds up towards one goal.
    Coop,
    /// Every participant plays for themselves.
    Competitive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Active,
    Finished,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Participant {
    pub nickname: String,
    pub is_ready: bool,
    /// Usage of the target since the game started, in whole minutes.
    pub current_minutes: i64,
    pub score: i64,
    pub reward_claimed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomOutcome {
    pub status: RoomStatus,
    /// Only competitive "at least" games have a winner.
    pub winner: Option<String>,
}

/// A game several participants play over the same target application. Participants are keyed by
/// nickname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: String,
    #[serde(default)]
    pub title: String,
    pub mode: RoomMode,
    #[serde(default)]
    pub target_app_name: String,
    pub target_package: Arc<str>,
    pub condition: QuestCondition,
    pub goal_minutes: i64,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub status: RoomStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    /// Nickname of the winner, empty when there is none.
    #[serde(default)]
    pub winner: String,
    #[serde(default)]
    pub participants: BTreeMap<String, Participant>,
}

impl Room {
    pub fn total_minutes(&self) -> i64 {
        self.participants.values().map(|v| v.current_minutes).sum()
    }

    /// Minutes `events` contribute to this room, measured the same way as for a single quest.
    pub fn measure<'a>(
        &self,
        events: impl IntoIterator<Item = &'a UsageEvent>,
        now: DateTime<Utc>,
    ) -> Result<i64, UsageError> {
        measure_progress(
            events,
            &self.target_package,
            self.start_time,
            self.end_time,
            now,
        )
    }

    /// Stores the latest usage of `nickname`. Returns false for someone outside the room.
    pub fn update_progress(&mut self, nickname: &str, minutes: i64) -> bool {
        match self.participants.get_mut(nickname) {
            Some(v) => {
                v.current_minutes = minutes;
                true
            }
            None => false,
        }
    }

    /// Rules applied while the game is running. [None] means the game goes on.
    ///
    /// - coop, at least: finished once the summed usage reaches the goal
    /// - coop, at most: failed as soon as the summed usage exceeds the goal
    /// - competitive, at least: finished once someone reaches the goal, that participant wins
    /// - competitive, at most: only decided at time up
    pub fn check_rule(&self) -> Option<RoomOutcome> {
        let total = self.total_minutes();
        match (self.mode, self.condition) {
            (RoomMode::Coop, QuestCondition::AtLeast) if total >= self.goal_minutes => {
                Some(finished(None))
            }
            (RoomMode::Coop, QuestCondition::AtMost) if total > self.goal_minutes => {
                Some(RoomOutcome {
                    status: RoomStatus::Failed,
                    winner: None,
                })
            }
            (RoomMode::Competitive, QuestCondition::AtLeast) => self
                .participants
                .iter()
                .filter(|(_, v)| v.current_minutes >= self.goal_minutes)
                // Most minutes wins, ties keep the first nickname.
                .reduce(|a, b| {
                    if b.1.current_minutes > a.1.current_minutes {
                        b
                    } else {
                        a
                    }
                })
                .map(|(nickname, _)| finished(Some(nickname.clone()))),
            _ => None,
        }
    }

    /// Decision once the end time has passed.
    pub fn finish_by_time_up(&self) -> RoomOutcome {
        let total = self.total_minutes();
        match (self.mode, self.condition) {
            (RoomMode::Coop, QuestCondition::AtMost) if total > self.goal_minutes => RoomOutcome {
                status: RoomStatus::Failed,
                winner: None,
            },
            (RoomMode::Coop, QuestCondition::AtLeast) if total < self.goal_minutes => {
                RoomOutcome {
                    status: RoomStatus::Failed,
                    winner: None,
                }
            }
            // Competitive results are judged per participant.
            _ => finished(None),
        }
    }

    /// Moves an active game forward at `now`. Returns the outcome when the game ended with this
    /// call.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Option<RoomOutcome> {
        if self.status != RoomStatus::Active || now < self.start_time {
            return None;
        }
        let outcome = if now >= self.end_time {
            Some(self.finish_by_time_up())
        } else {
            self.check_rule()
        }?;

        self.status = outcome.status;
        self.winner = outcome.winner.clone().unwrap_or_default();
        info!(
            "Room {} ended as {:?}, winner {:?}",
            self.room_id, self.status, self.winner
        );
        Some(outcome)
    }

    /// Whether `nickname` has a reward waiting. Failed games pay nobody, competitive "at least"
    /// games pay only the winner and competitive "at most" games pay those who stayed within the
    /// goal.
    pub fn can_claim(&self, nickname: &str) -> bool {
        if self.status != RoomStatus::Finished {
            return false;
        }
        let Some(participant) = self.participants.get(nickname) else {
            return false;
        };
        if participant.reward_claimed {
            return false;
        }
        match (self.mode, self.condition) {
            (RoomMode::Coop, _) => true,
            (RoomMode::Competitive, QuestCondition::AtLeast) => self.winner == nickname,
            (RoomMode::Competitive, QuestCondition::AtMost) => {
                participant.current_minutes <= self.goal_minutes
            }
        }
    }

    /// Points `nickname` gets for this game: own minutes in a coop "at least" game, the goal
    /// otherwise.
    pub fn reward_points(&self, nickname: &str) -> Option<i64> {
        let participant = self.participants.get(nickname)?;
        Some(match (self.mode, self.condition) {
            (RoomMode::Coop, QuestCondition::AtLeast) => participant.current_minutes,
            _ => self.goal_minutes,
        })
    }

    /// Pays out the reward of `nickname` once. Returns the granted points, [None] if there was
    /// nothing to claim.
    pub fn claim_reward(&mut self, nickname: &str) -> Option<i64> {
        if !self.can_claim(nickname) {
            return None;
        }
        let points = self.reward_points(nickname).filter(|v| *v > 0)?;
        let participant = self.participants.get_mut(nickname)?;
        participant.reward_claimed = true;
        participant.score += points;
        debug!("{nickname} claimed {points} points in {}", self.room_id);
        Some(points)
    }
}

fn finished(winner: Option<String>) -> RoomOutcome {
    RoomOutcome {
        status: RoomStatus::Finished,
        winner,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::{quest::QuestCondition, usage::entities::UsageEvent};

    use super::{Participant, Room, RoomMode, RoomStatus};

    fn minute(v: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap() + Duration::minutes(v)
    }

    fn room(mode: RoomMode, condition: QuestCondition, minutes: &[(&str, i64)]) -> Room {
        Room {
            room_id: "r1".into(),
            title: "Evening".into(),
            mode,
            target_app_name: "Video".into(),
            target_package: "com.video".into(),
            condition,
            goal_minutes: 30,
            creator: "alice".into(),
            status: RoomStatus::Active,
            start_time: minute(0),
            end_time: minute(60),
            winner: String::new(),
            participants: minutes
                .iter()
                .map(|(name, minutes)| {
                    (
                        name.to_string(),
                        Participant {
                            nickname: name.to_string(),
                            current_minutes: *minutes,
                            ..Default::default()
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_coop_at_least_finishes_on_summed_goal() {
        let mut room = room(
            RoomMode::Coop,
            QuestCondition::AtLeast,
            &[("alice", 10), ("bob", 15)],
        );
        assert_eq!(room.advance(minute(20)), None);
        assert_eq!(room.status, RoomStatus::Active);

        assert!(room.update_progress("bob", 20));
        let outcome = room.advance(minute(25)).unwrap();
        assert_eq!(outcome.status, RoomStatus::Finished);
        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.winner, "");

        // Own minutes are paid out, once.
        assert_eq!(room.claim_reward("alice"), Some(10));
        assert_eq!(room.claim_reward("alice"), None);
        assert_eq!(room.participants["alice"].score, 10);
        assert_eq!(room.claim_reward("bob"), Some(20));
    }

    #[test]
    fn test_coop_at_least_fails_at_time_up() {
        let mut room = room(
            RoomMode::Coop,
            QuestCondition::AtLeast,
            &[("alice", 10), ("bob", 5)],
        );
        assert_eq!(room.advance(minute(60)).unwrap().status, RoomStatus::Failed);
        assert!(!room.can_claim("alice"));
    }

    #[test]
    fn test_coop_at_most_fails_immediately() {
        let mut room = room(
            RoomMode::Coop,
            QuestCondition::AtMost,
            &[("alice", 20), ("bob", 10)],
        );
        // Exactly at the goal is still fine.
        assert_eq!(room.advance(minute(30)), None);

        room.update_progress("alice", 21);
        assert_eq!(room.advance(minute(31)).unwrap().status, RoomStatus::Failed);
        assert_eq!(room.claim_reward("bob"), None);
    }

    #[test]
    fn test_coop_at_most_succeeds_at_time_up() {
        let mut room = room(
            RoomMode::Coop,
            QuestCondition::AtMost,
            &[("alice", 0), ("bob", 0)],
        );
        assert_eq!(
            room.advance(minute(61)).unwrap().status,
            RoomStatus::Finished
        );
        // The goal is paid even with no usage at all.
        assert_eq!(room.claim_reward("alice"), Some(30));
        assert_eq!(room.claim_reward("carol"), None);
    }

    #[test]
    fn test_competitive_at_least_has_a_winner() {
        let mut room = room(
            RoomMode::Competitive,
            QuestCondition::AtLeast,
            &[("alice", 12), ("bob", 29), ("carol", 3)],
        );
        assert_eq!(room.advance(minute(40)), None);

        room.update_progress("bob", 31);
        room.update_progress("carol", 31);
        let outcome = room.advance(minute(45)).unwrap();
        assert_eq!(outcome.status, RoomStatus::Finished);
        assert_eq!(outcome.winner.as_deref(), Some("bob"));
        assert_eq!(room.winner, "bob");

        assert!(!room.can_claim("alice"));
        assert!(!room.can_claim("carol"));
        assert_eq!(room.claim_reward("bob"), Some(30));
    }

    #[test]
    fn test_competitive_at_most_judged_per_participant() {
        let mut room = room(
            RoomMode::Competitive,
            QuestCondition::AtMost,
            &[("alice", 45), ("bob", 30)],
        );
        // Nobody loses the whole game while it runs.
        assert_eq!(room.advance(minute(59)), None);

        let outcome = room.advance(minute(60)).unwrap();
        assert_eq!(outcome.status, RoomStatus::Finished);
        assert_eq!(outcome.winner, None);
        assert!(!room.can_claim("alice"));
        assert_eq!(room.claim_reward("bob"), Some(30));
    }

    #[test]
    fn test_advance_ignores_rooms_not_running() {
        let mut room = room(RoomMode::Coop, QuestCondition::AtLeast, &[("alice", 99)]);
        assert_eq!(room.advance(minute(-1)), None);

        room.status = RoomStatus::Waiting;
        assert_eq!(room.advance(minute(10)), None);
        assert_eq!(room.status, RoomStatus::Waiting);
        assert!(!room.update_progress("mallory", 5));
    }

    #[test]
    fn test_measure_counts_target_since_start() -> anyhow::Result<()> {
        let room = room(RoomMode::Coop, QuestCondition::AtLeast, &[("alice", 0)]);
        let events = [
            UsageEvent::start("com.video", minute(-10)),
            UsageEvent::end("com.video", minute(5)),
            UsageEvent::start("com.video", minute(10)),
            UsageEvent::start("com.chat", minute(12)),
            UsageEvent::end("com.video", minute(22)),
            UsageEvent::start("com.video", minute(50)),
        ];
        assert_eq!(room.measure(&events, minute(30))?, 12);
        // The open session is cut at the end time.
        assert_eq!(room.measure(&events, minute(90))?, 22);
        assert_eq!(room.measure(&events, minute(-5))?, 0);
        Ok(())
    }

    #[test]
    fn test_room_platform_fields() -> anyhow::Result<()> {
        let room = serde_json::from_str::<Room>(
            r#"{"roomId":"abc","mode":"competitive","targetPackage":"com.video",
                "condition":"≥","goalMinutes":30,"status":"active","startTime":0,
                "endTime":3600000,"winner":"",
                "participants":{"kim":{"nickname":"kim","isReady":true,"currentMinutes":4}}}"#,
        )?;
        assert_eq!(room.mode, RoomMode::Competitive);
        assert_eq!(room.condition, QuestCondition::AtLeast);
        assert_eq!(room.status, RoomStatus::Active);
        assert_eq!(room.participants["kim"].current_minutes, 4);
        assert!(!room.participants["kim"].reward_claimed);
        Ok(())
    }
}
