use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::debug;

use crate::{
    quest::{
        ranking::{rank, RankingEntry},
        room::Room,
    },
    storage::event_log::{read_window, EventLogImpl},
    usage::entities::UsageWindow,
};

use super::AppPaths;

#[derive(Debug, Parser)]
pub struct RoomCommand {
    #[arg(long, short, help = "Json file with the room. Updated in place")]
    file: PathBuf,
    #[arg(long, help = "Nickname whose usage is measured from the local event log")]
    me: String,
    #[arg(long, help = "Claim the reward of a finished game")]
    claim: bool,
}

/// Measures local usage for `me`, applies the game rules and writes the room back.
pub async fn process_room_command(
    RoomCommand { file, me, claim }: RoomCommand,
    paths: &AppPaths,
) -> Result<()> {
    let content = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {file:?}"))?;
    let mut room =
        serde_json::from_str::<Room>(&content).with_context(|| format!("Failed to parse {file:?}"))?;

    let now = Utc::now();
    if now >= room.start_time {
        let window = UsageWindow::new(room.start_time, now.min(room.end_time))?;
        let log = EventLogImpl::new(paths.events.clone())?;
        let events = read_window(&log, &window).await?.events;
        let minutes = room.measure(&events, now)?;
        if !room.update_progress(&me, minutes) {
            return Err(anyhow!("{me} is not a participant of {}", room.room_id));
        }
        debug!("{me} used {} for {minutes} minutes", room.target_package);
    }
    room.advance(now);

    let claimed = if claim { room.claim_reward(&me) } else { None };

    tokio::fs::write(&file, serde_json::to_vec_pretty(&room)?).await?;

    println!(
        "{}\t{:?}\t{} {}m\ttotal {}m",
        room.room_id,
        room.status,
        room.condition,
        room.goal_minutes,
        room.total_minutes()
    );
    for (nickname, participant) in &room.participants {
        println!("{nickname}\t{}m", participant.current_minutes);
    }
    if !room.winner.is_empty() {
        println!("Winner\t{}", room.winner);
    }
    match claimed {
        Some(points) => println!("Claimed {points} points"),
        None if claim => println!("No reward to claim"),
        None => {}
    }
    Ok(())
}

#[derive(Debug, Parser)]
pub struct RankingCommand {
    #[arg(long, short, help = "Json array of users with uid, name and points")]
    file: PathBuf,
    #[arg(long, default_value_t = 10, help = "Number of printed places")]
    top: usize,
}

pub async fn process_ranking_command(RankingCommand { file, top }: RankingCommand) -> Result<()> {
    let content = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {file:?}"))?;
    let users = serde_json::from_str::<Vec<RankingEntry>>(&content)
        .with_context(|| format!("Failed to parse {file:?}"))?;

    for (place, user) in rank(users).iter().take(top).enumerate() {
        println!("{}\t{}\t{}\t{}", place + 1, user.name, user.uid, user.points);
    }
    Ok(())
}
