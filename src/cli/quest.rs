use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::debug;

use crate::{
    quest::Quest,
    storage::event_log::{read_window, EventLogImpl},
    usage::entities::UsageWindow,
};

use super::AppPaths;

#[derive(Debug, Parser)]
pub struct QuestCommand {
    #[arg(long, short, help = "Json array of quests")]
    file: PathBuf,
}

/// Evaluates every quest in the file against the event log at the current moment.
pub async fn process_quest_command(QuestCommand { file }: QuestCommand, paths: &AppPaths) -> Result<()> {
    let content =
        std::fs::read_to_string(&file).with_context(|| format!("Failed to read {file:?}"))?;
    let quests = serde_json::from_str::<Vec<Quest>>(&content)
        .with_context(|| format!("Failed to parse {file:?}"))?;

    let now = Utc::now();
    let Some(earliest) = quests.iter().map(|v| v.start).filter(|v| *v <= now).min() else {
        println!("No started quests");
        return Ok(());
    };

    let log = EventLogImpl::new(paths.events.clone())?;
    // Quests only count sessions started after them, carried sessions are left out.
    let events = read_window(&log, &UsageWindow::new(earliest, now)?)
        .await?
        .events;
    debug!("Evaluating {} quests over {} events", quests.len(), events.len());

    for quest in &quests {
        let progress = quest.evaluate(&events, now)?;
        let name = if quest.app_name.is_empty() {
            &*quest.target
        } else {
            quest.app_name.as_str()
        };
        println!(
            "{}\t{}\t{} {}m\t{}m\t{:?}\t{} points",
            quest.id,
            name,
            quest.condition,
            quest.goal_minutes,
            progress.progress_minutes,
            progress.status,
            quest.reward_points()
        );
    }
    Ok(())
}
