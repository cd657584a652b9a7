pub mod dates;
pub mod format;
pub mod quest;
pub mod recommend;
pub mod room;
pub mod settle;
pub mod usage;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use quest::{process_quest_command, QuestCommand};
use recommend::{process_recommend_command, RecommendCommand};
use room::{process_ranking_command, process_room_command, RankingCommand, RoomCommand};
use settle::{process_settle_command, SettleCommand};
use tracing::level_filters::LevelFilter;
use usage::{process_record_command, process_usage_command, RecordCommand, UsageCommand};

use crate::utils::{
    dir::{create_application_default_path, create_dir},
    logging::{enable_logging, CLI_PREFIX},
};

#[derive(Parser, Debug)]
#[command(name = "Screenquest", version, long_about = None)]
#[command(about = "Screen time accounting and app recommendations for usage quests", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Append a foreground or background event to the event log")]
    Record {
        #[command(flatten)]
        command: RecordCommand,
    },
    #[command(about = "Display foreground time per application")]
    Usage {
        #[command(flatten)]
        command: UsageCommand,
    },
    #[command(about = "Settle a day into a daily report. Defaults to yesterday")]
    Settle {
        #[command(flatten)]
        command: SettleCommand,
    },
    #[command(about = "Recommend applications similar to the latest quest choice")]
    Recommend {
        #[command(flatten)]
        command: RecommendCommand,
    },
    #[command(about = "Evaluate quests against recorded usage")]
    Quest {
        #[command(flatten)]
        command: QuestCommand,
    },
    #[command(about = "Update a shared quest room with local usage and apply its rules")]
    Room {
        #[command(flatten)]
        command: RoomCommand,
    },
    #[command(about = "Print users ordered by collected points")]
    Ranking {
        #[command(flatten)]
        command: RankingCommand,
    },
}

/// Directory layout inside the application directory.
pub struct AppPaths {
    pub events: PathBuf,
    pub reports: PathBuf,
    pub logs: PathBuf,
}

impl AppPaths {
    pub fn new(app_dir: PathBuf) -> Self {
        Self {
            events: app_dir.join("events"),
            reports: app_dir.join("reports"),
            logs: app_dir.join("logs"),
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => create_dir(dir)?,
        None => create_application_default_path()?,
    };
    let paths = AppPaths::new(app_dir);

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &paths.logs, logging_level, args.log)?;

    match args.commands {
        Commands::Record { command } => process_record_command(command, &paths).await,
        Commands::Usage { command } => process_usage_command(command, &paths).await,
        Commands::Settle { command } => process_settle_command(command, &paths).await,
        Commands::Recommend { command } => process_recommend_command(command).await,
        Commands::Quest { command } => process_quest_command(command, &paths).await,
        Commands::Room { command } => process_room_command(command, &paths).await,
        Commands::Ranking { command } => process_ranking_command(command).await,
    }
}
