use anyhow::{anyhow, Result};
use chrono::{Local, Utc};
use clap::{CommandFactory, Parser};
use tracing::info;

use crate::{
    storage::event_log::{extract_window, EventLog, EventLogImpl},
    usage::{
        entities::{EventKind, UsageEvent, UsageWindow},
        reconcile::reconcile,
    },
    utils::{percentage::Percentage, time::local_day_start},
};

use super::{
    dates::{parse_date, DateStyle, DATE_EXAMPLES},
    format::print_usage,
    AppPaths, Args,
};

#[derive(Debug, Parser)]
pub struct RecordCommand {
    #[arg(long = "app", short, help = "Identifier of the application, usually a package name")]
    identifier: String,
    #[arg(
        long,
        short,
        help = "Kind of the event. SessionStart, SessionEnd or a platform name like MOVE_TO_FOREGROUND"
    )]
    kind: String,
    #[arg(long, help = format!("Moment of the event, now by default. {DATE_EXAMPLES}"))]
    at: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

pub async fn process_record_command(
    RecordCommand {
        identifier,
        kind,
        at,
        date_style,
    }: RecordCommand,
    paths: &AppPaths,
) -> Result<()> {
    let kind = EventKind::from(kind);
    if kind == EventKind::Unknown {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                "Unknown event kind",
            )
            .into());
    }
    let timestamp = match at {
        Some(at) => parse_date(&at, date_style, "at")?.to_utc(),
        None => Utc::now(),
    };
    let event = UsageEvent {
        identifier: identifier.into(),
        kind,
        timestamp,
    };
    event.validate()?;

    let log = EventLogImpl::new(paths.events.clone())?;
    log.append(vec![event]).await?;
    info!("Recorded {kind} at {timestamp}");
    Ok(())
}

#[derive(Debug, Parser)]
pub struct UsageCommand {
    #[arg(
        long = "start",
        short,
        help = format!("Start of the range, local midnight by default. {DATE_EXAMPLES}")
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = format!("End of the range, now by default. {DATE_EXAMPLES}")
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(short = 'p', long = "percentage", help = "Filter apps to have at least specified percentage", default_value_t = Percentage::new_opt(1.).unwrap()) ]
    min_percentage: Percentage,
}

/// Reconciles recorded events between `start_date` and `end_date` and prints time per app.
pub async fn process_usage_command(
    UsageCommand {
        start_date,
        end_date,
        date_style,
        min_percentage,
    }: UsageCommand,
    paths: &AppPaths,
) -> Result<()> {
    let now = Local::now();
    let start = match start_date {
        Some(v) => parse_date(&v, date_style, "start")?,
        None => local_day_start(now.date_naive(), &Local)
            .ok_or_else(|| anyhow!("Today has no local start"))?,
    };
    let end = match end_date {
        Some(v) => parse_date(&v, date_style, "end")?,
        None => now,
    };

    let window = match UsageWindow::new(start.to_utc(), end.to_utc()) {
        Ok(v) => v,
        Err(e) => {
            return Err(Args::command()
                .error(clap::error::ErrorKind::ValueValidation, e.to_string())
                .into())
        }
    };

    let log = EventLogImpl::new(paths.events.clone())?;
    let events = extract_window(&log, &window).await?;
    let usage = reconcile(&events, &window)?;

    print_usage(&usage, min_percentage);
    Ok(())
}
