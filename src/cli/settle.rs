use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;

use crate::{
    storage::{event_log::EventLogImpl, report_storage::ReportStorageImpl},
    usage::settle::{previous_day, settle_day},
    utils::clock::DefaultClock,
};

use super::AppPaths;

#[derive(Debug, Parser)]
pub struct SettleCommand {
    #[arg(long, help = "Day to settle in year-month-day format. Yesterday by default")]
    day: Option<NaiveDate>,
}

pub async fn process_settle_command(SettleCommand { day }: SettleCommand, paths: &AppPaths) -> Result<()> {
    let clock = DefaultClock;
    let day = match day {
        Some(v) => v,
        None => previous_day(&clock, &Local)?,
    };

    let log = EventLogImpl::new(paths.events.clone())?;
    let reports = ReportStorageImpl::new(paths.reports.clone())?;
    let report = settle_day(&log, &reports, day, &Local, &clock).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
