use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    storage::{
        event_log::{extract_window, EventLog},
        report_storage::ReportStorage,
    },
    utils::{
        clock::Clock,
        time::{local_day_start, next_day_start},
    },
};

use super::{
    entities::{AggregatedUsage, UsageWindow},
    reconcile::reconcile,
};

/// Marks reports computed from individual foreground events rather than from platform totals.
pub const SETTLEMENT_METHOD: &str = "precise_event_tracking";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMinutes {
    pub identifier: Arc<str>,
    pub minutes: i64,
}

/// Usage summary of a single local day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: NaiveDate,
    /// Sum of every application's foreground time, rounded down to whole minutes.
    pub total_usage_minutes: i64,
    /// Ordered from the most used application.
    pub apps: Vec<AppMinutes>,
    pub method: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub processed_at: DateTime<Utc>,
}

impl DailyReport {
    pub fn new(date: NaiveDate, usage: &AggregatedUsage, processed_at: DateTime<Utc>) -> Self {
        Self {
            date,
            total_usage_minutes: usage.total().num_minutes(),
            apps: usage
                .sorted()
                .into_iter()
                .map(|(identifier, duration)| AppMinutes {
                    identifier,
                    minutes: duration.num_minutes(),
                })
                .collect(),
            method: SETTLEMENT_METHOD.into(),
            processed_at,
        }
    }
}

/// The closed window covering `date` in `tz`, from `00:00:00.000` to `23:59:59.999`.
pub fn day_window<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<UsageWindow> {
    let start = local_day_start(date, tz).ok_or_else(|| anyhow!("{date} has no local start"))?;
    let next = next_day_start(date, tz).ok_or_else(|| anyhow!("{date} has no local end"))?;
    Ok(UsageWindow::new(
        start.to_utc(),
        next.to_utc() - Duration::milliseconds(1),
    )?)
}

/// Settlement always runs for the day before the current local date.
pub fn previous_day<Tz: TimeZone>(clock: &dyn Clock, tz: &Tz) -> Result<NaiveDate> {
    clock
        .time()
        .with_timezone(tz)
        .date_naive()
        .pred_opt()
        .ok_or_else(|| anyhow!("Beginning of time has no previous day"))
}

/// Reconciles all events of `date` and stores the resulting [DailyReport].
#[instrument(skip(log, reports, tz, clock))]
pub async fn settle_day<Tz: TimeZone>(
    log: impl EventLog,
    reports: impl ReportStorage,
    date: NaiveDate,
    tz: &Tz,
    clock: &dyn Clock,
) -> Result<DailyReport> {
    let window = day_window(date, tz)?;
    let events = extract_window(log, &window).await?;
    let usage = reconcile(&events, &window)?;
    let report = DailyReport::new(date, &usage, clock.time());

    reports.save(&report).await?;
    info!(
        "Settled {date} with {} minutes over {} apps",
        report.total_usage_minutes,
        report.apps.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        storage::{
            event_log::{EventLog, EventLogImpl},
            report_storage::{ReportStorage, ReportStorageImpl},
        },
        usage::entities::UsageEvent,
        utils::{clock::FixedClock, logging::TEST_LOGGING},
    };

    use super::{day_window, previous_day, settle_day, SETTLEMENT_METHOD};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();

    #[test]
    fn test_day_window_bounds() -> Result<()> {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let window = day_window(TEST_DATE, &tz)?;
        assert_eq!(
            window.start,
            Utc.from_utc_datetime(&NaiveDateTime::new(
                NaiveDate::from_ymd_opt(2024, 4, 4).unwrap(),
                NaiveTime::from_hms_opt(15, 0, 0).unwrap()
            ))
        );
        assert_eq!(
            window.duration(),
            Duration::days(1) - Duration::milliseconds(1)
        );
        Ok(())
    }

    #[test]
    fn test_previous_day_uses_local_date() -> Result<()> {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        // 20:00 UTC on the 5th is already the 6th in UTC+9.
        let clock = FixedClock(Utc.from_utc_datetime(&NaiveDateTime::new(
            TEST_DATE,
            NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        )));
        assert_eq!(previous_day(&clock, &tz)?, TEST_DATE);
        assert_eq!(previous_day(&clock, &Utc)?, TEST_DATE.pred_opt().unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn test_settle_day_with_midnight_session() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let log = EventLogImpl::new(dir.path().join("events"))?;
        let reports = ReportStorageImpl::new(dir.path().join("reports"))?;

        let midnight = Utc.from_utc_datetime(&TEST_DATE.and_time(NaiveTime::MIN));
        log.append(vec![
            // Started the evening before and spans midnight.
            UsageEvent::start("com.video", midnight - Duration::minutes(30)),
            UsageEvent::end("com.video", midnight + Duration::minutes(20)),
            UsageEvent::start("com.chat", midnight + Duration::hours(10)),
            UsageEvent::end("com.chat", midnight + Duration::hours(10) + Duration::seconds(90)),
            // Still open when the day ends.
            UsageEvent::start("com.reader", midnight + Duration::hours(23)),
            UsageEvent::end("com.reader", midnight + Duration::hours(25)),
        ])
        .await?;

        let processed_at = midnight + Duration::days(1) + Duration::hours(1);
        let report = settle_day(
            &log,
            &reports,
            TEST_DATE,
            &Utc,
            &FixedClock(processed_at),
        )
        .await?;

        assert_eq!(report.method, SETTLEMENT_METHOD);
        assert_eq!(report.processed_at, processed_at);
        // video 20m after midnight, chat 1.5m, reader 59m59.999s
        let minutes = report
            .apps
            .iter()
            .map(|v| (v.identifier.to_string(), v.minutes))
            .collect::<Vec<_>>();
        assert_eq!(
            minutes,
            vec![
                ("com.reader".to_string(), 59),
                ("com.video".to_string(), 20),
                ("com.chat".to_string(), 1),
            ]
        );
        assert_eq!(report.total_usage_minutes, 81);

        assert_eq!(reports.load(TEST_DATE).await?, Some(report));
        Ok(())
    }
}
