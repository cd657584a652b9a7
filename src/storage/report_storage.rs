use std::{future::Future, io::ErrorKind, ops::Deref, path::PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

use crate::{usage::settle::DailyReport, utils::time::date_to_record_name};

/// Interface for persisting settled [DailyReport]s.
pub trait ReportStorage {
    /// Saves the report, replacing a previous report of the same date.
    fn save(&self, report: &DailyReport) -> impl Future<Output = Result<()>>;

    fn load(&self, date: NaiveDate) -> impl Future<Output = Result<Option<DailyReport>>>;
}

impl<T: Deref> ReportStorage for T
where
    T::Target: ReportStorage,
{
    fn save(&self, report: &DailyReport) -> impl Future<Output = Result<()>> {
        self.deref().save(report)
    }

    fn load(&self, date: NaiveDate) -> impl Future<Output = Result<Option<DailyReport>>> {
        self.deref().load(date)
    }
}

pub struct ReportStorageImpl {
    report_dir: PathBuf,
}

impl ReportStorageImpl {
    pub fn new(report_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&report_dir)?;

        Ok(Self { report_dir })
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.report_dir
            .join(format!("{}.json", date_to_record_name(date)))
    }
}

impl ReportStorage for ReportStorageImpl {
    async fn save(&self, report: &DailyReport) -> Result<()> {
        let path = self.path_for(report.date);
        debug!("Saving report to {path:?}");
        let content = serde_json::to_vec_pretty(report)?;

        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await?;
        file.lock_exclusive()?;
        let result = async {
            file.write_all(&content).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        result?;
        Ok(())
    }

    async fn load(&self, date: NaiveDate) -> Result<Option<DailyReport>> {
        let path = self.path_for(date);
        let mut file = match File::open(&path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };
        file.lock_shared()?;
        let mut content = String::new();
        let result = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        result?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::usage::settle::{AppMinutes, DailyReport, SETTLEMENT_METHOD};

    use super::{ReportStorage, ReportStorageImpl};

    #[tokio::test]
    async fn test_report_storage_roundtrip_and_overwrite() -> Result<()> {
        let dir = tempdir()?;
        let storage = ReportStorageImpl::new(dir.path().to_owned())?;
        let date = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();

        assert!(storage.load(date).await?.is_none());

        let mut report = DailyReport {
            date,
            total_usage_minutes: 42,
            apps: vec![AppMinutes {
                identifier: "com.test".into(),
                minutes: 42,
            }],
            method: SETTLEMENT_METHOD.into(),
            processed_at: Utc.timestamp_millis_opt(1_712_345_678_000).unwrap(),
        };
        storage.save(&report).await?;
        assert_eq!(storage.load(date).await?, Some(report.clone()));

        report.total_usage_minutes = 1;
        report.apps.clear();
        storage.save(&report).await?;
        assert_eq!(storage.load(date).await?, Some(report));
        Ok(())
    }
}
