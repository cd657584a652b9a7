use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};

/// This is the standard way of converting a date to a file name in screenquest.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns the first moment of `date` in `tz`. During a DST gap at midnight the earliest valid
/// local time is used, [None] only if the whole start of the day is skipped.
pub fn local_day_start<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Tz>> {
    local_day_start(date.succ_opt()?, tz)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, Timelike};

    use super::{date_to_record_name, local_day_start, next_day_start};

    #[test]
    fn test_record_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_to_record_name(date), "2024-03-07");
    }

    #[test]
    fn test_day_bounds_in_offset() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let start = local_day_start(date, &tz).unwrap();
        assert_eq!(start.hour(), 0);
        assert_eq!(start.naive_utc().hour(), 15);
        let next = next_day_start(date, &tz).unwrap();
        assert_eq!((next - start).num_hours(), 24);
    }
}
