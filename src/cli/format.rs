use chrono::Duration;

use crate::{
    recommend::entities::CatalogItem,
    usage::entities::AggregatedUsage,
    utils::percentage::{duration_percentage, Percentage},
};

/// Applications used for less than this are left out of usage listings.
pub const MIN_LISTED_USAGE: Duration = Duration::minutes(1);

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

/// One line per application with at least [MIN_LISTED_USAGE] and at least `min_percentage` of the
/// listed total, most used first.
pub fn usage_lines(usage: &AggregatedUsage, min_percentage: Percentage) -> Vec<String> {
    let usage = usage.clone().above(MIN_LISTED_USAGE);
    let total = usage.total();
    usage
        .sorted()
        .into_iter()
        .map(|(identifier, duration)| (identifier, duration, duration_percentage(duration, total)))
        .filter(|(_, _, share)| *share >= min_percentage)
        .map(|(identifier, duration, share)| {
            format!(
                "{}%\t{}\t{}",
                *share as i32,
                format_duration(duration),
                identifier
            )
        })
        .collect()
}

pub fn print_usage(usage: &AggregatedUsage, min_percentage: Percentage) {
    let lines = usage_lines(usage, min_percentage);
    if lines.is_empty() {
        println!("No usage recorded");
        return;
    }
    for line in lines {
        println!("{line}");
    }
    println!();
    println!(
        "Total\t{}",
        format_duration(usage.clone().above(MIN_LISTED_USAGE).total())
    );
}

pub fn print_items(items: &[CatalogItem]) {
    if items.is_empty() {
        println!("No recommendations");
    }
    for item in items {
        println!("{}\t{}", item.name, item.identifier);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::{usage::entities::AggregatedUsage, utils::percentage::Percentage};

    use super::{format_duration, usage_lines};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(125)), "2m5s");
        assert_eq!(
            format_duration(Duration::hours(1) + Duration::seconds(61)),
            "1h1m1s"
        );
    }

    #[test]
    fn test_usage_lines_filter_small_shares() {
        let mut usage = AggregatedUsage::new();
        usage.add("com.video".into(), Duration::minutes(198));
        usage.add("com.clock".into(), Duration::minutes(1));
        usage.add("com.chat".into(), Duration::minutes(1));

        let lines = usage_lines(&usage, Percentage::new_opt(1.).unwrap());
        assert_eq!(lines, vec!["99%\t3h18m0s\tcom.video".to_string()]);

        let lines = usage_lines(&usage, Percentage::new_opt(0.).unwrap());
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_usage_lines_skip_apps_under_a_minute() {
        let mut usage = AggregatedUsage::new();
        usage.add("com.video".into(), Duration::minutes(3));
        usage.add("com.clock".into(), Duration::seconds(59));

        let lines = usage_lines(&usage, Percentage::new_opt(0.).unwrap());
        assert_eq!(lines, vec!["100%\t3m0s\tcom.video".to_string()]);
    }
}
