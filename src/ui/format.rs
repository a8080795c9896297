use chrono::{DateTime, Local, Utc};

/// Relative timestamp for post headers.
/// - <1min: "just now"
/// - <1h: "5m ago"
/// - <1d: "3h ago"
/// - <1w: "2d ago"
/// - Older: local calendar date, "6/16/2025"
pub fn format_time_ago(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(created).num_seconds();
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3_600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3_600)
    } else if seconds < 604_800 {
        format!("{}d ago", seconds / 86_400)
    } else {
        created.with_timezone(&Local).format("%-m/%-d/%Y").to_string()
    }
}

/// 999 -> "999", 1500 -> "1.5K", 2_500_000 -> "2.5M"
pub fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Byte count in 1024 steps with at most two decimals, trailing zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn numbers_abbreviate_at_thresholds() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1.0K");
        assert_eq!(format_number(1_500), "1.5K");
        assert_eq!(format_number(2_500_000), "2.5M");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1_536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn time_buckets() {
        let now = Utc::now();
        assert_eq!(format_time_ago(now - Duration::seconds(30), now), "just now");
        assert_eq!(format_time_ago(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(format_time_ago(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_time_ago(now - Duration::days(6), now), "6d ago");
    }

    #[test]
    fn older_than_a_week_shows_date() {
        let now = Utc::now();
        let then = now - Duration::days(30);
        let expected = then.with_timezone(&Local).format("%-m/%-d/%Y").to_string();
        assert_eq!(format_time_ago(then, now), expected);
    }

    #[test]
    fn future_timestamps_read_as_just_now() {
        let now = Utc::now();
        assert_eq!(format_time_ago(now + Duration::minutes(2), now), "just now");
    }
}
