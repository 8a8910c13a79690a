use chrono::{DateTime, Duration, Local, Utc};

/// Whole minutes between two moments, never negative.
pub fn whole_minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).max(Duration::zero()).num_minutes()
}

/// The standard way of showing a record moment to the user.
pub fn format_moment(moment: DateTime<Utc>) -> String {
    moment.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::whole_minutes_between;

    #[test]
    fn test_whole_minutes_between() {
        let start = Utc.with_ymd_and_hms(2018, 7, 4, 9, 0, 0).unwrap();
        assert_eq!(whole_minutes_between(start, start + Duration::seconds(59 * 60 + 59)), 59);
        assert_eq!(whole_minutes_between(start, start - Duration::minutes(5)), 0);
    }
}
