//! Reference-date computation for the first slide

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// The upcoming Friday relative to `today`. When `today` is already a
/// Friday the date rolls over to next week's, so a deck generated on a
/// Friday always points at the following reporting cycle.
pub fn next_reporting_date(today: NaiveDate) -> NaiveDate {
    let today_pos = today.weekday().num_days_from_monday();
    let friday_pos = Weekday::Fri.num_days_from_monday();
    let mut days_ahead = (friday_pos + 7 - today_pos) % 7;
    if days_ahead == 0 {
        days_ahead = 7;
    }
    today + Duration::days(days_ahead as i64)
}

/// Long-form rendering, e.g. "12 September 2025"
pub fn long_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_midweek_rolls_to_same_week() {
        // 2025-09-09 is a Tuesday
        assert_eq!(next_reporting_date(date(2025, 9, 9)), date(2025, 9, 12));
    }

    #[test]
    fn test_friday_rolls_a_full_week() {
        // 2025-09-12 is a Friday; the result must be next week's Friday
        assert_eq!(next_reporting_date(date(2025, 9, 12)), date(2025, 9, 19));
    }

    #[test]
    fn test_saturday_rolls_to_next_friday() {
        assert_eq!(next_reporting_date(date(2025, 9, 13)), date(2025, 9, 19));
    }

    #[test]
    fn test_long_date_has_no_zero_padding() {
        assert_eq!(long_date(date(2025, 9, 5)), "5 September 2025");
        assert_eq!(long_date(date(2025, 9, 12)), "12 September 2025");
    }
}
