use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// 严格晚于 `today` 的下一个指定星期几
pub fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let mut days = (target - current).rem_euclid(7);
    if days == 0 {
        days = 7;
    }
    today + Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_saturday_from_monday() {
        // 2025-09-01 是周一
        let monday = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(
            next_weekday(monday, Weekday::Sat),
            NaiveDate::from_ymd_opt(2025, 9, 6).unwrap()
        );
    }

    #[test]
    fn same_weekday_moves_a_full_week() {
        let thursday = NaiveDate::from_ymd_opt(2025, 9, 4).unwrap();
        assert_eq!(
            next_weekday(thursday, Weekday::Thu),
            NaiveDate::from_ymd_opt(2025, 9, 11).unwrap()
        );
    }
}
