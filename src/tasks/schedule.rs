use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Weekday};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// 每周固定时刻，例如 `SAT 22:00`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl WeeklySchedule {
    pub fn new(weekday: Weekday, time: NaiveTime) -> Self {
        Self { weekday, time }
    }

    /// 严格晚于 `now` 的下一次触发时刻（按 `now` 所在时区的本地时间）
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();
        for offset in 0..=14 {
            let date = today + Duration::days(offset);
            if date.weekday() != self.weekday {
                continue;
            }
            // 本地时间落在夏令时空档时取不到，顺延到下一周
            if let Some(candidate) = tz.from_local_datetime(&date.and_time(self.time)).earliest()
                && candidate > *now
            {
                return candidate;
            }
        }
        now.clone() + Duration::weeks(1)
    }

    /// 距离下一次触发的等待时长
    pub fn until_next<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> std::time::Duration {
        let next = self.next_after(now);
        (next - now.clone())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

impl fmt::Display for WeeklySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = match self.weekday {
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
            Weekday::Sat => "SAT",
            Weekday::Sun => "SUN",
        };
        write!(f, "{day} {}", self.time.format("%H:%M"))
    }
}

impl FromStr for WeeklySchedule {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::ConfigError(format!("invalid weekly schedule: {s:?}"));
        let mut parts = s.split_whitespace();
        let (Some(day), Some(time), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let weekday = day.parse::<Weekday>().map_err(|_| invalid())?;
        let time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| invalid())?;
        Ok(Self { weekday, time })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Seoul;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<chrono_tz::Tz> {
        Seoul.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn parses_day_and_time() {
        let s: WeeklySchedule = "sat 22:30".parse().unwrap();
        assert_eq!(s.weekday, Weekday::Sat);
        assert_eq!(s.time, NaiveTime::from_hms_opt(22, 30, 0).unwrap());
        assert_eq!(s.to_string(), "SAT 22:30");

        assert!("SAT".parse::<WeeklySchedule>().is_err());
        assert!("XYZ 10:00".parse::<WeeklySchedule>().is_err());
        assert!("MON 25:00".parse::<WeeklySchedule>().is_err());
        assert!("MON 10:00 extra".parse::<WeeklySchedule>().is_err());
    }

    #[test]
    fn next_after_same_day_later() {
        let s: WeeklySchedule = "MON 12:30".parse().unwrap();
        // 2025-09-01 是周一
        let now = at(2025, 9, 1, 9, 0);
        assert_eq!(s.next_after(&now), at(2025, 9, 1, 12, 30));
    }

    #[test]
    fn next_after_exact_moment_moves_a_week() {
        let s: WeeklySchedule = "MON 12:30".parse().unwrap();
        let now = at(2025, 9, 1, 12, 30);
        assert_eq!(s.next_after(&now), at(2025, 9, 8, 12, 30));
    }

    #[test]
    fn next_after_later_in_week() {
        let s: WeeklySchedule = "FRI 13:00".parse().unwrap();
        let now = at(2025, 9, 6, 8, 0);
        assert_eq!(s.next_after(&now), at(2025, 9, 12, 13, 0));
        assert_eq!(
            s.until_next(&at(2025, 9, 12, 12, 0)),
            std::time::Duration::from_secs(3600)
        );
    }
}
