//! Calendar schedules as pure predicates on the tick timestamp.
//!
//! Business days are Monday to Friday; no exchange holiday calendar is
//! applied. If the market is closed on the scheduled day, no tick exists for
//! it and the occurrence is skipped.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    EveryTick,
    /// First business day of each ISO week.
    Weekly,
    /// First business day of each month.
    MonthStart,
    /// Last business day of each month.
    MonthEnd,
    /// First business day of each year.
    YearStart,
    /// Every `n`th tick, starting at tick 0.
    EveryNTicks(usize),
}

impl Default for Schedule {
    fn default() -> Self {
        Self::MonthEnd
    }
}

fn is_business_day(ts: DateTime<Utc>) -> bool {
    !matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
}

fn next_business_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    let mut next = ts + Duration::days(1);
    while !is_business_day(next) {
        next += Duration::days(1);
    }
    next
}

fn prev_business_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    let mut prev = ts - Duration::days(1);
    while !is_business_day(prev) {
        prev -= Duration::days(1);
    }
    prev
}

impl Schedule {
    /// Whether the scheduled action is due on this tick.
    pub fn is_due(&self, timestamp: DateTime<Utc>, tick: usize) -> bool {
        match *self {
            Self::EveryTick => true,
            Self::EveryNTicks(n) => n > 0 && tick % n == 0,
            _ if !is_business_day(timestamp) => false,
            Self::Weekly => {
                prev_business_day(timestamp).iso_week() != timestamp.iso_week()
            }
            Self::MonthStart => prev_business_day(timestamp).month() != timestamp.month(),
            Self::MonthEnd => next_business_day(timestamp).month() != timestamp.month(),
            Self::YearStart => prev_business_day(timestamp).year() != timestamp.year(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 17, 0, 0).unwrap()
    }

    #[test]
    fn month_end_on_last_business_day() {
        // 30/09/21 Thursday, 29/10/21 Friday (31st is Sunday)
        assert!(Schedule::MonthEnd.is_due(at(2021, 9, 30), 0));
        assert!(Schedule::MonthEnd.is_due(at(2021, 10, 29), 0));
    }

    #[test]
    fn month_end_false_elsewhere() {
        assert!(!Schedule::MonthEnd.is_due(at(2021, 11, 1), 0));
        assert!(!Schedule::MonthEnd.is_due(at(2021, 11, 12), 0));
        // Sunday 31/10/21
        assert!(!Schedule::MonthEnd.is_due(at(2021, 10, 31), 0));
        assert!(!Schedule::MonthEnd.is_due(at(2021, 1, 22), 0));
    }

    #[test]
    fn month_start_skips_weekend() {
        // 1/5/21 is a Saturday, first business day is Monday 3rd
        assert!(!Schedule::MonthStart.is_due(at(2021, 5, 1), 0));
        assert!(Schedule::MonthStart.is_due(at(2021, 5, 3), 0));
        assert!(!Schedule::MonthStart.is_due(at(2021, 5, 4), 0));
    }

    #[test]
    fn weekly_fires_on_monday() {
        assert!(Schedule::Weekly.is_due(at(2021, 11, 1), 0));
        assert!(!Schedule::Weekly.is_due(at(2021, 11, 2), 0));
    }

    #[test]
    fn year_start() {
        // 1/1/22 Saturday → Monday 3/1/22
        assert!(Schedule::YearStart.is_due(at(2022, 1, 3), 0));
        assert!(!Schedule::YearStart.is_due(at(2021, 12, 31), 0));
    }

    #[test]
    fn every_n_ticks() {
        let s = Schedule::EveryNTicks(5);
        assert!(s.is_due(at(2021, 11, 6), 0));
        assert!(!s.is_due(at(2021, 11, 6), 3));
        assert!(s.is_due(at(2021, 11, 6), 10));
        assert!(!Schedule::EveryNTicks(0).is_due(at(2021, 11, 1), 0));
    }

    #[test]
    fn deserializes_from_toml_values() {
        #[derive(Deserialize)]
        struct Wrap {
            s: Schedule,
        }
        let w: Wrap = toml::from_str("s = \"month_end\"").unwrap();
        assert_eq!(w.s, Schedule::MonthEnd);
        let w: Wrap = toml::from_str("s = { every_n_ticks = 21 }").unwrap();
        assert_eq!(w.s, Schedule::EveryNTicks(21));
    }
}
