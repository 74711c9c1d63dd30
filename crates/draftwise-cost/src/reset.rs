// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Budget window reset policies and injectable clocks.

use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use draftwise_core::BudgetPeriod;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Decides which tracking window a point in time belongs to.
///
/// Spend and raised flags for a period are cleared when its window start changes.
pub trait ResetPolicy: Send + Sync {
    /// Start of the window containing `now`. `None` means the period never resets.
    fn window_start(&self, period: BudgetPeriod, now: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// When the window containing `now` ends.
    fn next_reset(&self, period: BudgetPeriod, now: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// UTC calendar windows: midnight, Monday midnight, first of the month.
/// `Total` never resets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarResetPolicy;

impl ResetPolicy for CalendarResetPolicy {
    fn window_start(&self, period: BudgetPeriod, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();
        let date = match period {
            BudgetPeriod::Daily => today,
            BudgetPeriod::Weekly => {
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
            }
            BudgetPeriod::Monthly => today.with_day(1)?,
            BudgetPeriod::Total => return None,
        };
        midnight(date)
    }

    fn next_reset(&self, period: BudgetPeriod, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = self.window_start(period, now)?;
        match period {
            BudgetPeriod::Daily => Some(start + Duration::days(1)),
            BudgetPeriod::Weekly => Some(start + Duration::days(7)),
            BudgetPeriod::Monthly => {
                let date = start.date_naive();
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                midnight(NaiveDate::from_ymd_opt(year, month, 1)?)
            }
            BudgetPeriod::Total => None,
        }
    }
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    #[test]
    fn daily_window_starts_at_midnight() {
        let policy = CalendarResetPolicy;
        let now = at(2026, 3, 11, 15);
        assert_eq!(
            policy.window_start(BudgetPeriod::Daily, now),
            Some(Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap())
        );
        assert_eq!(
            policy.next_reset(BudgetPeriod::Daily, now),
            Some(Utc.with_ymd_and_hms(2026, 3, 12, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn weekly_window_starts_monday() {
        let policy = CalendarResetPolicy;
        // 2026-03-11 is a Wednesday
        let start = policy.window_start(BudgetPeriod::Weekly, at(2026, 3, 11, 9)).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(start.weekday(), chrono::Weekday::Mon);
    }

    #[test]
    fn monthly_window_rolls_over_year_end() {
        let policy = CalendarResetPolicy;
        assert_eq!(
            policy.next_reset(BudgetPeriod::Monthly, at(2026, 12, 20, 1)),
            Some(Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn total_never_resets() {
        let policy = CalendarResetPolicy;
        assert_eq!(policy.window_start(BudgetPeriod::Total, at(2026, 1, 1, 0)), None);
        assert_eq!(policy.next_reset(BudgetPeriod::Total, at(2026, 1, 1, 0)), None);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(at(2026, 3, 11, 23));
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now().date_naive(), NaiveDate::from_ymd_opt(2026, 3, 12).unwrap());
    }
}
