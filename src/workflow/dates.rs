use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::db::models::leave::AccrualMode;

/// Resolved window for a leave request. `end_date` is the last day of
/// leave and `resume_date` the first day the employee is expected back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveDates {
    pub end_date: NaiveDate,
    pub resume_date: NaiveDate,
}

/// Source of public-holiday dates for a work location.
pub trait HolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// Holiday dates loaded for a single work location.
#[derive(Debug, Clone, Default)]
pub struct LocationCalendar {
    dates: HashSet<NaiveDate>,
}

impl LocationCalendar {
    pub fn new<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// Calendar with no holidays, used when a location has none on file.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl HolidayCalendar for LocationCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

fn is_business_day(date: NaiveDate, calendar: &dyn HolidayCalendar) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !calendar.is_holiday(date)
}

/// Computes the end and resume dates for a leave window.
///
/// Calendar counting includes every day, so a 5-day leave starting
/// 2025-03-10 ends 2025-03-14 and resumes 2025-03-15. Business counting
/// only consumes weekdays that are not holidays at the employee's
/// location, and the resume date is pushed to the next business day.
/// The start date itself always counts as day one when it is countable
/// under the active mode.
///
/// Callers validate `days_count` first: it must be positive and capped
/// well inside chrono's date range, or the arithmetic here panics.
pub fn compute_leave_dates(
    start_date: NaiveDate,
    days_count: i32,
    mode: AccrualMode,
    calendar: &dyn HolidayCalendar,
) -> LeaveDates {
    match mode {
        AccrualMode::CalendarDays => {
            let end_date = start_date + Duration::days(i64::from(days_count) - 1);
            LeaveDates {
                end_date,
                resume_date: end_date + Duration::days(1),
            }
        }
        AccrualMode::BusinessDays => {
            let mut cursor = start_date;
            let mut end_date = start_date;
            let mut counted = 0;
            while counted < days_count {
                if is_business_day(cursor, calendar) {
                    counted += 1;
                    end_date = cursor;
                }
                cursor += Duration::days(1);
            }
            let mut resume_date = end_date + Duration::days(1);
            while !is_business_day(resume_date, calendar) {
                resume_date += Duration::days(1);
            }
            LeaveDates {
                end_date,
                resume_date,
            }
        }
    }
}

/// True when the two inclusive date ranges share at least one day.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// Whole months of service between `from` and `to`, rounding down.
/// A day-of-month earlier than the hire day does not complete the month.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut months =
        (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn calendar_mode_counts_every_day() {
        // Monday 2025-03-10, five calendar days.
        let dates = compute_leave_dates(
            date(2025, 3, 10),
            5,
            AccrualMode::CalendarDays,
            &LocationCalendar::empty(),
        );
        assert_eq!(dates.end_date, date(2025, 3, 14));
        assert_eq!(dates.resume_date, date(2025, 3, 15));
    }

    #[test]
    fn calendar_mode_single_day_resumes_next_day() {
        let dates = compute_leave_dates(
            date(2025, 3, 10),
            1,
            AccrualMode::CalendarDays,
            &LocationCalendar::empty(),
        );
        assert_eq!(dates.end_date, date(2025, 3, 10));
        assert_eq!(dates.resume_date, date(2025, 3, 11));
    }

    #[test]
    fn calendar_mode_runs_through_weekends() {
        // Friday start, three days: Fri, Sat, Sun.
        let dates = compute_leave_dates(
            date(2025, 3, 14),
            3,
            AccrualMode::CalendarDays,
            &LocationCalendar::empty(),
        );
        assert_eq!(dates.end_date, date(2025, 3, 16));
        assert_eq!(dates.resume_date, date(2025, 3, 17));
    }

    #[test]
    fn business_mode_skips_weekends() {
        // Thursday start, four business days: Thu, Fri, Mon, Tue.
        let dates = compute_leave_dates(
            date(2025, 3, 13),
            4,
            AccrualMode::BusinessDays,
            &LocationCalendar::empty(),
        );
        assert_eq!(dates.end_date, date(2025, 3, 18));
        assert_eq!(dates.resume_date, date(2025, 3, 19));
    }

    #[test]
    fn business_mode_resume_lands_on_next_business_day() {
        // Monday start, five business days ends Friday; resume skips the weekend.
        let dates = compute_leave_dates(
            date(2025, 3, 10),
            5,
            AccrualMode::BusinessDays,
            &LocationCalendar::empty(),
        );
        assert_eq!(dates.end_date, date(2025, 3, 14));
        assert_eq!(dates.resume_date, date(2025, 3, 17));
    }

    #[test]
    fn business_mode_skips_location_holidays() {
        // Friday 2025-03-14 is a holiday, so day five lands on the next Monday.
        let calendar = LocationCalendar::new([date(2025, 3, 14)]);
        let dates =
            compute_leave_dates(date(2025, 3, 10), 5, AccrualMode::BusinessDays, &calendar);
        assert_eq!(dates.end_date, date(2025, 3, 17));
        assert_eq!(dates.resume_date, date(2025, 3, 18));
    }

    #[test]
    fn business_mode_start_on_weekend_moves_to_monday() {
        let dates = compute_leave_dates(
            date(2025, 3, 15),
            1,
            AccrualMode::BusinessDays,
            &LocationCalendar::empty(),
        );
        assert_eq!(dates.end_date, date(2025, 3, 17));
        assert_eq!(dates.resume_date, date(2025, 3, 18));
    }

    #[test]
    fn business_mode_resume_skips_holiday_monday() {
        let calendar = LocationCalendar::new([date(2025, 3, 17)]);
        let dates =
            compute_leave_dates(date(2025, 3, 10), 5, AccrualMode::BusinessDays, &calendar);
        assert_eq!(dates.end_date, date(2025, 3, 14));
        assert_eq!(dates.resume_date, date(2025, 3, 18));
    }

    #[test]
    fn overlap_detects_shared_days() {
        assert!(ranges_overlap(
            date(2025, 3, 10),
            date(2025, 3, 14),
            date(2025, 3, 14),
            date(2025, 3, 20),
        ));
        assert!(ranges_overlap(
            date(2025, 3, 10),
            date(2025, 3, 20),
            date(2025, 3, 12),
            date(2025, 3, 13),
        ));
    }

    #[test]
    fn overlap_rejects_disjoint_ranges() {
        assert!(!ranges_overlap(
            date(2025, 3, 10),
            date(2025, 3, 14),
            date(2025, 3, 15),
            date(2025, 3, 20),
        ));
    }

    #[test]
    fn months_between_rounds_down_before_anniversary_day() {
        assert_eq!(months_between(date(2024, 6, 15), date(2025, 6, 14)), 11);
        assert_eq!(months_between(date(2024, 6, 15), date(2025, 6, 15)), 12);
        assert_eq!(months_between(date(2024, 6, 1), date(2025, 3, 10)), 9);
        assert_eq!(months_between(date(2025, 1, 31), date(2025, 2, 28)), 0);
    }
}
