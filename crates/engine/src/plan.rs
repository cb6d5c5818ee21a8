//! Query window planning.
//!
//! The partitioner guarantees correctness under the cap; these plans keep
//! the number of calls down by never handing it a window known to blow past
//! the cap (a whole year of works notices always does).

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::model::DateWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowPolicy {
    /// Window length in days for the target year of works.
    pub current_window_days: u32,
    /// Window length in days for keyword searches.
    pub keyword_window_days: u32,
    /// Year-to-date ranges longer than this are queried as two halves.
    pub split_over_days: u32,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            current_window_days: 15,
            keyword_window_days: 301,
            split_over_days: 300,
        }
    }
}

/// Last day to query for `year`: today for the running year, Dec 31 otherwise.
fn year_end(year: i32, today: NaiveDate) -> Option<NaiveDate> {
    if year == today.year() {
        Some(today)
    } else {
        NaiveDate::from_ymd_opt(year, 12, 31)
    }
}

/// Consecutive windows of `window_days` days covering `[start, end]`; the
/// last one is cut at `end`.
pub fn step_windows(start: NaiveDate, end: NaiveDate, window_days: u32) -> Vec<DateWindow> {
    let mut windows = Vec::new();
    let step = window_days.max(1) as i64 - 1;
    let mut cur = start;
    while cur <= end {
        let next = (cur + Duration::days(step)).min(end);
        windows.push(DateWindow { start: cur, end: next });
        cur = next + Duration::days(1);
    }
    windows
}

/// Halve `window` when it spans more than `max_days`.
pub fn split_long_window(window: DateWindow, max_days: u32) -> Vec<DateWindow> {
    if window.span_days() > max_days as i64 {
        if let Some((left, right)) = window.split() {
            return vec![left, right];
        }
    }
    vec![window]
}

/// Windows for the works class of convocation year `year`.
///
/// - the target year in short steps, up to today when it is the running year;
/// - every complete year strictly between target and today as two halves;
/// - when the running year is later than the target, Jan 1 to today, halved
///   when longer than `split_over_days`.
///
/// Empty when `year` lies in the future.
pub fn plan_works_windows(year: i32, today: NaiveDate, policy: &WindowPolicy) -> Vec<DateWindow> {
    let mut windows = Vec::new();
    if year > today.year() {
        return windows;
    }

    let (Some(start), Some(end)) = (NaiveDate::from_ymd_opt(year, 1, 1), year_end(year, today)) else {
        return windows;
    };
    windows.extend(step_windows(start, end, policy.current_window_days));

    for full_year in (year + 1)..today.year() {
        if let Some(w) = DateWindow::year(full_year) {
            windows.extend(w.split().map(|(a, b)| vec![a, b]).unwrap_or_else(|| vec![w]));
        }
    }

    if today.year() > year {
        if let Some(jan1) = NaiveDate::from_ymd_opt(today.year(), 1, 1) {
            let ytd = DateWindow { start: jan1, end: today };
            windows.extend(split_long_window(ytd, policy.split_over_days));
        }
    }

    windows
}

/// Windows for one keyword search over `year`.
pub fn plan_keyword_windows(year: i32, today: NaiveDate, policy: &WindowPolicy) -> Vec<DateWindow> {
    if year > today.year() {
        return Vec::new();
    }
    match (NaiveDate::from_ymd_opt(year, 1, 1), year_end(year, today)) {
        (Some(start), Some(end)) => step_windows(start, end, policy.keyword_window_days),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn assert_contiguous(windows: &[DateWindow]) {
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end + Duration::days(1), pair[1].start, "gap or overlap: {pair:?}");
        }
    }

    #[test]
    fn current_year_in_fifteen_day_windows_up_to_today() {
        let windows = plan_works_windows(2026, d("2026-02-10"), &WindowPolicy::default());
        assert_eq!(windows[0], DateWindow { start: d("2026-01-01"), end: d("2026-01-15") });
        assert_eq!(windows[1].start, d("2026-01-16"));
        assert_eq!(windows.last().unwrap().end, d("2026-02-10"));
        assert!(windows.iter().all(|w| w.span_days() <= 15));
        assert_contiguous(&windows);
    }

    #[test]
    fn past_target_year_covers_gap_years_and_year_to_date() {
        let windows = plan_works_windows(2023, d("2026-03-01"), &WindowPolicy::default());
        assert_contiguous(&windows);
        assert_eq!(windows.first().unwrap().start, d("2023-01-01"));
        assert_eq!(windows.last().unwrap().end, d("2026-03-01"));

        // 2024 and 2025 appear as exactly two halves each.
        let y2024: Vec<_> = windows.iter().filter(|w| w.start.year() == 2024).collect();
        assert_eq!(y2024.len(), 2);
        assert_eq!(y2024[0].end, d("2024-07-01"));
        let y2025: Vec<_> = windows.iter().filter(|w| w.start.year() == 2025).collect();
        assert_eq!(y2025.len(), 2);

        // Year-to-date under 300 days stays whole.
        assert_eq!(*windows.last().unwrap(), DateWindow { start: d("2026-01-01"), end: d("2026-03-01") });
    }

    #[test]
    fn long_year_to_date_is_halved() {
        let windows = plan_works_windows(2025, d("2026-12-01"), &WindowPolicy::default());
        let ytd: Vec<_> = windows.iter().filter(|w| w.start.year() == 2026).collect();
        assert_eq!(ytd.len(), 2);
        assert_eq!(ytd[1].end, d("2026-12-01"));
    }

    #[test]
    fn future_year_plans_nothing() {
        assert!(plan_works_windows(2027, d("2026-05-01"), &WindowPolicy::default()).is_empty());
        assert!(plan_keyword_windows(2027, d("2026-05-01"), &WindowPolicy::default()).is_empty());
    }

    #[test]
    fn keyword_windows_cover_the_year_in_two_calls() {
        let windows = plan_keyword_windows(2025, d("2026-01-05"), &WindowPolicy::default());
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0], DateWindow { start: d("2025-01-01"), end: d("2025-10-28") });
        assert_eq!(windows[1], DateWindow { start: d("2025-10-29"), end: d("2025-12-31") });
    }

    #[test]
    fn first_of_january_is_a_single_window() {
        let windows = plan_works_windows(2026, d("2026-01-01"), &WindowPolicy::default());
        assert_eq!(windows, vec![DateWindow { start: d("2026-01-01"), end: d("2026-01-01") }]);
    }
}
