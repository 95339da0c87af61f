//! Post-pass derivations over the per-day message counts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use recap_core::models::{DailyCount, PeakDay};

/// Length of the longest run of consecutive calendar days in `days`.
///
/// Input order and duplicates do not matter. Two days continue a run only if
/// they are exactly one calendar day apart. Returns 0 for no days.
pub fn longest_streak(days: &[NaiveDate]) -> u32 {
    let mut sorted = days.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut iter = sorted.into_iter();
    let Some(mut prev) = iter.next() else {
        return 0;
    };

    let mut current = 1u32;
    let mut best = 1u32;
    for day in iter {
        if day.signed_duration_since(prev).num_days() == 1 {
            current += 1;
        } else {
            current = 1;
        }
        best = best.max(current);
        prev = day;
    }
    best
}

/// The day with the highest count. Ties go to the earliest date.
pub fn peak_day(daily: &BTreeMap<NaiveDate, u64>) -> Option<PeakDay> {
    let mut peak: Option<PeakDay> = None;
    for (&date, &count) in daily {
        // strict: first maximum in ascending date order wins
        if peak.map_or(true, |p| count > p.count) {
            peak = Some(PeakDay { date, count });
        }
    }
    peak
}

/// Flatten the day map into the ascending list carried by the report.
pub fn daily_stats(daily: &BTreeMap<NaiveDate, u64>) -> Vec<DailyCount> {
    daily
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(&date, &count)| DailyCount { date, count })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // ── longest_streak ────────────────────────────────────────────────────────

    #[test]
    fn test_streak_empty_is_zero() {
        assert_eq!(longest_streak(&[]), 0);
    }

    #[test]
    fn test_streak_single_day() {
        assert_eq!(longest_streak(&[d(2024, 3, 1)]), 1);
    }

    #[test]
    fn test_streak_grows_with_consecutive_days() {
        let mut days = Vec::new();
        let mut last = 0;
        for offset in 0..10 {
            days.push(d(2024, 1, 1) + chrono::Duration::days(offset));
            let streak = longest_streak(&days);
            assert!(streak >= last);
            assert_eq!(streak, offset as u32 + 1);
            last = streak;
        }
    }

    #[test]
    fn test_streak_resets_after_gap() {
        let days = [d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 5)];
        assert_eq!(longest_streak(&days), 3);

        // The run after the gap starts again at 1 and only wins once longer.
        let more = [
            d(2024, 1, 1),
            d(2024, 1, 3),
            d(2024, 1, 4),
            d(2024, 1, 5),
            d(2024, 1, 6),
        ];
        assert_eq!(longest_streak(&more), 4);
    }

    #[test]
    fn test_streak_crosses_month_and_leap_day() {
        let days = [d(2024, 2, 28), d(2024, 2, 29), d(2024, 3, 1)];
        assert_eq!(longest_streak(&days), 3);
    }

    #[test]
    fn test_streak_ignores_order_and_duplicates() {
        let days = [d(2024, 5, 3), d(2024, 5, 1), d(2024, 5, 2), d(2024, 5, 2)];
        assert_eq!(longest_streak(&days), 3);
    }

    // ── peak_day ──────────────────────────────────────────────────────────────

    #[test]
    fn test_peak_day_tie_resolves_to_earlier_date() {
        let mut daily = BTreeMap::new();
        daily.insert(d(2024, 6, 10), 5);
        daily.insert(d(2024, 6, 2), 5);
        daily.insert(d(2024, 6, 5), 3);

        let peak = peak_day(&daily).unwrap();
        assert_eq!(peak.date, d(2024, 6, 2));
        assert_eq!(peak.count, 5);
    }

    #[test]
    fn test_peak_day_picks_maximum() {
        let mut daily = BTreeMap::new();
        daily.insert(d(2024, 1, 1), 1);
        daily.insert(d(2024, 1, 2), 9);
        daily.insert(d(2024, 1, 3), 4);
        assert_eq!(peak_day(&daily).unwrap().date, d(2024, 1, 2));
    }

    #[test]
    fn test_peak_day_empty() {
        assert!(peak_day(&BTreeMap::new()).is_none());
    }

    // ── daily_stats ───────────────────────────────────────────────────────────

    #[test]
    fn test_daily_stats_ascending() {
        let mut daily = BTreeMap::new();
        daily.insert(d(2024, 2, 1), 2);
        daily.insert(d(2024, 1, 1), 1);
        let stats = daily_stats(&daily);
        assert_eq!(stats[0].date, d(2024, 1, 1));
        assert_eq!(stats[1].date, d(2024, 2, 1));
    }
}
