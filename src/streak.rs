use crate::models::CoffeeEntry;
use chrono::NaiveDate;
use std::collections::BTreeSet;

// Consecutive-day streak ending today. Walks the distinct entry days from
// most recent backwards; the i-th day must sit exactly i days before
// `today`, so a day without entries (including today itself) ends the walk.
pub fn compute_streak(entries: &[CoffeeEntry], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = entries
        .iter()
        .map(|entry| entry.timestamp.date_naive())
        .collect();

    let mut streak = 0;
    for (i, day) in days.iter().rev().enumerate() {
        let diff = (today - *day).num_days();
        if diff == i as i64 {
            streak += 1;
        } else if diff > i as i64 {
            break;
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CoffeeEntry, CoffeeType};
    use chrono::{Duration, Local, TimeZone};

    fn day(offset: i64) -> NaiveDate {
        today() - Duration::days(offset)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 18).unwrap()
    }

    fn entry_on(date: NaiveDate) -> CoffeeEntry {
        CoffeeEntry {
            id: format!("e-{date}"),
            kind: CoffeeType::Instantaneo,
            timestamp: Local
                .from_local_datetime(&date.and_hms_opt(10, 0, 0).unwrap())
                .unwrap(),
            date: None,
            notes: None,
        }
    }

    #[test]
    fn empty_collection_has_no_streak() {
        assert_eq!(compute_streak(&[], today()), 0);
    }

    #[test]
    fn single_entry_today_is_one() {
        assert_eq!(compute_streak(&[entry_on(day(0))], today()), 1);
    }

    #[test]
    fn entry_only_yesterday_breaks_immediately() {
        assert_eq!(compute_streak(&[entry_on(day(1))], today()), 0);
    }

    #[test]
    fn unbroken_run_counts_every_day() {
        let entries = vec![entry_on(day(0)), entry_on(day(1)), entry_on(day(2))];
        assert_eq!(compute_streak(&entries, today()), 3);
    }

    #[test]
    fn gap_stops_the_walk() {
        let entries = vec![
            entry_on(day(0)),
            entry_on(day(1)),
            entry_on(day(2)),
            entry_on(day(5)),
        ];
        assert_eq!(compute_streak(&entries, today()), 3);
    }

    #[test]
    fn several_entries_on_one_day_count_once() {
        let mut entries = vec![entry_on(day(0)), entry_on(day(1))];
        entries.push(entry_on(day(0)));
        entries.push(entry_on(day(1)));
        assert_eq!(compute_streak(&entries, today()), 2);
    }
}
