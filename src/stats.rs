use crate::dates::{self, DayPart};
use crate::models::{
    CoffeeEntry, CoffeeType, HabitsResponse, MonthlyEvolution, RecordsSummary, SkippedEntry,
    TimeDistribution, TimeRange, TimeSlot, Totals, WeeklyPattern,
};
use crate::streak::compute_streak;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Timelike};
use std::collections::BTreeMap;
use tracing::warn;

pub const MONTH_WINDOW: usize = 6;

const MONTH_LABELS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

pub fn build_habits(entries: &[CoffeeEntry], range: TimeRange, now: DateTime<Local>) -> HabitsResponse {
    let filtered = filter_range(entries, range, now);

    HabitsResponse {
        range,
        weekly_pattern: weekly_pattern(&filtered),
        // Always over the full collection, whatever the range selector says.
        monthly_evolution: monthly_evolution(entries, now),
        time_distribution: time_distribution(&filtered),
        by_type: type_histogram(&filtered),
        records: compute_records(&filtered, now.date_naive()),
    }
}

fn filter_range(entries: &[CoffeeEntry], range: TimeRange, now: DateTime<Local>) -> Vec<CoffeeEntry> {
    match range {
        TimeRange::All => entries.to_vec(),
        TimeRange::Last30Days => {
            let cutoff = now - Duration::days(30);
            entries
                .iter()
                .filter(|entry| entry.timestamp >= cutoff)
                .cloned()
                .collect()
        }
    }
}

pub fn compute_totals(entries: &[CoffeeEntry], now: DateTime<Local>) -> Totals {
    let today = now.date_naive();
    let mut totals = Totals::default();
    for entry in entries {
        let ts = entry.timestamp;
        if ts.date_naive() == today {
            totals.today += 1;
        }
        if ts.month() == now.month() && ts.year() == now.year() {
            totals.month += 1;
        }
        if ts.year() == now.year() {
            totals.year += 1;
        }
    }
    totals
}

pub fn weekly_pattern(entries: &[CoffeeEntry]) -> WeeklyPattern {
    let mut counts = [0u64; 7];
    let mut skipped = Vec::new();
    for entry in entries {
        match dates::logical_day(entry) {
            Ok(day) => counts[dates::weekday_index(day)] += 1,
            Err(err) => {
                warn!("entry {} excluded from weekly pattern: {err}", entry.id);
                skipped.push(SkippedEntry {
                    id: entry.id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    let max = counts.iter().copied().max().unwrap_or(0).max(1);
    let heights = counts.map(|count| count as f64 / max as f64 * 100.0);

    WeeklyPattern {
        counts,
        heights,
        skipped,
    }
}

pub fn monthly_evolution(entries: &[CoffeeEntry], now: DateTime<Local>) -> MonthlyEvolution {
    let mut months = Vec::with_capacity(MONTH_WINDOW);
    let mut counts = Vec::with_capacity(MONTH_WINDOW);

    for offset in (0..MONTH_WINDOW as i32).rev() {
        let (year, month) = shift_month(now.year(), now.month(), -offset);
        months.push(MONTH_LABELS[month as usize - 1].to_string());
        counts.push(
            entries
                .iter()
                .filter(|entry| entry.timestamp.year() == year && entry.timestamp.month() == month)
                .count() as u64,
        );
    }

    MonthlyEvolution { months, counts }
}

fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

pub fn time_distribution(entries: &[CoffeeEntry]) -> TimeDistribution {
    let mut morning = 0u64;
    let mut afternoon = 0u64;
    let mut night = 0u64;
    for entry in entries {
        match dates::day_part(entry.timestamp.hour()) {
            DayPart::Morning => morning += 1,
            DayPart::Afternoon => afternoon += 1,
            DayPart::Night => night += 1,
        }
    }

    // Flooring the denominator at 1 keeps the empty case at 0% everywhere.
    let total = (morning + afternoon + night).max(1);
    let slot = |count: u64| TimeSlot {
        count,
        percent: (count as f64 / total as f64 * 100.0).round() as u8,
    };

    TimeDistribution {
        morning: slot(morning),
        afternoon: slot(afternoon),
        night: slot(night),
    }
}

pub fn type_histogram(entries: &[CoffeeEntry]) -> BTreeMap<CoffeeType, u64> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.kind).or_insert(0) += 1;
    }
    counts
}

pub fn compute_records(entries: &[CoffeeEntry], today: NaiveDate) -> RecordsSummary {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for entry in entries {
        *per_day.entry(entry.timestamp.date_naive()).or_insert(0) += 1;
    }

    RecordsSummary {
        streak: compute_streak(entries, today),
        max_per_day: per_day.values().copied().max().unwrap_or(0),
        total: entries.len() as u64,
    }
}
