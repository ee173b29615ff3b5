use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::feed::{entry_date, LogEntry};

// Event names recognized by the aggregation. Anything else still shows up
// in the raw list but is not counted.
pub const HUNGRY_EVENT: &str = "Hungry Detected";
pub const FEEDER_EVENT: &str = "Auto Feeder Triggered";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounts {
    pub hungry: u64,
    pub feeder: u64,
}

/// Per-day counts of the two recognized events, keyed by calendar date.
///
/// The BTreeMap keeps days in chronological order of the underlying date,
/// so label formatting can never reorder the series.
#[derive(Debug, Default)]
pub struct DailyAggregate {
    days: BTreeMap<NaiveDate, DayCounts>,
}

/// The single current display filter.
///
/// Every application is a full replace derived from the complete aggregate;
/// a range filter and a month filter override each other rather than
/// composing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    All,
    /// Last `n` days of the aggregate, clamped to the full range.
    Range(usize),
    /// Calendar month, 0-based (0 = January), matching the dropdown values.
    Month(u32),
}

/// Three parallel sequences, equal length by construction.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub hungry: Vec<u64>,
    pub feeder: Vec<u64>,
}

impl Filter {
    /// Map the wire parameters to a filter. A concrete month wins over a
    /// range; "all" and out-of-range values fall back to `All`.
    pub fn parse(range: Option<usize>, month: Option<&str>) -> Filter {
        if let Some(m) = month {
            if m == "all" {
                return Filter::All;
            }
            return match m.parse::<u32>() {
                Ok(idx) if idx < 12 => Filter::Month(idx),
                _ => Filter::All,
            };
        }
        match range {
            Some(n) => Filter::Range(n),
            None => Filter::All,
        }
    }
}

impl DailyAggregate {
    /// Group entries by the date portion of their timestamp and count the
    /// two recognized events. Entries with unparseable dates are skipped;
    /// a day observed only through unrecognized events still gets a key
    /// with zero counts.
    pub fn from_entries(entries: &[LogEntry]) -> Self {
        let mut days: BTreeMap<NaiveDate, DayCounts> = BTreeMap::new();
        for entry in entries {
            let Some(date) = entry_date(entry) else {
                continue;
            };
            let counts = days.entry(date).or_default();
            match entry.event.as_str() {
                HUNGRY_EVENT => counts.hungry += 1,
                FEEDER_EVENT => counts.feeder += 1,
                _ => {}
            }
        }
        Self { days }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn counts(&self, date: NaiveDate) -> Option<DayCounts> {
        self.days.get(&date).copied()
    }

    /// Build the label/count series for one filter, always from the full
    /// aggregate.
    pub fn series(&self, filter: Filter) -> ChartSeries {
        let selected: Vec<(&NaiveDate, &DayCounts)> = match filter {
            Filter::All => self.days.iter().collect(),
            Filter::Range(n) => {
                let skip = self.days.len().saturating_sub(n);
                self.days.iter().skip(skip).collect()
            }
            Filter::Month(idx) => self
                .days
                .iter()
                .filter(|(date, _)| date.month0() == idx)
                .collect(),
        };

        let mut series = ChartSeries {
            labels: Vec::with_capacity(selected.len()),
            hungry: Vec::with_capacity(selected.len()),
            feeder: Vec::with_capacity(selected.len()),
        };
        for (date, counts) in selected {
            series.labels.push(format_label(*date));
            series.hungry.push(counts.hungry);
            series.feeder.push(counts.feeder);
        }
        series
    }
}

// "Jan 5" style axis labels.
fn format_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}
