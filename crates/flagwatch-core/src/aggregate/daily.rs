//! Per-day flag histogram, keyed by UTC calendar day.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, NaiveDate};
use serde::Serialize;

use flagwatch_shared::{Flag, Timestamp};

/// UTC calendar day of a timestamp. Out-of-range values land on the epoch.
pub fn day_of(timestamp: Timestamp) -> NaiveDate {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .date_naive()
}

/// Unpadded `Y-M-D` day label, e.g. `2024-3-7`.
pub fn day_key(day: NaiveDate) -> String {
    format!("{}-{}-{}", day.year(), day.month(), day.day())
}

fn parse_day_key(key: &str) -> Option<NaiveDate> {
    let mut parts = key.trim().splitn(3, '-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    pub total: usize,
    /// Counts per result tag, tags kept verbatim.
    pub result_counts: BTreeMap<String, usize>,
    pub unique_flagger_ids: BTreeSet<String>,
}

impl DailyBucket {
    pub fn unique_flaggers(&self) -> usize {
        self.unique_flagger_ids.len()
    }

    pub fn count(&self, result: &str) -> usize {
        self.result_counts.get(result).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyHistogram {
    buckets: BTreeMap<NaiveDate, DailyBucket>,
}

impl DailyHistogram {
    pub fn build(flags: &[Flag]) -> Self {
        let mut buckets: BTreeMap<NaiveDate, DailyBucket> = BTreeMap::new();
        for flag in flags {
            let bucket = buckets.entry(day_of(flag.timestamp)).or_default();
            bucket.total += 1;
            *bucket
                .result_counts
                .entry(flag.result.as_str().to_string())
                .or_insert(0) += 1;
            bucket.unique_flagger_ids.insert(flag.flagger.id.clone());
        }
        Self { buckets }
    }

    /// Look up a bucket by its `Y-M-D` label.
    pub fn get(&self, key: &str) -> Option<&DailyBucket> {
        parse_day_key(key).and_then(|day| self.buckets.get(&day))
    }

    /// Buckets in chronological order with their labels.
    pub fn iter(&self) -> impl Iterator<Item = (String, &DailyBucket)> {
        self.buckets.iter().map(|(day, bucket)| (day_key(*day), bucket))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum of all bucket totals.
    pub fn total(&self) -> usize {
        self.buckets.values().map(|b| b.total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flagwatch_shared::{Actor, FlagResult};

    fn flag(id: &str, ts: Timestamp, flagger: &str, result: &str) -> Flag {
        let mut f = Flag::new(id, ts, Actor::new(flagger), Actor::new("t"));
        f.result = FlagResult::parse(result);
        f
    }

    fn ts(y: i32, m: u32, d: u32, h: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp()
    }

    #[test]
    fn test_day_key_is_unpadded() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(day_key(day), "2024-3-7");
        assert_eq!(parse_day_key("2024-3-7"), Some(day));
        assert_eq!(parse_day_key("2024-03-07"), Some(day));
        assert_eq!(parse_day_key("yesterday"), None);
    }

    #[test]
    fn test_groups_by_utc_day() {
        let flags = vec![
            flag("a", ts(2024, 3, 7, 1), "x", "kicked"),
            flag("b", ts(2024, 3, 7, 23), "x", "failed"),
            flag("c", ts(2024, 3, 7, 12), "y", "kicked"),
            flag("d", ts(2024, 3, 8, 0), "y", "voting"),
        ];
        let hist = DailyHistogram::build(&flags);

        assert_eq!(hist.len(), 2);
        let first = hist.get("2024-3-7").unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(first.count("kicked"), 2);
        assert_eq!(first.count("failed"), 1);
        assert_eq!(first.count("voting"), 0);
        assert_eq!(first.unique_flaggers(), 2);

        let second = hist.get("2024-3-8").unwrap();
        assert_eq!(second.total, 1);
        assert_eq!(second.unique_flaggers(), 1);

        let labels: Vec<String> = hist.iter().map(|(k, _)| k).collect();
        assert_eq!(labels, ["2024-3-7", "2024-3-8"]);
        assert_eq!(hist.total(), 4);
    }

    #[test]
    fn test_unknown_results_counted_verbatim() {
        let hist = DailyHistogram::build(&[flag("a", 100, "x", "disputed")]);
        assert_eq!(hist.get("1970-1-1").unwrap().count("disputed"), 1);
    }
}
