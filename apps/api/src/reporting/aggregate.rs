//! Read-only aggregates over a user's records. Month grouping uses the UTC
//! calendar month of `created_at`.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::carbon::round2;
use crate::records::models::EmissionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_carbon: f64,
    pub monthly_carbon: f64,
    pub total_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub percentage: i64,
    /// `total` before rounding, for threshold comparisons.
    #[serde(skip)]
    pub raw_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub month: String,
    pub total: f64,
}

/// Unrounded totals for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthBucket {
    pub first_day: NaiveDate,
    pub total: f64,
    pub count: usize,
}

impl MonthBucket {
    pub fn label(&self, format: &str) -> String {
        self.first_day.format(format).to_string()
    }
}

/// Sum of `total_emission`, unrounded.
pub fn total_carbon(records: &[EmissionRecord]) -> f64 {
    records.iter().map(|r| r.analysis.total_emission()).sum()
}

pub fn summarize(records: &[EmissionRecord]) -> Summary {
    summarize_at(records, Utc::now())
}

pub fn summarize_at(records: &[EmissionRecord], now: DateTime<Utc>) -> Summary {
    let monthly: f64 = records
        .iter()
        .filter(|r| r.created_at.year() == now.year() && r.created_at.month() == now.month())
        .map(|r| r.analysis.total_emission())
        .sum();

    Summary {
        total_carbon: round2(total_carbon(records)),
        monthly_carbon: round2(monthly),
        total_records: records.len(),
    }
}

/// Per-category totals, largest first.
pub fn category_breakdown(records: &[EmissionRecord]) -> Vec<CategoryTotal> {
    let grand_total = total_carbon(records);

    let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        *by_category.entry(record.analysis.category()).or_default() +=
            record.analysis.total_emission();
    }

    let mut breakdown: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total: round2(total),
            percentage: percentage_of(total, grand_total),
            raw_total: total,
        })
        .collect();

    breakdown.sort_by(|a, b| b.total.total_cmp(&a.total));
    breakdown
}

/// `round(100 × part / whole)`, or 0 when there is nothing to divide by.
pub fn percentage_of(part: f64, whole: f64) -> i64 {
    if whole > 0.0 {
        (part / whole * 100.0).round() as i64
    } else {
        0
    }
}

/// Chronological calendar-month buckets.
pub fn month_buckets(records: &[EmissionRecord]) -> Vec<MonthBucket> {
    let mut by_month: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for record in records {
        let date = record.created_at.date_naive();
        let first_day = date.with_day(1).unwrap_or(date);
        let entry = by_month.entry(first_day).or_default();
        entry.0 += record.analysis.total_emission();
        entry.1 += 1;
    }

    by_month
        .into_iter()
        .map(|(first_day, (total, count))| MonthBucket {
            first_day,
            total,
            count,
        })
        .collect()
}

/// Monthly totals labelled like `Mar 2024`, oldest first.
pub fn monthly_trend(records: &[EmissionRecord]) -> Vec<MonthlyTotal> {
    month_buckets(records)
        .into_iter()
        .map(|bucket| MonthlyTotal {
            month: bucket.label("%b %Y"),
            total: round2(bucket.total),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::fixtures::record_at;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(
            summarize(&[]),
            Summary {
                total_carbon: 0.0,
                monthly_carbon: 0.0,
                total_records: 0
            }
        );
    }

    #[test]
    fn test_summarize_uses_calendar_month() {
        let now = at(2024, 3, 2);
        let records = vec![
            record_at("electricity", 10.5, at(2024, 3, 1)),
            // Two days earlier, but last month.
            record_at("food", 20.25, at(2024, 2, 29)),
            // Same month number, different year.
            record_at("waste", 1.0, at(2023, 3, 15)),
        ];
        let summary = summarize_at(&records, now);
        assert_eq!(summary.total_carbon, 31.75);
        assert_eq!(summary.monthly_carbon, 10.5);
        assert_eq!(summary.total_records, 3);
    }

    #[test]
    fn test_category_breakdown_sorted_and_sums_to_100() {
        let now = at(2024, 1, 1);
        let records = vec![
            record_at("food", 10.0, now),
            record_at("electricity", 33.33, now),
            record_at("electricity", 20.0, now),
            record_at("transportation", 15.0, now),
            record_at("waste", 1.11, now),
        ];
        let breakdown = category_breakdown(&records);

        let order: Vec<&str> = breakdown.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(order, vec!["electricity", "transportation", "food", "waste"]);
        assert_eq!(breakdown[0].total, 53.33);

        let sum: i64 = breakdown.iter().map(|c| c.percentage).sum();
        assert!((99..=101).contains(&sum), "percentages summed to {sum}");
    }

    #[test]
    fn test_category_breakdown_zero_total() {
        let records = vec![record_at("waste", 0.0, at(2024, 1, 1))];
        let breakdown = category_breakdown(&records);
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].percentage, 0);
    }

    #[test]
    fn test_monthly_trend_is_chronological_across_years() {
        let records = vec![
            record_at("food", 2.0, at(2024, 1, 20)),
            record_at("food", 1.0, at(2023, 12, 5)),
            record_at("food", 3.0, at(2024, 1, 3)),
            record_at("food", 4.0, at(2023, 2, 14)),
        ];
        let trend = monthly_trend(&records);
        assert_eq!(
            trend,
            vec![
                MonthlyTotal {
                    month: "Feb 2023".into(),
                    total: 4.0
                },
                MonthlyTotal {
                    month: "Dec 2023".into(),
                    total: 1.0
                },
                MonthlyTotal {
                    month: "Jan 2024".into(),
                    total: 5.0
                },
            ]
        );
        assert_eq!(month_buckets(&records)[2].count, 2);
    }
}
