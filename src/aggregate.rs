//! Aggregates derived from the accepted transaction collection.
//!
//! Everything here is pure and recomputed wholesale from the full
//! collection on every tick.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::clock::days_between;
use crate::models::Transaction;

/// Average month length in days, leap years included.
pub const DAYS_PER_MONTH: f64 = 30.44;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateSnapshot {
    /// `"YYYY"` to sum of amounts.
    pub year_totals: BTreeMap<String, i64>,
    /// `"YYYY"` to the sum of each transaction's rounded twelfth.
    pub year_averages: BTreeMap<String, i64>,
    /// `"YYYYMM"` to sum of amounts.
    pub year_months: BTreeMap<String, i64>,
    /// Signed sum of every amount. Spend is negative.
    pub full_total: i64,
    /// How far through the sync window the accepted data reaches, 0..=100
    /// in the normal case.
    pub percentage: i64,
}

/// Recomputes [`AggregateSnapshot`]s.
pub struct AggregationEngine;

impl AggregationEngine {
    pub fn recompute(
        transactions: &[Transaction],
        window_start: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AggregateSnapshot {
        let mut snapshot = AggregateSnapshot::default();

        for tx in transactions {
            let amount = tx.amount;
            let year = tx.year().unwrap_or_default();
            let month = tx.month().unwrap_or_default();

            *snapshot.year_totals.entry(year.to_string()).or_insert(0) += amount;
            // Rounded per transaction, then summed.
            *snapshot.year_averages.entry(year.to_string()).or_insert(0) +=
                round_half_up(amount as f64 / 12.0);
            *snapshot
                .year_months
                .entry(format!("{year}{month}"))
                .or_insert(0) += amount;

            snapshot.full_total += amount;
        }

        snapshot.percentage = progress_percentage(transactions, window_start, now);
        snapshot
    }
}

/// Share of the window (start to now) covered by the last accepted
/// transaction, rounded to a whole percent.
///
/// Zero when there is no window start, no transactions, an unparseable
/// timestamp, or an empty window.
pub fn progress_percentage(
    transactions: &[Transaction],
    window_start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let Some(start) = window_start else {
        return 0;
    };
    let Some(last) = transactions.last().and_then(Transaction::created_at) else {
        return 0;
    };

    let window_days = days_between(start, now);
    if window_days <= 0.0 {
        return 0;
    }

    round_half_up(days_between(start, last) / window_days * 100.0)
}

/// Monthly transit spend in pounds: the sign-corrected total divided by the
/// months elapsed since the window started, to two decimal places.
///
/// Zero without a window start or when nothing was spent.
pub fn monthly_average(
    full_total: i64,
    window_start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Decimal {
    let Some(start) = window_start else {
        return Decimal::ZERO;
    };

    let spent = Decimal::new(-full_total, 2);
    if spent <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let exact_months = days_between(start, now) / DAYS_PER_MONTH;
    let Some(months) = Decimal::from_f64(exact_months).filter(|m| *m > Decimal::ZERO) else {
        return Decimal::ZERO;
    };

    (spent / months).round_dp(2)
}

/// Round half towards positive infinity (`-2.5` becomes `-2`).
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn tx(id: &str, amount: i64, created: &str) -> Transaction {
        Transaction::new(id, "acc", amount, created)
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn empty_collection_gives_empty_snapshot() {
        let snapshot = AggregationEngine::recompute(&[], Some(utc(2023, 1, 1)), utc(2024, 1, 1));
        assert_eq!(snapshot, AggregateSnapshot::default());
    }

    #[test]
    fn totals_by_year_and_month() {
        let txns = vec![
            tx("a", -280, "2023-11-02T08:00:00Z"),
            tx("b", -150, "2023-11-20T08:00:00Z"),
            tx("c", -700, "2023-12-01T08:00:00Z"),
            tx("d", -240, "2024-01-03T08:00:00Z"),
        ];
        let snapshot = AggregationEngine::recompute(&txns, None, utc(2024, 2, 1));

        assert_eq!(snapshot.year_totals["2023"], -1130);
        assert_eq!(snapshot.year_totals["2024"], -240);
        assert_eq!(snapshot.year_months["202311"], -430);
        assert_eq!(snapshot.year_months["202312"], -700);
        assert_eq!(snapshot.year_months["202401"], -240);
        assert_eq!(snapshot.full_total, -1370);
    }

    #[test]
    fn year_totals_sum_to_full_total() {
        let txns: Vec<_> = (0..40)
            .map(|i| {
                tx(
                    &format!("t{i}"),
                    -(i * 37 + 5),
                    &format!("{}-{:02}-10T00:00:00Z", 2022 + i % 3, 1 + i % 12),
                )
            })
            .collect();
        let snapshot = AggregationEngine::recompute(&txns, None, utc(2025, 1, 1));

        let sum: i64 = txns.iter().map(|t| t.amount).sum();
        assert_eq!(snapshot.full_total, sum);
        assert_eq!(snapshot.year_totals.values().sum::<i64>(), sum);
        assert_eq!(snapshot.year_months.values().sum::<i64>(), sum);
    }

    #[test]
    fn year_average_rounds_each_transaction() {
        // -150/12 = -12.5 rounds to -12; twice gives -24, not round(-300/12) = -25.
        let txns = vec![
            tx("a", -150, "2023-03-01T00:00:00Z"),
            tx("b", -150, "2023-03-02T00:00:00Z"),
        ];
        let snapshot = AggregationEngine::recompute(&txns, None, utc(2024, 1, 1));
        assert_eq!(snapshot.year_averages["2023"], -24);
    }

    #[test]
    fn rounding_matches_half_up() {
        assert_eq!(round_half_up(-12.5), -12);
        assert_eq!(round_half_up(12.5), 13);
        assert_eq!(round_half_up(-12.51), -13);
        assert_eq!(round_half_up(0.49), 0);
    }

    #[test]
    fn percentage_half_way_through_year() {
        let txns = vec![tx("a", -280, "2023-07-01T00:00:00Z")];
        let pct = progress_percentage(&txns, Some(utc(2023, 1, 1)), utc(2024, 1, 1));
        // 181 / 365 days.
        assert_eq!(pct, 50);
    }

    #[test]
    fn percentage_uses_last_transaction() {
        let txns = vec![
            tx("a", -280, "2023-12-01T00:00:00Z"),
            tx("b", -280, "2023-04-01T00:00:00Z"),
        ];
        let pct = progress_percentage(&txns, Some(utc(2023, 1, 1)), utc(2024, 1, 1));
        assert_eq!(pct, 25);
    }

    #[test]
    fn percentage_is_zero_without_data_or_window() {
        let txns = vec![tx("a", -280, "2023-07-01T00:00:00Z")];
        assert_eq!(progress_percentage(&[], Some(utc(2023, 1, 1)), utc(2024, 1, 1)), 0);
        assert_eq!(progress_percentage(&txns, None, utc(2024, 1, 1)), 0);
    }

    #[test]
    fn percentage_with_empty_window_does_not_fault() {
        let txns = vec![tx("a", -280, "2023-07-01T00:00:00Z")];
        let start = utc(2024, 1, 1);
        assert_eq!(progress_percentage(&txns, Some(start), start), 0);
        assert_eq!(progress_percentage(&txns, Some(start), utc(2023, 6, 1)), 0);
    }

    #[test]
    fn monthly_average_over_elapsed_months() {
        // 365 days is 11.99 months; £120 / 11.99 = £10.01.
        let avg = monthly_average(-12_000, Some(utc(2023, 1, 1)), utc(2024, 1, 1));
        assert_eq!(avg, Decimal::from_str("10.01").unwrap());
    }

    #[test]
    fn monthly_average_is_zero_for_income_or_missing_window() {
        assert_eq!(monthly_average(500, Some(utc(2023, 1, 1)), utc(2024, 1, 1)), Decimal::ZERO);
        assert_eq!(monthly_average(0, Some(utc(2023, 1, 1)), utc(2024, 1, 1)), Decimal::ZERO);
        assert_eq!(monthly_average(-12_000, None, utc(2024, 1, 1)), Decimal::ZERO);
        let start = utc(2024, 1, 1);
        assert_eq!(monthly_average(-12_000, Some(start), start), Decimal::ZERO);
    }
}
