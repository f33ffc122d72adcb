//! Daily balance allocation.
//!
//! A period's amount is split evenly over its inclusive civil days. Each day gets
//! its base share plus whatever the previous day left over, plus the day's incomes,
//! minus the day's expenses. What remains becomes the next day's leftover.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use tracing::{debug, instrument, trace};

use common::{BalanceDto, DailyBalanceRow, TransactionDto};

use crate::error::{ComputeError, Result};
use crate::timezone::{
    civil_date, civil_date_start, civil_day_end, civil_day_start, days_between_inclusive,
};

/// Inclusive output window for [`compute_daily_rows`]. Compared by civil day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// First and last instant covered by the range once widened to whole civil days in `tz`.
    fn civil_bounds(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (civil_day_start(self.start, tz), civil_day_end(self.end, tz))
    }
}

/// Groups transactions by the civil day they fall on in `tz`, keeping each day in time order.
fn bucket_by_civil_day(
    transactions: &[TransactionDto],
    tz: Tz,
) -> BTreeMap<NaiveDate, Vec<TransactionDto>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<TransactionDto>> = BTreeMap::new();
    for transaction in transactions {
        buckets
            .entry(civil_date(transaction.date, tz))
            .or_default()
            .push(transaction.clone());
    }
    for day in buckets.values_mut() {
        day.sort_by_key(|t| t.date);
    }
    buckets
}

pub(crate) fn sum_amounts(transactions: &[TransactionDto]) -> Result<Decimal> {
    transactions
        .iter()
        .try_fold(Decimal::ZERO, |total, t| total.checked_add(t.amount))
        .ok_or_else(|| overflow("transaction total"))
}

pub(crate) fn overflow(what: &str) -> ComputeError {
    ComputeError::Overflow(format!("{} is out of range", what))
}

/// Produces one ledger row per civil day of `period`, in ascending order.
///
/// The carry-forward always runs over the whole period. `range`, when given, only
/// filters which rows are returned, so a window starting mid-period still carries
/// the leftover accumulated before it.
#[instrument(skip(period, expenses, incomes, tz), fields(balance_id = %period.id, tz = %tz))]
pub fn compute_daily_rows(
    period: &BalanceDto,
    expenses: &[TransactionDto],
    incomes: &[TransactionDto],
    tz: Tz,
    range: Option<DateRange>,
) -> Result<Vec<DailyBalanceRow>> {
    let start = civil_date(period.start_date, tz);
    let end = civil_date(period.end_date, tz).max(start);

    let total_days = days_between_inclusive(start, end).max(1);
    let base_share = period.amount / Decimal::from(total_days);
    debug!(%start, %end, total_days, %base_share, "Computing daily balances");

    let mut expenses_by_day = bucket_by_civil_day(expenses, tz);
    let mut incomes_by_day = bucket_by_civil_day(incomes, tz);

    let mut rows = Vec::with_capacity(total_days as usize);
    let mut leftover = Decimal::ZERO;

    for day in start.iter_days().take_while(|day| *day <= end) {
        let day_expenses = expenses_by_day.remove(&day).unwrap_or_default();
        let day_incomes = incomes_by_day.remove(&day).unwrap_or_default();

        let day_income = sum_amounts(&day_incomes)?;
        let day_spent = sum_amounts(&day_expenses)?;
        let total_available = base_share
            .checked_add(leftover)
            .and_then(|available| available.checked_add(day_income))
            .ok_or_else(|| overflow(&format!("available balance on {}", day)))?;
        let remaining_balance = total_available
            .checked_sub(day_spent)
            .ok_or_else(|| overflow(&format!("remaining balance on {}", day)))?;
        trace!(%day, %leftover, %total_available, %remaining_balance, "Day computed");

        rows.push(DailyBalanceRow {
            balance_id: period.id.clone(),
            date: civil_date_start(day, tz),
            base_balance: base_share,
            previous_day_leftover: leftover,
            expenses: day_expenses,
            incomes: day_incomes,
            total_available,
            remaining_balance,
        });

        leftover = remaining_balance;
    }

    if !expenses_by_day.is_empty() || !incomes_by_day.is_empty() {
        debug!(
            stray_expense_days = expenses_by_day.len(),
            stray_income_days = incomes_by_day.len(),
            "Transactions outside the period range were ignored"
        );
    }

    Ok(match range {
        Some(range) => {
            let (from, to) = range.civil_bounds(tz);
            rows.into_iter()
                .filter(|row| from <= row.date && row.date <= to)
                .collect()
        }
        None => rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timezone::parse_timezone;
    use std::str::FromStr;

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    fn period(amount: &str, start: &str, end: &str) -> BalanceDto {
        BalanceDto {
            id: "balance-1".into(),
            user_id: "user-1".into(),
            amount: dec(amount),
            start_date: utc(start),
            end_date: utc(end),
            created_at: utc(start),
        }
    }

    fn transaction(id: &str, amount: &str, date: &str) -> TransactionDto {
        TransactionDto {
            id: id.into(),
            amount: dec(amount),
            description: format!("{} description", id),
            date: utc(date),
            balance_id: "balance-1".into(),
            created_at: utc(date),
        }
    }

    fn assert_carry_forward(rows: &[DailyBalanceRow]) {
        for pair in rows.windows(2) {
            assert_eq!(pair[1].previous_day_leftover, pair[0].remaining_balance);
        }
        for row in rows {
            let incomes: Decimal = row.incomes.iter().map(|t| t.amount).sum();
            let expenses: Decimal = row.expenses.iter().map(|t| t.amount).sum();
            assert_eq!(
                row.total_available,
                row.base_balance + row.previous_day_leftover + incomes
            );
            assert_eq!(row.remaining_balance, row.total_available - expenses);
        }
    }

    #[test]
    fn test_three_day_example() {
        let tz = Tz::UTC;
        let period = period("300", "2024-01-01T00:00:00Z", "2024-01-03T00:00:00Z");
        let expenses = vec![transaction("e1", "50", "2024-01-02T12:00:00Z")];

        let rows = compute_daily_rows(&period, &expenses, &[], tz, None).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, utc("2024-01-01T00:00:00Z"));
        assert_eq!(rows[0].base_balance, dec("100"));
        assert_eq!(rows[0].previous_day_leftover, Decimal::ZERO);
        assert_eq!(rows[0].total_available, dec("100"));
        assert_eq!(rows[0].remaining_balance, dec("100"));

        assert_eq!(rows[1].previous_day_leftover, dec("100"));
        assert_eq!(rows[1].total_available, dec("200"));
        assert_eq!(rows[1].expenses.len(), 1);
        assert_eq!(rows[1].remaining_balance, dec("150"));

        assert_eq!(rows[2].previous_day_leftover, dec("150"));
        assert_eq!(rows[2].total_available, dec("250"));
        assert_eq!(rows[2].remaining_balance, dec("250"));

        assert_carry_forward(&rows);
    }

    #[test]
    fn test_incomes_add_to_available() {
        let tz = Tz::UTC;
        let period = period("300", "2024-01-01T00:00:00Z", "2024-01-03T00:00:00Z");
        let incomes = vec![
            transaction("i1", "20", "2024-01-01T08:00:00Z"),
            transaction("i2", "5.50", "2024-01-01T09:00:00Z"),
        ];
        let expenses = vec![transaction("e1", "200", "2024-01-03T20:00:00Z")];

        let rows = compute_daily_rows(&period, &expenses, &incomes, tz, None).unwrap();

        assert_eq!(rows[0].incomes.len(), 2);
        assert_eq!(rows[0].total_available, dec("125.50"));
        assert_eq!(rows[1].remaining_balance, dec("225.50"));
        assert_eq!(rows[2].total_available, dec("325.50"));
        assert_eq!(rows[2].remaining_balance, dec("125.50"));
        assert_carry_forward(&rows);
    }

    #[test]
    fn test_deficit_carries_forward() {
        let tz = Tz::UTC;
        let period = period("100", "2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z");
        let expenses = vec![transaction("e1", "80", "2024-01-01T10:00:00Z")];

        let rows = compute_daily_rows(&period, &expenses, &[], tz, None).unwrap();

        assert_eq!(rows[0].remaining_balance, dec("-30"));
        assert_eq!(rows[1].previous_day_leftover, dec("-30"));
        assert_eq!(rows[1].remaining_balance, dec("20"));
    }

    #[test]
    fn test_transactions_bucket_by_caller_zone() {
        let tz = parse_timezone("America/Sao_Paulo").unwrap();
        // Local midnights: May 30 03:00Z through June 1 03:00Z.
        let period = period("300", "2024-05-30T03:00:00Z", "2024-06-01T03:00:00Z");
        let expenses = vec![transaction("e1", "30", "2024-06-01T02:00:00Z")];

        let rows = compute_daily_rows(&period, &expenses, &[], tz, None).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].date, utc("2024-05-31T03:00:00Z"));
        assert_eq!(rows[1].expenses.len(), 1);
        assert!(rows[2].expenses.is_empty());

        // The same data read in UTC lands on June 1st instead.
        let rows_utc = compute_daily_rows(&period, &expenses, &[], Tz::UTC, None).unwrap();
        let june_first = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let june_first = rows_utc
            .iter()
            .find(|row| civil_date(row.date, Tz::UTC) == june_first)
            .unwrap();
        assert_eq!(june_first.expenses.len(), 1);
    }

    #[test]
    fn test_single_day_period() {
        let tz = Tz::UTC;
        let period = period("75", "2024-02-10T00:00:00Z", "2024-02-10T00:00:00Z");

        let rows = compute_daily_rows(&period, &[], &[], tz, None).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].base_balance, dec("75"));
        assert_eq!(rows[0].remaining_balance, dec("75"));
    }

    #[test]
    fn test_no_transactions_accumulates_base_share() {
        let tz = Tz::UTC;
        let period = period("400", "2024-03-01T00:00:00Z", "2024-03-04T00:00:00Z");

        let rows = compute_daily_rows(&period, &[], &[], tz, None).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].previous_day_leftover, Decimal::ZERO);
        assert_eq!(rows[0].remaining_balance, dec("100"));
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.base_balance, dec("100"));
            assert_eq!(row.previous_day_leftover, dec("100") * Decimal::from(i));
        }
        assert_eq!(rows[3].remaining_balance, period.amount);
        assert_carry_forward(&rows);
    }

    #[test]
    fn test_rows_are_contiguous() {
        let tz = parse_timezone("Europe/Prague").unwrap();
        // Spans the October DST change.
        let period = period("3100", "2024-10-14T22:00:00Z", "2024-11-13T23:00:00Z");

        let rows = compute_daily_rows(&period, &[], &[], tz, None).unwrap();

        assert_eq!(rows.len(), 31);
        for pair in rows.windows(2) {
            let previous = civil_date(pair[0].date, tz);
            let next = civil_date(pair[1].date, tz);
            assert_eq!(previous.succ_opt().unwrap(), next);
        }
    }

    #[test]
    fn test_range_filter_keeps_full_period_accumulation() {
        let tz = Tz::UTC;
        let period = period("500", "2024-01-01T00:00:00Z", "2024-01-05T00:00:00Z");
        let expenses = vec![transaction("e1", "40", "2024-01-02T12:00:00Z")];

        let full = compute_daily_rows(&period, &expenses, &[], tz, None).unwrap();
        let window = DateRange::new(utc("2024-01-03T00:00:00Z"), utc("2024-01-04T18:00:00Z"));
        let filtered = compute_daily_rows(&period, &expenses, &[], tz, Some(window)).unwrap();

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0], full[2]);
        assert_eq!(filtered[1], full[3]);
        // A window starting mid-period inherits the earlier leftover,
        // which a fresh computation starting at the window would not.
        assert_eq!(filtered[0].previous_day_leftover, dec("160"));
        assert_ne!(filtered[0].previous_day_leftover, Decimal::ZERO);

        // Starting at the period start the filter is transparent.
        let from_start = DateRange::new(period.start_date, utc("2024-01-02T00:00:00Z"));
        let head = compute_daily_rows(&period, &expenses, &[], tz, Some(from_start)).unwrap();
        assert_eq!(head, full[..2].to_vec());
    }

    #[test]
    fn test_transactions_outside_period_are_ignored() {
        let tz = Tz::UTC;
        let period = period("200", "2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z");
        let expenses = vec![transaction("late", "999", "2024-01-05T00:00:00Z")];

        let rows = compute_daily_rows(&period, &expenses, &[], tz, None).unwrap();

        assert!(rows.iter().all(|row| row.expenses.is_empty()));
        assert_eq!(rows[1].remaining_balance, dec("200"));
    }

    #[test]
    fn test_range_covers_whole_civil_days_in_caller_zone() {
        let tz = parse_timezone("America/Sao_Paulo").unwrap();
        let period = period("400", "2024-01-01T03:00:00Z", "2024-01-04T03:00:00Z");

        // Both bounds sit mid-day locally; the window still spans Jan 2 and Jan 3 entirely.
        let window = DateRange::new(utc("2024-01-02T20:00:00Z"), utc("2024-01-03T04:00:00Z"));
        let rows = compute_daily_rows(&period, &[], &[], tz, Some(window)).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, utc("2024-01-02T03:00:00Z"));
        assert_eq!(rows[1].date, utc("2024-01-03T03:00:00Z"));
        assert_eq!(rows[1].previous_day_leftover, dec("200"));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let tz = Tz::UTC;
        let period = period("300", "2024-01-01T00:00:00Z", "2024-01-03T00:00:00Z");
        let incomes = vec![
            transaction("i1", "50000000000000000000000000000", "2024-01-02T12:00:00Z"),
            transaction("i2", "50000000000000000000000000000", "2024-01-02T13:00:00Z"),
        ];

        let result = compute_daily_rows(&period, &[], &incomes, tz, None);
        assert!(matches!(result, Err(ComputeError::Overflow(_))));
    }
}
