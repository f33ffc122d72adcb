use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use common::{BalanceDto, BalanceSnapshot, DailyBalanceRow};

use crate::daily::{overflow, sum_amounts};
use crate::error::Result;
use crate::timezone::civil_date;

/// Builds the "today" view of a period from its unfiltered ledger rows.
///
/// `daily_balance_today` is the remaining balance of the row on the reference civil day
/// (zero when the day lies outside the period). `total_remaining_until_today` is the
/// period amount plus every income minus every expense dated up to and including that day.
#[instrument(skip(period, rows, tz), fields(balance_id = %period.id))]
pub fn summarize(
    period: &BalanceDto,
    rows: &[DailyBalanceRow],
    reference: DateTime<Utc>,
    tz: Tz,
) -> Result<BalanceSnapshot> {
    let reference_day = civil_date(reference, tz);

    let daily_balance_today = rows
        .iter()
        .find(|row| civil_date(row.date, tz) == reference_day)
        .map(|row| row.remaining_balance)
        .unwrap_or(Decimal::ZERO);

    let mut total_remaining_until_today = period.amount;
    for row in rows.iter().filter(|row| civil_date(row.date, tz) <= reference_day) {
        let (incomes, expenses) = (sum_amounts(&row.incomes)?, sum_amounts(&row.expenses)?);
        total_remaining_until_today = total_remaining_until_today
            .checked_add(incomes)
            .and_then(|total| total.checked_sub(expenses))
            .ok_or_else(|| overflow("total remaining balance"))?;
    }
    debug!(%reference_day, %daily_balance_today, %total_remaining_until_today, "Summarized period");

    Ok(BalanceSnapshot {
        balance: period.clone(),
        daily_balance_today,
        total_remaining_until_today,
    })
}
