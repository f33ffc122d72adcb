//! Read side: period lookups composed with the allocation engine.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, info, instrument, warn};

use common::{BalanceDto, BalanceSnapshot, BalanceWithTransactions, DailyBalanceRow, TransactionDto};
use model::entities::{balance, expense, income, prelude::*};

use crate::convert::{balance_to_dto, expense_to_dto, income_to_dto};
use crate::daily::{DateRange, compute_daily_rows};
use crate::error::{ComputeError, Result};
use crate::summary::summarize;
use crate::timezone::civil_date;

/// Stored bounds are civil midnights in whichever zone created the period. Widening
/// the SQL window by this much covers any pair of UTC offsets before the exact check.
const ZONE_MARGIN_DAYS: i64 = 2;

/// A period owned by `user_id`, or `None` for missing and foreign periods alike.
pub(crate) async fn find_owned_balance<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    balance_id: &str,
) -> Result<Option<balance::Model>> {
    Ok(Balance::find_by_id(balance_id.to_string())
        .filter(balance::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

pub(crate) async fn require_owned_balance<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    balance_id: &str,
) -> Result<balance::Model> {
    find_owned_balance(db, user_id, balance_id)
        .await?
        .ok_or_else(|| ComputeError::NotFound(format!("balance {} not found", balance_id)))
}

/// All expenses and incomes of a period, oldest first.
pub(crate) async fn load_transactions<C: ConnectionTrait>(
    db: &C,
    balance_id: &str,
) -> Result<(Vec<TransactionDto>, Vec<TransactionDto>)> {
    let expenses = Expense::find()
        .filter(expense::Column::BalanceId.eq(balance_id))
        .order_by_asc(expense::Column::Date)
        .all(db)
        .await?;
    let incomes = Income::find()
        .filter(income::Column::BalanceId.eq(balance_id))
        .order_by_asc(income::Column::Date)
        .all(db)
        .await?;

    Ok((
        expenses.iter().map(expense_to_dto).collect(),
        incomes.iter().map(income_to_dto).collect(),
    ))
}

/// Periods of `user_id` whose civil range in `tz` intersects the civil days of `[from, to]`.
async fn find_periods_touching(
    db: &DatabaseConnection,
    user_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    tz: Tz,
) -> Result<Vec<balance::Model>> {
    let margin = Duration::days(ZONE_MARGIN_DAYS);
    let upper = to.checked_add_signed(margin).unwrap_or(DateTime::<Utc>::MAX_UTC);
    let lower = from.checked_sub_signed(margin).unwrap_or(DateTime::<Utc>::MIN_UTC);

    let candidates = Balance::find()
        .filter(balance::Column::UserId.eq(user_id))
        .filter(balance::Column::StartDate.lte(upper))
        .filter(balance::Column::EndDate.gte(lower))
        .order_by_asc(balance::Column::StartDate)
        .all(db)
        .await?;

    let (from_day, to_day) = (civil_date(from, tz), civil_date(to, tz));
    Ok(candidates
        .into_iter()
        .filter(|period| {
            civil_date(period.start_date, tz) <= to_day
                && civil_date(period.end_date, tz) >= from_day
        })
        .collect())
}

async fn snapshot_for(
    db: &DatabaseConnection,
    period: &balance::Model,
    reference: DateTime<Utc>,
    tz: Tz,
) -> Result<BalanceSnapshot> {
    let dto = balance_to_dto(period);
    let (expenses, incomes) = load_transactions(db, &period.id).await?;
    let rows = compute_daily_rows(&dto, &expenses, &incomes, tz, None)?;
    summarize(&dto, &rows, reference, tz)
}

/// Every period of the user, ordered by start date.
#[instrument(skip(db))]
pub async fn list_user_balances(db: &DatabaseConnection, user_id: &str) -> Result<Vec<BalanceDto>> {
    let periods = Balance::find()
        .filter(balance::Column::UserId.eq(user_id))
        .order_by_asc(balance::Column::StartDate)
        .all(db)
        .await?;
    debug!("Found {} balance periods", periods.len());
    Ok(periods.iter().map(balance_to_dto).collect())
}

#[instrument(skip(db))]
pub async fn get_user_balance(
    db: &DatabaseConnection,
    user_id: &str,
    balance_id: &str,
) -> Result<BalanceDto> {
    let period = require_owned_balance(db, user_id, balance_id).await?;
    Ok(balance_to_dto(&period))
}

/// A period together with all of its expenses and incomes.
#[instrument(skip(db))]
pub async fn get_balance_with_transactions(
    db: &DatabaseConnection,
    user_id: &str,
    balance_id: &str,
) -> Result<BalanceWithTransactions> {
    let period = require_owned_balance(db, user_id, balance_id).await?;
    let (expenses, incomes) = load_transactions(db, &period.id).await?;
    debug!(
        "Balance {} has {} expenses and {} incomes",
        period.id,
        expenses.len(),
        incomes.len()
    );
    Ok(BalanceWithTransactions {
        balance: balance_to_dto(&period),
        expenses,
        incomes,
    })
}

/// The per-day ledger of one period, optionally narrowed to `range`.
///
/// Missing periods and periods owned by someone else yield an empty ledger.
#[instrument(skip(db, tz), fields(tz = %tz))]
pub async fn get_daily_balances_by_period(
    db: &DatabaseConnection,
    user_id: &str,
    balance_id: &str,
    range: Option<DateRange>,
    tz: Tz,
) -> Result<Vec<DailyBalanceRow>> {
    let Some(period) = find_owned_balance(db, user_id, balance_id).await? else {
        warn!("Balance {} not found for user, returning no rows", balance_id);
        return Ok(Vec::new());
    };

    let (expenses, incomes) = load_transactions(db, &period.id).await?;
    let rows = compute_daily_rows(&balance_to_dto(&period), &expenses, &incomes, tz, range)?;
    info!("Computed {} daily rows for balance {}", rows.len(), period.id);
    Ok(rows)
}

/// The period containing the civil day of `date`, with that day's snapshot.
#[instrument(skip(db, tz), fields(tz = %tz))]
pub async fn get_balance_for_date(
    db: &DatabaseConnection,
    user_id: &str,
    date: DateTime<Utc>,
    tz: Tz,
) -> Result<BalanceSnapshot> {
    let period = find_periods_touching(db, user_id, date, date, tz)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            ComputeError::NotFound(format!("no balance period contains {}", civil_date(date, tz)))
        })?;

    debug!("Balance {} contains the requested day", period.id);
    snapshot_for(db, &period, date, tz).await
}

/// Periods overlapping `[start, end]`, each summarized as of `now` rather than `end`.
#[instrument(skip(db, tz), fields(tz = %tz))]
pub async fn get_balances_for_period_range(
    db: &DatabaseConnection,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: Tz,
    now: Option<DateTime<Utc>>,
) -> Result<Vec<BalanceSnapshot>> {
    if civil_date(start, tz) > civil_date(end, tz) {
        return Err(ComputeError::Validation(
            "startDate must not be after endDate".to_string(),
        ));
    }
    let now = now.unwrap_or_else(Utc::now);

    let periods = find_periods_touching(db, user_id, start, end, tz).await?;
    debug!("Found {} periods overlapping the range", periods.len());

    let mut snapshots = Vec::with_capacity(periods.len());
    for period in &periods {
        snapshots.push(snapshot_for(db, period, now, tz).await?);
    }
    Ok(snapshots)
}
