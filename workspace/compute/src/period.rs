//! Write side for balance periods.
//!
//! Overlap checks and writes run inside one serializable transaction, and the
//! `(user_id, start_date)` unique index turns a lost race into a `Conflict`.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IsolationLevel, QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use common::{BalanceDto, DateInput, amount_violation};
use model::entities::{balance, expense, income, prelude::*};

use crate::convert::balance_to_dto;
use crate::error::{ComputeError, Result};
use crate::queries::require_owned_balance;
use crate::timezone::{civil_date, civil_day_start, days_between_inclusive, resolve_in_zone};

/// Longest period, in inclusive civil days. Every ledger query walks each day of the period.
pub const MAX_PERIOD_DAYS: i64 = 366;

/// Amount and civil range of a period, validated and normalized to civil day starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBounds {
    pub amount: Decimal,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PeriodBounds {
    /// Parses and validates caller input: a storable positive amount, and the start civil
    /// day strictly before the end civil day, both read in `tz`, at most
    /// [`MAX_PERIOD_DAYS`] days apart inclusive.
    pub fn from_input(amount: Decimal, start: &DateInput, end: &DateInput, tz: Tz) -> Result<Self> {
        if let Some((_, message)) = amount_violation(&amount) {
            return Err(ComputeError::Validation(message.to_string()));
        }

        let start = resolve_in_zone(start, tz)?;
        let end = resolve_in_zone(end, tz)?;
        let (first, last) = (civil_date(start, tz), civil_date(end, tz));
        if first >= last {
            return Err(ComputeError::Validation(
                "startDate must be before endDate".to_string(),
            ));
        }
        let days = days_between_inclusive(first, last);
        if days > MAX_PERIOD_DAYS {
            warn!(days, "Rejected period longer than {} days", MAX_PERIOD_DAYS);
            return Err(ComputeError::Validation(format!(
                "a balance period may span at most {} days",
                MAX_PERIOD_DAYS
            )));
        }

        Ok(Self {
            amount,
            start: civil_day_start(start, tz),
            end: civil_day_start(end, tz),
        })
    }
}

async fn begin_serializable(db: &DatabaseConnection) -> Result<DatabaseTransaction> {
    Ok(db
        .begin_with_config(Some(IsolationLevel::Serializable), None)
        .await?)
}

/// Fails with `Conflict` when another period of the same user overlaps `bounds`.
async fn ensure_no_overlap<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    bounds: &PeriodBounds,
    exclude_id: Option<&str>,
) -> Result<()> {
    let mut query = Balance::find()
        .filter(balance::Column::UserId.eq(user_id))
        .filter(balance::Column::StartDate.lte(bounds.end))
        .filter(balance::Column::EndDate.gte(bounds.start));
    if let Some(id) = exclude_id {
        query = query.filter(balance::Column::Id.ne(id));
    }

    if let Some(existing) = query.one(db).await? {
        warn!(
            "Period {}..{} overlaps existing balance {}",
            bounds.start, bounds.end, existing.id
        );
        return Err(ComputeError::Conflict(format!(
            "an overlapping balance period already exists ({})",
            existing.id
        )));
    }
    Ok(())
}

/// Creates a balance period for `user_id`.
#[instrument(skip(db, start, end, tz), fields(tz = %tz))]
pub async fn create_balance(
    db: &DatabaseConnection,
    user_id: &str,
    amount: Decimal,
    start: &DateInput,
    end: &DateInput,
    tz: Tz,
) -> Result<BalanceDto> {
    let bounds = PeriodBounds::from_input(amount, start, end, tz)?;
    debug!("Normalized period bounds: {:?}", bounds);

    let txn = begin_serializable(db).await?;
    ensure_no_overlap(&txn, user_id, &bounds, None).await?;

    let created = balance::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        amount: Set(bounds.amount),
        start_date: Set(bounds.start),
        end_date: Set(bounds.end),
        created_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await
    .map_err(|e| ComputeError::from_write(e, "balance period"))?;

    match txn.commit().await {
        Ok(_) => {
            info!("Created balance period {}", created.id);
            Ok(balance_to_dto(&created))
        }
        Err(e) => {
            error!("Failed to commit balance period: {}", e);
            Err(ComputeError::from_write(e, "balance period"))
        }
    }
}

/// Replaces amount and range of a period owned by `user_id`.
#[instrument(skip(db, start, end, tz), fields(tz = %tz))]
pub async fn update_balance(
    db: &DatabaseConnection,
    user_id: &str,
    balance_id: &str,
    amount: Decimal,
    start: &DateInput,
    end: &DateInput,
    tz: Tz,
) -> Result<BalanceDto> {
    let bounds = PeriodBounds::from_input(amount, start, end, tz)?;

    let txn = begin_serializable(db).await?;
    let existing = require_owned_balance(&txn, user_id, balance_id).await?;
    ensure_no_overlap(&txn, user_id, &bounds, Some(balance_id)).await?;

    let mut active: balance::ActiveModel = existing.into();
    active.amount = Set(bounds.amount);
    active.start_date = Set(bounds.start);
    active.end_date = Set(bounds.end);

    let updated = active
        .update(&txn)
        .await
        .map_err(|e| ComputeError::from_write(e, "balance period"))?;
    txn.commit().await?;

    info!("Updated balance period {}", updated.id);
    Ok(balance_to_dto(&updated))
}

/// Deletes a period owned by `user_id` together with its expenses and incomes.
#[instrument(skip(db))]
pub async fn delete_balance(db: &DatabaseConnection, user_id: &str, balance_id: &str) -> Result<()> {
    let txn = db.begin().await?;
    let existing = require_owned_balance(&txn, user_id, balance_id).await?;

    let expenses = Expense::delete_many()
        .filter(expense::Column::BalanceId.eq(existing.id.as_str()))
        .exec(&txn)
        .await?;
    let incomes = Income::delete_many()
        .filter(income::Column::BalanceId.eq(existing.id.as_str()))
        .exec(&txn)
        .await?;
    Balance::delete_by_id(existing.id.clone()).exec(&txn).await?;
    txn.commit().await?;

    info!(
        "Deleted balance period {} with {} expenses and {} incomes",
        existing.id, expenses.rows_affected, incomes.rows_affected
    );
    Ok(())
}
