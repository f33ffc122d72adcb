//! Write side for expenses and incomes.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use common::{CreateTransactionRequest, TransactionDto, amount_violation};
use model::entities::{balance, expense, income, prelude::*};

use crate::convert::{expense_to_dto, income_to_dto};
use crate::error::{ComputeError, Result};
use crate::queries::{find_owned_balance, require_owned_balance};
use crate::timezone::{civil_date, resolve_in_zone};

/// Which ledger a transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Expense,
    Income,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Expense => write!(f, "expense"),
            TransactionKind::Income => write!(f, "income"),
        }
    }
}

/// A request that passed validation, with its date resolved to UTC.
struct NewTransaction {
    amount: Decimal,
    description: String,
    date: DateTime<Utc>,
    balance_id: String,
}

fn prepare(request: &CreateTransactionRequest, tz: Tz) -> Result<NewTransaction> {
    if let Some((_, message)) = amount_violation(&request.amount) {
        return Err(ComputeError::Validation(message.to_string()));
    }
    let description = request.description.trim();
    if description.is_empty() {
        return Err(ComputeError::Validation(
            "description must not be empty".to_string(),
        ));
    }

    Ok(NewTransaction {
        amount: request.amount,
        description: description.to_string(),
        date: resolve_in_zone(&request.date, tz)?,
        balance_id: request.balance_id.clone(),
    })
}

/// Fails with `Validation` when `date` is not one of the period's civil days.
fn ensure_within_period(period: &balance::Model, date: DateTime<Utc>, tz: Tz) -> Result<()> {
    let day = civil_date(date, tz);
    let (first, last) = (civil_date(period.start_date, tz), civil_date(period.end_date, tz));
    if day < first || day > last {
        warn!("Date {} is outside balance {} ({}..{})", day, period.id, first, last);
        return Err(ComputeError::Validation(format!(
            "date {} is outside the balance period {} to {}",
            day, first, last
        )));
    }
    Ok(())
}

async fn insert<C: ConnectionTrait>(
    db: &C,
    kind: TransactionKind,
    new: NewTransaction,
) -> Result<TransactionDto> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let dto = match kind {
        TransactionKind::Expense => {
            let model = expense::ActiveModel {
                id: Set(id),
                amount: Set(new.amount),
                description: Set(new.description),
                date: Set(new.date),
                created_at: Set(now),
                balance_id: Set(new.balance_id),
            }
            .insert(db)
            .await
            .map_err(|e| ComputeError::from_write(e, "expense"))?;
            expense_to_dto(&model)
        }
        TransactionKind::Income => {
            let model = income::ActiveModel {
                id: Set(id),
                amount: Set(new.amount),
                description: Set(new.description),
                date: Set(new.date),
                created_at: Set(now),
                balance_id: Set(new.balance_id),
            }
            .insert(db)
            .await
            .map_err(|e| ComputeError::from_write(e, "income"))?;
            income_to_dto(&model)
        }
    };
    Ok(dto)
}

/// Records one expense or income against a period owned by `user_id`.
#[instrument(skip(db, request, tz), fields(balance_id = %request.balance_id))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    kind: TransactionKind,
    request: &CreateTransactionRequest,
    tz: Tz,
) -> Result<TransactionDto> {
    let mut created = create_transactions(db, user_id, kind, std::slice::from_ref(request), tz).await?;
    created
        .pop()
        .ok_or_else(|| ComputeError::Validation("nothing was created".to_string()))
}

/// Records several transactions atomically: either all of them are stored or none.
#[instrument(skip(db, requests, tz), fields(count = requests.len()))]
pub async fn create_transactions(
    db: &DatabaseConnection,
    user_id: &str,
    kind: TransactionKind,
    requests: &[CreateTransactionRequest],
    tz: Tz,
) -> Result<Vec<TransactionDto>> {
    if requests.is_empty() {
        return Err(ComputeError::Validation(format!(
            "at least one {} is required",
            kind
        )));
    }

    let prepared = requests
        .iter()
        .map(|request| prepare(request, tz))
        .collect::<Result<Vec<_>>>()?;

    let txn = db.begin().await?;
    let mut periods: HashMap<String, balance::Model> = HashMap::new();
    let mut created = Vec::with_capacity(prepared.len());

    for new in prepared {
        if !periods.contains_key(&new.balance_id) {
            let period = require_owned_balance(&txn, user_id, &new.balance_id).await?;
            periods.insert(new.balance_id.clone(), period);
        }
        if let Some(period) = periods.get(&new.balance_id) {
            ensure_within_period(period, new.date, tz)?;
        }
        created.push(insert(&txn, kind, new).await?);
    }

    txn.commit().await?;
    info!("Created {} {} record(s)", created.len(), kind);
    Ok(created)
}

/// Deletes an expense or income whose period belongs to `user_id`.
#[instrument(skip(db))]
pub async fn delete_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    kind: TransactionKind,
    id: &str,
) -> Result<()> {
    let txn = db.begin().await?;
    let balance_id = match kind {
        TransactionKind::Expense => Expense::find_by_id(id.to_string())
            .one(&txn)
            .await?
            .map(|model| model.balance_id),
        TransactionKind::Income => Income::find_by_id(id.to_string())
            .one(&txn)
            .await?
            .map(|model| model.balance_id),
    };

    let not_found = || ComputeError::NotFound(format!("{} {} not found", kind, id));
    let balance_id = balance_id.ok_or_else(not_found)?;
    if find_owned_balance(&txn, user_id, &balance_id).await?.is_none() {
        debug!("{} {} belongs to another user's balance", kind, id);
        return Err(not_found());
    }

    let result = match kind {
        TransactionKind::Expense => Expense::delete_by_id(id.to_string()).exec(&txn).await?,
        TransactionKind::Income => Income::delete_by_id(id.to_string()).exec(&txn).await?,
    };
    if result.rows_affected == 0 {
        return Err(not_found());
    }
    txn.commit().await?;

    info!("Deleted {} {}", kind, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::get_daily_balances_by_period;
    use crate::testing::*;
    use common::DateInput;
    use sea_orm::PaginatorTrait;

    fn sao_paulo() -> Tz {
        chrono_tz::America::Sao_Paulo
    }

    fn request(amount: &str, description: &str, date: &str, balance_id: &str) -> CreateTransactionRequest {
        CreateTransactionRequest {
            amount: dec(amount),
            description: description.to_string(),
            date: DateInput::from(date),
            balance_id: balance_id.to_string(),
        }
    }

    async fn setup() -> DatabaseConnection {
        let db = setup_db().await;
        seed_user(&db, "alice").await;
        seed_user(&db, "bob").await;
        seed_balance(&db, "jan", "alice", "300", "2024-01-01T03:00:00Z", "2024-01-03T03:00:00Z").await;
        seed_balance(&db, "bob-jan", "bob", "300", "2024-01-01T03:00:00Z", "2024-01-03T03:00:00Z").await;
        db
    }

    #[tokio::test]
    async fn test_create_expense_reads_naive_dates_in_caller_zone() {
        let db = setup().await;

        let created = create_transaction(
            &db,
            "alice",
            TransactionKind::Expense,
            &request("50", "  Groceries ", "2024-01-02T23:30:00", "jan"),
            sao_paulo(),
        )
        .await
        .unwrap();

        assert_eq!(created.description, "Groceries");
        assert_eq!(created.date, utc("2024-01-03T02:30:00Z"));

        let rows = get_daily_balances_by_period(&db, "alice", "jan", None, sao_paulo())
            .await
            .unwrap();
        assert_eq!(rows[1].expenses.len(), 1);
        assert_eq!(rows[1].remaining_balance, dec("150"));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let db = setup().await;
        let tz = sao_paulo();

        let zero = create_transaction(&db, "alice", TransactionKind::Income, &request("0", "x", "2024-01-02", "jan"), tz).await;
        assert!(matches!(zero, Err(ComputeError::Validation(_))));

        let blank = create_transaction(&db, "alice", TransactionKind::Income, &request("5", "   ", "2024-01-02", "jan"), tz).await;
        assert!(matches!(blank, Err(ComputeError::Validation(_))));

        let outside = create_transaction(&db, "alice", TransactionKind::Income, &request("5", "x", "2024-01-04", "jan"), tz).await;
        assert!(matches!(outside, Err(ComputeError::Validation(_))));

        let foreign = create_transaction(&db, "alice", TransactionKind::Income, &request("5", "x", "2024-01-02", "bob-jan"), tz).await;
        assert!(matches!(foreign, Err(ComputeError::NotFound(_))));

        let empty = create_transactions(&db, "alice", TransactionKind::Income, &[], tz).await;
        assert!(matches!(empty, Err(ComputeError::Validation(_))));

        assert_eq!(Income::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_amounts_beyond_the_column_are_rejected() {
        let db = setup().await;
        let tz = sao_paulo();

        let huge = vec![
            request("50000000000000000000000000000", "jackpot", "2024-01-02", "jan"),
            request("50000000000000000000000000000", "jackpot", "2024-01-02", "jan"),
        ];
        let result = create_transactions(&db, "alice", TransactionKind::Income, &huge, tz).await;
        assert!(matches!(result, Err(ComputeError::Validation(_))));

        let precise = create_transaction(&db, "alice", TransactionKind::Expense, &request("12345678901234567.89", "x", "2024-01-02", "jan"), tz).await;
        assert!(matches!(precise, Err(ComputeError::Validation(_))));

        let fraction = create_transaction(&db, "alice", TransactionKind::Expense, &request("0.001", "x", "2024-01-02", "jan"), tz).await;
        assert!(matches!(fraction, Err(ComputeError::Validation(_))));

        create_transaction(&db, "alice", TransactionKind::Income, &request("9999999999.99", "max", "2024-01-02", "jan"), tz)
            .await
            .unwrap();
        let rows = get_daily_balances_by_period(&db, "alice", "jan", None, tz)
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(Income::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bulk_is_all_or_nothing() {
        let db = setup().await;
        let tz = sao_paulo();

        let batch = vec![
            request("10", "coffee", "2024-01-01", "jan"),
            request("20", "lunch", "2024-01-02", "jan"),
            request("30", "late", "2024-02-20", "jan"),
        ];
        let result = create_transactions(&db, "alice", TransactionKind::Expense, &batch, tz).await;
        assert!(matches!(result, Err(ComputeError::Validation(_))));
        assert_eq!(Expense::find().count(&db).await.unwrap(), 0);

        let created = create_transactions(&db, "alice", TransactionKind::Expense, &batch[..2], tz)
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(Expense::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_transactions() {
        let db = setup().await;
        seed_expense(&db, "e1", "jan", "50", "2024-01-02T15:00:00Z").await;
        seed_income(&db, "i1", "jan", "20", "2024-01-02T16:00:00Z").await;

        let foreign = delete_transaction(&db, "bob", TransactionKind::Expense, "e1").await;
        assert!(matches!(foreign, Err(ComputeError::NotFound(_))));
        assert_eq!(Expense::find().count(&db).await.unwrap(), 1);

        delete_transaction(&db, "alice", TransactionKind::Expense, "e1").await.unwrap();
        delete_transaction(&db, "alice", TransactionKind::Income, "i1").await.unwrap();
        assert_eq!(Expense::find().count(&db).await.unwrap(), 0);
        assert_eq!(Income::find().count(&db).await.unwrap(), 0);

        // Ids are not shared between ledgers
        let missing = delete_transaction(&db, "alice", TransactionKind::Income, "e1").await;
        assert!(matches!(missing, Err(ComputeError::NotFound(_))));
    }
}
