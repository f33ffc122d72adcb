//! Root for all SeaORM entity modules.
//!
//! Users and sessions belong to the identity provider; balances, expenses
//! and incomes are owned by this service.

pub mod balance;
pub mod expense;
pub mod income;
pub mod session;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::balance::Entity as Balance;
    pub use super::expense::Entity as Expense;
    pub use super::income::Entity as Income;
    pub use super::session::Entity as Session;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let now = Utc::now();

        let owner = user::ActiveModel {
            id: Set("user-1".to_string()),
            name: Set("Ana".to_string()),
            email: Set("ana@example.com".to_string()),
            created_at: Set(now),
        }
        .insert(&db)
        .await?;

        let period = balance::ActiveModel {
            id: Set("balance-1".to_string()),
            user_id: Set(owner.id.clone()),
            amount: Set(Decimal::new(30000, 2)),
            start_date: Set(Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap()),
            end_date: Set(Utc.with_ymd_and_hms(2024, 1, 3, 3, 0, 0).unwrap()),
            created_at: Set(now),
        }
        .insert(&db)
        .await?;

        expense::ActiveModel {
            id: Set("expense-1".to_string()),
            amount: Set(Decimal::new(5000, 2)),
            description: Set("Groceries".to_string()),
            date: Set(Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap()),
            created_at: Set(now),
            balance_id: Set(period.id.clone()),
        }
        .insert(&db)
        .await?;

        income::ActiveModel {
            id: Set("income-1".to_string()),
            amount: Set(Decimal::new(2000, 2)),
            description: Set("Refund".to_string()),
            date: Set(Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap()),
            created_at: Set(now),
            balance_id: Set(period.id.clone()),
        }
        .insert(&db)
        .await?;

        // Related lookups
        let expenses = period.find_related(Expense).all(&db).await?;
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].amount, Decimal::new(5000, 2));

        let incomes = period.find_related(Income).all(&db).await?;
        assert_eq!(incomes.len(), 1);

        let stored = Balance::find_by_id("balance-1").one(&db).await?.unwrap();
        assert_eq!(stored.amount, Decimal::new(30000, 2));
        assert_eq!(stored.start_date, period.start_date);

        // Deleting the period cascades to its transactions
        Balance::delete_by_id("balance-1").exec(&db).await?;
        let remaining_expenses = Expense::find()
            .filter(expense::Column::BalanceId.eq("balance-1"))
            .count(&db)
            .await?;
        let remaining_incomes = Income::find()
            .filter(income::Column::BalanceId.eq("balance-1"))
            .count(&db)
            .await?;
        assert_eq!(remaining_expenses, 0);
        assert_eq!(remaining_incomes, 0);

        Ok(())
    }
}
