use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_table::{Balances, Expenses, Incomes};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // A user can never have two periods starting on the same instant.
        // General overlap is checked inside a serializable transaction on write.
        manager
            .create_index(
                Index::create()
                    .name("idx_balances_user_start_unique")
                    .table(Balances::Table)
                    .col(Balances::UserId)
                    .col(Balances::StartDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_balances_user_end")
                    .table(Balances::Table)
                    .col(Balances::UserId)
                    .col(Balances::EndDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_balance_date")
                    .table(Expenses::Table)
                    .col(Expenses::BalanceId)
                    .col(Expenses::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_incomes_balance_date")
                    .table(Incomes::Table)
                    .col(Incomes::BalanceId)
                    .col(Incomes::Date)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_incomes_balance_date")
                    .table(Incomes::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_expenses_balance_date")
                    .table(Expenses::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_balances_user_end")
                    .table(Balances::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_balances_user_start_unique")
                    .table(Balances::Table)
                    .to_owned(),
            )
            .await
    }
}
