use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(string(Users::Id).primary_key())
                    .col(string(Users::Name))
                    .col(string(Users::Email).unique_key())
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create sessions table
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(string(Sessions::Id).primary_key())
                    .col(string(Sessions::Token).unique_key())
                    .col(string(Sessions::UserId))
                    .col(timestamp_with_time_zone(Sessions::ExpiresAt))
                    .col(timestamp_with_time_zone(Sessions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_user")
                            .from(Sessions::Table, Sessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create balances table
        manager
            .create_table(
                Table::create()
                    .table(Balances::Table)
                    .if_not_exists()
                    .col(string(Balances::Id).primary_key())
                    .col(string(Balances::UserId))
                    .col(decimal(Balances::Amount).decimal_len(12, 2))
                    .col(timestamp_with_time_zone(Balances::StartDate))
                    .col(timestamp_with_time_zone(Balances::EndDate))
                    .col(timestamp_with_time_zone(Balances::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_balance_user")
                            .from(Balances::Table, Balances::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create expenses table
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(string(Expenses::Id).primary_key())
                    .col(decimal(Expenses::Amount).decimal_len(12, 2))
                    .col(string(Expenses::Description))
                    .col(timestamp_with_time_zone(Expenses::Date))
                    .col(timestamp_with_time_zone(Expenses::CreatedAt))
                    .col(string(Expenses::BalanceId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_balance")
                            .from(Expenses::Table, Expenses::BalanceId)
                            .to(Balances::Table, Balances::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create incomes table
        manager
            .create_table(
                Table::create()
                    .table(Incomes::Table)
                    .if_not_exists()
                    .col(string(Incomes::Id).primary_key())
                    .col(decimal(Incomes::Amount).decimal_len(12, 2))
                    .col(string(Incomes::Description))
                    .col(timestamp_with_time_zone(Incomes::Date))
                    .col(timestamp_with_time_zone(Incomes::CreatedAt))
                    .col(string(Incomes::BalanceId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_income_balance")
                            .from(Incomes::Table, Incomes::BalanceId)
                            .to(Balances::Table, Balances::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Incomes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Balances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    Token,
    UserId,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Balances {
    Table,
    Id,
    UserId,
    Amount,
    StartDate,
    EndDate,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Expenses {
    Table,
    Id,
    Amount,
    Description,
    Date,
    CreatedAt,
    BalanceId,
}

#[derive(DeriveIden)]
pub(crate) enum Incomes {
    Table,
    Id,
    Amount,
    Description,
    Date,
    CreatedAt,
    BalanceId,
}
