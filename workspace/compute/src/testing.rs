//! Fixtures shared by the database-backed tests of this crate.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

use model::entities::{balance, expense, income, user};

pub fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

pub fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap()
}

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub async fn setup_db() -> DatabaseConnection {
    init_test_tracing();
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");

    // Enable foreign keys
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");

    Migrator::up(&db, None).await.expect("Migrations failed.");
    db
}

pub async fn seed_user(db: &DatabaseConnection, id: &str) -> user::Model {
    user::ActiveModel {
        id: Set(id.to_string()),
        name: Set(format!("User {}", id)),
        email: Set(format!("{}@example.com", id)),
        created_at: Set(utc("2024-01-01T00:00:00Z")),
    }
    .insert(db)
    .await
    .expect("Failed to seed user")
}

pub async fn seed_balance(
    db: &DatabaseConnection,
    id: &str,
    user_id: &str,
    amount: &str,
    start: &str,
    end: &str,
) -> balance::Model {
    balance::ActiveModel {
        id: Set(id.to_string()),
        user_id: Set(user_id.to_string()),
        amount: Set(dec(amount)),
        start_date: Set(utc(start)),
        end_date: Set(utc(end)),
        created_at: Set(utc(start)),
    }
    .insert(db)
    .await
    .expect("Failed to seed balance")
}

pub async fn seed_expense(
    db: &DatabaseConnection,
    id: &str,
    balance_id: &str,
    amount: &str,
    date: &str,
) -> expense::Model {
    expense::ActiveModel {
        id: Set(id.to_string()),
        amount: Set(dec(amount)),
        description: Set(format!("expense {}", id)),
        date: Set(utc(date)),
        created_at: Set(utc(date)),
        balance_id: Set(balance_id.to_string()),
    }
    .insert(db)
    .await
    .expect("Failed to seed expense")
}

pub async fn seed_income(
    db: &DatabaseConnection,
    id: &str,
    balance_id: &str,
    amount: &str,
    date: &str,
) -> income::Model {
    income::ActiveModel {
        id: Set(id.to_string()),
        amount: Set(dec(amount)),
        description: Set(format!("income {}", id)),
        date: Set(utc(date)),
        created_at: Set(utc(date)),
        balance_id: Set(balance_id.to_string()),
    }
    .insert(db)
    .await
    .expect("Failed to seed income")
}
