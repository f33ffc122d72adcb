use std::sync::Arc;

use chrono_tz::Tz;
use common::{
    ApiResponse, BalanceDto, BalanceSnapshot, BalanceWithTransactions, CreateBalanceRequest,
    CreateTransactionRequest, DailyBalanceRow, DateInput, ErrorBody, ErrorResponse,
    TransactionDto, UpdateBalanceRequest,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::auth::IdentityProvider;
use crate::config::AppConfig;
use crate::handlers::balances::{DailyPeriodQuery, PeriodRangeQuery, TodayQuery};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    /// Zone applied when a request carries no `x-timezone` header
    pub default_tz: Tz,
    /// Resolves bearer tokens to users
    pub identity: Arc<dyn IdentityProvider>,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Identifier of a resource that was removed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedResource {
    pub id: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::balances::create_balance,
        crate::handlers::balances::find_balances_by_period,
        crate::handlers::balances::get_daily_balances,
        crate::handlers::balances::get_today_balance,
        crate::handlers::balances::list_balances,
        crate::handlers::balances::get_balance,
        crate::handlers::balances::get_balance_transactions,
        crate::handlers::balances::update_balance,
        crate::handlers::balances::delete_balance,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::create_expenses_bulk,
        crate::handlers::expenses::delete_expense,
        crate::handlers::incomes::create_income,
        crate::handlers::incomes::create_incomes_bulk,
        crate::handlers::incomes::delete_income,
    ),
    components(
        schemas(
            ApiResponse<BalanceDto>,
            ApiResponse<Vec<BalanceDto>>,
            ApiResponse<BalanceSnapshot>,
            ApiResponse<Vec<BalanceSnapshot>>,
            ApiResponse<BalanceWithTransactions>,
            ApiResponse<Vec<DailyBalanceRow>>,
            ApiResponse<TransactionDto>,
            ApiResponse<Vec<TransactionDto>>,
            ApiResponse<DeletedResource>,
            ErrorResponse,
            ErrorBody,
            HealthResponse,
            DeletedResource,
            DateInput,
            BalanceDto,
            BalanceSnapshot,
            BalanceWithTransactions,
            CreateBalanceRequest,
            UpdateBalanceRequest,
            TransactionDto,
            CreateTransactionRequest,
            DailyBalanceRow,
            PeriodRangeQuery,
            DailyPeriodQuery,
            TodayQuery,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "balances", description = "Balance periods and their daily ledger"),
        (name = "expenses", description = "Expenses recorded against a balance period"),
        (name = "incomes", description = "Incomes recorded against a balance period"),
    ),
    info(
        title = "Saldo API",
        description = "Personal budget tracker: balance periods, expenses, incomes and the daily carry-forward ledger",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
