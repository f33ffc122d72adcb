//! Common transport-layer types shared between the compute crate and the HTTP layer.
//! Every payload is camelCase on the wire and money always travels as decimal text.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

// ===================== Envelope =====================

/// Uniform response envelope returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Success flag
    pub success: bool,
    /// Response data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// HTTP status mirrored into the body
    pub status_code: u16,
    /// When the response was produced
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            status_code,
            timestamp: Utc::now(),
        }
    }
}

/// Machine-readable error description.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ErrorBody {
    /// Stable code such as `VALIDATION_ERROR` or `NOT_FOUND`
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error envelope. Same shape as [`ApiResponse`] with `error` in place of `data`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    pub error: ErrorBody,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(status_code: u16, error: ErrorBody) -> Self {
        Self {
            success: false,
            error,
            status_code,
            timestamp: Utc::now(),
        }
    }
}

// ===================== Dates =====================

/// A caller-supplied date.
///
/// Text may be RFC 3339 with an offset, a naive ISO datetime or a plain `YYYY-MM-DD` date.
/// Numbers are Unix timestamps in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(untagged)]
pub enum DateInput {
    Millis(i64),
    Text(String),
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        DateInput::Text(value.to_string())
    }
}

impl From<String> for DateInput {
    fn from(value: String) -> Self {
        DateInput::Text(value)
    }
}

// ===================== Balances =====================

/// A balance period as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDto {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    /// Start of the first civil day, in UTC
    pub start_date: DateTime<Utc>,
    /// Start of the last civil day (inclusive), in UTC
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A balance period augmented with its "today" figures.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    #[serde(flatten)]
    pub balance: BalanceDto,
    /// Remaining balance of the reference day's ledger row
    pub daily_balance_today: Decimal,
    /// Period amount plus incomes minus expenses up to and including the reference day
    pub total_remaining_until_today: Decimal,
}

/// A balance period together with every expense and income recorded against it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceWithTransactions {
    #[serde(flatten)]
    pub balance: BalanceDto,
    pub expenses: Vec<TransactionDto>,
    pub incomes: Vec<TransactionDto>,
}

/// Request body for creating a balance period.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBalanceRequest {
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
    pub start_date: DateInput,
    pub end_date: DateInput,
}

/// Request body for updating a balance period. The whole range and amount are replaced.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBalanceRequest {
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
    pub start_date: DateInput,
    pub end_date: DateInput,
}

// ===================== Transactions =====================

/// An expense or an income.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    pub amount: Decimal,
    pub description: String,
    pub date: DateTime<Utc>,
    pub balance_id: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for recording an expense or an income.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: String,
    pub date: DateInput,
    #[validate(length(min = 1, message = "balanceId must not be empty"))]
    pub balance_id: String,
}

// ===================== Daily ledger =====================

/// One civil day of a balance period's carry-forward ledger.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyBalanceRow {
    pub balance_id: String,
    /// Start of the civil day, in UTC
    pub date: DateTime<Utc>,
    /// The period amount divided by its inclusive day count
    pub base_balance: Decimal,
    /// Remaining balance of the previous day, zero on the first day
    pub previous_day_leftover: Decimal,
    pub expenses: Vec<TransactionDto>,
    pub incomes: Vec<TransactionDto>,
    /// `base_balance + previous_day_leftover + sum(incomes)`
    pub total_available: Decimal,
    /// `total_available - sum(expenses)`
    pub remaining_balance: Decimal,
}

/// Largest amount the `decimal(12, 2)` amount columns can hold: 9 999 999 999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Most decimal places an amount may carry.
pub const MAX_AMOUNT_SCALE: u32 = 2;

/// Checks that `amount` is positive and fits the storage column.
///
/// Returns the validation code and message of the first rule broken. Trailing zeros
/// do not count towards the scale, so `1.500` is accepted.
pub fn amount_violation(amount: &Decimal) -> Option<(&'static str, &'static str)> {
    if *amount <= Decimal::ZERO {
        Some(("positive", "amount must be greater than zero"))
    } else if *amount > MAX_AMOUNT {
        Some(("max", "amount must not exceed 9999999999.99"))
    } else if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        Some(("scale", "amount must have at most 2 decimal places"))
    } else {
        None
    }
}

/// `validator` adapter for [`amount_violation`].
pub fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    match amount_violation(amount) {
        None => Ok(()),
        Some((code, message)) => {
            let mut err = ValidationError::new(code);
            err.message = Some(message.into());
            Err(err)
        }
    }
}
