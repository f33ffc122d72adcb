use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use common::{ApiResponse, CreateTransactionRequest, TransactionDto};
use compute::{transactions, TransactionKind};
use tracing::{debug, info, instrument, trace};
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::extract::{JsonBody, ValidatedJson};
use crate::schemas::{AppState, DeletedResource};
use crate::timezone::CallerTimezone;

/// Record an expense
#[utoipa::path(
    post,
    path = "/api/expense",
    tag = "expenses",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Expense created successfully", body = ApiResponse<TransactionDto>),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Balance period not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_expense(
    user: AuthUser,
    CallerTimezone(tz): CallerTimezone,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateTransactionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<TransactionDto>>)> {
    trace!("Entering create_expense function");
    let expense =
        transactions::create_transaction(&state.db, user.id(), TransactionKind::Expense, &request, tz)
            .await?;

    info!("Expense {} recorded on balance {}", expense.id, expense.balance_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            expense,
            "Expense created successfully",
            StatusCode::CREATED.as_u16(),
        )),
    ))
}

/// Record several expenses at once; either all are stored or none
#[utoipa::path(
    post,
    path = "/api/expenses/bulk",
    tag = "expenses",
    request_body = Vec<CreateTransactionRequest>,
    responses(
        (status = 201, description = "Expenses created successfully", body = ApiResponse<Vec<TransactionDto>>),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Balance period not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requests), fields(count = requests.len()))]
pub async fn create_expenses_bulk(
    user: AuthUser,
    CallerTimezone(tz): CallerTimezone,
    State(state): State<AppState>,
    JsonBody(requests): JsonBody<Vec<CreateTransactionRequest>>,
) -> AppResult<(StatusCode, Json<ApiResponse<Vec<TransactionDto>>>)> {
    trace!("Entering create_expenses_bulk function");
    for request in &requests {
        request.validate()?;
    }

    let created =
        transactions::create_transactions(&state.db, user.id(), TransactionKind::Expense, &requests, tz)
            .await?;

    debug!("Stored {} expenses", created.len());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            created,
            "Expenses created successfully",
            StatusCode::CREATED.as_u16(),
        )),
    ))
}

/// Delete an expense
#[utoipa::path(
    delete,
    path = "/api/expense/{id}",
    tag = "expenses",
    params(
        ("id" = String, Path, description = "Expense ID"),
    ),
    responses(
        (status = 200, description = "Expense deleted successfully", body = ApiResponse<DeletedResource>),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_expense(
    user: AuthUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DeletedResource>>> {
    transactions::delete_transaction(&state.db, user.id(), TransactionKind::Expense, &id).await?;
    Ok(Json(ApiResponse::success(
        DeletedResource { id },
        "Expense deleted successfully",
        StatusCode::OK.as_u16(),
    )))
}
