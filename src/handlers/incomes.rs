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

/// Record an income
#[utoipa::path(
    post,
    path = "/api/income",
    tag = "incomes",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Income created successfully", body = ApiResponse<TransactionDto>),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Balance period not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_income(
    user: AuthUser,
    CallerTimezone(tz): CallerTimezone,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateTransactionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<TransactionDto>>)> {
    trace!("Entering create_income function");
    let income =
        transactions::create_transaction(&state.db, user.id(), TransactionKind::Income, &request, tz)
            .await?;

    info!("Income {} recorded on balance {}", income.id, income.balance_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            income,
            "Income created successfully",
            StatusCode::CREATED.as_u16(),
        )),
    ))
}

/// Record several incomes at once; either all are stored or none
#[utoipa::path(
    post,
    path = "/api/incomes/bulk",
    tag = "incomes",
    request_body = Vec<CreateTransactionRequest>,
    responses(
        (status = 201, description = "Incomes created successfully", body = ApiResponse<Vec<TransactionDto>>),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Balance period not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requests), fields(count = requests.len()))]
pub async fn create_incomes_bulk(
    user: AuthUser,
    CallerTimezone(tz): CallerTimezone,
    State(state): State<AppState>,
    JsonBody(requests): JsonBody<Vec<CreateTransactionRequest>>,
) -> AppResult<(StatusCode, Json<ApiResponse<Vec<TransactionDto>>>)> {
    trace!("Entering create_incomes_bulk function");
    for request in &requests {
        request.validate()?;
    }

    let created =
        transactions::create_transactions(&state.db, user.id(), TransactionKind::Income, &requests, tz)
            .await?;

    debug!("Stored {} incomes", created.len());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            created,
            "Incomes created successfully",
            StatusCode::CREATED.as_u16(),
        )),
    ))
}

/// Delete an income
#[utoipa::path(
    delete,
    path = "/api/income/{id}",
    tag = "incomes",
    params(
        ("id" = String, Path, description = "Income ID"),
    ),
    responses(
        (status = 200, description = "Income deleted successfully", body = ApiResponse<DeletedResource>),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Income not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_income(
    user: AuthUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DeletedResource>>> {
    transactions::delete_transaction(&state.db, user.id(), TransactionKind::Income, &id).await?;
    Ok(Json(ApiResponse::success(
        DeletedResource { id },
        "Income deleted successfully",
        StatusCode::OK.as_u16(),
    )))
}
