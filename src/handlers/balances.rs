use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use common::{
    ApiResponse, BalanceDto, BalanceSnapshot, BalanceWithTransactions, CreateBalanceRequest,
    DailyBalanceRow, UpdateBalanceRequest,
};
use compute::{period, queries, timezone::resolve_in_zone, DateRange};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::extract::{ValidatedJson, ValidatedQuery};
use crate::handlers::query_date;
use crate::schemas::AppState;
use crate::timezone::CallerTimezone;

/// Query parameters for finding balance periods that overlap a range
#[derive(Debug, Deserialize, Serialize, ToSchema, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PeriodRangeQuery {
    /// First day of the range (date, datetime or epoch millis)
    #[validate(length(min = 1, message = "startDate is required"))]
    pub start_date: String,
    /// Last day of the range, inclusive
    #[validate(length(min = 1, message = "endDate is required"))]
    pub end_date: String,
}

/// Query parameters for the daily ledger of one balance period
#[derive(Debug, Deserialize, Serialize, ToSchema, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DailyPeriodQuery {
    /// Balance period to compute
    #[validate(length(min = 1, message = "balanceId is required"))]
    pub balance_id: String,
    /// Only return rows from this day on
    pub start_date: Option<String>,
    /// Only return rows up to this day, inclusive
    pub end_date: Option<String>,
}

/// Query parameters for the snapshot of a single day
#[derive(Debug, Deserialize, Serialize, ToSchema, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TodayQuery {
    /// Day to summarize; defaults to the current day
    pub date: Option<String>,
}

/// Create a balance period
#[utoipa::path(
    post,
    path = "/api/balance",
    tag = "balances",
    request_body = CreateBalanceRequest,
    responses(
        (status = 201, description = "Balance period created successfully", body = ApiResponse<BalanceDto>),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 409, description = "Overlaps an existing balance period", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_balance(
    user: AuthUser,
    CallerTimezone(tz): CallerTimezone,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateBalanceRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BalanceDto>>)> {
    trace!("Entering create_balance function");
    debug!("Creating balance of {} for user {}", request.amount, user.id());

    let balance = period::create_balance(
        &state.db,
        user.id(),
        request.amount,
        &request.start_date,
        &request.end_date,
        tz,
    )
    .await?;

    info!("Balance period {} created for user {}", balance.id, user.id());
    let response = ApiResponse::success(
        balance,
        "Balance created successfully",
        StatusCode::CREATED.as_u16(),
    );
    Ok((StatusCode::CREATED, Json(response)))
}

/// Find balance periods overlapping a range, each with today's snapshot
#[utoipa::path(
    get,
    path = "/api/balance/find/period",
    tag = "balances",
    params(PeriodRangeQuery),
    responses(
        (status = 200, description = "Balance periods retrieved successfully", body = ApiResponse<Vec<BalanceSnapshot>>),
        (status = 400, description = "Malformed date or time zone", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn find_balances_by_period(
    user: AuthUser,
    CallerTimezone(tz): CallerTimezone,
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<PeriodRangeQuery>,
) -> AppResult<Json<ApiResponse<Vec<BalanceSnapshot>>>> {
    trace!("Entering find_balances_by_period function");
    let start = resolve_in_zone(&query_date(&query.start_date), tz)?;
    let end = resolve_in_zone(&query_date(&query.end_date), tz)?;

    let snapshots =
        queries::get_balances_for_period_range(&state.db, user.id(), start, end, tz, None).await?;

    info!("Found {} balance periods between {} and {}", snapshots.len(), start, end);
    Ok(Json(ApiResponse::success(
        snapshots,
        "Balances retrieved successfully",
        StatusCode::OK.as_u16(),
    )))
}

/// Daily carry-forward ledger of one balance period
#[utoipa::path(
    get,
    path = "/api/balance/daily/period",
    tag = "balances",
    params(DailyPeriodQuery),
    responses(
        (status = 200, description = "Daily balances computed successfully", body = ApiResponse<Vec<DailyBalanceRow>>),
        (status = 400, description = "Malformed date or time zone", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_daily_balances(
    user: AuthUser,
    CallerTimezone(tz): CallerTimezone,
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<DailyPeriodQuery>,
) -> AppResult<Json<ApiResponse<Vec<DailyBalanceRow>>>> {
    trace!("Entering get_daily_balances function");
    let range = match (&query.start_date, &query.end_date) {
        (None, None) => None,
        (Some(start), Some(end)) => Some(DateRange::new(
            resolve_in_zone(&query_date(start), tz)?,
            resolve_in_zone(&query_date(end), tz)?,
        )),
        _ => {
            return Err(AppError::validation(
                "startDate and endDate must be given together",
            ))
        }
    };

    let rows =
        queries::get_daily_balances_by_period(&state.db, user.id(), &query.balance_id, range, tz)
            .await?;

    debug!("Returning {} daily rows for balance {}", rows.len(), query.balance_id);
    Ok(Json(ApiResponse::success(
        rows,
        "Daily balances retrieved successfully",
        StatusCode::OK.as_u16(),
    )))
}

/// Snapshot of the balance period containing a given day
#[utoipa::path(
    get,
    path = "/api/balance/today",
    tag = "balances",
    params(TodayQuery),
    responses(
        (status = 200, description = "Balance snapshot computed successfully", body = ApiResponse<BalanceSnapshot>),
        (status = 400, description = "Malformed date or time zone", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "No balance period contains the day", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_today_balance(
    user: AuthUser,
    CallerTimezone(tz): CallerTimezone,
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<TodayQuery>,
) -> AppResult<Json<ApiResponse<BalanceSnapshot>>> {
    trace!("Entering get_today_balance function");
    let date = match query.date.as_deref() {
        Some(raw) => resolve_in_zone(&query_date(raw), tz)?,
        None => Utc::now(),
    };

    let snapshot = queries::get_balance_for_date(&state.db, user.id(), date, tz).await?;
    Ok(Json(ApiResponse::success(
        snapshot,
        "Balance retrieved successfully",
        StatusCode::OK.as_u16(),
    )))
}

/// List the caller's balance periods
#[utoipa::path(
    get,
    path = "/api/balances",
    tag = "balances",
    responses(
        (status = 200, description = "Balance periods retrieved successfully", body = ApiResponse<Vec<BalanceDto>>),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_balances(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<BalanceDto>>>> {
    let balances = queries::list_user_balances(&state.db, user.id()).await?;
    Ok(Json(ApiResponse::success(
        balances,
        "Balances retrieved successfully",
        StatusCode::OK.as_u16(),
    )))
}

/// Get one balance period
#[utoipa::path(
    get,
    path = "/api/balances/{id}",
    tag = "balances",
    params(
        ("id" = String, Path, description = "Balance period ID"),
    ),
    responses(
        (status = 200, description = "Balance period retrieved successfully", body = ApiResponse<BalanceDto>),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Balance period not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_balance(
    user: AuthUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<BalanceDto>>> {
    let balance = queries::get_user_balance(&state.db, user.id(), &id).await?;
    Ok(Json(ApiResponse::success(
        balance,
        "Balance retrieved successfully",
        StatusCode::OK.as_u16(),
    )))
}

/// Get one balance period with all of its expenses and incomes
#[utoipa::path(
    get,
    path = "/api/balances/{id}/transactions",
    tag = "balances",
    params(
        ("id" = String, Path, description = "Balance period ID"),
    ),
    responses(
        (status = 200, description = "Balance period retrieved successfully", body = ApiResponse<BalanceWithTransactions>),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Balance period not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_balance_transactions(
    user: AuthUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<BalanceWithTransactions>>> {
    let balance = queries::get_balance_with_transactions(&state.db, user.id(), &id).await?;
    Ok(Json(ApiResponse::success(
        balance,
        "Balance with transactions retrieved successfully",
        StatusCode::OK.as_u16(),
    )))
}

/// Replace amount and range of a balance period
#[utoipa::path(
    put,
    path = "/api/balance/{id}",
    tag = "balances",
    params(
        ("id" = String, Path, description = "Balance period ID"),
    ),
    request_body = UpdateBalanceRequest,
    responses(
        (status = 200, description = "Balance period updated successfully", body = ApiResponse<BalanceDto>),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Balance period not found", body = ErrorResponse),
        (status = 409, description = "Overlaps another balance period", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_balance(
    user: AuthUser,
    CallerTimezone(tz): CallerTimezone,
    Path(id): Path<String>,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UpdateBalanceRequest>,
) -> AppResult<Json<ApiResponse<BalanceDto>>> {
    trace!("Entering update_balance function for {}", id);
    let balance = period::update_balance(
        &state.db,
        user.id(),
        &id,
        request.amount,
        &request.start_date,
        &request.end_date,
        tz,
    )
    .await?;

    info!("Balance period {} updated", balance.id);
    Ok(Json(ApiResponse::success(
        balance,
        "Balance updated successfully",
        StatusCode::OK.as_u16(),
    )))
}

/// Delete a balance period together with its expenses and incomes
#[utoipa::path(
    delete,
    path = "/api/balances/{id}",
    tag = "balances",
    params(
        ("id" = String, Path, description = "Balance period ID"),
    ),
    responses(
        (status = 204, description = "Balance period deleted successfully"),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Balance period not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_balance(
    user: AuthUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    period::delete_balance(&state.db, user.id(), &id).await?;
    info!("Balance period {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}
