use crate::handlers::{
    balances::{
        create_balance, delete_balance, find_balances_by_period, get_balance,
        get_balance_transactions, get_daily_balances, get_today_balance, list_balances,
        update_balance,
    },
    expenses::{create_expense, create_expenses_bulk, delete_expense},
    health::health_check,
    incomes::{create_income, create_incomes_bulk, delete_income},
};
use crate::error::AppError;
use crate::middleware::request_logger::log_requests;
use crate::schemas::{ApiDoc, AppState};
use axum::{
    error_handling::HandleErrorLayer,
    http::{HeaderValue, Method, Uri},
    middleware,
    routing::{delete, get, post, put},
    BoxError, Router,
};
use axum_prometheus::PrometheusMetricLayer;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let cors = cors_layer(state.config.cors_origin.as_deref());
    let metrics_enabled = state.config.metrics_enabled;

    let router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Balance periods
        .route("/api/balance", post(create_balance))
        .route("/api/balance/find/period", get(find_balances_by_period))
        .route("/api/balance/daily/period", get(get_daily_balances))
        .route("/api/balance/today", get(get_today_balance))
        .route("/api/balance/:id", put(update_balance))
        .route("/api/balances", get(list_balances))
        .route("/api/balances/:id", get(get_balance).delete(delete_balance))
        .route("/api/balances/:id/transactions", get(get_balance_transactions))
        // Expenses
        .route("/api/expense", post(create_expense))
        .route("/api/expenses", post(create_expense))
        .route("/api/expenses/bulk", post(create_expenses_bulk))
        .route("/api/expense/:id", delete(delete_expense))
        // Incomes
        .route("/api/income", post(create_income))
        .route("/api/incomes", post(create_income))
        .route("/api/incomes/bulk", post(create_incomes_bulk))
        .route("/api/income/:id", delete(delete_income))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found);

    // The recorder is process-global, so the layer is only built when asked for.
    let router = if metrics_enabled {
        let (metric_layer, metric_handle) = PrometheusMetricLayer::pair();
        info!("Prometheus metrics exposed on /metrics");
        router
            .route("/metrics", get(move || async move { metric_handle.render() }))
            .layer(metric_layer)
    } else {
        router
    };

    // Layers added later wrap the earlier ones: trace, compression, timeout, CORS, request log.
    let router = router.layer(
        ServiceBuilder::new()
            .layer(cors)
            .layer(middleware::from_fn(log_requests)),
    );

    with_request_timeout(router, timeout)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// Aborts requests running longer than `timeout` with a `REQUEST_TIMEOUT` envelope.
pub(crate) fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                middleware_error(err, timeout)
            }))
            .timeout(timeout),
    )
}

fn middleware_error(err: BoxError, timeout: Duration) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout(timeout)
    } else {
        AppError::Internal(format!("unhandled middleware error: {}", err))
    }
}

async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {} {}", method, uri.path()))
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };

    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::permissive().allow_origin(value),
        Err(e) => {
            warn!("Ignoring invalid CORS origin {}: {}", origin, e);
            CorsLayer::permissive()
        }
    }
}
