use axum::{extract::FromRequestParts, http::request::Parts};
use chrono_tz::Tz;
use compute::timezone::parse_timezone;
use tracing::trace;

use crate::error::AppError;
use crate::schemas::AppState;

/// Header carrying the caller's IANA zone name.
pub const TIMEZONE_HEADER: &str = "x-timezone";

/// The zone used for every civil-day decision of a request.
///
/// Taken from the `x-timezone` header, or the configured default when the header is absent.
#[derive(Debug, Clone, Copy)]
pub struct CallerTimezone(pub Tz);

#[axum::async_trait]
impl FromRequestParts<AppState> for CallerTimezone {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(TIMEZONE_HEADER) else {
            return Ok(CallerTimezone(state.default_tz));
        };

        let name = value
            .to_str()
            .map_err(|_| AppError::BadRequest("x-timezone header is not valid text".to_string()))?;
        if name.trim().is_empty() {
            return Ok(CallerTimezone(state.default_tz));
        }

        let tz = parse_timezone(name)?;
        trace!(%tz, "Using caller time zone");
        Ok(CallerTimezone(tz))
    }
}
