//! Per-request access log. Failed requests additionally get their (redacted) payload and a
//! curl command that reproduces them.

use std::time::Instant;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::AppError;

/// Bodies larger than this are rejected before reaching a handler.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

const REDACTED: &str = "[REDACTED]";
const MASKED_TOKEN: &str = "Bearer [MASKED]";
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-api-key"];
const SENSITIVE_FIELDS: &[&str] = &["password", "token", "secret", "key"];
const CURL_HEADERS: &[&str] = &[
    "content-type",
    "authorization",
    "accept",
    "x-timezone",
    "x-requested-with",
];

pub async fn log_requests(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not buffer request body for {} {}: {}", parts.method, parts.uri, e);
            return AppError::BadRequest("request body is unreadable or too large".to_string())
                .into_response();
        }
    };

    let method = parts.method.clone();
    let uri = parts.uri.clone();
    let headers = parts.headers.clone();
    let response = next.run(Request::from_parts(parts, Body::from(bytes.clone()))).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    info!(
        method = %method,
        path = %uri.path(),
        query = uri.query().unwrap_or(""),
        status = status.as_u16(),
        latency_ms,
        "Request completed"
    );

    if status.is_client_error() || status.is_server_error() {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        let body = redact_body(&bytes);
        let curl = curl_command(&method, path_and_query, &headers, &bytes);
        let headers = redact_headers(&headers);

        if status.is_server_error() {
            error!(
                status = status.as_u16(),
                headers = %headers,
                body = %body,
                curl = %curl,
                "Request failed with status {}", status
            );
        } else {
            warn!(
                status = status.as_u16(),
                headers = %headers,
                body = %body,
                curl = %curl,
                "Request failed with status {}", status
            );
        }
    }

    response
}

/// Header map rendered as JSON with credentials replaced.
pub fn redact_headers(headers: &HeaderMap) -> Value {
    let mut out = serde_json::Map::new();
    for (name, value) in headers {
        let rendered = if SENSITIVE_HEADERS.contains(&name.as_str()) {
            REDACTED.to_string()
        } else {
            value.to_str().unwrap_or("<binary>").to_string()
        };
        out.insert(name.as_str().to_string(), Value::String(rendered));
    }
    Value::Object(out)
}

/// The request body for logging. JSON fields whose name looks like a credential are replaced,
/// at any depth; anything that is not JSON is logged as lossy text.
pub fn redact_body(bytes: &Bytes) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(mut value) => {
            redact_value(&mut value);
            value.to_string()
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                let lowered = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|s| lowered.contains(s)) {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact_value(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

/// A curl invocation that replays the request. The bearer token is masked.
pub fn curl_command(method: &Method, path_and_query: &str, headers: &HeaderMap, body: &Bytes) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let mut command = format!("curl -X {} \"http://{}{}\"", method, host, path_and_query);

    for name in CURL_HEADERS {
        let Some(value) = headers.get(*name).and_then(|value| value.to_str().ok()) else {
            continue;
        };
        let value = if *name == "authorization" && value.to_lowercase().starts_with("bearer") {
            MASKED_TOKEN
        } else {
            value
        };
        command.push_str(&format!(" \\\n  -H \"{}: {}\"", name, value));
    }

    let sends_body = [Method::POST, Method::PUT, Method::PATCH].contains(method);
    if sends_body && !body.is_empty() {
        let text = String::from_utf8_lossy(body).replace('\'', "'\\''");
        command.push_str(&format!(" \\\n  -d '{}'", text));
    }

    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.example.com"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cr3t"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-timezone", HeaderValue::from_static("America/Sao_Paulo"));
        headers
    }

    #[test]
    fn test_redact_body_hides_credentials_at_any_depth() {
        let body = Bytes::from_static(
            br#"{"amount":"10","apiKey":"k","nested":[{"password":"p","description":"ok"}]}"#,
        );
        let redacted: Value = serde_json::from_str(&redact_body(&body)).unwrap();

        assert_eq!(redacted["amount"], "10");
        assert_eq!(redacted["apiKey"], REDACTED);
        assert_eq!(redacted["nested"][0]["password"], REDACTED);
        assert_eq!(redacted["nested"][0]["description"], "ok");
    }

    #[test]
    fn test_redact_body_passes_through_non_json() {
        assert_eq!(redact_body(&Bytes::from_static(b"not json")), "not json");
        assert_eq!(redact_body(&Bytes::new()), "");
    }

    #[test]
    fn test_redact_headers() {
        let redacted = redact_headers(&headers());
        assert_eq!(redacted["authorization"], REDACTED);
        assert_eq!(redacted["x-timezone"], "America/Sao_Paulo");
    }

    #[test]
    fn test_curl_command_masks_token_and_includes_body() {
        let body = Bytes::from_static(br#"{"description":"it's lunch"}"#);
        let curl = curl_command(&Method::POST, "/api/expense?x=1", &headers(), &body);

        assert!(curl.starts_with("curl -X POST \"http://api.example.com/api/expense?x=1\""));
        assert!(curl.contains("-H \"authorization: Bearer [MASKED]\""));
        assert!(!curl.contains("s3cr3t"));
        assert!(curl.contains("-H \"x-timezone: America/Sao_Paulo\""));
        assert!(curl.contains(r#"-d '{"description":"it'\''s lunch"}'"#));
    }

    #[test]
    fn test_curl_command_skips_body_for_get() {
        let body = Bytes::from_static(b"ignored");
        let curl = curl_command(&Method::GET, "/api/balances", &HeaderMap::new(), &body);
        assert_eq!(curl, "curl -X GET \"http://localhost/api/balances\"");
    }
}
