//! Bearer-token authentication.
//!
//! Sessions are issued by an external identity service that shares our database. Handlers
//! only ever see the resolved [`AuthUser`]; how a token becomes a user is behind
//! [`IdentityProvider`].

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use chrono::Utc;
use model::entities::{prelude::Session, session};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{debug, trace, warn};

use crate::error::AppError;
use crate::schemas::AppState;

/// The caller behind a valid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
}

/// Resolves a bearer token to a user, or `None` when no live session matches.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    async fn resolve(&self, token: &str) -> Result<Option<UserIdentity>, AppError>;
}

/// Looks tokens up in the `sessions` table, ignoring expired rows.
#[derive(Debug, Clone)]
pub struct SessionIdentityProvider {
    db: DatabaseConnection,
}

impl SessionIdentityProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Option<UserIdentity>, AppError> {
        let session = Session::find()
            .filter(session::Column::Token.eq(token))
            .filter(session::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.db)
            .await?;

        Ok(session.map(|session| UserIdentity {
            id: session.user_id,
        }))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor for routes that require a signed-in caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserIdentity);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        trace!("Resolving caller identity");
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        let Some(token) = bearer_token(header) else {
            debug!("Request without bearer token");
            return Err(AppError::Unauthorized(
                "missing bearer token".to_string(),
            ));
        };

        match state.identity.resolve(token).await? {
            Some(identity) => {
                debug!("Authenticated user {}", identity.id);
                Ok(AuthUser(identity))
            }
            None => {
                warn!("Rejected unknown or expired session token");
                Err(AppError::Unauthorized(
                    "invalid or expired session".to_string(),
                ))
            }
        }
    }
}
