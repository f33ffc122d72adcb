#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use crate::auth::SessionIdentityProvider;
    use crate::config::AppConfig;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::Router;
    use axum_test::TestServer;
    use chrono::{Duration, Utc};
    use migration::{Migrator, MigratorTrait};
    use model::entities::{session, user};
    use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    pub const TEST_USER: &str = "test-user";
    pub const TEST_TOKEN: &str = "test-token";
    pub const OTHER_USER: &str = "other-user";
    pub const OTHER_TOKEN: &str = "other-token";
    pub const EXPIRED_TOKEN: &str = "expired-token";

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    async fn seed_user_with_session(db: &DatabaseConnection, user_id: &str, token: &str, ttl: Duration) {
        let now = Utc::now();
        user::ActiveModel {
            id: Set(user_id.to_string()),
            name: Set(format!("User {}", user_id)),
            email: Set(format!("{}@example.com", user_id)),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .expect("Failed to create test user");

        session::ActiveModel {
            id: Set(format!("session-{}", token)),
            token: Set(token.to_string()),
            user_id: Set(user_id.to_string()),
            expires_at: Set(now + ttl),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .expect("Failed to create test session");
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;

        // Create test users for the tests to reference
        seed_user_with_session(&db, TEST_USER, TEST_TOKEN, Duration::days(1)).await;
        seed_user_with_session(&db, OTHER_USER, OTHER_TOKEN, Duration::days(1)).await;
        seed_user_with_session(&db, "lapsed-user", EXPIRED_TOKEN, Duration::days(-1)).await;

        // Metrics install a process-wide recorder and stay off in tests
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            metrics_enabled: false,
            ..AppConfig::default()
        };
        let default_tz = config
            .default_timezone
            .parse()
            .expect("Default time zone must be valid");

        AppState {
            identity: Arc::new(SessionIdentityProvider::new(db.clone())),
            db,
            config: Arc::new(config),
            default_tz,
        }
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is determined by the RUST_LOG environment variable,
    /// defaulting to WARN if not set.
    ///
    /// # Returns
    ///
    /// A guard that will clean up the subscriber when dropped.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        // Get log level from environment variable or default to WARN
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr) // Output to stderr, which is captured by tests
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        // Initialize tracing for tests
        let _ = init_test_tracing();

        let state = setup_test_app_state().await;
        create_router(state)
    }

    /// Test server over `state` whose requests carry `token` as bearer credentials.
    pub fn authed_server(state: &AppState, token: &str) -> TestServer {
        let mut server = TestServer::new(create_router(state.clone())).unwrap();
        server.add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        server
    }

    /// Test server signed in as the primary test user.
    pub async fn setup_test_server() -> TestServer {
        let _ = init_test_tracing();
        let state = setup_test_app_state().await;
        authed_server(&state, TEST_TOKEN)
    }
}
