//! Portfolio site - content API, admin dashboard and the backend they run on

pub mod backend;
pub mod config;
pub mod content;
pub mod dashboard;
pub mod form;
pub mod logging;
pub mod models;
pub mod routes;
pub mod session;
pub mod upload;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir,
    trace::TraceLayer,
};

use backend::postgres::{self, PgDatabase};
use backend::storage::LocalStorage;
use backend::{memory::MemoryDatabase, BackendClient, Database};
use config::AppConfig;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub client: BackendClient,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{0}")]
    Config(String),

    #[error("invalid HOST/PORT configuration: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: std::io::Error },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, defaulting to
/// the local dev frontend.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    let storage_dir = state.config.storage_dir.clone();

    Router::new()
        .route("/api/home", get(routes::public::home))
        .route("/api/projects", get(routes::public::list_projects))
        .route("/api/categories", get(routes::public::list_categories))
        .route("/api/services", get(routes::public::list_services))
        .route("/api/reviews", get(routes::public::list_reviews))
        .route("/api/contact", post(routes::public::contact))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/signup", post(routes::auth::signup))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/session", get(routes::auth::session))
        .route(session::LOGIN_PATH, get(routes::auth::login_page))
        .route("/health", get(routes::health::health_ping))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        .merge(routes::admin::router(state.clone()))
        .nest_service("/storage", ServeDir::new(storage_dir))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Uploads carry several images; per-file size is checked separately
        .layer(RequestBodyLimitLayer::new(routes::upload::UPLOAD_BODY_LIMIT))
        .layer(cors)
}

/// Postgres when DATABASE_URL is set and reachable, in-memory tables otherwise.
async fn connect_database() -> Arc<dyn Database> {
    if std::env::var("DATABASE_URL").is_err() {
        tracing::info!("DATABASE_URL not set. Using in-memory tables.");
        return Arc::new(MemoryDatabase::new());
    }

    match postgres::init_pool(None).await {
        Ok(pool) => {
            if let Err(e) = postgres::run_migrations(&pool).await {
                tracing::error!("Failed to run database migrations: {}", e);
            }
            Arc::new(PgDatabase::new(pool))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize database pool: {}. Continuing with in-memory tables.",
                e
            );
            Arc::new(MemoryDatabase::new())
        }
    }
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    // Held for the process lifetime so buffered log lines are flushed.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    let config = AppConfig::from_env();
    config.check_production().map_err(StartupError::Config)?;

    let db = connect_database().await;
    let storage = Arc::new(LocalStorage::new(config.storage_dir.clone(), &config.public_base_url));
    let state = AppState {
        client: BackendClient::new(db, storage, &config),
        config: Arc::new(config),
    };

    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port).parse()?;
    let app = create_app(state);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(StartupError::Serve)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::{admin_token, send, state};

    #[tokio::test]
    async fn test_request_id_is_set() {
        let app = create_app(state());
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_dashboard_gate_through_full_app() {
        let state = state();
        let (status, _) = send(create_app(state.clone()), "GET", "/admin", None, None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let (status, body) = send(create_app(state.clone()), "GET", session::LOGIN_PATH, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["signedIn"], false);

        let token = admin_token(&state).await;
        let (status, _) = send(create_app(state), "GET", "/admin", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_write_shows_on_public_api() {
        let state = state();
        let token = admin_token(&state).await;

        let (_, body) = send(
            create_app(state.clone()),
            "POST",
            "/api/admin/categories",
            Some(&token),
            Some(json!({ "name": "Website Development", "slug": "website-development" })),
        )
        .await;
        let category_id = body["data"][0]["id"].as_str().unwrap().to_string();

        send(
            create_app(state.clone()),
            "POST",
            "/api/admin/projects",
            Some(&token),
            Some(json!({
                "title": "Shop",
                "category_id": category_id,
                "show_on_home": true,
                "demo_url": "https://shop.test"
            })),
        )
        .await;

        let (status, body) = send(create_app(state), "GET", "/api/home", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["projects"][0]["title"], "Shop");
        assert_eq!(body["projects"][0]["demo_url"], "https://shop.test");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (status, _) = send(create_app(state()), "GET", "/api/blog", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
