/**
 * Auth Routes
 * Admin login, bootstrap signup, logout and the current session
 */
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::backend::auth::Session;
use crate::content::Notification;
use crate::session::{
    admin_login, admin_signup, extract_access_token, AdminCapability, LoginOutcome, SignupOutcome,
    ACCESS_TOKEN_COOKIE, DASHBOARD_PATH,
};
use crate::routes::{api_error, SuccessResponse};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub notification: Notification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    /// Where the client should navigate next.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    #[serde(flatten)]
    pub result: SuccessResponse,
    pub redirect: &'static str,
}

// ============================================================================
// Helpers
// ============================================================================

fn validate(credentials: &Credentials) -> Result<(), Response> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Email and password are required", None).into_response());
    }
    if !credentials.email.contains('@') {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid email format", None).into_response());
    }
    Ok(())
}

fn session_cookie(token: &str, max_age_secs: i64) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{ACCESS_TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    ))
    .ok()
}

fn respond(
    state: &AppState,
    status: StatusCode,
    notification: Notification,
    session: Option<Session>,
    redirect: Option<&'static str>,
) -> Response {
    let cookie = session
        .as_ref()
        .and_then(|s| session_cookie(&s.access_token, state.config.session_ttl_minutes * 60));
    let body = Json(AuthResponse {
        success: status.is_success(),
        notification,
        session,
        redirect,
    });

    let mut response = (status, body).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(State(state): State<AppState>, Json(payload): Json<Credentials>) -> impl IntoResponse {
    if let Err(response) = validate(&payload) {
        return response;
    }

    let outcome = admin_login(state.client.auth(), &payload.email, &payload.password).await;
    let notification = outcome.notification();
    let status = match &outcome {
        LoginOutcome::SignedIn(_) => StatusCode::OK,
        LoginOutcome::AccessDenied => StatusCode::FORBIDDEN,
        LoginOutcome::AccountExists => StatusCode::CONFLICT,
        LoginOutcome::LoginFailed(_) => StatusCode::UNAUTHORIZED,
    };
    if !status.is_success() {
        tracing::warn!(email = %payload.email, status = %status, "admin login refused");
    }

    let redirect = outcome.session().map(|_| DASHBOARD_PATH);
    let session = match outcome {
        LoginOutcome::SignedIn(session) => Some(session),
        _ => None,
    };
    respond(&state, status, notification, session, redirect)
}

/// POST /api/auth/signup
/// Bootstraps the admin account.
pub async fn signup(State(state): State<AppState>, Json(payload): Json<Credentials>) -> impl IntoResponse {
    if let Err(response) = validate(&payload) {
        return response;
    }

    let outcome = admin_signup(state.client.auth(), &payload.email, &payload.password).await;
    let notification = outcome.notification();
    let redirect = outcome.redirect();
    let status = match &outcome {
        SignupOutcome::Created => StatusCode::CREATED,
        SignupOutcome::SignedIn(_) => StatusCode::OK,
        SignupOutcome::AccessDenied => StatusCode::FORBIDDEN,
        SignupOutcome::LoginFailed(_) => StatusCode::UNAUTHORIZED,
        SignupOutcome::SignupFailed(_) => StatusCode::BAD_REQUEST,
    };

    let session = match outcome {
        SignupOutcome::SignedIn(session) => Some(session),
        _ => None,
    };
    respond(&state, status, notification, session, redirect)
}

/// POST /api/auth/logout
/// Always succeeds; the session cookie is cleared either way.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = extract_access_token(&headers) {
        state.client.auth().sign_out(&token).await;
    }

    let mut response = Json(LogoutResponse {
        result: SuccessResponse { success: true },
        redirect: "/",
    })
    .into_response();
    if let Some(cookie) = session_cookie("", 0) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

/// GET /api/auth/session
pub async fn session(capability: AdminCapability) -> Json<AdminCapability> {
    Json(capability)
}

/// GET /admin-login
/// Target of the dashboard gate's redirect; describes the login form.
pub async fn login_page(capability: AdminCapability) -> impl IntoResponse {
    Json(serde_json::json!({
        "title": "Admin Login",
        "login": "/api/auth/login",
        "signup": "/api/auth/signup",
        "signedIn": capability.is_admin,
        "dashboard": DASHBOARD_PATH,
    }))
}
