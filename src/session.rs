//! Who is calling, and whether they may use the dashboard.
//!
//! [`AdminCapability`] is derived once per request from the access token and
//! cached in the request extensions; [`AdminGate`] turns a missing or
//! non-admin session into a redirect to the login page.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::Redirect;
use serde::Serialize;

use crate::backend::auth::{AuthError, AuthService, Session, SignUp, User};
use crate::content::{Notification, NotificationLevel};
use crate::AppState;

pub const LOGIN_PATH: &str = "/admin-login";
pub const DASHBOARD_PATH: &str = "/admin";

/// Cookie that carries the access token for browser navigation to `/admin`.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Bearer token from the Authorization header, falling back to the
/// access token cookie.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
        .map(|(_, value)| value.to_string())
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCapability {
    pub user: Option<User>,
    pub is_admin: bool,
}

impl AdminCapability {
    pub fn for_user(user: User, auth: &AuthService) -> Self {
        let is_admin = auth.is_admin_email(&user.email);
        Self {
            user: Some(user),
            is_admin,
        }
    }

    pub async fn resolve(auth: &AuthService, token: Option<&str>) -> Self {
        let Some(token) = token else {
            return Self::default();
        };
        match auth.get_user(token).await {
            Ok(user) => Self::for_user(user, auth),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unusable session token");
                Self::default()
            }
        }
    }
}

impl FromRequestParts<AppState> for AdminCapability {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(capability) = parts.extensions.get::<AdminCapability>() {
            return Ok(capability.clone());
        }

        let token = extract_access_token(&parts.headers);
        let capability = AdminCapability::resolve(state.client.auth(), token.as_deref()).await;
        parts.extensions.insert(capability.clone());
        Ok(capability)
    }
}

/// Present only on requests from the admin; everyone else is redirected to
/// the login page before the handler runs.
#[derive(Debug, Clone)]
pub struct AdminGate(pub User);

impl FromRequestParts<AppState> for AdminGate {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let capability = AdminCapability::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        match capability {
            AdminCapability {
                user: Some(user),
                is_admin: true,
            } => Ok(AdminGate(user)),
            AdminCapability { user, .. } => {
                tracing::warn!(
                    path = %parts.uri.path(),
                    email = user.as_ref().map(|u| u.email.as_str()).unwrap_or("-"),
                    "dashboard access refused"
                );
                Err(Redirect::to(LOGIN_PATH))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    SignedIn(Session),
    AccessDenied,
    /// The admin account exists but its email is not confirmed yet.
    AccountExists,
    LoginFailed(String),
}

impl LoginOutcome {
    pub fn notification(&self) -> Notification {
        match self {
            LoginOutcome::SignedIn(_) => Notification::success("Welcome back, Admin!"),
            LoginOutcome::AccessDenied => access_denied(),
            LoginOutcome::AccountExists => Notification::titled(
                NotificationLevel::Error,
                "Account Exists",
                "Please check your email to confirm your account, or contact support.",
            ),
            LoginOutcome::LoginFailed(message) => Notification::titled(NotificationLevel::Error, "Login Failed", message.clone()),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            LoginOutcome::SignedIn(session) => Some(session),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SignupOutcome {
    Created,
    SignedIn(Session),
    AccessDenied,
    LoginFailed(String),
    SignupFailed(String),
}

impl SignupOutcome {
    pub fn notification(&self) -> Notification {
        match self {
            SignupOutcome::Created => Notification::success("Admin account created! You can now login."),
            SignupOutcome::SignedIn(_) => Notification::success("Welcome back, Admin!"),
            SignupOutcome::AccessDenied => access_denied(),
            SignupOutcome::LoginFailed(message) => {
                Notification::titled(NotificationLevel::Error, "Login Failed", message.clone())
            }
            SignupOutcome::SignupFailed(message) => {
                Notification::titled(NotificationLevel::Error, "Signup Failed", message.clone())
            }
        }
    }

    /// Where the browser goes next, if anywhere.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            SignupOutcome::Created => Some(LOGIN_PATH),
            SignupOutcome::SignedIn(_) => Some(DASHBOARD_PATH),
            _ => None,
        }
    }
}

fn access_denied() -> Notification {
    Notification::titled(
        NotificationLevel::Error,
        "Access Denied",
        "You don't have admin privileges",
    )
}

/// Sign in. An unconfirmed admin address is told to confirm its email, and a
/// non-admin session is revoked straight away.
pub async fn admin_login(auth: &AuthService, email: &str, password: &str) -> LoginOutcome {
    match auth.sign_in_with_password(email, password).await {
        Ok(session) if auth.is_admin_email(&session.user.email) => {
            tracing::info!(email = %session.user.email, "admin signed in");
            LoginOutcome::SignedIn(session)
        }
        Ok(session) => {
            auth.sign_out(&session.access_token).await;
            LoginOutcome::AccessDenied
        }
        Err(AuthError::EmailNotConfirmed) if auth.is_admin_email(&email.trim().to_lowercase()) => {
            LoginOutcome::AccountExists
        }
        Err(e) => LoginOutcome::LoginFailed(e.to_string()),
    }
}

/// Bootstrap the admin account. An already registered address is signed in
/// instead and must carry the admin profile role.
pub async fn admin_signup(auth: &AuthService, email: &str, password: &str) -> SignupOutcome {
    match auth.sign_up(email, password).await {
        Ok(outcome) => {
            if let SignUp::Confirmed(session) = outcome {
                auth.sign_out(&session.access_token).await;
            }
            SignupOutcome::Created
        }
        Err(AuthError::AlreadyRegistered) => {
            let session = match auth.sign_in_with_password(email, password).await {
                Ok(session) => session,
                Err(e) => return SignupOutcome::LoginFailed(e.to_string()),
            };
            match auth.profile_role(&session.user.id).await {
                Ok(Some(role)) if role == "admin" => SignupOutcome::SignedIn(session),
                Ok(_) => {
                    auth.sign_out(&session.access_token).await;
                    SignupOutcome::AccessDenied
                }
                Err(e) => {
                    tracing::error!(error = %e, "profile lookup failed");
                    auth.sign_out(&session.access_token).await;
                    SignupOutcome::LoginFailed(e.to_string())
                }
            }
        }
        Err(e) => SignupOutcome::SignupFailed(e.to_string()),
    }
}
