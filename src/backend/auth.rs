//! Password accounts and JWT sessions.
//!
//! Accounts are rows of `auth_users`; every sign-up also writes a `profiles`
//! row. Sessions are stateless HS256 tokens carrying a session id, and
//! sign-out revokes that id until the token would have expired anyway.

use std::collections::HashMap;
use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BackendError, Database, Query, Table};
use crate::config::AppConfig;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Password should be at least {0} characters")]
    WeakPassword(usize),

    #[error("Unable to validate email address: invalid format")]
    InvalidEmail,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Failed to process password")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Failed to create session")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// JWT claims for a session.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub sid: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Result of a sign-up: a live session when the account is confirmed
/// immediately, otherwise just the pending user.
#[derive(Debug, Clone)]
pub enum SignUp {
    Confirmed(Session),
    PendingConfirmation(User),
}

#[derive(Debug, Deserialize)]
struct AccountRow {
    id: String,
    email: String,
    password_hash: String,
    #[serde(default)]
    email_confirmed: bool,
}

pub struct AuthService {
    db: Arc<dyn Database>,
    jwt_secret: String,
    session_ttl: Duration,
    autoconfirm: bool,
    admin_email: String,
    /// Revoked session id -> token expiry (unix seconds).
    revoked: RwLock<HashMap<String, i64>>,
}

impl AuthService {
    pub fn new(db: Arc<dyn Database>, config: &AppConfig) -> Self {
        Self {
            db,
            jwt_secret: config.jwt_secret.clone(),
            session_ttl: Duration::minutes(config.session_ttl_minutes),
            autoconfirm: config.auth_autoconfirm,
            admin_email: config.admin_email.trim().to_lowercase(),
            revoked: RwLock::new(HashMap::new()),
        }
    }

    /// Exact match against the configured admin address.
    pub fn is_admin_email(&self, email: &str) -> bool {
        email == self.admin_email
    }

    async fn find_account(&self, email: &str) -> Result<Option<AccountRow>, AuthError> {
        let rows = self
            .db
            .select(&Query::new(Table::AuthUsers).eq("email", email))
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(
                serde_json::from_value(row).map_err(BackendError::from)?,
            )),
            None => Ok(None),
        }
    }

    fn issue_session(&self, user: User) -> Result<Session, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            sid: Uuid::new_v4().to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(Session {
            access_token,
            expires_at,
            user,
        })
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidSession)?;
        Ok(data.claims)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, AuthError> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }

        if self.find_account(&email).await?.is_some() {
            return Err(AuthError::AlreadyRegistered);
        }

        // bcrypt is CPU-bound; keep it off the async executor.
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
            .await
            .map_err(|e| BackendError::InvalidRow(format!("hashing task failed: {e}")))??;

        let rows = self
            .db
            .insert(
                Table::AuthUsers,
                vec![json!({
                    "email": email,
                    "password_hash": password_hash,
                    "email_confirmed": self.autoconfirm,
                })],
            )
            .await
            .map_err(|e| match e {
                BackendError::UniqueViolation { .. } => AuthError::AlreadyRegistered,
                other => AuthError::Backend(other),
            })?;

        let id = rows
            .first()
            .and_then(|row| row.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BackendError::InvalidRow("account insert returned no id".to_string()))?;

        let role = if self.is_admin_email(&email) { "admin" } else { "user" };
        if let Err(e) = self
            .db
            .insert(
                Table::Profiles,
                vec![json!({ "user_id": id, "email": email, "role": role })],
            )
            .await
        {
            // Accounts never outlive a failed profile insert
            if let Err(cleanup) = self.db.delete(Table::AuthUsers, &id).await {
                tracing::error!(email = %email, error = %cleanup, "failed to remove account after profile insert failed");
            }
            return Err(e.into());
        }

        tracing::info!(email = %email, confirmed = self.autoconfirm, "account created");

        let user = User { id, email };
        if self.autoconfirm {
            Ok(SignUp::Confirmed(self.issue_session(user)?))
        } else {
            Ok(SignUp::PendingConfirmation(user))
        }
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim().to_lowercase();
        let Some(account) = self.find_account(&email).await? else {
            tracing::warn!("Login attempt for unknown user: {}", email);
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let stored_hash = account.password_hash.clone();
        let password_ok = tokio::task::spawn_blocking(move || verify(password, &stored_hash).unwrap_or(false))
            .await
            .unwrap_or(false);
        if !password_ok {
            tracing::warn!("Failed login attempt for: {}", account.email);
            return Err(AuthError::InvalidCredentials);
        }

        if !account.email_confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }

        self.issue_session(User {
            id: account.id,
            email: account.email,
        })
    }

    /// Resolves the user behind an access token.
    pub async fn get_user(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.decode_claims(token)?;
        if self.revoked.read().await.contains_key(&claims.sid) {
            return Err(AuthError::InvalidSession);
        }
        Ok(User {
            id: claims.sub,
            email: claims.email,
        })
    }

    /// Revokes the session. Unknown or expired tokens are ignored.
    pub async fn sign_out(&self, token: &str) {
        if let Ok(claims) = self.decode_claims(token) {
            let now = Utc::now().timestamp();
            let mut revoked = self.revoked.write().await;
            // Expired tokens fail validation on their own
            revoked.retain(|_, exp| *exp > now);
            revoked.insert(claims.sid, claims.exp);
            tracing::info!(email = %claims.email, "session revoked");
        }
    }

    pub async fn profile_role(&self, user_id: &str) -> Result<Option<String>, AuthError> {
        let rows = self
            .db
            .select(
                &Query::new(Table::Profiles)
                    .select(&["role"])
                    .eq("user_id", user_id),
            )
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("role"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::backend::memory::MemoryDatabase;

    /// Memory store whose `profiles` inserts fail while `fail_profiles` is set.
    struct FlakyProfiles {
        inner: MemoryDatabase,
        fail_profiles: AtomicBool,
    }

    #[async_trait]
    impl Database for FlakyProfiles {
        async fn select(&self, query: &Query) -> Result<Vec<Value>, BackendError> {
            self.inner.select(query).await
        }
        async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
            if table == Table::Profiles && self.fail_profiles.load(Ordering::SeqCst) {
                return Err(BackendError::Storage("profiles unavailable".to_string()));
            }
            self.inner.insert(table, rows).await
        }
        async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, BackendError> {
            self.inner.update(table, id, patch).await
        }
        async fn delete(&self, table: Table, id: &str) -> Result<(), BackendError> {
            self.inner.delete(table, id).await
        }
        async fn ping(&self) -> Result<std::time::Duration, BackendError> {
            self.inner.ping().await
        }
    }

    fn service(autoconfirm: bool) -> AuthService {
        let config = AppConfig {
            auth_autoconfirm: autoconfirm,
            admin_email: "owner@site.test".to_string(),
            ..AppConfig::default()
        };
        AuthService::new(Arc::new(MemoryDatabase::new()), &config)
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let auth = service(true);
        let outcome = auth.sign_up("Owner@Site.test", "secret123").await.unwrap();
        assert!(matches!(outcome, SignUp::Confirmed(_)));

        let session = auth
            .sign_in_with_password("owner@site.test", "secret123")
            .await
            .unwrap();
        assert_eq!(session.user.email, "owner@site.test");

        let user = auth.get_user(&session.access_token).await.unwrap();
        assert_eq!(user, session.user);
        assert_eq!(
            auth.profile_role(&user.id).await.unwrap().as_deref(),
            Some("admin")
        );
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let auth = service(true);
        auth.sign_up("a@b.test", "secret123").await.unwrap();
        let err = auth.sign_in_with_password("a@b.test", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_unconfirmed_account_cannot_sign_in() {
        let auth = service(false);
        let outcome = auth.sign_up("a@b.test", "secret123").await.unwrap();
        assert!(matches!(outcome, SignUp::PendingConfirmation(_)));

        let err = auth.sign_in_with_password("a@b.test", "secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailNotConfirmed));
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_is_rejected() {
        let auth = service(true);
        auth.sign_up("a@b.test", "secret123").await.unwrap();
        let err = auth.sign_up("A@B.test", "secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn test_failed_profile_insert_removes_account() {
        let db = Arc::new(FlakyProfiles {
            inner: MemoryDatabase::new(),
            fail_profiles: AtomicBool::new(true),
        });
        let auth = AuthService::new(db.clone(), &AppConfig::default());

        let err = auth.sign_up("a@b.test", "secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::Backend(BackendError::Storage(_))));
        let accounts = db.select(&Query::new(Table::AuthUsers)).await.unwrap();
        assert!(accounts.is_empty());

        db.fail_profiles.store(false, Ordering::SeqCst);
        assert!(auth.sign_up("a@b.test", "secret123").await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_validates_input() {
        let auth = service(true);
        assert!(matches!(
            auth.sign_up("no-at-sign", "secret123").await,
            Err(AuthError::InvalidEmail)
        ));
        assert!(matches!(
            auth.sign_up("a@b.test", "123").await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_session() {
        let auth = service(true);
        let SignUp::Confirmed(session) = auth.sign_up("a@b.test", "secret123").await.unwrap() else {
            panic!("expected a confirmed session");
        };
        auth.sign_out(&session.access_token).await;
        assert!(matches!(
            auth.get_user(&session.access_token).await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_sign_out_prunes_expired_revocations() {
        let auth = service(true);
        let stale = Utc::now().timestamp() - 60;
        auth.revoked.write().await.insert("old-session".to_string(), stale);

        let SignUp::Confirmed(session) = auth.sign_up("a@b.test", "secret123").await.unwrap() else {
            panic!("expected a confirmed session");
        };
        auth.sign_out(&session.access_token).await;

        let revoked = auth.revoked.read().await;
        assert!(!revoked.contains_key("old-session"));
        assert_eq!(revoked.len(), 1);
    }

    #[tokio::test]
    async fn test_get_user_rejects_garbage() {
        let auth = service(true);
        assert!(auth.get_user("invalid.jwt.token").await.is_err());
    }
}
