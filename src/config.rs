//! Application configuration read from the environment (and `.env` via dotenvy).

use std::path::PathBuf;

/// Fallback admin address. Production startup warns when it is still in use.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";

/// Fallback signing secret. Production startup refuses to run with it.
pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

/// Bucket that receives project images and thumbnails.
pub const DEFAULT_IMAGE_BUCKET: &str = "project-images";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    /// The single address allowed into the dashboard.
    pub admin_email: String,
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
    /// New accounts are confirmed on sign-up instead of waiting for an email link.
    pub auth_autoconfirm: bool,
    pub storage_dir: PathBuf,
    pub image_bucket: String,
    pub public_base_url: String,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            session_ttl_minutes: 60,
            auth_autoconfirm: true,
            storage_dir: PathBuf::from("storage"),
            image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
            public_base_url: String::new(),
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            admin_email: std::env::var("ADMIN_EMAIL")
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.admin_email),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            session_ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.session_ttl_minutes),
            auth_autoconfirm: std::env::var("AUTH_AUTOCONFIRM")
                .ok()
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.auth_autoconfirm),
            storage_dir: std::env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            image_bucket: std::env::var("IMAGE_BUCKET").unwrap_or(defaults.image_bucket),
            public_base_url: std::env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Startup checks. Returns the reason the server must not start, if any.
    pub fn check_production(&self) -> Result<(), String> {
        if !self.is_production() {
            return Ok(());
        }

        if self.jwt_secret.is_empty() || self.jwt_secret == DEFAULT_JWT_SECRET {
            return Err("JWT_SECRET must be set to a secure, unique value in production".to_string());
        }

        if self.admin_email == DEFAULT_ADMIN_EMAIL {
            tracing::warn!(
                "SECURITY: ADMIN_EMAIL is using an insecure default. \
                 Set ADMIN_EMAIL to the real admin address."
            );
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_development() {
        let config = AppConfig::default();
        assert!(!config.is_production());
        assert!(config.check_production().is_ok());
        assert_eq!(config.image_bucket, DEFAULT_IMAGE_BUCKET);
    }

    #[test]
    fn test_production_rejects_default_secret() {
        let config = AppConfig {
            environment: "production".to_string(),
            ..AppConfig::default()
        };
        assert!(config.check_production().is_err());

        let config = AppConfig {
            environment: "production".to_string(),
            jwt_secret: "a-real-secret".to_string(),
            ..AppConfig::default()
        };
        assert!(config.check_production().is_ok());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
