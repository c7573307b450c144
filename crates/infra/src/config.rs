//! Runtime configuration from environment variables.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "stockroom-dev-secret-change-me";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub password_rounds: u32,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// `None` allows any origin.
    pub cors_origin: Option<String>,
    pub company_name: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub cookie_secure: bool,
}

fn load<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = optional(&lookup, "DATABASE_URL");
        if database_url.is_none() {
            warn!("DATABASE_URL not set, data is kept in memory and lost on restart");
        }

        let jwt_secret = optional(&lookup, "JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using an insecure development secret");
            DEV_JWT_SECRET.to_string()
        });

        let jwt_ttl_minutes: i64 = load(&lookup, "JWT_TTL_MINUTES", "480")?;
        if jwt_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "JWT_TTL_MINUTES",
                value: jwt_ttl_minutes.to_string(),
                reason: "must be positive".into(),
            });
        }

        let password_rounds: u32 = load(&lookup, "PASSWORD_ROUNDS", "100000")?;
        if password_rounds == 0 {
            return Err(ConfigError::Invalid {
                key: "PASSWORD_ROUNDS",
                value: "0".into(),
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            bind_addr: load(&lookup, "BIND_ADDR", "0.0.0.0:8080")?,
            database_url,
            db_max_connections: load(&lookup, "DB_MAX_CONNECTIONS", "10")?,
            jwt_secret,
            jwt_ttl_minutes,
            password_rounds,
            upload_dir: PathBuf::from(
                optional(&lookup, "UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
            ),
            max_upload_bytes: load(&lookup, "MAX_UPLOAD_BYTES", "2097152")?,
            cors_origin: optional(&lookup, "CORS_ORIGIN"),
            company_name: optional(&lookup, "COMPANY_NAME")
                .unwrap_or_else(|| "Stockroom".to_string()),
            admin_email: optional(&lookup, "ADMIN_EMAIL"),
            admin_password: optional(&lookup, "ADMIN_PASSWORD"),
            cookie_secure: load(&lookup, "COOKIE_SECURE", "false")?,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply() {
        let c = config(&[]).unwrap();
        assert_eq!(c.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(c.database_url, None);
        assert_eq!(c.db_max_connections, 10);
        assert_eq!(c.jwt_ttl_minutes, 480);
        assert_eq!(c.max_upload_bytes, 2 * 1024 * 1024);
        assert!(c.uses_dev_secret());
        assert!(!c.cookie_secure);
    }

    #[test]
    fn values_are_read() {
        let c = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/stockroom"),
            ("JWT_SECRET", "s3cret"),
            ("COOKIE_SECURE", "true"),
            ("COMPANY_NAME", "Corner Shop"),
        ])
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.database_url.as_deref(), Some("postgres://localhost/stockroom"));
        assert!(!c.uses_dev_secret());
        assert!(c.cookie_secure);
        assert_eq!(c.company_name, "Corner Shop");
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = config(&[("DB_MAX_CONNECTIONS", "lots")]).unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
        assert!(config(&[("JWT_TTL_MINUTES", "0")]).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let c = config(&[("DATABASE_URL", "  "), ("CORS_ORIGIN", "")]).unwrap();
        assert_eq!(c.database_url, None);
        assert_eq!(c.cors_origin, None);
    }
}
