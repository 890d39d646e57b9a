//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Service configuration, read from `BEAUTY_BOOK_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Path to the local libSQL database file.
    pub db_path: PathBuf,
    /// Name of the cookie carrying the session token.
    pub session_cookie: String,
    /// Allowed CORS origins. Empty means same-origin only; `*` allows any.
    pub cors_origins: Vec<String>,
    /// Payment-processor API key. Only its presence is ever logged.
    pub stripe_secret_key: Option<SecretString>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: PathBuf::from("./data/beauty-book.db"),
            session_cookie: "bb-session".to_string(),
            cors_origins: Vec::new(),
            stripe_secret_key: None,
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> crate::error::Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok())?)
    }

    /// Load using `lookup` for each variable. Unset variables take defaults;
    /// set-but-invalid ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("BEAUTY_BOOK_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "BEAUTY_BOOK_PORT".to_string(),
                message: format!("expected a port number, got {raw:?}"),
            })?,
            None => defaults.port,
        };

        let db_path = lookup("BEAUTY_BOOK_DB_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let session_cookie = match lookup("BEAUTY_BOOK_SESSION_COOKIE") {
            Some(name) if is_cookie_name(&name) => name,
            Some(name) => {
                return Err(ConfigError::InvalidValue {
                    key: "BEAUTY_BOOK_SESSION_COOKIE".to_string(),
                    message: format!("not a valid cookie name: {name:?}"),
                });
            }
            None => defaults.session_cookie,
        };

        let cors_origins: Vec<String> = lookup("BEAUTY_BOOK_CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let stripe_secret_key = lookup("STRIPE_SECRET_KEY")
            .filter(|s| !s.is_empty())
            .map(SecretString::from);

        Ok(Self {
            port,
            db_path,
            session_cookie,
            cors_origins,
            stripe_secret_key,
        })
    }
}

fn is_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
