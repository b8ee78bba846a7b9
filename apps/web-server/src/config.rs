//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use inkwell_infra::database::DatabaseConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub media_root: PathBuf,
    pub settings: Settings,
}

/// Request-time knobs the handlers read from state.
#[derive(Debug, Clone)]
pub struct Settings {
    /// How long the rendered index page is served from cache.
    pub index_cache_ttl: Duration,
    pub session_cookie_secure: bool,
    /// Scheme and host that links in outgoing mail point at.
    pub site_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_cache_ttl: Duration::from_secs(20),
            session_cookie_secure: false,
            site_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

impl Settings {
    /// `path` on the configured site, e.g. for a password reset link.
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.site_url.trim_end_matches('/'), path)
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut database = DatabaseConfig::new(
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://inkwell.db?mode=rwc".to_string()),
        );
        if let Some(max) = parsed("DB_MAX_CONNECTIONS") {
            database.max_connections = max;
        }
        if let Some(min) = parsed("DB_MIN_CONNECTIONS") {
            database.min_connections = min;
        }
        database.log_statements = env::var("DB_LOG_STATEMENTS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let defaults = Settings::default();
        let settings = Settings {
            index_cache_ttl: parsed("INDEX_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.index_cache_ttl),
            session_cookie_secure: env::var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.session_cookie_secure),
            site_url: env::var("SITE_URL").unwrap_or(defaults.site_url),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT").unwrap_or(8080),
            database,
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
            settings,
        }
    }
}
