//! Service configuration.

use std::path::Path;

use tally_core::RuleBook;
use tally_ledger::LedgerConfig;

/// Errors raised while loading configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The rules file could not be read.
    #[error("failed to read rules file {path}: {source}")]
    Io {
        /// The configured path.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The rules file is not a valid JSON rule list.
    #[error("invalid rules file {path}: {source}")]
    Parse {
        /// The configured path.
        path: String,
        /// The underlying error.
        source: serde_json::Error,
    },
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/tally").
    pub data_dir: String,

    /// Expected JWT issuer (default: "tally-auth").
    pub auth_issuer: String,

    /// Expected JWT audience (default: "tally").
    pub auth_audience: String,

    /// HS256 secret for user JWTs. User routes reject every token when unset.
    pub auth_jwt_secret: Option<String>,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Admin API key for operator endpoints.
    pub admin_api_key: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// JSON rule list replacing the standard rules (optional).
    pub rules_file: Option<String>,

    /// Ledger policy.
    pub ledger: LedgerConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            auth_issuer: std::env::var("AUTH_ISSUER").unwrap_or(defaults.auth_issuer),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or(defaults.auth_audience),
            auth_jwt_secret: std::env::var("AUTH_JWT_SECRET").ok(),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            rules_file: std::env::var("RULES_FILE").ok(),
            ledger: LedgerConfig {
                fail_open_on_store_error: env_parse("LIMITS_FAIL_OPEN")
                    .unwrap_or(defaults.ledger.fail_open_on_store_error),
                achievement_depth_limit: env_parse("ACHIEVEMENT_DEPTH_LIMIT")
                    .unwrap_or(defaults.ledger.achievement_depth_limit),
            },
        }
    }

    /// The rule book to serve: the rules file when configured, otherwise the
    /// standard rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules file cannot be read or parsed.
    pub fn load_rules(&self) -> Result<RuleBook, ConfigError> {
        let Some(path) = &self.rules_file else {
            return Ok(RuleBook::standard());
        };

        let contents = std::fs::read_to_string(Path::new(path)).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let rules = RuleBook::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path, "Loaded rules from file");
        Ok(rules)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/tally".into(),
            auth_issuer: "tally-auth".into(),
            auth_audience: "tally".into(),
            auth_jwt_secret: None,
            service_api_key: None,
            admin_api_key: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            rules_file: None,
            ledger: LedgerConfig::default(),
        }
    }
}
