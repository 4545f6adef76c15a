// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use config::{Config as ConfigFile, File, Environment};

use crate::error::ConfigError;

/// Central configuration for the web server and its session core
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web_server_addr: String,

    pub session: SessionConfig,

    // Static file serving configuration
    pub static_files: StaticFilesConfig,

    // Throttling for the login endpoint
    pub rate_limit: RateLimitConfig,
}

/// The only runtime knobs the session core accepts.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HMAC signing secret. Required; there is no fallback value.
    pub secret: Option<String>,
    /// Controls the `Secure` attribute on the session cookie.
    pub production: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub path: String,
    pub index: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    /// Key clients on `X-Forwarded-For`/`Forwarded` instead of the socket peer.
    /// Only safe behind a proxy that overwrites those headers.
    pub trust_forwarded: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            session: SessionConfig::default(),
            static_files: StaticFilesConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            path: "./static".to_string(),
            index: "index.html".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
            trust_forwarded: false,
        }
    }
}

impl SessionConfig {
    /// The signing secret, or `MissingSecret` when it is absent or blank.
    pub fn secret(&self) -> Result<&str, ConfigError> {
        self.secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        Self::load_from(&config_dir, &run_mode)
    }

    /// Load configuration layered from `config_dir` for the given run mode
    pub fn load_from(config_dir: &Path, run_mode: &str) -> Result<Self, ConfigError> {
        // JWT_SECRET is honoured unless the namespaced variable is also set
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|_| env::var("APP__SESSION__SECRET").is_err());

        Self::load_layered(config_dir, run_mode, jwt_secret.as_deref())
    }

    /// Layered load with the `JWT_SECRET` value passed in.
    ///
    /// Precedence for `session.secret`, highest first: `APP__SESSION__SECRET`
    /// (callers drop `jwt_secret` when it is set), `jwt_secret`, `local.toml`,
    /// `{run_mode}.toml`, `default.toml`.
    pub fn load_layered(
        config_dir: &Path,
        run_mode: &str,
        jwt_secret: Option<&str>,
    ) -> Result<Self, ConfigError> {
        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            // Production mode implies secure cookies unless a file says otherwise
            .set_default("session.production", run_mode == "production")?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            // Add a local config file for local overrides
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment variables with prefix "APP", e.g. APP__SESSION__SECRET
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("session.secret", jwt_secret)?
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load configuration, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let web_server_addr = env::var("WEB_SERVER_ADDR")
                    .unwrap_or_else(|_| "127.0.0.1:8081".to_string());

                let secret = env::var("APP__SESSION__SECRET")
                    .or_else(|_| env::var("JWT_SECRET"))
                    .ok();

                let production = env::var("RUN_MODE")
                    .map(|v| v == "production")
                    .unwrap_or(false);

                let static_files_path = env::var("STATIC_FILES_PATH")
                    .unwrap_or_else(|_| "./static".to_string());

                let static_files_index = env::var("STATIC_FILES_INDEX")
                    .unwrap_or_else(|_| "index.html".to_string());

                Self {
                    web_server_addr,
                    session: SessionConfig { secret, production },
                    static_files: StaticFilesConfig {
                        path: static_files_path,
                        index: static_files_index,
                    },
                    rate_limit: RateLimitConfig::default(),
                }
            }
        }
    }
}
