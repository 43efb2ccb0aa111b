//! Service configuration.
//!
//! Settings are layered: built-in defaults, then `config/config.toml` if it
//! exists, then `TASKTRACK__SECTION__KEY` environment variables, then the flat
//! variables older deployments already set (`DATABASE_URL`, `RUN_MIGRATIONS`,
//! `MAX_BODY_BYTES`, ...).

use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;
use std::path::Path;

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_FILE: &str = "config/config.toml";

/// Flat environment variables and the keys they override.
const LEGACY_VARS: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("RUN_MIGRATIONS", "migrations.run_on_startup"),
    ("LOG_LEVEL", "log.level"),
    ("LOG_FORMAT", "log.format"),
    ("MAX_BODY_BYTES", "limits.max_body_bytes"),
    ("RL_WINDOW_SECS", "limits.rate_limit_window_seconds"),
    ("RL_MAX_REQS", "limits.rate_limit_max_requests"),
    ("CORS_ALLOW_ORIGINS", "cors.allow_origins"),
    ("HOST", "server.host"),
    ("PORT", "server.port"),
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub migrations: MigrationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// No default: a missing URL is a fatal startup error.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
    /// Advisory lock key shared by every instance of the service.
    #[serde(default = "default_lock_key")]
    pub lock_key: i64,
    /// `0` waits for the lock indefinitely.
    #[serde(default = "default_lock_timeout_seconds")]
    pub lock_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of `may` worker threads; the runtime default when unset.
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_rate_limit_window_seconds")]
    pub rate_limit_window_seconds: u64,
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,
    #[serde(default = "default_rate_limit_max_clients")]
    pub rate_limit_max_clients: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Comma separated list of allowed origins; empty disables CORS.
    #[serde(default)]
    pub allow_origins: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
    /// Human-readable and JSON lines side by side.
    #[default]
    Dual,
}

fn default_max_connections() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_lock_key() -> i64 {
    777_777_777
}

fn default_lock_timeout_seconds() -> u64 {
    60
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_body_bytes() -> usize {
    1_048_576
}

fn default_rate_limit_window_seconds() -> u64 {
    60
}

fn default_rate_limit_max_requests() -> u32 {
    120
}

fn default_rate_limit_max_clients() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            run_on_startup: true,
            lock_key: default_lock_key(),
            lock_timeout_seconds: default_lock_timeout_seconds(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            rate_limit_window_seconds: default_rate_limit_window_seconds(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            rate_limit_max_clients: default_rate_limit_max_clients(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load from `config/config.toml` (optional) and the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a source cannot be parsed or a value has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        let vars: Map<String, String> = std::env::vars().collect();
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE), vars)
    }

    /// Load from an explicit file path and environment snapshot
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a source cannot be parsed or a value has the wrong type.
    pub fn load_from(file: &Path, vars: Map<String, String>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix("TASKTRACK")
                    .separator("__")
                    .source(Some(vars.clone())),
            );

        for (var, key) in LEGACY_VARS {
            let value = vars.get(*var).filter(|v| !v.trim().is_empty()).cloned();
            builder = builder.set_override_option(*key, value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// The configured database URL, if any
    pub fn database_url(&self) -> Option<&str> {
        self.database
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// `host:port` the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl CorsConfig {
    /// The allowed origins, trimmed, empty entries dropped
    pub fn origins(&self) -> Vec<String> {
        self.allow_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn missing_file() -> &'static Path {
        Path::new("does/not/exist.toml")
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::load_from(missing_file(), Map::new()).unwrap();
        assert_eq!(config.database_url(), None);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.migrations.run_on_startup);
        assert_eq!(config.migrations.lock_key, 777_777_777);
        assert_eq!(config.migrations.lock_timeout_seconds, 60);
        assert_eq!(config.limits.max_body_bytes, 1_048_576);
        assert_eq!(config.limits.rate_limit_window_seconds, 60);
        assert_eq!(config.limits.rate_limit_max_requests, 120);
        assert_eq!(config.log.format, LogFormat::Dual);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert!(config.cors.origins().is_empty());
    }

    #[test]
    fn test_legacy_variables() {
        let config = AppConfig::load_from(
            missing_file(),
            vars(&[
                ("DATABASE_URL", "postgres://u:p@db:5432/tasks"),
                ("RUN_MIGRATIONS", "0"),
                ("MAX_BODY_BYTES", "2048"),
                ("RL_WINDOW_SECS", "10"),
                ("RL_MAX_REQS", "5"),
                ("CORS_ALLOW_ORIGINS", "https://a.example, ,https://b.example"),
                ("PORT", "9000"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database_url(), Some("postgres://u:p@db:5432/tasks"));
        assert!(!config.migrations.run_on_startup);
        assert_eq!(config.limits.max_body_bytes, 2048);
        assert_eq!(config.limits.rate_limit_window_seconds, 10);
        assert_eq!(config.limits.rate_limit_max_requests, 5);
        assert_eq!(
            config.cors.origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_run_migrations_accepts_true_spellings() {
        for value in ["1", "true", "True"] {
            let config =
                AppConfig::load_from(missing_file(), vars(&[("RUN_MIGRATIONS", value)])).unwrap();
            assert!(config.migrations.run_on_startup, "{value} should enable");
        }
    }

    #[test]
    fn test_prefixed_environment() {
        let config = AppConfig::load_from(
            missing_file(),
            vars(&[
                ("TASKTRACK__DATABASE__URL", "postgres://u:p@db/tasks"),
                ("TASKTRACK__MIGRATIONS__LOCK_TIMEOUT_SECONDS", "5"),
                ("TASKTRACK__LOG__FORMAT", "json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database_url(), Some("postgres://u:p@db/tasks"));
        assert_eq!(config.migrations.lock_timeout_seconds, 5);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_legacy_variable_wins_over_prefixed() {
        let config = AppConfig::load_from(
            missing_file(),
            vars(&[
                ("TASKTRACK__DATABASE__URL", "postgres://u:p@prefixed/tasks"),
                ("DATABASE_URL", "postgres://u:p@legacy/tasks"),
            ]),
        )
        .unwrap();
        assert_eq!(config.database_url(), Some("postgres://u:p@legacy/tasks"));
    }

    #[test]
    fn test_blank_database_url_is_missing() {
        let config =
            AppConfig::load_from(missing_file(), vars(&[("TASKTRACK__DATABASE__URL", "  ")]))
                .unwrap();
        assert_eq!(config.database_url(), None);
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[database]
url = "postgres://u:p@file/tasks"
max_connections = 4

[migrations]
run_on_startup = false

[log]
format = "text"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(&path, Map::new()).unwrap();
        assert_eq!(config.database_url(), Some("postgres://u:p@file/tasks"));
        assert_eq!(config.database.max_connections, 4);
        assert!(!config.migrations.run_on_startup);
        assert_eq!(config.log.format, LogFormat::Text);
    }
}
