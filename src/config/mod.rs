//! Configuration management.
//!
//! Settings come from a TOML file whose fields are all optional and merge
//! over the defaults, followed by `HINDSIGHT_*` environment overrides.
//!
//! ```toml
//! [database]
//! path = "~/.hindsight/knowledge.db"
//! busy_timeout_ms = 5000
//! max_retries = 3
//!
//! [search]
//! default_limit = 10
//! max_limit = 100
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory under the home directory holding the database, logs and config.
const HINDSIGHT_DIR: &str = ".hindsight";

/// Main configuration for hindsight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HindsightConfig {
    /// Storage settings.
    pub database: DatabaseConfig,
    /// Result limit settings.
    pub search: SearchConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Storage file and connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Path to the `SQLite` file.
    pub path: PathBuf,
    /// Overall budget for acquiring a connection, including retries.
    pub connect_timeout: Duration,
    /// How long a statement waits on a locked database.
    pub busy_timeout: Duration,
    /// Retries after the first failed connection attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay: Duration,
}

/// Result limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Limit used when a request names none.
    pub default_limit: usize,
    /// Upper bound for any requested limit.
    pub max_limit: usize,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, defaulting to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Level or `EnvFilter` directive, e.g. `info` or `hindsight=debug`.
    pub level: String,
    /// Log file to append to, in addition to stderr.
    pub file: Option<PathBuf>,
    /// Output format.
    pub format: LogFormat,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Database section.
    pub database: Option<ConfigFileDatabase>,
    /// Search section.
    pub search: Option<ConfigFileSearch>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Database section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileDatabase {
    /// Database path; `~` expands to the home directory.
    pub path: Option<String>,
    /// Connect timeout in seconds.
    pub connection_timeout: Option<u64>,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u64>,
    /// Retry count.
    pub max_retries: Option<u32>,
    /// Base retry delay in milliseconds.
    pub retry_delay_ms: Option<u64>,
}

/// Search section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileSearch {
    /// Default limit.
    pub default_limit: Option<usize>,
    /// Maximum limit.
    pub max_limit: Option<usize>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// Level or filter directive.
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: hindsight_dir().join("knowledge.db"),
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_millis(5000),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl DatabaseConfig {
    /// Creates the default settings pointing at `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Sets the retry count.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the base retry delay.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl SearchConfig {
    /// Resolves a requested limit into `[1, max_limit]`.
    ///
    /// `None` selects the default limit.
    ///
    /// # Examples
    ///
    /// ```
    /// use hindsight::config::SearchConfig;
    ///
    /// let search = SearchConfig::default();
    /// assert_eq!(search.resolve_limit(None), 10);
    /// assert_eq!(search.resolve_limit(Some(500)), 100);
    /// assert_eq!(search.resolve_limit(Some(-3)), 1);
    /// ```
    #[must_use]
    pub fn resolve_limit(&self, requested: Option<i64>) -> usize {
        let max = self.max_limit.max(1);
        match requested {
            None => self.default_limit.clamp(1, max),
            Some(n) => usize::try_from(n.max(1)).map_or(max, |n| n.min(max)),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some(hindsight_dir().join("logs").join("hindsight.log")),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for HindsightConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            search: SearchConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl HindsightConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/.config/hindsight/config.toml` on Linux)
    /// 2. `~/.hindsight/config.toml`
    ///
    /// Returns default configuration if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("hindsight").join("config.toml"),
            base_dirs.home_dir().join(HINDSIGHT_DIR).join("config.toml"),
        ];

        for candidate in candidates {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default()
    }

    /// Applies `HINDSIGHT_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// Unparseable numeric values are ignored.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("HINDSIGHT_DB_PATH") {
            self.database.path = expand_home(&path);
        }
        if let Some(level) = get("HINDSIGHT_LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Some(file) = get("HINDSIGHT_LOG_FILE") {
            self.logging.file = Some(expand_home(&file));
        }
        if let Some(retries) = get("HINDSIGHT_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.database.max_retries = retries;
        }
        if let Some(ms) = get("HINDSIGHT_RETRY_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.database.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = get("HINDSIGHT_BUSY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.database.busy_timeout = Duration::from_millis(ms);
        }
        self
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database.path = path.into();
        self
    }

    /// Converts a `ConfigFile` to `HindsightConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(db) = file.database {
            if let Some(path) = db.path {
                config.database.path = expand_home(&path);
            }
            if let Some(secs) = db.connection_timeout {
                config.database.connect_timeout = Duration::from_secs(secs);
            }
            if let Some(ms) = db.busy_timeout_ms {
                config.database.busy_timeout = Duration::from_millis(ms);
            }
            if let Some(retries) = db.max_retries {
                config.database.max_retries = retries;
            }
            if let Some(ms) = db.retry_delay_ms {
                config.database.retry_delay = Duration::from_millis(ms);
            }
        }
        if let Some(search) = file.search {
            if let Some(max) = search.max_limit {
                config.search.max_limit = max.max(1);
            }
            if let Some(default) = search.default_limit {
                config.search.default_limit = default.clamp(1, config.search.max_limit);
            }
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                config.logging.level = level.to_lowercase();
            }
            if let Some(file) = logging.file {
                config.logging.file = Some(expand_home(&file));
            }
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
        }

        config
    }
}

/// Returns `~/.hindsight`, or a relative `.hindsight` when there is no home.
fn hindsight_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(HINDSIGHT_DIR),
        |dirs| dirs.home_dir().join(HINDSIGHT_DIR),
    )
}

/// Expands a leading `~` to the home directory.
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };

    match (rest, directories::BaseDirs::new()) {
        (Some(rest), Some(dirs)) => dirs.home_dir().join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = HindsightConfig::default();
        assert_eq!(config.database.max_retries, 3);
        assert_eq!(config.database.retry_delay, Duration::from_millis(500));
        assert_eq!(config.database.busy_timeout, Duration::from_millis(5000));
        assert_eq!(config.database.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.search.max_limit, 100);
        assert!(config.database.path.ends_with(".hindsight/knowledge.db"));
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let config = HindsightConfig::from_toml(
            r#"
            [database]
            path = "/tmp/kb.db"
            max_retries = 5

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/kb.db"));
        assert_eq!(config.database.max_retries, 5);
        assert_eq!(config.database.retry_delay, Duration::from_millis(500));
        assert_eq!(config.search.max_limit, 100);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_default_limit_clamped_to_max() {
        let config = HindsightConfig::from_toml(
            r"
            [search]
            default_limit = 500
            max_limit = 50
            ",
        )
        .unwrap();

        assert_eq!(config.search.max_limit, 50);
        assert_eq!(config.search.default_limit, 50);
    }

    #[test]
    fn test_resolve_limit() {
        let search = SearchConfig {
            default_limit: 10,
            max_limit: 100,
        };
        assert_eq!(search.resolve_limit(None), 10);
        assert_eq!(search.resolve_limit(Some(0)), 1);
        assert_eq!(search.resolve_limit(Some(25)), 25);
        assert_eq!(search.resolve_limit(Some(i64::MAX)), 100);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = HindsightConfig::from_toml("[database]\npth = \"x\"").unwrap_err();
        assert!(err.to_string().contains("parse_config_file"));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("HINDSIGHT_DB_PATH", "/data/kb.db"),
            ("HINDSIGHT_LOG_LEVEL", "DEBUG"),
            ("HINDSIGHT_MAX_RETRIES", "not-a-number"),
            ("HINDSIGHT_RETRY_DELAY_MS", "10"),
        ]
        .into_iter()
        .collect();

        let config = HindsightConfig::default()
            .with_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/kb.db"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.database.max_retries, 3);
        assert_eq!(config.database.retry_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel/~/x"), PathBuf::from("rel/~/x"));
        if let Some(dirs) = directories::BaseDirs::new() {
            assert_eq!(expand_home("~/kb.db"), dirs.home_dir().join("kb.db"));
        }
    }
}
