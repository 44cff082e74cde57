//! Configuration for the data assistant MCP server

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "DATA_ASSISTANT_CONFIG_PATH";

/// Data assistant configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AssistantConfig {
    /// Database connection settings
    pub database: DatabaseConfig,
}

/// Which backend to connect to, selected by the `backend` key
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Postgres(PostgresConfig),
    Sqlite(SqliteConfig),
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::Sqlite(SqliteConfig::default())
    }
}

impl DatabaseConfig {
    /// Human readable target, safe to log (never includes the password)
    pub fn target(&self) -> String {
        match self {
            DatabaseConfig::Postgres(pg) => format!(
                "postgres://{}@{}:{}/{}",
                pg.user, pg.host, pg.port, pg.dbname
            ),
            DatabaseConfig::Sqlite(sqlite) => format!("sqlite://{}", sqlite.path.display()),
        }
    }
}

/// PostgreSQL connection settings
#[derive(Clone, Deserialize)]
pub struct PostgresConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub dbname: String,

    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Start every transaction read-only on the server side.
    /// Default: true
    #[serde(default = "default_true")]
    pub read_only: bool,

    /// Server-side `statement_timeout`. Unset means queries may run forever.
    #[serde(default)]
    pub statement_timeout_secs: Option<u64>,
}

// Hand-written so the password never ends up in logs
impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("read_only", &self.read_only)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .finish()
    }
}

/// SQLite connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,

    /// Open the file read-only and refuse writes.
    /// Default: true
    #[serde(default = "default_true")]
    pub read_only: bool,

    /// Busy timeout in seconds
    /// Default: 30
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("database.db"),
            read_only: true,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_port() -> u16 {
    5432
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

impl AssistantConfig {
    /// Resolve the config file location
    ///
    /// Looks for config in:
    /// 1. the explicit `path` (from `--config`)
    /// 2. `DATA_ASSISTANT_CONFIG_PATH` environment variable
    /// 3. `~/.binks/data-assistant.toml`
    pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = path {
            return Ok(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(dirs::home_dir()
            .context("Could not determine home directory")?
            .join(".binks")
            .join("data-assistant.toml"))
    }

    /// Load configuration from file
    ///
    /// A missing file falls back to [`AssistantConfig::default`]; a file that
    /// exists but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_path(path)?;

        if !config_path.exists() {
            tracing::warn!(
                "Config not found at {:?}. Using default ({}).",
                config_path,
                DatabaseConfig::default().target()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_postgres_defaults() {
        let config = AssistantConfig::from_toml(
            r#"
            [database]
            backend = "postgres"
            host = "db.example.com"
            dbname = "shop"
            user = "analyst"
            password = "hunter2"
            "#,
        )
        .unwrap();

        let DatabaseConfig::Postgres(pg) = &config.database else {
            panic!("expected postgres backend, got {:?}", config.database);
        };
        assert_eq!(pg.port, 5432);
        assert!(pg.read_only);
        assert_eq!(pg.statement_timeout_secs, None);
        assert_eq!(
            config.database.target(),
            "postgres://analyst@db.example.com:5432/shop"
        );
    }

    #[test]
    fn test_parse_sqlite() {
        let config = AssistantConfig::from_toml(
            r#"
            [database]
            backend = "sqlite"
            path = "/tmp/sales.db"
            read_only = false
            "#,
        )
        .unwrap();

        let DatabaseConfig::Sqlite(sqlite) = &config.database else {
            panic!("expected sqlite backend");
        };
        assert_eq!(sqlite.path, PathBuf::from("/tmp/sales.db"));
        assert!(!sqlite.read_only);
        assert_eq!(sqlite.timeout_secs, 30);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = AssistantConfig::from_toml(
            r#"
            [database]
            backend = "oracle"
            path = "x"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = AssistantConfig::from_toml(
            r#"
            [database]
            backend = "postgres"
            host = "localhost"
            dbname = "postgres"
            user = "postgres"
            password = "super-secret-password"
            "#,
        )
        .unwrap();

        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-password"));
        assert!(debug.contains("<redacted>"));
        assert!(!config.database.target().contains("super-secret-password"));
    }

    #[test]
    fn test_load_missing_file_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssistantConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(matches!(config.database, DatabaseConfig::Sqlite(_)));
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[database\nbackend = ").unwrap();
        assert!(AssistantConfig::load(Some(&path)).is_err());
    }
}
