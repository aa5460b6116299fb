//! Runtime configuration for the Astrobadge API server.
//!
//! Values come from environment variables with defaults for everything except the trusted
//! signer keys. Set-but-empty and unparsable values are errors rather than silently
//! falling back.

use anyhow::Context;
use astrobadge_core::MessageStyle;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://astrobadge.db";
const DEFAULT_REPORTS_DIR: &str = "./reports";
const DEFAULT_MAX_REPORT_BYTES: usize = 256 * 1024;

/// Where reports are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// SQLite database at `database_url`.
    Sqlite {
        /// sqlx connection URL, e.g. `sqlite://astrobadge.db`.
        database_url: String,
    },
    /// One JSON file per repository under `dir`.
    Filesystem {
        /// Report directory.
        dir: PathBuf,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Invalid log format {} (expected pretty or json)", other),
        }
    }
}

/// Full server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen port (binds all interfaces).
    pub port: u16,
    /// Report store backend.
    pub store: StoreBackend,
    /// Badge message style.
    pub message_style: MessageStyle,
    /// Trusted signer public keys (base64 or `0x` hex).
    pub trusted_keys: Vec<String>,
    /// Maximum accepted ingest body size.
    pub max_report_bytes: usize,
    /// Log level name (see [`crate::logging::parse_level`]).
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Only log failed requests.
    pub log_errors_only: bool,
}

impl ServerConfig {
    /// Build configuration from environment variables.
    ///
    /// - `ASTROBADGE_PORT` (default: 8080)
    /// - `ASTROBADGE_STORE` (`sqlite` | `fs`, default: sqlite)
    /// - `DATABASE_URL` (default: sqlite://astrobadge.db)
    /// - `ASTROBADGE_REPORTS_DIR` (default: ./reports)
    /// - `ASTROBADGE_MESSAGE_STYLE` (`letterGrade` | `percentage`, default: letterGrade)
    /// - `ASTROBADGE_TRUSTED_KEYS` (comma separated, required)
    /// - `ASTROBADGE_MAX_REPORT_BYTES` (default: 262144)
    /// - `ASTROBADGE_LOG_LEVEL` (default: info)
    /// - `ASTROBADGE_LOG_FORMAT` (`pretty` | `json`, default: pretty)
    /// - `ASTROBADGE_LOG_ERRORS_ONLY` (default: false)
    pub fn from_env() -> anyhow::Result<Self> {
        let port = parse_env::<u16>("ASTROBADGE_PORT")?.unwrap_or(DEFAULT_PORT);

        let backend = parse_env_string("ASTROBADGE_STORE")?.unwrap_or_else(|| "sqlite".into());
        let store = match backend.to_ascii_lowercase().as_str() {
            "sqlite" => StoreBackend::Sqlite {
                database_url: parse_env_string("DATABASE_URL")?
                    .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            },
            "fs" | "filesystem" => StoreBackend::Filesystem {
                dir: parse_env_string("ASTROBADGE_REPORTS_DIR")?
                    .unwrap_or_else(|| DEFAULT_REPORTS_DIR.to_string())
                    .into(),
            },
            other => anyhow::bail!("Invalid ASTROBADGE_STORE {} (expected sqlite or fs)", other),
        };

        let message_style = match parse_env_string("ASTROBADGE_MESSAGE_STYLE")? {
            Some(raw) => raw
                .parse::<MessageStyle>()
                .context("Invalid ASTROBADGE_MESSAGE_STYLE")?,
            None => MessageStyle::default(),
        };

        let trusted_keys = parse_env_string("ASTROBADGE_TRUSTED_KEYS")?
            .map(|raw| split_list(&raw))
            .unwrap_or_default();

        let max_report_bytes = parse_env::<usize>("ASTROBADGE_MAX_REPORT_BYTES")?
            .unwrap_or(DEFAULT_MAX_REPORT_BYTES);

        let log_level =
            parse_env_string("ASTROBADGE_LOG_LEVEL")?.unwrap_or_else(|| "info".to_string());
        let log_format = match parse_env_string("ASTROBADGE_LOG_FORMAT")? {
            Some(raw) => raw
                .parse::<LogFormat>()
                .context("Invalid ASTROBADGE_LOG_FORMAT")?,
            None => LogFormat::default(),
        };
        let log_errors_only = parse_env_bool("ASTROBADGE_LOG_ERRORS_ONLY")?.unwrap_or(false);

        let config = Self {
            port,
            store,
            message_style,
            trusted_keys,
            max_report_bytes,
            log_level,
            log_format,
            log_errors_only,
        };
        config.validate()?;
        Ok(config)
    }

    /// Deterministic test configuration.
    pub fn for_test(store: StoreBackend, trusted_keys: Vec<String>) -> Self {
        Self {
            port: 0,
            store,
            message_style: MessageStyle::LetterGrade,
            trusted_keys,
            max_report_bytes: DEFAULT_MAX_REPORT_BYTES,
            log_level: "debug".to_string(),
            log_format: LogFormat::Pretty,
            log_errors_only: false,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.trusted_keys.is_empty() {
            anyhow::bail!("ASTROBADGE_TRUSTED_KEYS must list at least one signer public key");
        }
        if self.max_report_bytes == 0 {
            anyhow::bail!("ASTROBADGE_MAX_REPORT_BYTES must be > 0");
        }
        match &self.store {
            StoreBackend::Sqlite { database_url } if database_url.trim().is_empty() => {
                anyhow::bail!("DATABASE_URL cannot be empty")
            }
            StoreBackend::Filesystem { dir } if dir.as_os_str().is_empty() => {
                anyhow::bail!("ASTROBADGE_REPORTS_DIR cannot be empty")
            }
            _ => {}
        }
        astrobadge_verifier::TrustedKeys::parse(&self.trusted_keys)
            .context("Invalid ASTROBADGE_TRUSTED_KEYS")?;
        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env_string(name: &str) -> anyhow::Result<Option<String>> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    let raw = raw.trim();
    anyhow::ensure!(!raw.is_empty(), "{} is set but empty", name);
    Ok(Some(raw.to_string()))
}

fn parse_env<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = parse_env_string(name)? else {
        return Ok(None);
    };
    let v = raw.parse::<T>().with_context(|| {
        format!("Invalid {} (expected {})", name, std::any::type_name::<T>())
    })?;
    Ok(Some(v))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_env_bool(name: &str) -> anyhow::Result<Option<bool>> {
    let Some(raw) = parse_env_string(name)? else {
        return Ok(None);
    };
    match parse_bool(&raw) {
        Some(v) => Ok(Some(v)),
        None => Err(anyhow::anyhow!(
            "Invalid {} (expected boolean-like value)",
            name
        )),
    }
}
