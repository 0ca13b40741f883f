/*!
common/src/lib.rs

Shared configuration types and DB helper functions for Review Intake.

This file provides:
- Config data structures (deserialized from TOML, overridable from the environment)
- An async loader that merges a default and an override config file
- Helpers to initialize and migrate an SQLite database
*/

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Table used for review records when neither the config file nor `TABLE_NAME` names one.
pub const DEFAULT_TABLE_NAME: &str = "reviews";

/// Environment variable naming the store target (review table).
pub const ENV_TABLE_NAME: &str = "TABLE_NAME";
/// Environment variable holding the notification sender address.
pub const ENV_SENDER_EMAIL: &str = "SENDER_EMAIL";
/// Environment variable holding the notification recipient address.
pub const ENV_RECIPIENT_EMAIL: &str = "RECIPIENT_EMAIL";

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the sqlite database file (e.g. "data/reviews.db"), or ":memory:"
    pub path: String,
    /// Name of the table review records are written to
    pub table: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/reviews.db".to_string(),
            table: None,
        }
    }
}

/// Outbound email settings. Notification is only attempted when both
/// `sender` and `recipient` are non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    /// Email relay endpoint receiving the JSON send request
    pub api_url: Option<String>,
    /// Name of the env var holding the relay API key (never the key itself)
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl NotifierConfig {
    /// Sender and recipient, only when both are configured and non-empty.
    pub fn addresses(&self) -> Option<(&str, &str)> {
        match (self.sender.as_deref(), self.recipient.as_deref()) {
            (Some(sender), Some(recipient)) if !sender.is_empty() && !recipient.is_empty() => {
                Some((sender, recipient))
            }
            _ => None,
        }
    }
}

/// Remote scorer config (used if `scorer.adapter = "remote"`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteScorerConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Sentiment scorer selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub adapter: Option<String>, // "lexicon", "remote"
    /// Optional JSON file (word -> polarity) extending the built-in lexicon
    pub lexicon_path: Option<String>,
    pub remote: Option<RemoteScorerConfig>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Largest request body read by the review routes; bigger bodies are rejected
    pub body_limit_bytes: Option<u64>,
}

/// Admin / maintenance config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    pub auto_migrate: Option<bool>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub notifier: Option<NotifierConfig>,
    pub scorer: Option<ScorerConfig>,
    pub server: Option<ServerConfig>,
    pub admin: Option<AdminConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for (label, path) in [("default", default_path), ("override", override_path)] {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {} config: {}", label, path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse {} configuration", label))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Apply `TABLE_NAME`, `SENDER_EMAIL` and `RECIPIENT_EMAIL` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply environment-style overrides from an arbitrary lookup.
    /// Empty values are ignored so that an exported-but-blank variable never
    /// clobbers a value from the config file.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(table) = non_empty(ENV_TABLE_NAME) {
            self.database.table = Some(table);
        }

        let sender = non_empty(ENV_SENDER_EMAIL);
        let recipient = non_empty(ENV_RECIPIENT_EMAIL);
        if sender.is_some() || recipient.is_some() {
            let notifier = self.notifier.get_or_insert_with(NotifierConfig::default);
            if sender.is_some() {
                notifier.sender = sender;
            }
            if recipient.is_some() {
                notifier.recipient = recipient;
            }
        }
    }

    /// Table review records are written to.
    pub fn table_name(&self) -> &str {
        self.database
            .table
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TABLE_NAME)
    }

    /// Catch configuration mistakes at startup rather than on the first request.
    pub fn validate(&self) -> Result<()> {
        if self.notifier.as_ref().and_then(NotifierConfig::addresses).is_some() {
            let api_url = self
                .notifier
                .as_ref()
                .and_then(|n| n.api_url.as_deref())
                .context("notifier.api_url is required when sender and recipient are set")?;
            url::Url::parse(api_url)
                .with_context(|| format!("invalid notifier.api_url: {}", api_url))?;
        }

        if let Some(scorer) = &self.scorer {
            match scorer.adapter.as_deref().unwrap_or("lexicon") {
                "lexicon" => {}
                "remote" => {
                    let api_url = scorer
                        .remote
                        .as_ref()
                        .and_then(|r| r.api_url.as_deref())
                        .context("scorer.remote.api_url is required for the remote adapter")?;
                    url::Url::parse(api_url)
                        .with_context(|| format!("invalid scorer.remote.api_url: {}", api_url))?;
                }
                other => bail!("Unknown scorer adapter type: {}", other),
            }
        }

        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Run the embedded SQL migrations (`migrations/` at the workspace root) against the pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .context("Failed to run sqlx migrations")?;

    Ok(())
}

/// Initialize an SQLite connection pool.
///
/// For a file path, the parent directory and the file itself are created if missing and the
/// pool uses WAL journaling with at most 5 connections. The special path `:memory:` yields a
/// single-connection in-memory database (every connection would otherwise see its own DB).
///
/// Example:
///   let pool = init_db_pool("data/reviews.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    if path == ":memory:" {
        return SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory sqlite database");
    }

    if let Some(parent) = Path::new(path).parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create DB parent directory: {}", parent.display())
        })?;
    }

    // Surfaces permission/path problems with a clearer error than the SQLite connect would.
    tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to create or open DB file: {}", path))?;

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    tracing::debug!(db_path = %path, "sqlite pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
            [database]
            path = "data/test.db"
            table = "product_reviews"

            [notifier]
            sender = "noreply@example.com"
            recipient = "owner@example.com"
            api_url = "https://mail.example.com/send"

            [scorer]
            adapter = "lexicon"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.table_name(), "product_reviews");
        assert_eq!(
            cfg.notifier.as_ref().and_then(NotifierConfig::addresses),
            Some(("noreply@example.com", "owner@example.com"))
        );
        cfg.validate().expect("valid config");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert_eq!(cfg.database.path, "data/reviews.db");
        assert_eq!(cfg.table_name(), DEFAULT_TABLE_NAME);
        assert!(cfg.notifier.is_none());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn env_overrides_fill_table_and_addresses() {
        let env: HashMap<&str, &str> = [
            (ENV_TABLE_NAME, "reviews_prod"),
            (ENV_SENDER_EMAIL, "a@example.com"),
            (ENV_RECIPIENT_EMAIL, "b@example.com"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::default();
        cfg.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.table_name(), "reviews_prod");
        assert_eq!(
            cfg.notifier.as_ref().and_then(NotifierConfig::addresses),
            Some(("a@example.com", "b@example.com"))
        );
    }

    #[test]
    fn blank_env_values_do_not_enable_notification() {
        let mut cfg = Config::default();
        cfg.apply_overrides_from(|k| match k {
            ENV_SENDER_EMAIL => Some("a@example.com".to_string()),
            ENV_RECIPIENT_EMAIL => Some(String::new()),
            _ => None,
        });
        assert!(cfg.notifier.as_ref().and_then(NotifierConfig::addresses).is_none());
    }

    #[test]
    fn addresses_require_both_non_empty() {
        let pair = |sender: Option<&str>, recipient: Option<&str>| NotifierConfig {
            sender: sender.map(String::from),
            recipient: recipient.map(String::from),
            ..Default::default()
        };
        assert_eq!(
            pair(Some("a@x.io"), Some("b@x.io")).addresses(),
            Some(("a@x.io", "b@x.io"))
        );
        assert!(pair(Some("a@x.io"), None).addresses().is_none());
        assert!(pair(None, Some("b@x.io")).addresses().is_none());
        assert!(pair(Some(""), Some("b@x.io")).addresses().is_none());
        assert!(pair(Some("a@x.io"), Some("")).addresses().is_none());
    }

    #[test]
    fn addresses_without_relay_fail_validation() {
        let mut cfg = Config::default();
        cfg.notifier = Some(NotifierConfig {
            sender: Some("a@example.com".into()),
            recipient: Some("b@example.com".into()),
            ..Default::default()
        });
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("notifier.api_url"));
    }

    #[test]
    fn unknown_scorer_adapter_fails_validation() {
        let cfg: Config = toml::from_str("[scorer]\nadapter = \"oracle\"").expect("parse");
        assert!(cfg.validate().is_err());
    }

    #[tokio::test]
    async fn override_file_takes_precedence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");
        std::fs::write(
            &default_path,
            "[database]\npath = \"data/default.db\"\ntable = \"reviews\"\n[server]\nport = 8000\nbody_limit_bytes = 65536\n",
        )
        .expect("write default");
        std::fs::write(&override_path, "[database]\ntable = \"feedback\"\n").expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load merged config");
        assert_eq!(cfg.database.path, "data/default.db");
        assert_eq!(cfg.table_name(), "feedback");
        let server = cfg.server.expect("server section");
        assert_eq!(server.port, Some(8000));
        assert_eq!(server.body_limit_bytes, Some(65536));
    }

    #[tokio::test]
    async fn db_pool_in_temp_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("reviews.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = init_db_pool(&db_path_str).await.expect("init pool");
        let conn = pool.acquire().await.expect("acquire conn");
        drop(conn);
        assert!(db_path.exists());

        run_migrations(&pool).await.expect("migrations");
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(&pool)
            .await
            .expect("reviews table exists");
        assert_eq!(count, 0);
    }
}
