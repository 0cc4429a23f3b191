//! Configuration loading for targetyx.
//! Reads targetyx.toml from the current directory or the path in TARGETYX_CONFIG.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use targetyx_annotate::table::DEFAULT_TOP_EXPRESSION_COUNT;
use targetyx_common::RetryConfig;
use targetyx_sources::cache::{SqliteCache, DEFAULT_EXPIRE_AFTER_DAYS};

pub const CONFIG_ENV: &str = "TARGETYX_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "targetyx.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    #[serde(default)]
    pub targets: Vec<String>,
    pub disease_code: Option<String>,
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
}

fn default_results_path() -> PathBuf { PathBuf::from("results") }

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            disease_code: None,
            results_path: default_results_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_top_expression_count")]
    pub top_expression_count: usize,
    /// Defaults to `<results_path>/tables`.
    pub output_path: Option<PathBuf>,
}

fn default_top_expression_count() -> usize { DEFAULT_TOP_EXPRESSION_COUNT }

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            top_expression_count: default_top_expression_count(),
            output_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub path: Option<PathBuf>,
    #[serde(default = "default_expire_after_days")]
    pub expire_after_days: i64,
}

fn default_true() -> bool { true }
fn default_expire_after_days() -> i64 { DEFAULT_EXPIRE_AFTER_DAYS }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            expire_after_days: default_expire_after_days(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Unset means no client-side timeout.
    pub timeout_secs: Option<f64>,
}


impl Config {
    /// Load from `path`, else `TARGETYX_CONFIG`, else `targetyx.toml`.
    /// An explicitly named file must exist; a missing default file yields
    /// the built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

        match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!(
                        "Config file not found: {}\n\
                         Copy targetyx.example.toml to targetyx.toml and edit it.",
                        path.display()
                    );
                }
                Self::from_file(&path)
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.retry.validate()?;
        self.cache_expiry()?;
        self.timeout()?;
        Ok(())
    }

    /// Checked `cache.expire_after_days`; must be at least one day and
    /// representable as a calendar offset from now.
    pub fn cache_expiry(&self) -> anyhow::Result<chrono::Duration> {
        let days = self.cache.expire_after_days;
        if days < 1 {
            anyhow::bail!("cache.expire_after_days must be at least 1, got {}", days);
        }
        chrono::Duration::try_days(days)
            .filter(|expiry| chrono::Utc::now().checked_add_signed(*expiry).is_some())
            .with_context(|| format!("cache.expire_after_days is too large: {}", days))
    }

    pub fn timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.http
            .timeout_secs
            .map(|secs| timeout_from_secs(secs, "http.timeout_secs"))
            .transpose()
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache.path.clone().unwrap_or_else(SqliteCache::default_path)
    }

    pub fn table_output_path(&self) -> PathBuf {
        self.table
            .output_path
            .clone()
            .unwrap_or_else(|| self.annotation.results_path.join("tables"))
    }
}

/// Positive, finite seconds that fit in a `Duration`.
pub fn timeout_from_secs(secs: f64, name: &str) -> anyhow::Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        anyhow::bail!("{} must be positive, got {}", name, secs);
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("{} is out of range: {}", name, secs))
}
