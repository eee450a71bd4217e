use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Directory holding the synced title XML files and cache artifacts.
    pub data_dir: PathBuf,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Artifacts younger than this are served from disk without a fetch.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
}

fn default_base_url() -> String {
    "https://www.ecfr.gov".to_string()
}
fn default_max_age_hours() -> u64 {
    24
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    4_000
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    /// Overall wall-clock budget for one ingestion run, in seconds.
    /// 0 disables the deadline.
    #[serde(default)]
    pub run_deadline_secs: u64,
}

impl IngestConfig {
    pub fn deadline(&self) -> Option<Duration> {
        if self.run_deadline_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.run_deadline_secs))
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl CorpusConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours * 3600)
    }

    /// Directory holding one XML artifact per synced title.
    pub fn titles_dir(&self) -> PathBuf {
        self.data_dir.join("titles")
    }

    /// Directory holding one JSON artifact per memoized count key.
    pub fn counts_dir(&self) -> PathBuf {
        self.data_dir.join("counts")
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.fetch.max_attempts == 0 {
        anyhow::bail!("fetch.max_attempts must be >= 1");
    }

    if config.fetch.base_delay_ms > config.fetch.max_delay_ms {
        anyhow::bail!("fetch.base_delay_ms must be <= fetch.max_delay_ms");
    }

    if config.corpus.base_url.ends_with('/') {
        anyhow::bail!("corpus.base_url must not end with '/'");
    }

    Ok(config)
}
