//! HTTP retrieval with bounded retry, plus the staleness-aware file cache.
//!
//! The fetch layer performs network I/O only; caching lives one level up in
//! [`fetch_and_cache`], which serves a previously stored artifact when it is
//! younger than the configured age threshold and overwrites it otherwise.
//!
//! Retry strategy:
//! - Network error or non-2xx status → retry with exponential backoff
//! - Retries exhausted → [`FetchError::RetriesExhausted`] carrying the last cause

use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::FetchConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("fetch failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

/// Explicit retry policy: attempt budget plus backoff bounds.
///
/// The backoff schedule is a pure function of the attempt number, so the
/// policy is testable without a clock.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1),
    /// capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << (attempt.saturating_sub(1)).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

pub fn build_client(config: &FetchConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("reg-census/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Fetch a URL, retrying transient failures per the policy.
pub async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<Vec<u8>, FetchError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            tokio::time::sleep(policy.backoff_delay(attempt)).await;
        }

        let err = match client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response.bytes().await.map(|b| b.to_vec()).map_err(|e| {
                        FetchError::Transport {
                            url: url.to_string(),
                            source: e,
                        }
                    });
                }
                FetchError::Status {
                    status,
                    url: url.to_string(),
                }
            }
            Err(e) => FetchError::Transport {
                url: url.to_string(),
                source: e,
            },
        };

        attempt += 1;
        if attempt >= attempts {
            return Err(FetchError::RetriesExhausted {
                attempts,
                source: Box::new(err),
            });
        }
    }
}

/// True when `path` exists and was modified within `max_age` of now.
pub fn is_fresh(path: &Path, max_age: Duration) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = meta.modified() else {
        return false;
    };
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age < max_age,
        // Clock skew put the mtime in the future; treat as fresh.
        Err(_) => true,
    }
}

/// Serve `cache_path` if fresh, otherwise fetch, overwrite, and return.
///
/// The overwrite is write-to-temp + rename, so a concurrent reader never
/// observes a partial file. Concurrent callers racing on the same key may
/// fetch twice; the last complete rename wins.
pub async fn fetch_and_cache(
    client: &reqwest::Client,
    url: &str,
    cache_path: &Path,
    max_age: Duration,
    policy: &RetryPolicy,
) -> Result<Vec<u8>> {
    if is_fresh(cache_path, max_age) {
        debug!(path = %cache_path.display(), "using cached artifact");
        return std::fs::read(cache_path)
            .with_context(|| format!("Failed to read cached artifact: {}", cache_path.display()));
    }

    info!(%url, "fetching fresh data");
    let payload = fetch_with_retry(client, url, policy).await?;
    write_atomic(cache_path, &payload)?;
    Ok(payload)
}

/// Replace `path` with `bytes` as a single complete overwrite.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Cache path has no parent: {}", path.display()))?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, bytes)
        .with_context(|| format!("Failed to write temp artifact: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace artifact: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(4_000),
            max_delay: Duration::from_millis(10_000),
        }
    }

    #[test]
    fn backoff_doubles_from_base() {
        let p = policy();
        assert_eq!(p.backoff_delay(1), Duration::from_millis(4_000));
        assert_eq!(p.backoff_delay(2), Duration::from_millis(8_000));
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let p = policy();
        assert_eq!(p.backoff_delay(3), Duration::from_millis(10_000));
        assert_eq!(p.backoff_delay(30), Duration::from_millis(10_000));
    }

    #[test]
    fn missing_file_is_not_fresh() {
        assert!(!is_fresh(
            Path::new("/nonexistent/artifact.json"),
            Duration::from_secs(3600)
        ));
    }

    #[test]
    fn fresh_window_respects_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.json");
        std::fs::write(&path, b"{}").unwrap();
        assert!(is_fresh(&path, Duration::from_secs(3600)));
        assert!(!is_fresh(&path, Duration::ZERO));
    }

    #[test]
    fn write_atomic_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/artifact.xml");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }
}
