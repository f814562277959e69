// crates/clients/src/codehost.rs
//! Raw-source fetches from the code-hosting service, with a TTL cache.
//!
//! The playback view re-selects the same file constantly while scrubbing;
//! the cache makes that free. Entries past the validity window are treated
//! as stale and refetched in place -- there is no proactive eviction.
//! Fetches serialize through the cache lock, which makes them single-flight
//! per key (a second request for the same key finds the fresh entry).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::{ClientError, ClientResult};

const SERVICE: &str = "codehost";

/// How long a fetched source stays valid.
pub const SOURCE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Cache key for one fetched file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub reference: String,
}

struct CacheEntry {
    fetched_at: Instant,
    /// `None` records an upstream 404 -- "file not found" is a cacheable
    /// answer, not a fault.
    body: Option<String>,
}

/// Code-hosting client serving raw file content at a branch.
pub struct CodeHostClient {
    http: reqwest::Client,
    base_url: String,
    cache: Mutex<HashMap<SourceKey, CacheEntry>>,
}

impl CodeHostClient {
    /// Build a client for a raw-content host,
    /// e.g. `https://raw.githubusercontent.com`.
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.into();
        if !base_url.starts_with("http") {
            return Err(ClientError::config(
                SERVICE,
                format!("base URL is not http(s): {base_url}"),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Fetch a file's content at a branch. `None` means the file does not
    /// exist there (404); other failures are errors. Served from cache
    /// within [`SOURCE_CACHE_TTL`].
    pub async fn get_file_at_branch(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> ClientResult<Option<String>> {
        let key = SourceKey {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
            reference: branch.to_string(),
        };

        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.get(&key) {
            if entry.fetched_at.elapsed() < SOURCE_CACHE_TTL {
                return Ok(entry.body.clone());
            }
        }

        let url = format!(
            "{}/{}/{}/{}/{}",
            self.base_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            urlencoding::encode(branch),
            path.trim_start_matches('/'),
        );
        tracing::debug!(url = %url, "Fetching source file");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        let body = if status.as_u16() == 404 {
            None
        } else if status.is_success() {
            Some(
                response
                    .text()
                    .await
                    .map_err(|e| ClientError::schema(SERVICE, e.to_string()))?,
            )
        } else {
            return Err(ClientError::from_status(
                SERVICE,
                status.as_u16(),
                "raw content fetch failed",
            ));
        };

        cache.insert(
            key,
            CacheEntry {
                fetched_at: Instant::now(),
                body: body.clone(),
            },
        );
        Ok(body)
    }

    /// Number of cached entries, fresh or stale. For tests and diagnostics.
    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

/// Extract `(owner, repo)` from a code-host repository URL.
///
/// Accepts `https://github.com/owner/repo`, with or without a scheme,
/// trailing path segments, `.git`, or query/fragment noise.
pub fn parse_repo_url(url: &str) -> Option<(String, String)> {
    let trimmed = url.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    let mut segments = without_scheme.split('/').filter(|s| !s.is_empty());
    let _host = segments.next()?;
    let owner = segments.next()?;
    let repo = segments.next()?;

    let repo = repo
        .split(['?', '#'])
        .next()
        .unwrap_or(repo)
        .trim_end_matches(".git");
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
