//! Read-query cache with invalidation.
//!
//! Reads go through [`QueryClient::fetch`], which serves a fresh cached value
//! or runs the fetcher (retrying a failed read up to the configured count).
//! Writes never touch cached data directly: a successful mutation only marks
//! its query roots stale, and the next read re-fetches from the server.

use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Identifies one cached read: a root used for invalidation, the path that
/// was requested and its query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    root: String,
    path: String,
    params: Vec<(String, String)>,
}

impl QueryKey {
    /// Key for a collection endpoint; the root is the endpoint itself.
    pub fn collection(endpoint: &str) -> Self {
        Self {
            root: endpoint.to_string(),
            path: endpoint.to_string(),
            params: Vec::new(),
        }
    }

    /// Key for a custom path invalidated together with `root`.
    pub fn under(root: &str, path: &str) -> Self {
        Self {
            root: root.to_string(),
            path: path.to_string(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self.params.sort();
        self
    }

    pub fn with_params(mut self, params: &[(String, String)]) -> Self {
        self.params.extend(params.iter().cloned());
        self.params.sort();
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            write!(f, "{}{}={}", if i == 0 { '?' } else { '&' }, k, v)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct CacheEntry {
    data: Arc<Value>,
    stale: bool,
}

#[derive(Debug)]
pub struct QueryClient {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    retries: u32,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(1)
    }
}

impl QueryClient {
    pub fn new(retries: u32) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            retries,
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serve `key` from cache when fresh, otherwise run `fetcher`.
    ///
    /// A failed fetch is attempted again up to `retries` times; the last
    /// error is returned and any stale entry stays in place.
    pub async fn fetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Arc<Value>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Some(entry) = self.entries().get(key) {
            if !entry.stale {
                debug!("Cache hit for {}", key);
                return Ok(entry.data.clone());
            }
        }

        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(value) => {
                    let data = Arc::new(value);
                    self.entries().insert(
                        key.clone(),
                        CacheEntry {
                            data: data.clone(),
                            stale: false,
                        },
                    );
                    return Ok(data);
                }
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!("🔄 Query {} failed ({}), retry {}/{}", key, e, attempt, self.retries);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Mark every query under `root` stale. Returns how many entries were hit.
    pub fn invalidate(&self, root: &str) -> usize {
        let mut entries = self.entries();
        let mut hits = 0;
        for (key, entry) in entries.iter_mut() {
            if key.root == root {
                entry.stale = true;
                hits += 1;
            }
        }
        info!("♻️ Invalidated {} cached queries under '{}'", hits, root);
        hits
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries().get(key).map(|e| e.stale).unwrap_or(true)
    }

    pub fn cached(&self, key: &QueryKey) -> Option<Arc<Value>> {
        self.entries().get(key).map(|e| e.data.clone())
    }

    /// Drop everything, e.g. on logout.
    pub fn clear(&self) {
        self.entries().clear();
    }
}
