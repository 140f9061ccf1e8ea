use crate::offline::{CacheBucket, OfflinePolicy};
use reqwest::Url;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

const OFFLINE_PAGE: &str = include_str!("../../assets/offline.html");
const CACHE_PREFIX: &str = "voicemailai";

#[derive(Debug, Clone)]
pub struct AssetRequest {
    pub method: String,
    /// Absolute URL, including the query string.
    pub url: String,
    pub origin: Option<String>,
    pub accepts_html: bool,
}

impl AssetRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            origin: None,
            accepts_html: false,
        }
    }

    fn is_navigation(&self) -> bool {
        self.accepts_html
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    OfflineFallback,
}

#[derive(Debug)]
pub enum CacheOutcome {
    Served {
        response: AssetResponse,
        source: ResponseSource,
    },
    /// The request failed the security check and must not be answered.
    Blocked,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub caches: BTreeMap<String, usize>,
    pub total_entries: usize,
}

/// Where responses come from when the cache cannot answer.
#[async_trait::async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, anyhow::Error>;
}

/// Cache-then-network strategy over named, versioned in-memory caches.
///
/// Entries are never evicted except by [`OfflineCache::activate`] (stale
/// versions) and [`OfflineCache::clear`].
pub struct OfflineCache<F> {
    policy: OfflinePolicy,
    fetcher: F,
    version: String,
    caches: RwLock<HashMap<String, HashMap<String, AssetResponse>>>,
}

impl<F: AssetFetcher> OfflineCache<F> {
    pub fn new(policy: OfflinePolicy, fetcher: F, version: impl Into<String>) -> Self {
        Self {
            policy,
            fetcher,
            version: version.into(),
            caches: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &OfflinePolicy {
        &self.policy
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn cache_name(&self, bucket: CacheBucket) -> String {
        format!("{}-{}-{}", CACHE_PREFIX, bucket.as_str(), self.version)
    }

    #[tracing::instrument(
        name = "Serve through offline cache",
        skip(self, request),
        fields(url = %request.url)
    )]
    pub async fn handle(&self, request: &AssetRequest) -> CacheOutcome {
        if !self
            .policy
            .is_request_secure(&request.method, &request.url, request.origin.as_deref())
        {
            tracing::warn!("Blocked an insecure asset request");
            return CacheOutcome::Blocked;
        }
        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(_) => return CacheOutcome::Blocked,
        };

        let bucket = if request.method.eq_ignore_ascii_case("GET") {
            self.policy.bucket_for(&url)
        } else {
            None
        };
        let bucket = match bucket {
            Some(bucket) => bucket,
            None => return self.fetch_uncached(request, &url).await,
        };

        let cache_name = self.cache_name(bucket);
        let key = cache_key(&url);
        if let Some(hit) = self.lookup(&cache_name, &key).await {
            if self.policy.is_valid_cached_response(&hit) {
                return CacheOutcome::Served {
                    response: hit,
                    source: ResponseSource::Cache,
                };
            }
            tracing::debug!("Discarding an invalid cached response");
            self.remove(&cache_name, &key).await;
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if self.policy.is_valid_cached_response(&response) {
                    let mut caches = self.caches.write().await;
                    caches
                        .entry(cache_name)
                        .or_default()
                        .insert(key, response.clone());
                }
                CacheOutcome::Served {
                    response,
                    source: ResponseSource::Network,
                }
            }
            Err(e) => {
                tracing::warn!(
                    error.cause_chain = ?e,
                    "Asset fetch failed, serving offline fallback"
                );
                self.offline_fallback(request, &url)
            }
        }
    }

    async fn fetch_uncached(&self, request: &AssetRequest, url: &Url) -> CacheOutcome {
        match self.fetcher.fetch(request).await {
            Ok(response) => CacheOutcome::Served {
                response,
                source: ResponseSource::Network,
            },
            Err(e) => {
                tracing::warn!(
                    error.cause_chain = ?e,
                    "Asset fetch failed, serving offline fallback"
                );
                self.offline_fallback(request, url)
            }
        }
    }

    fn offline_fallback(&self, request: &AssetRequest, url: &Url) -> CacheOutcome {
        let response = if url.path().starts_with("/api/") {
            AssetResponse {
                status: 503,
                content_type: Some("application/json".to_string()),
                body: serde_json::json!({
                    "error": "offline",
                    "message": "You appear to be offline. Please try again once your connection is restored."
                })
                .to_string()
                .into_bytes(),
            }
        } else if request.is_navigation() {
            AssetResponse {
                status: 503,
                content_type: Some("text/html; charset=utf-8".to_string()),
                body: OFFLINE_PAGE.as_bytes().to_vec(),
            }
        } else {
            AssetResponse {
                status: 503,
                content_type: None,
                body: Vec::new(),
            }
        };
        CacheOutcome::Served {
            response,
            source: ResponseSource::OfflineFallback,
        }
    }

    async fn lookup(&self, cache_name: &str, key: &str) -> Option<AssetResponse> {
        let caches = self.caches.read().await;
        caches.get(cache_name).and_then(|cache| cache.get(key)).cloned()
    }

    async fn remove(&self, cache_name: &str, key: &str) {
        let mut caches = self.caches.write().await;
        if let Some(cache) = caches.get_mut(cache_name) {
            cache.remove(key);
        }
    }

    /// Drops every cache that belongs to another version. Returns the number
    /// of entries removed.
    pub async fn activate(&self) -> usize {
        let suffix = format!("-{}", self.version);
        let mut caches = self.caches.write().await;
        let mut purged = 0;
        caches.retain(|name, entries| {
            let current = name.starts_with(CACHE_PREFIX) && name.ends_with(&suffix);
            if !current {
                purged += entries.len();
            }
            current
        });
        purged
    }

    pub async fn clear(&self) -> usize {
        let mut caches = self.caches.write().await;
        let removed = caches.values().map(HashMap::len).sum();
        caches.clear();
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let caches = self.caches.read().await;
        let caches: BTreeMap<String, usize> = caches
            .iter()
            .map(|(name, entries)| (name.clone(), entries.len()))
            .collect();
        let total_entries = caches.values().sum();
        CacheStats {
            caches,
            total_entries,
        }
    }

    #[cfg(test)]
    async fn store(&self, cache_name: &str, url: &str, response: AssetResponse) {
        let mut caches = self.caches.write().await;
        caches
            .entry(cache_name.to_string())
            .or_default()
            .insert(url.to_string(), response);
    }
}

fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}
