use crate::offline::AssetResponse;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use rocket::http::RawStr;
use std::collections::BTreeSet;

const ALLOWED_METHODS: [&str; 5] = ["GET", "HEAD", "POST", "PUT", "DELETE"];

const NEVER_CACHED_PREFIXES: [&str; 7] = [
    "/api/webhook",
    "/api/agent",
    "/api/subscriptions",
    "/api/dev",
    "/api/user",
    "/api/pwa",
    "/sw.js",
];

const CACHEABLE_API_PREFIXES: [&str; 2] = ["/api/transcriptions", "/api/notifications"];

const STATIC_PREFIXES: [&str; 3] = ["/static/", "/_next/static/", "/icons/"];

const STATIC_EXTENSIONS: [&str; 12] = [
    "js",
    "css",
    "png",
    "jpg",
    "jpeg",
    "svg",
    "ico",
    "webp",
    "gif",
    "woff",
    "woff2",
    "webmanifest",
];

// Matched as media-type prefixes.
const CACHEABLE_CONTENT_TYPES: [&str; 9] = [
    "text/html",
    "text/css",
    "text/plain",
    "text/javascript",
    "application/javascript",
    "application/json",
    "application/manifest+json",
    "image/",
    "font/",
];

static UNSAFE_URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?i)javascript:", r"(?i)<script", r"(?i)on\w+="]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("Unsafe URL patterns are valid regexes"))
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheBucket {
    Static,
    Dynamic,
    Api,
}

impl CacheBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBucket::Static => "static",
            CacheBucket::Dynamic => "dynamic",
            CacheBucket::Api => "api",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OfflinePolicy {
    app_origin: String,
    allowed_origins: BTreeSet<String>,
}

impl OfflinePolicy {
    /// The application's own origin is always allowed; `extra_origins` adds
    /// third-party origins such as font CDNs.
    pub fn new(app_base_url: &str, extra_origins: &[String]) -> Result<Self, anyhow::Error> {
        let app_origin = origin_of(app_base_url)
            .ok_or_else(|| anyhow::anyhow!("{} is not a valid base url.", app_base_url))?;
        let mut allowed_origins = BTreeSet::new();
        allowed_origins.insert(app_origin.clone());
        for origin in extra_origins {
            let normalized = origin_of(origin)
                .ok_or_else(|| anyhow::anyhow!("{} is not a valid origin.", origin))?;
            allowed_origins.insert(normalized);
        }
        Ok(Self {
            app_origin,
            allowed_origins,
        })
    }

    pub fn app_origin(&self) -> &str {
        &self.app_origin
    }

    pub fn allowed_origins(&self) -> impl Iterator<Item = &str> {
        self.allowed_origins.iter().map(String::as_str)
    }

    pub fn is_request_secure(&self, method: &str, url: &str, origin_header: Option<&str>) -> bool {
        if !ALLOWED_METHODS.contains(&method.to_ascii_uppercase().as_str()) {
            return false;
        }
        match origin_of(url) {
            Some(origin) if self.allowed_origins.contains(&origin) => {}
            _ => return false,
        }
        if let Some(header) = origin_header {
            match origin_of(header) {
                Some(origin) if self.allowed_origins.contains(&origin) => {}
                _ => return false,
            }
        }
        let decoded = RawStr::new(url).percent_decode_lossy();
        !UNSAFE_URL_PATTERNS
            .iter()
            .any(|pattern| pattern.is_match(url) || pattern.is_match(&decoded))
    }

    /// Which cache a GET for `url` belongs in, if any.
    pub fn bucket_for(&self, url: &Url) -> Option<CacheBucket> {
        let origin = url.origin().ascii_serialization();
        if origin != self.app_origin {
            return self.allowed_origins.contains(&origin).then(|| CacheBucket::Static);
        }
        let path = url.path();
        if NEVER_CACHED_PREFIXES.iter().any(|p| path.starts_with(p)) {
            return None;
        }
        if CACHEABLE_API_PREFIXES.iter().any(|p| path.starts_with(p)) {
            return Some(CacheBucket::Api);
        }
        if path.starts_with("/api/") {
            return None;
        }
        let has_static_extension = path
            .rsplit('/')
            .next()
            .and_then(|segment| segment.rsplit_once('.'))
            .map(|(_, extension)| {
                STATIC_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
            })
            .unwrap_or(false);
        if has_static_extension || STATIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
            Some(CacheBucket::Static)
        } else {
            Some(CacheBucket::Dynamic)
        }
    }

    /// A response is only worth keeping (or serving from cache) when it is a
    /// non-empty 200 with a content type we know how to serve offline.
    pub fn is_valid_cached_response(&self, response: &AssetResponse) -> bool {
        if response.status != 200 || response.body.is_empty() {
            return false;
        }
        match &response.content_type {
            Some(content_type) => {
                let media_type = content_type.to_ascii_lowercase();
                CACHEABLE_CONTENT_TYPES
                    .iter()
                    .any(|allowed| media_type.starts_with(allowed))
            }
            None => false,
        }
    }

    /// The policy as the browser worker consumes it.
    pub fn worker_config(&self, version: &str) -> serde_json::Value {
        serde_json::json!({
            "version": version,
            "appOrigin": self.app_origin,
            "allowedOrigins": self.allowed_origins,
            "allowedMethods": ALLOWED_METHODS,
            "neverCached": NEVER_CACHED_PREFIXES,
            "cacheableApi": CACHEABLE_API_PREFIXES,
            "staticPrefixes": STATIC_PREFIXES,
            "staticExtensions": STATIC_EXTENSIONS,
            "cacheableContentTypes": CACHEABLE_CONTENT_TYPES,
        })
    }
}

fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(parsed.origin().ascii_serialization()),
        _ => None,
    }
}
