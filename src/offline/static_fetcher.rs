use crate::offline::{AssetFetcher, AssetRequest, AssetResponse};
use anyhow::Context;
use reqwest::Url;
use rocket::http::{ContentType, RawStr};
use std::io::ErrorKind;
use std::path::PathBuf;

const STATIC_ROUTE_PREFIX: &str = "/static/";

/// Serves `/static/*` from a directory on disk.
pub struct StaticDirFetcher {
    root: PathBuf,
}

impl StaticDirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &Url) -> Option<PathBuf> {
        let decoded = RawStr::new(url.path()).percent_decode_lossy();
        let relative = decoded.strip_prefix(STATIC_ROUTE_PREFIX)?;
        let mut path = self.root.clone();
        for segment in relative.split('/') {
            if segment.is_empty() || segment.starts_with('.') || segment.contains('\\') {
                return None;
            }
            path.push(segment);
        }
        Some(path)
    }
}

#[async_trait::async_trait]
impl AssetFetcher for StaticDirFetcher {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, anyhow::Error> {
        let url = Url::parse(&request.url).context("Asset URL is not absolute.")?;
        let path = match self.resolve(&url) {
            Some(path) => path,
            None => return Ok(not_found()),
        };
        match tokio::fs::read(&path).await {
            Ok(body) => {
                let content_type = path
                    .extension()
                    .and_then(|extension| extension.to_str())
                    .and_then(ContentType::from_extension)
                    .map(|content_type| content_type.to_string());
                Ok(AssetResponse {
                    status: 200,
                    content_type,
                    body,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(not_found()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}

fn not_found() -> AssetResponse {
    AssetResponse {
        status: 404,
        content_type: None,
        body: Vec::new(),
    }
}
