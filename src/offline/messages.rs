use crate::offline::{AssetFetcher, CacheStats, OfflineCache};

/// Control messages a page posts to the worker (`postMessage({type: ...})`).
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    SkipWaiting,
    GetVersion,
    ClearCache,
    CacheStats,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerReply {
    #[serde(rename_all = "camelCase")]
    Activated {
        version: String,
        purged_entries: usize,
    },
    Version {
        version: String,
    },
    #[serde(rename_all = "camelCase")]
    CacheCleared {
        removed_entries: usize,
    },
    CacheStats(CacheStats),
}

impl<F: AssetFetcher> OfflineCache<F> {
    #[tracing::instrument(name = "Handle worker message", skip(self))]
    pub async fn respond(&self, message: WorkerMessage) -> WorkerReply {
        match message {
            WorkerMessage::SkipWaiting => WorkerReply::Activated {
                version: self.version().to_string(),
                purged_entries: self.activate().await,
            },
            WorkerMessage::GetVersion => WorkerReply::Version {
                version: self.version().to_string(),
            },
            WorkerMessage::ClearCache => WorkerReply::CacheCleared {
                removed_entries: self.clear().await,
            },
            WorkerMessage::CacheStats => WorkerReply::CacheStats(self.stats().await),
        }
    }
}
