//! Search and playlist listings.
//!
//! Listing order and content are whatever the extractor returns; this layer
//! only fills defaults, drops entries without an id and applies the same
//! timeout and error mapping as [`ResolutionSession`](super::ResolutionSession).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::extractor::{Extractor, RawEntry};
use super::session::{non_blank, DEFAULT_EXTRACT_TIMEOUT, UNKNOWN};
use crate::error::{GatewayError, Result};

/// Number of results requested from a search.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Listing entry returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub uploader_name: String,
    pub thumbnail: String,
    pub views: u64,
    pub duration: Option<f64>,
}

impl CatalogEntry {
    fn from_raw(raw: RawEntry) -> Option<Self> {
        let id = raw.id.filter(|id| !id.trim().is_empty())?;
        let thumbnail = raw
            .thumbnail
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| default_thumbnail(&id));

        Some(Self {
            title: non_blank(raw.title).unwrap_or_else(|| UNKNOWN.to_string()),
            uploader_name: non_blank(raw.uploader_name).unwrap_or_else(|| UNKNOWN.to_string()),
            thumbnail,
            views: raw.view_count.unwrap_or(0),
            duration: raw.duration,
            id,
        })
    }
}

/// Thumbnail URL derived from a video id.
pub fn default_thumbnail(id: &str) -> String {
    format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg")
}

/// Search and trending listings backed by an [`Extractor`].
pub struct Catalog {
    extractor: Arc<dyn Extractor>,
    timeout: Duration,
    search_limit: usize,
    trending_playlist: Option<String>,
}

impl Catalog {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self {
            extractor,
            timeout: DEFAULT_EXTRACT_TIMEOUT,
            search_limit: DEFAULT_SEARCH_LIMIT,
            trending_playlist: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    /// Playlist whose entries make up the trending feed.
    #[must_use]
    pub fn with_trending_playlist(mut self, url: Option<String>) -> Self {
        self.trending_playlist = url;
        self
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        let entries = self
            .bounded(self.extractor.search(query, self.search_limit))
            .await?;
        info!(results = entries.len(), "search complete");
        Ok(entries)
    }

    #[instrument(skip(self))]
    pub async fn trending(&self) -> Result<Vec<CatalogEntry>> {
        let Some(playlist) = self.trending_playlist.as_deref() else {
            return Err(GatewayError::NotFound(
                "no trending playlist configured".to_string(),
            ));
        };
        let entries = self.bounded(self.extractor.playlist(playlist)).await?;
        info!(results = entries.len(), "trending listing complete");
        Ok(entries)
    }

    async fn bounded<F>(&self, call: F) -> Result<Vec<CatalogEntry>>
    where
        F: Future<Output = anyhow::Result<Vec<RawEntry>>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(raw)) => Ok(raw.into_iter().filter_map(CatalogEntry::from_raw).collect()),
            Ok(Err(e)) => {
                warn!("listing failed: {e:#}");
                Err(GatewayError::Extraction(format!("{e:#}")))
            }
            Err(_) => Err(GatewayError::Extraction(format!(
                "extraction timed out after {:?}",
                self.timeout
            ))),
        }
    }
}
