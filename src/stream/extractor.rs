//! Extraction collaborator trait and its output types.
//!
//! An [`Extractor`] turns an opaque identifier (bare video ID, full URL, or a
//! backend-specific pseudo-URL) into raw metadata and format records. The
//! core never parses the identifier; it is handed to the extractor verbatim.

use anyhow::Result;
use async_trait::async_trait;

use super::format::RawFormat;

/// Raw metadata for one video, as produced by an extractor.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub title: Option<String>,
    pub uploader_name: Option<String>,
    pub view_count: Option<u64>,
    pub raw_formats: Vec<RawFormat>,
    /// Passed through to callers untouched.
    pub related_streams: Vec<serde_json::Value>,
}

impl Extraction {
    /// True when the extractor produced no metadata field at all.
    pub fn has_no_metadata(&self) -> bool {
        self.title.is_none() && self.uploader_name.is_none() && self.view_count.is_none()
    }
}

/// One entry of a search result or playlist listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub uploader_name: Option<String>,
    pub thumbnail: Option<String>,
    pub view_count: Option<u64>,
    pub duration: Option<f64>,
}

/// Trait for extraction backends.
///
/// Implementations must be safe to call concurrently; any credential
/// material they use is fixed at construction.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short lowercase backend name (e.g., `"yt-dlp"`).
    fn name(&self) -> &'static str;

    /// Fetch metadata and format records for `identifier`.
    ///
    /// The error text is the upstream diagnostic and is surfaced verbatim.
    async fn extract(&self, identifier: &str) -> Result<Extraction>;

    /// Search the backend's catalog. Returns an empty vec by default.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawEntry>> {
        let _ = (query, limit);
        Ok(vec![])
    }

    /// List the entries of a playlist. Returns an empty vec by default.
    async fn playlist(&self, url: &str) -> Result<Vec<RawEntry>> {
        let _ = url;
        Ok(vec![])
    }
}
