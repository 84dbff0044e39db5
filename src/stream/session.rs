//! Resolution session: one resolve-for-identifier request.
//!
//! Runs the extractor under a hard timeout, funnels its raw formats through
//! [`normalize`] and [`select`], and assembles a [`ResolutionResult`]. The
//! session holds no mutable state; a single instance is shared by every
//! concurrent request.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::extractor::Extractor;
use super::format::{normalize, StreamDescriptor, StreamKind};
use super::select::select;
use crate::error::{GatewayError, Result};

/// Placeholder for missing title and uploader.
pub const UNKNOWN: &str = "Unknown";

/// Upper bound on a single extraction call.
pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved streams for one identifier. Built fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub title: String,
    pub uploader_name: String,
    pub view_count: u64,
    /// Ranked renditions, never containing an empty URL.
    pub streams: Vec<StreamDescriptor>,
    /// URL of the chosen adaptive manifest; always one of `streams`.
    pub manifest_url: Option<String>,
    /// Best progressive muxed rendition, used for direct playback.
    pub primary: Option<StreamDescriptor>,
    pub related_streams: Vec<serde_json::Value>,
}

/// JSON shape returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamsResponse {
    pub title: String,
    pub uploader_name: String,
    pub views: u64,
    pub video_streams: Vec<VideoStream>,
    pub hls: Option<String>,
    pub related_streams: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStream {
    pub url: String,
    pub format: String,
    pub video_only: bool,
    pub audio_only: bool,
    pub bitrate: Option<f64>,
    pub height: Option<u32>,
}

impl From<&StreamDescriptor> for VideoStream {
    fn from(d: &StreamDescriptor) -> Self {
        Self {
            url: d.url.clone(),
            format: d.container.clone(),
            video_only: d.kind == StreamKind::VideoOnly,
            audio_only: d.kind == StreamKind::AudioOnly,
            bitrate: d.bitrate_kbps,
            height: d.resolution_height,
        }
    }
}

impl From<&ResolutionResult> for StreamsResponse {
    fn from(r: &ResolutionResult) -> Self {
        Self {
            title: r.title.clone(),
            uploader_name: r.uploader_name.clone(),
            views: r.view_count,
            video_streams: r.streams.iter().map(VideoStream::from).collect(),
            hls: r.manifest_url.clone(),
            related_streams: r.related_streams.clone(),
        }
    }
}

/// Orchestrates extraction, normalization and selection.
pub struct ResolutionSession {
    extractor: Arc<dyn Extractor>,
    timeout: Duration,
}

impl ResolutionSession {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self {
            extractor,
            timeout: DEFAULT_EXTRACT_TIMEOUT,
        }
    }

    /// Override the extraction timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve `identifier` into ranked streams.
    ///
    /// Every call performs its own upstream extraction.
    #[instrument(skip(self), fields(extractor = self.extractor.name()))]
    pub async fn resolve(&self, identifier: &str) -> Result<ResolutionResult> {
        let extraction =
            match tokio::time::timeout(self.timeout, self.extractor.extract(identifier)).await {
                Ok(Ok(extraction)) => extraction,
                Ok(Err(e)) => {
                    warn!("extraction failed: {e:#}");
                    return Err(GatewayError::Extraction(format!("{e:#}")));
                }
                Err(_) => {
                    warn!("extraction timed out after {:?}", self.timeout);
                    return Err(GatewayError::Extraction(format!(
                        "extraction timed out after {:?}",
                        self.timeout
                    )));
                }
            };

        let descriptors = normalize(&extraction.raw_formats);
        debug!(
            raw = extraction.raw_formats.len(),
            usable = descriptors.len(),
            "normalized formats"
        );

        if descriptors.is_empty() && extraction.has_no_metadata() {
            return Err(GatewayError::NotFound(format!(
                "no playable content for {identifier}"
            )));
        }

        let selection = select(descriptors);
        let manifest_url = selection.manifest.map(|m| m.url);

        info!(
            streams = selection.ranked.len(),
            has_primary = selection.primary.is_some(),
            has_manifest = manifest_url.is_some(),
            "resolved"
        );

        Ok(ResolutionResult {
            title: non_blank(extraction.title).unwrap_or_else(|| UNKNOWN.to_string()),
            uploader_name: non_blank(extraction.uploader_name)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            view_count: extraction.view_count.unwrap_or(0),
            streams: selection.ranked,
            manifest_url,
            primary: selection.primary,
            related_streams: extraction.related_streams,
        })
    }
}

/// Blank strings count as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::stream::extractor::Extraction;
    use crate::stream::format::RawFormat;

    struct CannedExtractor {
        extraction: Extraction,
        calls: AtomicUsize,
    }

    impl CannedExtractor {
        fn new(extraction: Extraction) -> Arc<Self> {
            Arc::new(Self {
                extraction,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Extractor for CannedExtractor {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn extract(&self, _identifier: &str) -> anyhow::Result<Extraction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.extraction.clone())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl Extractor for FailingExtractor {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn extract(&self, identifier: &str) -> anyhow::Result<Extraction> {
            Err(anyhow!("ERROR: [youtube] {identifier}: Video unavailable"))
        }
    }

    struct HangingExtractor;

    #[async_trait]
    impl Extractor for HangingExtractor {
        fn name(&self) -> &'static str {
            "hanging"
        }

        async fn extract(&self, _identifier: &str) -> anyhow::Result<Extraction> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Extraction::default())
        }
    }

    /// Echoes the identifier back as the title.
    struct EchoExtractor;

    #[async_trait]
    impl Extractor for EchoExtractor {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn extract(&self, identifier: &str) -> anyhow::Result<Extraction> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(Extraction {
                title: Some(identifier.to_string()),
                ..Extraction::default()
            })
        }
    }

    fn scenario_formats() -> Vec<RawFormat> {
        serde_json::from_value(json!([
            {"url": "a", "vcodec": "none", "acodec": "aac", "ext": "m4a"},
            {"url": "b", "vcodec": "h264", "acodec": "aac", "ext": "mp4", "height": 1080, "tbr": 4000},
            {"url": "c", "vcodec": "h264", "acodec": "none", "protocol": "m3u8_native", "ext": "m3u8"}
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn resolves_scenario() {
        let extractor = CannedExtractor::new(Extraction {
            title: Some("Big Buck Bunny".into()),
            uploader_name: Some("Blender".into()),
            view_count: Some(1234),
            raw_formats: scenario_formats(),
            related_streams: vec![],
        });
        let session = ResolutionSession::new(extractor);

        let result = session.resolve("aqz-KE-bpKQ").await.unwrap();

        assert_eq!(result.title, "Big Buck Bunny");
        assert_eq!(result.uploader_name, "Blender");
        assert_eq!(result.view_count, 1234);
        assert_eq!(result.streams.len(), 3);
        assert_eq!(result.manifest_url.as_deref(), Some("c"));
        assert_eq!(result.primary.as_ref().map(|p| p.url.as_str()), Some("b"));
        assert!(result.streams.iter().all(|s| !s.url.is_empty()));
        assert!(result
            .streams
            .iter()
            .any(|s| Some(&s.url) == result.manifest_url.as_ref() && s.is_adaptive_manifest));
    }

    #[tokio::test]
    async fn response_shape_matches_client_contract() {
        let extractor = CannedExtractor::new(Extraction {
            title: Some("t".into()),
            raw_formats: scenario_formats(),
            ..Extraction::default()
        });
        let result = ResolutionSession::new(extractor).resolve("id").await.unwrap();

        let value = serde_json::to_value(StreamsResponse::from(&result)).unwrap();

        assert_eq!(value["title"], "t");
        assert_eq!(value["uploaderName"], "Unknown");
        assert_eq!(value["views"], 0);
        assert_eq!(value["hls"], "c");
        assert_eq!(value["relatedStreams"], json!([]));
        assert_eq!(
            value["videoStreams"][0],
            json!({
                "url": "b",
                "format": "mp4",
                "videoOnly": false,
                "audioOnly": false,
                "bitrate": 4000.0,
                "height": 1080
            })
        );
        let audio = value["videoStreams"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["url"] == "a")
            .unwrap();
        assert_eq!(audio["audioOnly"], true);
        assert_eq!(audio["height"], serde_json::Value::Null);
        assert_eq!(audio["bitrate"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn metadata_without_formats_is_degenerate_success() {
        let extractor = CannedExtractor::new(Extraction {
            view_count: Some(0),
            ..Extraction::default()
        });

        let result = ResolutionSession::new(extractor).resolve("id").await.unwrap();

        assert_eq!(result.title, UNKNOWN);
        assert_eq!(result.uploader_name, UNKNOWN);
        assert_eq!(result.view_count, 0);
        assert!(result.streams.is_empty());
        assert!(result.manifest_url.is_none());
        assert!(result.primary.is_none());
    }

    #[tokio::test]
    async fn empty_extraction_is_not_found() {
        let extractor = CannedExtractor::new(Extraction::default());

        let err = ResolutionSession::new(extractor)
            .resolve("missing")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "not_found");
        assert!(err.detail().contains("missing"));
    }

    #[tokio::test]
    async fn unusable_formats_and_no_metadata_is_not_found() {
        let extractor = CannedExtractor::new(Extraction {
            raw_formats: vec![RawFormat::default(), RawFormat::default()],
            ..Extraction::default()
        });

        let err = ResolutionSession::new(extractor).resolve("x").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn blank_metadata_uses_defaults() {
        let extractor = CannedExtractor::new(Extraction {
            title: Some("   ".into()),
            uploader_name: Some(String::new()),
            raw_formats: scenario_formats(),
            ..Extraction::default()
        });

        let result = ResolutionSession::new(extractor).resolve("x").await.unwrap();
        assert_eq!(result.title, UNKNOWN);
        assert_eq!(result.uploader_name, UNKNOWN);
    }

    #[tokio::test]
    async fn extractor_diagnostic_is_surfaced_verbatim() {
        let session = ResolutionSession::new(Arc::new(FailingExtractor));

        let err = session.resolve("dQw4w9WgXcQ").await.unwrap_err();

        assert_eq!(
            err,
            GatewayError::Extraction("ERROR: [youtube] dQw4w9WgXcQ: Video unavailable".into())
        );
    }

    #[tokio::test]
    async fn hanging_extractor_fails_within_bound() {
        let session = ResolutionSession::new(Arc::new(HangingExtractor))
            .with_timeout(Duration::from_millis(50));

        let start = Instant::now();
        let err = session.resolve("slow").await.unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(err.kind(), "extraction");
        assert!(err.detail().contains("timed out"));
    }

    #[tokio::test]
    async fn every_call_reaches_the_extractor() {
        let extractor = CannedExtractor::new(Extraction {
            title: Some("t".into()),
            ..Extraction::default()
        });
        let session = ResolutionSession::new(extractor.clone());

        session.resolve("same").await.unwrap();
        session.resolve("same").await.unwrap();

        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_resolves_are_independent() {
        let session = Arc::new(ResolutionSession::new(Arc::new(EchoExtractor)));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.resolve(&format!("id-{i}")).await })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.title, format!("id-{i}"));
        }
    }
}
