//! yt-dlp extraction backend
//!
//! Runs the `yt-dlp` binary as a subprocess and decodes its
//! `--dump-single-json` output. Handles:
//! - Single videos (bare IDs are expanded to a watch URL)
//! - `ytsearchN:` searches and playlists via `--flat-playlist`
//! - A cookies file fixed at construction time

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::stream::extractor::{Extraction, Extractor, RawEntry};
use crate::stream::format::RawFormat;

/// Default prefix for bare video identifiers.
pub const DEFAULT_WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// Settings for [`YtDlpExtractor`]. Read-only once the extractor is built.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    /// Path to the yt-dlp binary.
    pub binary: PathBuf,
    /// Netscape-format cookies file passed with `--cookies`.
    pub cookies: Option<PathBuf>,
    /// Per-socket timeout handed to yt-dlp itself.
    pub socket_timeout: Option<Duration>,
    /// Prefix used to turn a bare ID into a URL.
    pub watch_url_base: String,
    /// Additional arguments appended before the target.
    pub extra_args: Vec<String>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: which::which("yt-dlp").unwrap_or_else(|_| PathBuf::from("yt-dlp")),
            cookies: None,
            socket_timeout: None,
            watch_url_base: DEFAULT_WATCH_URL_BASE.to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// yt-dlp subprocess extractor
pub struct YtDlpExtractor {
    config: YtDlpConfig,
}

impl YtDlpExtractor {
    /// Create an extractor, checking that a configured cookies file exists.
    pub fn new(config: YtDlpConfig) -> Result<Self> {
        if let Some(ref cookies) = config.cookies {
            if !cookies.is_file() {
                bail!("cookies file not found: {}", cookies.display());
            }
        }
        Ok(Self { config })
    }

    /// Check if yt-dlp can be executed
    pub async fn check_available(&self) -> bool {
        Command::new(&self.config.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Bare IDs become watch URLs; URLs and `prefix:` pseudo-URLs pass through.
    fn target(&self, identifier: &str) -> String {
        let identifier = identifier.trim();
        if identifier.contains(':') || identifier.contains('/') {
            identifier.to_string()
        } else {
            format!("{}{identifier}", self.config.watch_url_base)
        }
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
        ];

        if let Some(ref cookies) = self.config.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }

        if let Some(timeout) = self.config.socket_timeout {
            args.push("--socket-timeout".to_string());
            args.push(timeout.as_secs().max(1).to_string());
        }

        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    fn build_video_args(&self, identifier: &str) -> Vec<String> {
        let mut args = self.common_args();
        args.push("--no-playlist".to_string());
        args.push(self.target(identifier));
        args
    }

    fn build_search_args(&self, query: &str, limit: usize) -> Vec<String> {
        let mut args = self.common_args();
        args.push("--flat-playlist".to_string());
        args.push(format!("ytsearch{limit}:{query}"));
        args
    }

    fn build_playlist_args(&self, url: &str) -> Vec<String> {
        let mut args = self.common_args();
        args.push("--flat-playlist".to_string());
        args.push(url.to_string());
        args
    }

    /// Run yt-dlp and return stdout. A failed run yields its stderr verbatim.
    async fn run(&self, args: &[String]) -> Result<Vec<u8>> {
        debug!("yt-dlp args: {:?}", args);

        let output = Command::new(&self.config.binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.config.binary.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.is_empty() {
                bail!("yt-dlp exited with {}", output.status);
            }
            return Err(anyhow!(stderr));
        }

        Ok(output.stdout)
    }

    fn parse_video(stdout: &[u8]) -> Result<Extraction> {
        let json: Value =
            serde_json::from_slice(stdout).context("invalid yt-dlp JSON output")?;
        if !json.is_object() {
            bail!("unexpected yt-dlp metadata shape: not a JSON object");
        }

        // Playlist-shaped targets (`ytsearch1:`, playlist URLs) wrap the video in `entries`
        let video = if Self::carries_streams(&json) {
            &json
        } else {
            json.get("entries")
                .and_then(Value::as_array)
                .and_then(|entries| entries.first())
                .filter(|entry| entry.is_object())
                .unwrap_or(&json)
        };

        let text = |key: &str| {
            [video, &json]
                .into_iter()
                .find_map(|v| v.get(key).and_then(Value::as_str))
                .map(ToString::to_string)
        };

        // Single-format extractions carry the stream at the top level
        let raw_formats = match video.get("formats").and_then(Value::as_array) {
            Some(formats) => formats.iter().filter_map(Self::parse_format).collect(),
            None if video.get("url").is_some() => Self::parse_format(video).into_iter().collect(),
            None => Vec::new(),
        };

        let extraction = Extraction {
            title: text("title"),
            uploader_name: text("uploader").or_else(|| text("channel")),
            view_count: [video, &json]
                .into_iter()
                .find_map(|v| v.get("view_count").and_then(Value::as_f64))
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64),
            raw_formats,
            related_streams: Vec::new(),
        };
        Ok(extraction)
    }

    fn carries_streams(item: &Value) -> bool {
        item.get("formats").is_some_and(Value::is_array)
            || item.get("url").is_some_and(Value::is_string)
    }

    /// Decode one format record; records that are not objects are dropped.
    fn parse_format(item: &Value) -> Option<RawFormat> {
        RawFormat::deserialize(item)
            .map_err(|e| trace!("dropping malformed format record: {e}"))
            .ok()
    }

    fn parse_listing(stdout: &[u8]) -> Result<Vec<RawEntry>> {
        let json: Value =
            serde_json::from_slice(stdout).context("invalid yt-dlp JSON output")?;

        let Some(entries) = json.get("entries").and_then(Value::as_array) else {
            return Ok(Vec::new());
        };

        Ok(entries.iter().map(Self::parse_entry).collect())
    }

    fn parse_entry(item: &Value) -> RawEntry {
        let text = |key: &str| item.get(key).and_then(Value::as_str).map(ToString::to_string);

        let thumbnail = text("thumbnail").or_else(|| {
            item.pointer("/thumbnails")
                .and_then(Value::as_array)
                .and_then(|thumbs| thumbs.last())
                .and_then(|t| t.get("url"))
                .and_then(Value::as_str)
                .map(ToString::to_string)
        });

        RawEntry {
            id: text("id"),
            title: text("title"),
            uploader_name: text("uploader").or_else(|| text("channel")),
            thumbnail,
            view_count: item.get("view_count").and_then(Value::as_u64),
            duration: item.get("duration").and_then(Value::as_f64),
        }
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract(&self, identifier: &str) -> Result<Extraction> {
        let stdout = self.run(&self.build_video_args(identifier)).await?;
        Self::parse_video(&stdout)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawEntry>> {
        let stdout = self.run(&self.build_search_args(query, limit)).await?;
        Self::parse_listing(&stdout)
    }

    async fn playlist(&self, url: &str) -> Result<Vec<RawEntry>> {
        let stdout = self.run(&self.build_playlist_args(url)).await?;
        Self::parse_listing(&stdout)
    }
}
