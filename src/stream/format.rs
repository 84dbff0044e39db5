//! Format normalization.
//!
//! [`RawFormat`] is the permissive parsing boundary for upstream format
//! records: every field is optional and a field holding an unexpected JSON
//! type reads as absent. [`normalize`] turns those records into strict
//! [`StreamDescriptor`]s; nothing downstream ever sees the loose shape.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::trace;

/// One upstream format record, as reported by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawFormat {
    #[serde(deserialize_with = "lenient_string")]
    pub url: Option<String>,
    /// Container extension (mp4, webm, m4a, m3u8).
    #[serde(deserialize_with = "lenient_string")]
    pub ext: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub vcodec: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub acodec: Option<String>,
    #[serde(deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
    #[serde(deserialize_with = "lenient_u32")]
    pub width: Option<u32>,
    /// Average total bitrate in kbps.
    #[serde(deserialize_with = "lenient_f64")]
    pub tbr: Option<f64>,
    /// Audio bitrate in kbps.
    #[serde(deserialize_with = "lenient_f64")]
    pub abr: Option<f64>,
    /// Video bitrate in kbps.
    #[serde(deserialize_with = "lenient_f64")]
    pub vbr: Option<f64>,
    /// Delivery protocol tag (https, m3u8_native, http_dash_segments, ...).
    #[serde(deserialize_with = "lenient_string")]
    pub protocol: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub format_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub format_note: Option<String>,
}

/// Media content carried by a rendition, derived from codec presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Muxed,
    VideoOnly,
    AudioOnly,
    Unknown,
}

impl StreamKind {
    /// The single codec-presence rule used everywhere in the crate.
    pub fn from_presence(has_video: bool, has_audio: bool) -> Self {
        match (has_video, has_audio) {
            (true, true) => Self::Muxed,
            (true, false) => Self::VideoOnly,
            (false, true) => Self::AudioOnly,
            (false, false) => Self::Unknown,
        }
    }
}

/// A canonical, fetchable rendition of a video.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Never empty.
    pub url: String,
    pub container: String,
    pub kind: StreamKind,
    pub resolution_height: Option<u32>,
    pub bitrate_kbps: Option<f64>,
    pub is_adaptive_manifest: bool,
}

impl StreamDescriptor {
    /// Build a descriptor from one raw record, or `None` if it has no usable URL.
    pub fn from_raw(raw: &RawFormat) -> Option<Self> {
        let url = raw.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;

        let kind = StreamKind::from_presence(
            codec_present(raw.vcodec.as_deref()),
            codec_present(raw.acodec.as_deref()),
        );

        Some(Self {
            url: url.to_string(),
            container: raw.ext.as_deref().map(str::trim).unwrap_or_default().to_string(),
            kind,
            resolution_height: raw.height.filter(|h| *h > 0),
            bitrate_kbps: effective_bitrate(raw),
            is_adaptive_manifest: raw.protocol.as_deref().is_some_and(is_manifest_protocol),
        })
    }
}

/// Convert raw records to descriptors, dropping records without a URL.
///
/// Output order matches input order.
pub fn normalize(raw_formats: &[RawFormat]) -> Vec<StreamDescriptor> {
    raw_formats
        .iter()
        .filter_map(|raw| {
            let descriptor = StreamDescriptor::from_raw(raw);
            if descriptor.is_none() {
                trace!(format_id = ?raw.format_id, "dropping format without url");
            }
            descriptor
        })
        .collect()
}

/// Absent, empty and `"none"` all mean "no codec".
fn codec_present(codec: Option<&str>) -> bool {
    codec
        .map(str::trim)
        .is_some_and(|c| !c.is_empty() && !c.eq_ignore_ascii_case("none"))
}

/// HLS-family protocol tags (`m3u8`, `m3u8_native`, `m3u8_native+https`).
fn is_manifest_protocol(protocol: &str) -> bool {
    protocol
        .split('+')
        .any(|part| part.trim().to_ascii_lowercase().starts_with("m3u8"))
}

fn effective_bitrate(raw: &RawFormat) -> Option<f64> {
    let valid = |v: Option<f64>| v.filter(|b| b.is_finite() && *b > 0.0);

    valid(raw.tbr).or_else(|| match (valid(raw.vbr), valid(raw.abr)) {
        (None, None) => None,
        (v, a) => Some(v.unwrap_or(0.0) + a.unwrap_or(0.0)),
    })
}

// ============================================================================
// Lenient field decoding
// ============================================================================

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u32)
            }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
