//! Stream selection over normalized descriptors.

use std::cmp::Ordering;

use super::format::{StreamDescriptor, StreamKind};

/// Outcome of [`select`].
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Best progressive (non-manifest) muxed rendition.
    pub primary: Option<StreamDescriptor>,
    /// First adaptive-manifest rendition in normalized order.
    pub manifest: Option<StreamDescriptor>,
    /// Every descriptor, best first, `Unknown` kind last.
    pub ranked: Vec<StreamDescriptor>,
}

/// Pick the primary and manifest renditions and rank the rest.
///
/// Ranking key is `(resolution_height desc, bitrate_kbps desc)` with missing
/// values sorting last. The sort is stable, so equal keys keep their
/// normalized order and the result never depends on iteration order of
/// anything but the input.
pub fn select(descriptors: Vec<StreamDescriptor>) -> Selection {
    let manifest = descriptors
        .iter()
        .find(|d| d.is_adaptive_manifest)
        .cloned();

    let mut ranked = descriptors;
    ranked.sort_by(|a, b| {
        let a_unknown = a.kind == StreamKind::Unknown;
        let b_unknown = b.kind == StreamKind::Unknown;
        a_unknown.cmp(&b_unknown).then_with(|| rank(a, b))
    });

    let primary = ranked
        .iter()
        .find(|d| d.kind == StreamKind::Muxed && !d.is_adaptive_manifest)
        .cloned();

    Selection {
        primary,
        manifest,
        ranked,
    }
}

/// Quality ordering shared by `ranked` and `primary`.
pub fn rank(a: &StreamDescriptor, b: &StreamDescriptor) -> Ordering {
    desc_nulls_last(a.resolution_height, b.resolution_height)
        .then_with(|| desc_nulls_last(a.bitrate_kbps, b.bitrate_kbps))
}

fn desc_nulls_last<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::format::{normalize, RawFormat};
    use serde_json::json;

    fn descriptor(
        url: &str,
        kind: StreamKind,
        height: Option<u32>,
        bitrate: Option<f64>,
    ) -> StreamDescriptor {
        StreamDescriptor {
            url: url.to_string(),
            container: "mp4".to_string(),
            kind,
            resolution_height: height,
            bitrate_kbps: bitrate,
            is_adaptive_manifest: false,
        }
    }

    fn manifest(url: &str, kind: StreamKind, height: Option<u32>) -> StreamDescriptor {
        StreamDescriptor {
            is_adaptive_manifest: true,
            container: "m3u8".to_string(),
            ..descriptor(url, kind, height, None)
        }
    }

    #[test]
    fn scenario_picks_primary_and_manifest() {
        let raw: Vec<RawFormat> = serde_json::from_value(json!([
            {"url": "a", "vcodec": "none", "acodec": "aac", "ext": "m4a"},
            {"url": "b", "vcodec": "h264", "acodec": "aac", "ext": "mp4", "height": 1080, "tbr": 4000},
            {"url": "c", "vcodec": "h264", "acodec": "none", "protocol": "m3u8_native", "ext": "m3u8"}
        ]))
        .unwrap();

        let selection = select(normalize(&raw));

        assert_eq!(selection.manifest.as_ref().map(|d| d.url.as_str()), Some("c"));
        assert_eq!(selection.primary.as_ref().map(|d| d.url.as_str()), Some("b"));
        assert_eq!(selection.ranked.len(), 3);
        assert_eq!(selection.ranked[0].url, "b");
    }

    #[test]
    fn ranking_law_for_muxed_pairs() {
        let input = vec![
            descriptor("360", StreamKind::Muxed, Some(360), Some(700.0)),
            descriptor("none", StreamKind::Muxed, None, Some(9000.0)),
            descriptor("720-lo", StreamKind::Muxed, Some(720), Some(1500.0)),
            descriptor("720-null", StreamKind::Muxed, Some(720), None),
            descriptor("720-hi", StreamKind::Muxed, Some(720), Some(2500.0)),
            descriptor("1080", StreamKind::Muxed, Some(1080), None),
        ];

        let ranked = select(input).ranked;
        let urls: Vec<&str> = ranked.iter().map(|d| d.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["1080", "720-hi", "720-lo", "720-null", "360", "none"]
        );

        for (i, a) in ranked.iter().enumerate() {
            for b in &ranked[i + 1..] {
                if let (Some(ha), Some(hb)) = (a.resolution_height, b.resolution_height) {
                    assert!(ha >= hb, "{} ranked before {}", a.url, b.url);
                }
            }
        }
    }

    #[test]
    fn unknown_kind_sorts_last_regardless_of_quality() {
        let input = vec![
            descriptor("unknown-4k", StreamKind::Unknown, Some(2160), Some(20000.0)),
            descriptor("audio", StreamKind::AudioOnly, None, Some(128.0)),
            descriptor("video", StreamKind::VideoOnly, Some(480), None),
        ];

        let ranked = select(input).ranked;
        assert_eq!(ranked.last().map(|d| d.url.as_str()), Some("unknown-4k"));
        assert_eq!(ranked[0].url, "video");
    }

    #[test]
    fn no_muxed_means_no_primary() {
        let input = vec![
            descriptor("video", StreamKind::VideoOnly, Some(1080), None),
            descriptor("audio", StreamKind::AudioOnly, None, Some(160.0)),
        ];

        let selection = select(input);
        assert!(selection.primary.is_none());
        assert!(selection.manifest.is_none());
        assert_eq!(selection.ranked.len(), 2);
    }

    #[test]
    fn primary_skips_manifest_renditions() {
        let input = vec![
            manifest("hls-1080", StreamKind::Muxed, Some(1080)),
            descriptor("mp4-360", StreamKind::Muxed, Some(360), Some(600.0)),
        ];

        let selection = select(input);
        assert_eq!(selection.primary.unwrap().url, "mp4-360");
        assert_eq!(selection.manifest.unwrap().url, "hls-1080");
    }

    #[test]
    fn manifest_tie_break_is_first_occurrence() {
        let input = vec![
            descriptor("plain", StreamKind::Muxed, Some(720), None),
            manifest("hls-low", StreamKind::Muxed, Some(240)),
            manifest("hls-high", StreamKind::Muxed, Some(1080)),
        ];

        let selection = select(input);
        let chosen = selection.manifest.unwrap();
        assert_eq!(chosen.url, "hls-low");
        assert!(selection
            .ranked
            .iter()
            .any(|d| d.url == chosen.url && d.is_adaptive_manifest));
    }

    #[test]
    fn selection_is_deterministic() {
        let input = vec![
            descriptor("a", StreamKind::Muxed, Some(720), Some(1000.0)),
            descriptor("b", StreamKind::Muxed, Some(720), Some(1000.0)),
            descriptor("c", StreamKind::AudioOnly, None, None),
            manifest("d", StreamKind::VideoOnly, Some(720)),
        ];

        let first = select(input.clone());
        for _ in 0..10 {
            assert_eq!(select(input.clone()), first);
        }
        // equal keys keep normalized order
        assert_eq!(first.ranked[0].url, "a");
        assert_eq!(first.ranked[1].url, "b");
    }

    #[test]
    fn empty_input() {
        let selection = select(Vec::new());
        assert!(selection.primary.is_none());
        assert!(selection.manifest.is_none());
        assert!(selection.ranked.is_empty());
    }
}
