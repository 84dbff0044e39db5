//! Error taxonomy surfaced by the resolution and proxy core.
//!
//! Every failure reaching a caller carries a stable [`GatewayError::kind`]
//! tag and a human-readable [`GatewayError::detail`]. The core never retries;
//! the detail text is whatever the upstream reported.

use thiserror::Error;

/// Request-level failures of the gateway core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The extractor failed, timed out, or returned undecodable metadata.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Extraction succeeded but the identifier denotes no playable content.
    #[error("not found: {0}")]
    NotFound(String),

    /// The origin connection could not be established (or was rejected).
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The origin connection dropped after at least one chunk was relayed.
    #[error("upstream interrupted: {0}")]
    UpstreamInterrupted(String),
}

impl GatewayError {
    /// Stable machine-readable tag for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Extraction(_) => "extraction",
            Self::NotFound(_) => "not_found",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::UpstreamInterrupted(_) => "upstream_interrupted",
        }
    }

    /// Diagnostic text without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Extraction(d)
            | Self::NotFound(d)
            | Self::UpstreamUnavailable(d)
            | Self::UpstreamInterrupted(d) => d,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
