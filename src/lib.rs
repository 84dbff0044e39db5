//! `tubegate` - Stream resolution and byte-proxy gateway
//!
//! # Features
//!
//! - **Resolution**: turns a video identifier into ranked, canonical streams
//! - **Selection**: best progressive muxed stream plus the HLS manifest
//! - **Byte proxy**: relays origin media without buffering whole files
//! - **Gateway**: axum routes for resolve, playback, search and trending
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tubegate::stream::extractors::{YtDlpConfig, YtDlpExtractor};
//! use tubegate::{ResolutionSession, StreamsResponse};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let extractor = Arc::new(YtDlpExtractor::new(YtDlpConfig::default())?);
//!     let session = ResolutionSession::new(extractor);
//!     let result = session.resolve("dQw4w9WgXcQ").await?;
//!     println!("{}", serde_json::to_string_pretty(&StreamsResponse::from(&result))?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod stream;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use stream::{
    ByteProxy, Catalog, CatalogEntry, Extraction, Extractor, ProxiedBody, ResolutionResult,
    ResolutionSession, StreamDescriptor, StreamKind, StreamsResponse,
};

/// Version of tubegate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
