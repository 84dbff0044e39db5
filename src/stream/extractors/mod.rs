//! Extraction backends

pub mod ytdlp;

pub use ytdlp::{YtDlpConfig, YtDlpExtractor};
