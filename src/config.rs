//! Gateway configuration loaded from `~/.config/tubegate/config.toml`.
//!
//! Every section and key is optional. The resulting value is built once at
//! startup and only ever read afterwards; credential material (the cookies
//! file) reaches the extractor through it and nowhere else.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::stream::extractors::ytdlp::DEFAULT_WATCH_URL_BASE;
use crate::stream::extractors::{YtDlpConfig, YtDlpExtractor};
use crate::stream::{ByteProxy, Catalog, Extractor, ResolutionSession};

/// Playlist backing the trending feed unless configured otherwise.
pub const DEFAULT_TRENDING_PLAYLIST: &str =
    "https://www.youtube.com/playlist?list=PLrEnWoR732-BHrPp_Pm8_VleD68f9s14-";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub extractor: ExtractorSettings,
    pub proxy: ProxySettings,
    pub server: ServerSettings,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    /// yt-dlp binary; looked up in `PATH` when unset.
    pub ytdlp_path: Option<PathBuf>,
    /// Cookies file handed to yt-dlp.
    pub cookies: Option<PathBuf>,
    /// Hard bound on one extraction call.
    pub timeout_secs: u64,
    pub watch_url_base: String,
    pub extra_args: Vec<String>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            cookies: None,
            timeout_secs: 30,
            watch_url_base: DEFAULT_WATCH_URL_BASE.to_string(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub connect_timeout_secs: u64,
    /// Idle read timeout on origin connections.
    pub idle_timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            idle_timeout_secs: 60,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub search_limit: usize,
    pub trending_playlist: Option<String>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            search_limit: 10,
            trending_playlist: Some(DEFAULT_TRENDING_PLAYLIST.to_string()),
        }
    }
}

impl GatewayConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used if present and defaults are returned otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = config_path();
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.extractor.timeout_secs == 0 {
            bail!("extractor.timeout_secs must be greater than zero");
        }
        if self.proxy.idle_timeout_secs == 0 {
            bail!("proxy.idle_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extractor.timeout_secs)
    }

    pub fn ytdlp_config(&self) -> YtDlpConfig {
        let defaults = YtDlpConfig::default();
        YtDlpConfig {
            binary: self.extractor.ytdlp_path.clone().unwrap_or(defaults.binary),
            cookies: self.extractor.cookies.clone(),
            socket_timeout: Some(self.extract_timeout()),
            watch_url_base: self.extractor.watch_url_base.clone(),
            extra_args: self.extractor.extra_args.clone(),
        }
    }

    /// Build the shared yt-dlp extractor.
    pub fn build_extractor(&self) -> Result<Arc<dyn Extractor>> {
        Ok(Arc::new(YtDlpExtractor::new(self.ytdlp_config())?))
    }

    pub fn build_session(&self, extractor: Arc<dyn Extractor>) -> ResolutionSession {
        ResolutionSession::new(extractor).with_timeout(self.extract_timeout())
    }

    pub fn build_catalog(&self, extractor: Arc<dyn Extractor>) -> Catalog {
        Catalog::new(extractor)
            .with_timeout(self.extract_timeout())
            .with_search_limit(self.catalog.search_limit)
            .with_trending_playlist(self.catalog.trending_playlist.clone())
    }

    pub fn build_proxy(&self) -> Result<ByteProxy> {
        ByteProxy::with_settings(
            Duration::from_secs(self.proxy.connect_timeout_secs),
            Duration::from_secs(self.proxy.idle_timeout_secs),
            self.proxy.user_agent.as_deref(),
        )
    }
}

/// Return the path to the default config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tubegate")
        .join("config.toml")
}
