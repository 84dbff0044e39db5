use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use tubegate::server::{self, AppState};
use tubegate::stream::extractors::YtDlpExtractor;
use tubegate::{Extractor, GatewayConfig};

pub async fn cmd_serve(config: &GatewayConfig, bind: Option<&str>) -> Result<()> {
    let ytdlp = YtDlpExtractor::new(config.ytdlp_config())?;
    if !ytdlp.check_available().await {
        tracing::warn!(
            "yt-dlp not runnable at {}; resolution requests will fail",
            config.ytdlp_config().binary.display()
        );
    }
    let extractor: Arc<dyn Extractor> = Arc::new(ytdlp);

    let state = AppState {
        session: Arc::new(config.build_session(Arc::clone(&extractor))),
        proxy: Arc::new(config.build_proxy()?),
        catalog: Arc::new(config.build_catalog(extractor)),
    };

    let addr = bind.unwrap_or(&config.server.bind);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    server::serve(listener, state).await
}
