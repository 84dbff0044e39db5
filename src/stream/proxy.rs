//! Byte proxy: relay an origin media body as a forward-only chunk stream.
//!
//! The origin body is never collected; each chunk is handed on as soon as
//! the transport yields it. Dropping a [`ProxiedBody`] drops the upstream
//! response, which closes the origin connection.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::header::{
    HeaderName, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE,
};
use reqwest::{Client, Response};
use tracing::{debug, info, instrument, warn};

use crate::error::{GatewayError, Result};

/// Default connect timeout for origin hosts.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default idle read timeout; there is no overall transfer timeout.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Origin content framing, relayed as connection metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginFraming {
    /// Origin status (200, or 206 for range responses).
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub content_range: Option<String>,
    pub accept_ranges: Option<String>,
}

impl OriginFraming {
    fn from_response(response: &Response) -> Self {
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            status: response.status().as_u16(),
            content_type: header(CONTENT_TYPE),
            content_length: header(CONTENT_LENGTH).and_then(|v| v.parse().ok()),
            content_range: header(CONTENT_RANGE),
            accept_ranges: header(ACCEPT_RANGES),
        }
    }
}

/// A lazy, finite, non-restartable stream of origin body chunks.
pub struct ProxiedBody {
    pub framing: OriginFraming,
    chunks: BoxStream<'static, Result<Bytes>>,
}

impl ProxiedBody {
    fn new(response: Response, origin: String) -> Self {
        let framing = OriginFraming::from_response(&response);
        let upstream = Box::pin(response.bytes_stream());

        // (upstream, bytes relayed so far, failed)
        let chunks = stream::unfold(
            (upstream, 0u64, false),
            move |(mut upstream, relayed, failed)| {
                let origin = origin.clone();
                async move {
                    if failed {
                        return None;
                    }
                    match upstream.next().await {
                        Some(Ok(chunk)) => {
                            let relayed = relayed + chunk.len() as u64;
                            Some((Ok(chunk), (upstream, relayed, false)))
                        }
                        Some(Err(e)) => {
                            let err = if relayed > 0 {
                                warn!(relayed, "origin dropped mid-transfer: {e}");
                                GatewayError::UpstreamInterrupted(format!(
                                    "{origin}: connection lost after {relayed} bytes: {e}"
                                ))
                            } else {
                                warn!("origin failed before first chunk: {e}");
                                GatewayError::UpstreamUnavailable(format!("{origin}: {e}"))
                            };
                            Some((Err(err), (upstream, relayed, true)))
                        }
                        None => {
                            debug!(relayed, "origin body complete");
                            None
                        }
                    }
                }
            },
        )
        .boxed();

        Self { framing, chunks }
    }
}

impl Stream for ProxiedBody {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.chunks.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for ProxiedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxiedBody")
            .field("framing", &self.framing)
            .finish_non_exhaustive()
    }
}

/// Opens origin connections and wraps their bodies as [`ProxiedBody`].
#[derive(Clone)]
pub struct ByteProxy {
    client: Client,
}

impl ByteProxy {
    /// Create a proxy with default timeouts and no user agent override.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_settings(DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_TIMEOUT, None)
    }

    /// Create a proxy with explicit connect/idle timeouts.
    pub fn with_settings(
        connect_timeout: Duration,
        idle_timeout: Duration,
        user_agent: Option<&str>,
    ) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(idle_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            // Relay bytes exactly as the origin framed them
            .no_gzip()
            .no_brotli()
            .no_zstd()
            .no_deflate()
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Connect to `origin_url` and return its body as a chunk stream.
    ///
    /// `range` is forwarded verbatim as the `Range` request header.
    #[instrument(skip(self))]
    pub async fn open(&self, origin_url: &str, range: Option<&str>) -> Result<ProxiedBody> {
        let mut request = self.client.get(origin_url);
        if let Some(range) = range {
            request = request.header(RANGE, range);
        }

        let response = request.send().await.map_err(|e| {
            warn!("origin connect failed: {e}");
            GatewayError::UpstreamUnavailable(format!("{origin_url}: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "origin rejected request");
            return Err(GatewayError::UpstreamUnavailable(format!(
                "{origin_url}: origin returned {status}"
            )));
        }

        let body = ProxiedBody::new(response, origin_url.to_string());
        info!(
            status = body.framing.status,
            content_type = ?body.framing.content_type,
            content_length = ?body.framing.content_length,
            "proxying origin body"
        );
        Ok(body)
    }
}
