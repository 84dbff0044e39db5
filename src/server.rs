//! HTTP gateway routes.
//!
//! Thin axum wiring around the core: JSON for resolution and listings, a
//! streamed body for direct playback. The router state is immutable and
//! shared by reference count; handlers never mutate it.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::HeaderName;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::GatewayError;
use crate::stream::{ByteProxy, Catalog, CatalogEntry, ResolutionSession, StreamsResponse};

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ResolutionSession>,
    pub proxy: Arc<ByteProxy>,
    pub catalog: Arc<Catalog>,
}

/// Error body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorBody {
            error: self.detail().to_string(),
            kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/streams/{video_id}", get(streams))
        .route("/stream/{video_id}", get(stream_video))
        .route("/search", get(search))
        .route("/trending", get(trending))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the gateway on an already-bound listener until it fails.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    info!("gateway listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn streams(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<StreamsResponse>, GatewayError> {
    let result = state.session.resolve(&video_id).await?;
    Ok(Json(StreamsResponse::from(&result)))
}

async fn stream_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let result = state.session.resolve(&video_id).await?;
    let primary = result.primary.ok_or_else(|| {
        GatewayError::NotFound(format!("no progressive muxed stream for {video_id}"))
    })?;

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let body = state.proxy.open(&primary.url, range).await?;
    let framing = body.framing.clone();

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = StatusCode::from_u16(framing.status).unwrap_or(StatusCode::OK);

    let out = response.headers_mut();
    let mut relay = |name: HeaderName, value: Option<String>| {
        if let Some(v) = value.and_then(|v| HeaderValue::from_str(&v).ok()) {
            out.insert(name, v);
        }
    };
    relay(header::CONTENT_TYPE, framing.content_type);
    relay(header::CONTENT_LENGTH, framing.content_length.map(|l| l.to_string()));
    relay(header::CONTENT_RANGE, framing.content_range);
    relay(header::ACCEPT_RANGES, framing.accept_ranges);

    Ok(response)
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, GatewayError> {
    let items = state.catalog.search(&params.q).await?;
    Ok(Json(SearchResponse { items }))
}

async fn trending(
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogEntry>>, GatewayError> {
    Ok(Json(state.catalog.trending().await?))
}
