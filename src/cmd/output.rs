use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::io::{stdout, AsyncWrite, AsyncWriteExt};

use tubegate::ProxiedBody;

/// Relay a proxied body to `output`, or to stdout when no path is given.
///
/// Returns the number of bytes written. A failure mid-transfer is returned
/// as-is after whatever was already written has been flushed.
pub async fn write_body(body: ProxiedBody, output: Option<&Path>) -> Result<u64> {
    match output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?;
            let written = copy_chunks(body, &mut file).await?;
            eprintln!("💾 Saved {written} bytes to {}", path.display());
            Ok(written)
        }
        None => copy_chunks(body, &mut stdout()).await,
    }
}

async fn copy_chunks<W: AsyncWrite + Unpin>(mut body: ProxiedBody, out: &mut W) -> Result<u64> {
    let started = Instant::now();
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                out.write_all(&bytes).await?;
                written += bytes.len() as u64;
            }
            Err(e) => {
                out.flush().await?;
                return Err(e.into());
            }
        }
    }

    out.flush().await?;
    tracing::debug!(written, elapsed = ?started.elapsed(), "relay finished");
    Ok(written)
}

/// Print a framing summary to stderr.
pub fn describe_framing(body: &ProxiedBody) {
    let framing = &body.framing;
    eprintln!("📡 Origin status: {}", framing.status);
    if let Some(ref ct) = framing.content_type {
        eprintln!("   Content-Type: {ct}");
    }
    if let Some(len) = framing.content_length {
        eprintln!("   Content-Length: {len}");
    }
    if let Some(ref range) = framing.content_range {
        eprintln!("   Content-Range: {range}");
    }
}
