use std::path::Path;

use anyhow::Result;

use tubegate::{GatewayConfig, GatewayError};

use super::output::{describe_framing, write_body};

pub async fn cmd_stream(config: &GatewayConfig, id: &str, output: Option<&Path>) -> Result<()> {
    let session = config.build_session(config.build_extractor()?);
    let proxy = config.build_proxy()?;

    eprintln!("📡 Resolving: {id}");
    let result = session.resolve(id).await?;
    eprintln!("📺 {}", result.title);

    let Some(primary) = result.primary else {
        if let Some(manifest) = result.manifest_url {
            eprintln!("   Only adaptive streams available. HLS manifest: {manifest}");
        }
        return Err(GatewayError::NotFound(format!("no progressive muxed stream for {id}")).into());
    };

    if let Some(height) = primary.resolution_height {
        eprintln!("   {}p {}", height, primary.container);
    }

    let body = proxy.open(&primary.url, None).await?;
    describe_framing(&body);
    write_body(body, output).await?;

    Ok(())
}
