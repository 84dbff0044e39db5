use std::path::Path;

use anyhow::Result;

use tubegate::GatewayConfig;

use super::output::{describe_framing, write_body};

pub async fn cmd_proxy(
    config: &GatewayConfig,
    url: &str,
    output: Option<&Path>,
    range: Option<&str>,
) -> Result<()> {
    let proxy = config.build_proxy()?;
    let body = proxy.open(url, range).await?;
    describe_framing(&body);
    write_body(body, output).await?;
    Ok(())
}
