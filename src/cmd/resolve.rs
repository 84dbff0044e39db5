use anyhow::Result;

use tubegate::{GatewayConfig, StreamsResponse};

pub async fn cmd_resolve(config: &GatewayConfig, id: &str, pretty: bool) -> Result<()> {
    let session = config.build_session(config.build_extractor()?);
    let result = session.resolve(id).await?;

    eprintln!("📺 {}", result.title);
    eprintln!("   {} streams", result.streams.len());
    if result.primary.is_none() {
        eprintln!("   ⚠️  No progressive muxed stream");
    }

    let response = StreamsResponse::from(&result);
    let json = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{json}");

    Ok(())
}
