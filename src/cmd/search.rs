use anyhow::Result;

use tubegate::{CatalogEntry, GatewayConfig};

pub async fn cmd_search(config: &GatewayConfig, query: &str, limit: Option<usize>) -> Result<()> {
    let mut catalog = config.build_catalog(config.build_extractor()?);
    if let Some(limit) = limit {
        catalog = catalog.with_search_limit(limit);
    }

    eprintln!("🔍 Searching: {query}");
    let entries = catalog.search(query).await?;
    print_entries(&entries);
    Ok(())
}

pub async fn cmd_trending(config: &GatewayConfig) -> Result<()> {
    let catalog = config.build_catalog(config.build_extractor()?);
    let entries = catalog.trending().await?;
    print_entries(&entries);
    Ok(())
}

fn print_entries(entries: &[CatalogEntry]) {
    for entry in entries {
        let duration = entry
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let secs = d.round() as u64;
                format!(" ({}:{:02})", secs / 60, secs % 60)
            })
            .unwrap_or_default();
        println!(
            "{}  {} - {}{} [{} views]",
            entry.id, entry.title, entry.uploader_name, duration, entry.views
        );
    }
    eprintln!("({} results)", entries.len());
}
