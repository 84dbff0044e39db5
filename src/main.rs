//! `tubegate` CLI - resolve, proxy and serve video streams

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tubegate::GatewayConfig;

#[derive(Parser)]
#[command(name = "tubegate")]
#[command(about = "Resolve video streams and relay their bytes")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/tubegate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cookies file passed to yt-dlp
    #[arg(long, global = true)]
    cookies: Option<PathBuf>,

    /// Extraction timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a video and print its streams as JSON
    Resolve {
        /// Video ID or watch URL
        id: String,

        /// Pretty-print the JSON
        #[arg(short, long)]
        pretty: bool,
    },

    /// Resolve a video and relay its best progressive stream
    Stream {
        /// Video ID or watch URL
        id: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Relay bytes from an origin URL
    Proxy {
        /// Origin media URL
        url: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Byte range to request (e.g. "bytes=0-1023")
        #[arg(short, long)]
        range: Option<String>,
    },

    /// Search for videos
    Search {
        /// Search terms
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List trending videos
    Trending,

    /// Run the HTTP gateway
    Serve {
        /// Address to listen on (default from config: 127.0.0.1:8000)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so relayed bytes on stdout stay clean
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tubegate=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let mut config = GatewayConfig::load(cli.config.as_deref())?;
    if let Some(cookies) = cli.cookies {
        config.extractor.cookies = Some(cookies);
    }
    if let Some(secs) = cli.timeout {
        anyhow::ensure!(secs > 0, "--timeout must be greater than zero");
        config.extractor.timeout_secs = secs;
    }

    match cli.command {
        Commands::Resolve { id, pretty } => cmd::cmd_resolve(&config, &id, pretty).await?,
        Commands::Stream { id, output } => {
            cmd::cmd_stream(&config, &id, output.as_deref()).await?;
        }
        Commands::Proxy { url, output, range } => {
            cmd::cmd_proxy(&config, &url, output.as_deref(), range.as_deref()).await?;
        }
        Commands::Search { query, limit } => cmd::cmd_search(&config, &query, limit).await?,
        Commands::Trending => cmd::cmd_trending(&config).await?,
        Commands::Serve { bind } => cmd::cmd_serve(&config, bind.as_deref()).await?,
    }

    Ok(())
}
