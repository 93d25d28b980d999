//! chunkxfer retriever entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Fetches a published blob's metadata and all of its chunks.
#[derive(Parser, Debug)]
#[command(name = "chunkxfer-client", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Publisher address, `host:port` or a URL.
    #[arg(short, long, alias = "tcp-server")]
    server: Option<String>,

    /// Local directory for metadata and chunks.
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Concurrent chunk downloads.
    #[arg(short = 'n', long, alias = "cc")]
    concurrency: Option<usize>,

    /// Skip checking the chunks against the published hash.
    #[arg(long)]
    no_verify: bool,

    /// Write the reassembled blob next to the chunks.
    #[arg(long)]
    assemble: bool,

    /// Ask the publisher to generate a new blob first.
    #[arg(long)]
    generate: bool,

    /// Per-request timeout in seconds.
    #[arg(long)]
    request_timeout: Option<u64>,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout_secs = Some(timeout);
        }
        if self.no_verify {
            config.verify = false;
        }
        config.assemble |= self.assemble;
        config.verbose |= self.verbose;
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %config.server,
        data_dir = %config.data_dir.display(),
        concurrency = config.concurrency,
        "starting chunkxfer client"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, cli.generate))
}
