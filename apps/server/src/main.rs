//! chunkxfer publisher entry point.

mod app;
mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Serves a generated blob, its chunks and metadata over HTTP.
#[derive(Parser, Debug)]
#[command(name = "chunkxfer-server", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(short, long, alias = "server")]
    listen: Option<SocketAddr>,

    /// Directory holding the blob, chunks and metadata.
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Chunk size in bytes.
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Size of each generated blob in bytes.
    #[arg(long)]
    generate_size: Option<u64>,

    /// Debug logging, including every chunk write.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(base_dir) = self.base_dir {
            config.base_dir = base_dir;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(generate_size) = self.generate_size {
            config.generate_size = generate_size;
        }
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
        listen = %config.listen,
        base_dir = %config.base_dir.display(),
        chunk_size = config.chunk_size,
        "starting chunkxfer server"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("server shut down cleanly");
    Ok(())
}
