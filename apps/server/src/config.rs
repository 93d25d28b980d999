//! Server configuration.
//!
//! Read from an optional TOML file; every key may be omitted.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chunkxfer_protocol::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_GENERATE_SIZE};
use chunkxfer_publisher::PublisherConfig;
use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address to listen on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Directory holding the blob, chunks and metadata.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Chunk size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Size of each generated blob in bytes.
    #[serde(default = "default_generate_size")]
    pub generate_size: u64,

    /// Debug logging, including every chunk write.
    #[serde(default)]
    pub verbose: bool,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9090))
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("/tmp/chunkxfer")
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_generate_size() -> u64 {
    DEFAULT_GENERATE_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            base_dir: default_base_dir(),
            chunk_size: default_chunk_size(),
            generate_size: default_generate_size(),
            verbose: false,
        }
    }
}

impl Config {
    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be at least 1");
        }
        Ok(())
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            base_dir: self.base_dir.clone(),
            chunk_size: self.chunk_size,
            generate_size: self.generate_size,
            verbose: self.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.listen.port(), 9090);
        assert_eq!(config.base_dir, PathBuf::from("/tmp/chunkxfer"));
        assert_eq!(config.chunk_size, 1500);
        assert_eq!(config.generate_size, 10 * 1024 * 1024);
        assert!(!config.verbose);
        config.validate().unwrap();
    }

    #[test]
    fn config_partial_toml() {
        let config: Config = toml::from_str("chunk_size = 4096").unwrap();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.listen, default_listen());
        assert_eq!(config.generate_size, DEFAULT_GENERATE_SIZE);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = Config {
            listen: "127.0.0.1:8080".parse::<SocketAddr>().unwrap(),
            base_dir: PathBuf::from("/srv/blobs"),
            chunk_size: 512,
            generate_size: 1024,
            verbose: true,
        };
        let parsed: Config = toml::from_str(&toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(parsed.listen, config.listen);
        assert_eq!(parsed.base_dir, config.base_dir);
        assert_eq!(parsed.chunk_size, 512);
        assert!(parsed.verbose);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let config = Config {
            chunk_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("server.toml");
        std::fs::write(&path, "listen = \"127.0.0.1:7000\"\nverbose = true\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.listen.port(), 7000);
        assert!(config.verbose);
        assert_eq!(config.chunk_size, 1500);
    }

    #[test]
    fn load_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&tmp.path().join("absent.toml"))).is_err());
        assert!(Config::load(None).is_ok());
    }
}
