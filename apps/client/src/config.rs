//! Client configuration.
//!
//! Read from an optional TOML file; every key may be omitted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use chunkxfer_retriever::RetrievalConfig;
use serde::{Deserialize, Serialize};

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Publisher address, `host:port` or a URL.
    #[serde(default = "default_server")]
    pub server: String,

    /// Local directory for metadata and chunks.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Concurrent chunk downloads.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Check the fetched chunks against the published hash.
    #[serde(default = "default_true")]
    pub verify: bool,

    /// Write the reassembled blob next to the chunks.
    #[serde(default)]
    pub assemble: bool,

    /// Per-request timeout in seconds; unset means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Debug logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_server() -> String {
    "127.0.0.1:9090".into()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/tmp/chunkxfer/client")
}

fn default_concurrency() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            data_dir: default_data_dir(),
            concurrency: default_concurrency(),
            verify: default_true(),
            assemble: false,
            request_timeout_secs: None,
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
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.request_timeout_secs == Some(0) {
            bail!("request_timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            data_dir: self.data_dir.clone(),
            concurrency: self.concurrency,
            verify: self.verify,
            assemble: self.assemble,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.server, "127.0.0.1:9090");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/chunkxfer/client"));
        assert_eq!(config.concurrency, 5);
        assert!(config.verify);
        assert!(!config.assemble);
        assert_eq!(config.request_timeout(), None);
        config.validate().unwrap();
    }

    #[test]
    fn config_partial_toml() {
        let config: Config = toml::from_str("concurrency = 16\nverify = false").unwrap();
        assert_eq!(config.concurrency, 16);
        assert!(!config.verify);
        assert_eq!(config.server, "127.0.0.1:9090");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert!(zero.validate().is_err());

        let no_time = Config {
            request_timeout_secs: Some(0),
            ..Config::default()
        };
        assert!(no_time.validate().is_err());
    }

    #[test]
    fn retrieval_config_carries_settings() {
        let config = Config {
            data_dir: PathBuf::from("/data"),
            concurrency: 3,
            verify: false,
            assemble: true,
            ..Config::default()
        };
        let retrieval = config.retrieval_config();
        assert_eq!(retrieval.data_dir, PathBuf::from("/data"));
        assert_eq!(retrieval.concurrency, 3);
        assert!(!retrieval.verify);
        assert!(retrieval.assemble);
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("client.toml");
        std::fs::write(&path, "server = \"10.0.0.2:9090\"\nrequest_timeout_secs = 30\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server, "10.0.0.2:9090");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.concurrency, 5);
    }
}
