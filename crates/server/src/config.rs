use matcher::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ServerError, ServerResult};

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address (IP or hostname)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port. `0` picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of detection workers consuming the task queue
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Directory of corpus files indexed at startup
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,

    /// Time allowed for a client to deliver its request line
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Maximum request line length in bytes, newline excluded
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    /// Time allowed for queued work to finish after shutdown is requested
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,

    /// Log level, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Prometheus scrape listener, disabled when unset
    #[serde(default)]
    pub metrics_addr: Option<String>,

    /// Detection parameters
    #[serde(default)]
    pub detector: DetectorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            workers: default_workers(),
            corpus_dir: default_corpus_dir(),
            read_timeout_secs: default_read_timeout_secs(),
            max_request_bytes: default_max_request_bytes(),
            drain_timeout_secs: default_drain_timeout_secs(),
            log_level: default_log_level(),
            log_json: false,
            metrics_addr: None,
            detector: DetectorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `simscan.{toml,yaml,json}` file in
    /// the working directory, overridden by `SIMSCAN__*` environment variables
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("simscan").required(false));
        Self::finish(builder)
    }

    /// Load configuration from an explicit file, still overridden by the
    /// environment
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let builder = config::Config::builder().add_source(config::File::from(path.as_ref()));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> anyhow::Result<Self> {
        let config: ServerConfig = builder
            // SIMSCAN__DETECTOR__MIN_SIMILARITY -> detector.min_similarity
            .add_source(
                config::Environment::with_prefix("SIMSCAN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> ServerResult<()> {
        if self.workers == 0 {
            return Err(ServerError::Config("workers must be at least 1".into()));
        }
        if self.max_request_bytes == 0 {
            return Err(ServerError::Config(
                "max_request_bytes must be greater than zero".into(),
            ));
        }
        self.detector.validate()?;
        Ok(())
    }

    /// `host:port` string for logging
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_workers() -> usize {
    4
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("data_text")
}

fn default_read_timeout_secs() -> u64 {
    30
}

fn default_max_request_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_drain_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}
