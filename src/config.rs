// src/config.rs

//! Manages server configuration: loading, defaults, and validation.

use crate::core::liveness::DEFAULT_LIVENESS_TIMEOUT;
use crate::core::protocol::DEFAULT_MAX_MESSAGE_SIZE;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::Ipv4Addr;
use tracing::warn;

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    8878
}

/// A raw representation of the config file before validation.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    worker_threads: Option<usize>,
    #[serde(default = "default_liveness_timeout_ms")]
    liveness_timeout_ms: u64,
    #[serde(default = "default_max_message_size")]
    max_message_size: usize,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8001
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
fn default_liveness_timeout_ms() -> u64 {
    DEFAULT_LIVENESS_TIMEOUT.as_millis() as u64
}
fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

/// Represents the final, validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Number of dispatcher worker threads.
    pub worker_threads: usize,
    /// A session silent on `ping` for longer than this is disconnected.
    pub liveness_timeout_ms: u64,
    /// Maximum bytes a message may span, newline included.
    pub max_message_size: usize,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            worker_threads: default_worker_threads(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
            max_message_size: default_max_message_size(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid configuration in '{path}'"))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse configuration TOML")?;

        let config = Config {
            host: raw_config.host,
            port: raw_config.port,
            log_level: raw_config.log_level,
            worker_threads: raw_config
                .worker_threads
                .unwrap_or_else(default_worker_threads),
            liveness_timeout_ms: raw_config.liveness_timeout_ms,
            max_message_size: raw_config.max_message_size,
            metrics: raw_config.metrics,
        };

        config.validate()?;
        Ok(config)
    }

    /// The `host:port` pair the acceptor binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.host.parse::<Ipv4Addr>().is_err() {
            return Err(anyhow!("host '{}' is not an IPv4 address", self.host));
        }
        if self.worker_threads == 0 {
            return Err(anyhow!("worker_threads cannot be 0"));
        }
        if self.liveness_timeout_ms == 0 {
            return Err(anyhow!("liveness_timeout_ms cannot be 0"));
        }
        if self.max_message_size < 2 {
            return Err(anyhow!("max_message_size must be at least 2 bytes"));
        }
        if self.worker_threads > 1024 {
            warn!(
                "high worker_threads setting: {}. Most of these threads will sit idle.",
                self.worker_threads
            );
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the main server port"
                ));
            }
        }
        Ok(())
    }
}
