// src/config.rs

//! Manages harness configuration: loading, defaults, and validation.

use crate::core::protocol::Framing;
use crate::core::protocol::codec::{DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_READ_BUFFER_SIZE};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// How responses are delimited on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FramingMode {
    /// A single bounded read is the whole response.
    #[default]
    Unframed,
    /// Responses end with a `\0` byte.
    NulTerminated,
}

/// Settings for a single `Connection`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub framing: FramingMode,
    /// Capacity of the single read used in unframed mode.
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Upper bound on one response in `nul-terminated` mode.
    #[serde(default = "default_max_response_size")]
    pub max_response_size: usize,
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    /// Applies to each write and each read. Absent means wait indefinitely.
    #[serde(with = "humantime_serde", default)]
    pub io_timeout: Option<Duration>,
}

fn default_read_buffer_size() -> usize {
    DEFAULT_READ_BUFFER_SIZE
}
fn default_max_response_size() -> usize {
    DEFAULT_MAX_RESPONSE_SIZE
}
fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            framing: FramingMode::default(),
            read_buffer_size: default_read_buffer_size(),
            max_response_size: default_max_response_size(),
            connect_timeout: default_connect_timeout(),
            io_timeout: None,
        }
    }
}

impl ConnectionConfig {
    /// Resolves the framing mode and its size limit into a codec setting.
    pub fn framing(&self) -> Framing {
        match self.framing {
            FramingMode::Unframed => Framing::Unframed {
                capacity: self.read_buffer_size,
            },
            FramingMode::NulTerminated => Framing::NulTerminated {
                max_size: self.max_response_size,
            },
        }
    }
}

/// Settings for the isolation scenario.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    #[serde(default = "default_table")]
    pub table: String,
    /// Read back every seeded row before any transaction begins.
    #[serde(default = "default_true")]
    pub verify_seed: bool,
    /// Re-read the target row after the read-only transaction commits.
    #[serde(default = "default_true")]
    pub verify_after_commit: bool,
}

fn default_table() -> String {
    "concurrency_test".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            verify_seed: true,
            verify_after_commit: true,
        }
    }
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
    connection: ConnectionConfig,
    #[serde(default)]
    scenario: ScenarioConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8765
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Represents the final, validated harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub connection: ConnectionConfig,
    pub scenario: ScenarioConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            connection: ConnectionConfig::default(),
            scenario: ScenarioConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config in '{path}'"))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(contents).context("Failed to parse TOML")?;

        let config = Config {
            host: raw.host,
            port: raw.port,
            log_level: raw.log_level,
            connection: raw.connection,
            scenario: raw.scenario,
        };

        config.validate()?;
        Ok(config)
    }

    /// The server address in `host:port` form.
    pub fn addr(&self) -> String {
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

        let conn = &self.connection;
        if conn.read_buffer_size == 0 {
            return Err(anyhow!("connection.read_buffer_size cannot be 0"));
        }
        if conn.max_response_size < conn.read_buffer_size {
            return Err(anyhow!(
                "connection.max_response_size ({}) cannot be smaller than connection.read_buffer_size ({})",
                conn.max_response_size,
                conn.read_buffer_size
            ));
        }
        if conn.connect_timeout.is_zero() {
            return Err(anyhow!("connection.connect_timeout cannot be 0"));
        }
        if conn.io_timeout.is_some_and(|t| t.is_zero()) {
            return Err(anyhow!(
                "connection.io_timeout cannot be 0; omit it to wait indefinitely"
            ));
        }
        if conn.framing == FramingMode::Unframed && conn.read_buffer_size < 2048 {
            warn!(
                "connection.read_buffer_size is {} bytes; unframed responses longer than this are truncated.",
                conn.read_buffer_size
            );
        }

        let table = &self.scenario.table;
        if table.is_empty() {
            return Err(anyhow!("scenario.table cannot be empty"));
        }
        if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            || table.starts_with(|c: char| c.is_ascii_digit())
        {
            return Err(anyhow!("scenario.table '{table}' is not a valid identifier"));
        }
        Ok(())
    }
}
