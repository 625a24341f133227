//! Configuration for mpcover
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{MpdError, Result};
use crate::network::Address;

/// Connection settings for a session
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Server Configuration
    // -------------------------------------------------------------------------
    /// Server host name or IP address
    pub host: String,

    /// Server TCP port
    pub port: u16,

    /// Password sent right after the greeting, if any
    pub password: Option<String>,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Per-candidate connect timeout, also the initial socket timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Read timeout applied to every transport (milliseconds, 0 = block indefinitely)
    pub read_timeout_ms: u64,

    /// Send/receive cycles attempted before a command yields an empty result
    pub max_attempts: u32,

    /// Size of each socket read while collecting a response
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6600,
            password: None,
            connect_timeout_ms: 1000,
            read_timeout_ms: 1000,
            max_attempts: 3,
            chunk_size: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Address of the server this config points at
    pub fn address(&self) -> Address {
        Address::new(self.host.clone(), self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// `None` means reads block until data arrives
    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Reject values that would make a session unusable
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(MpdError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(MpdError::Config("port must not be 0".to_string()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(MpdError::Config(
                "connect timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(MpdError::Config(
                "at least one attempt is required".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(MpdError::Config(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the password used to authenticate every connection
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the password from an optional value
    pub fn maybe_password(mut self, password: Option<String>) -> Self {
        self.config.password = password;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds, 0 blocks indefinitely)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the number of send/receive attempts per command
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the receive chunk size (in bytes)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
