//! Configuration for TableCache
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{CacheError, Result};

/// Main configuration for a TableCache server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection write timeout (milliseconds), 0 disables it
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Serve Loop Configuration
    // -------------------------------------------------------------------------
    /// How long a single receive waits before the loop re-checks its stop flag
    /// (milliseconds)
    pub poll_interval_ms: u64,

    /// Largest request or reply body accepted on the wire (bytes)
    pub max_frame_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5757".to_string(),
            max_connections: 1024,
            write_timeout_ms: 5000,
            poll_interval_ms: 100,
            max_frame_size: crate::protocol::MAX_FRAME_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Receive timeout used by the serve loop
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.is_empty() {
            return Err(CacheError::Config("listen address cannot be empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(CacheError::Config("poll interval must be positive".to_string()));
        }
        if self.max_connections == 0 {
            return Err(CacheError::Config("max connections must be positive".to_string()));
        }
        if self.max_frame_size > crate::protocol::MAX_FRAME_SIZE {
            return Err(CacheError::Config(format!(
                "max frame size {} exceeds protocol limit {}",
                self.max_frame_size,
                crate::protocol::MAX_FRAME_SIZE
            )));
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
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the serve loop poll interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the largest accepted frame body (in bytes)
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.config.max_frame_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
