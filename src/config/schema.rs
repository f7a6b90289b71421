//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the multiplexer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the multiplexing server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MuxConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Multiplexed request handling.
    pub multiplexer: MultiplexerConfig,

    /// Upstream server that services individual requests.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Multiplexer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MultiplexerConfig {
    /// Path the multiplexer is mounted on.
    pub path: String,

    /// Maximum number of individual requests, counted across all nesting levels.
    pub max_requests: usize,

    /// Envelope headers that individual requests may inherit (case-insensitive).
    pub header_whitelist: Vec<String>,

    /// Maximum number of individual requests dispatched at the same time.
    pub max_concurrent_dispatches: usize,

    /// Maximum envelope body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            path: "/mux".to_string(),
            max_requests: 20,
            header_whitelist: Vec::new(),
            max_concurrent_dispatches: 64,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream authority (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Per-request upstream timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Envelope request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
