//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, timeouts > 0, dispatch permits bounded)
//! - Validate addresses and header names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MuxConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use axum::http::HeaderName;
use tokio::sync::Semaphore;

use crate::config::schema::MuxConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &MuxConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }

    let mux = &config.multiplexer;
    if !mux.path.starts_with('/') {
        errors.push(ValidationError::new("multiplexer.path", "must start with `/`"));
    }
    if mux.max_requests == 0 {
        errors.push(ValidationError::new("multiplexer.max_requests", "must be greater than 0"));
    }
    if mux.max_concurrent_dispatches == 0 {
        errors.push(ValidationError::new(
            "multiplexer.max_concurrent_dispatches",
            "must be greater than 0",
        ));
    } else if mux.max_concurrent_dispatches > Semaphore::MAX_PERMITS {
        errors.push(ValidationError::new(
            "multiplexer.max_concurrent_dispatches",
            format!("must be at most {}", Semaphore::MAX_PERMITS),
        ));
    }
    if mux.max_body_bytes == 0 {
        errors.push(ValidationError::new("multiplexer.max_body_bytes", "must be greater than 0"));
    }
    for name in &mux.header_whitelist {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "multiplexer.header_whitelist",
                format!("`{}` is not a valid header name", name),
            ));
        }
    }

    if Authority::from_str(&config.upstream.address).is_err() {
        errors.push(ValidationError::new(
            "upstream.address",
            format!("`{}` is not a valid authority", config.upstream.address),
        ));
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MuxConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = MuxConfig::default();
        config.multiplexer.path = "mux".into();
        config.multiplexer.max_requests = 0;
        config.multiplexer.header_whitelist = vec!["bad header".into()];
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "multiplexer.path",
                "multiplexer.max_requests",
                "multiplexer.header_whitelist",
                "timeouts.request_secs",
            ]
        );
    }

    #[test]
    fn test_dispatch_permits_upper_bound() {
        let mut config = MuxConfig::default();
        config.multiplexer.max_concurrent_dispatches = usize::MAX;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "multiplexer.max_concurrent_dispatches");

        config.multiplexer.max_concurrent_dispatches = Semaphore::MAX_PERMITS;
        assert!(validate_config(&config).is_ok());
    }
}
