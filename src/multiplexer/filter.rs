//! Pre- and post-processing hooks for individual requests.
//!
//! # Design Decisions
//! - Hooks are synchronous transformations; they never dispatch
//! - Default methods are identity, so implementors override only what they need
//! - A failing hook turns into that request's error response

use axum::http::StatusCode;
use thiserror::Error;

use crate::multiplexer::types::{IndividualRequest, IndividualResponseWithCookies};

/// Error raised by a multiplexer filter.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FilterError {
    status: StatusCode,
    message: String,
}

impl FilterError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// A filter failure reported as 500.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Transforms individual requests before dispatch and responses before recording.
pub trait MultiplexerFilter: Send + Sync {
    /// Runs after envelope inheritance.
    fn filter_request(&self, request: IndividualRequest) -> Result<IndividualRequest, FilterError> {
        Ok(request)
    }

    /// Runs after the handler response has been converted, before it is recorded.
    fn filter_response(
        &self,
        response: IndividualResponseWithCookies,
    ) -> Result<IndividualResponseWithCookies, FilterError> {
        Ok(response)
    }
}
