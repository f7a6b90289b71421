//! Single-request dispatch.
//!
//! # Data Flow
//! ```text
//! Synthetic request (from multiplexer) or plain request (from HTTP server)
//!     → RequestHandler::handle
//!         - service.rs (in-process tower Service, e.g. an axum Router)
//!         - upstream.rs (forward to an upstream HTTP backend)
//!     → Response or HandlerError
//! ```
//!
//! # Design Decisions
//! - Handlers are opaque capabilities; the multiplexer never inspects them
//! - Failures are typed so callers can pick a status code
//! - Returned futures are `'static` so callers may drop them to cancel work

pub mod service;
pub mod upstream;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures_util::future::BoxFuture;
use thiserror::Error;

pub use service::ServiceHandler;
pub use upstream::UpstreamHandler;

/// Errors a handler can report instead of a response.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler gave up waiting for the target.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The target could not be reached.
    #[error("target unavailable: {0}")]
    Unavailable(String),

    /// Any other failure.
    #[error("handler failed: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Status code used when this failure is reported to a client.
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            HandlerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            HandlerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Services one standalone request.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>, HandlerError>>;
}

/// Id of the individual request a synthetic request was built from.
///
/// Inserted into the request extensions by the multiplexer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndividualRequestId(pub String);

impl IndividualRequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
