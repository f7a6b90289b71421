//! Multiplexer error taxonomy.
//!
//! Envelope-level errors (`MuxError`) abort the whole multiplexed request
//! before any individual request is dispatched. Branch-level errors
//! (`BranchError`) are recorded as the failing request's response and never
//! affect unrelated requests.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::codec::ContentTypeError;
use crate::dispatch::HandlerError;
use crate::multiplexer::filter::FilterError;
use crate::multiplexer::types::{ErrorBody, IndividualResponse};

/// Errors that fail the whole multiplexed request.
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("POST is expected, but {0} received")]
    MethodNotAllowed(Method),

    #[error("invalid envelope request: {0}")]
    InvalidEnvelope(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("invalid multiplexed request: {0}")]
    MalformedBody(String),

    #[error("no individual requests to process")]
    EmptyRequestSet,

    #[error("the server is configured to serve up to {max} requests, but received {received}")]
    TooManyRequests { max: usize, received: usize },

    #[error("failed to encode multiplexed response: {0}")]
    Aggregation(String),
}

impl MuxError {
    pub fn status(&self) -> StatusCode {
        match self {
            MuxError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            MuxError::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            MuxError::InvalidEnvelope(_)
            | MuxError::MalformedBody(_)
            | MuxError::EmptyRequestSet
            | MuxError::TooManyRequests { .. } => StatusCode::BAD_REQUEST,
            MuxError::Aggregation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ContentTypeError> for MuxError {
    fn from(err: ContentTypeError) -> Self {
        MuxError::UnsupportedContentType(err.to_string())
    }
}

impl IntoResponse for MuxError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            status: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Errors confined to a single individual request.
#[derive(Debug, Error)]
pub enum BranchError {
    /// The request could not be turned into a synthetic request.
    #[error("invalid individual request: {0}")]
    InvalidRequest(String),

    #[error("multiplexer filter failed: {0}")]
    Hook(#[from] FilterError),

    #[error("dispatch failed: {0}")]
    Dispatch(#[from] HandlerError),

    /// Not dispatched because an ancestor request failed.
    #[error("ancestor request `{0}` failed")]
    AncestorFailed(String),
}

impl BranchError {
    pub fn status(&self) -> StatusCode {
        match self {
            BranchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BranchError::Hook(e) => e.status(),
            BranchError::Dispatch(e) => e.status(),
            BranchError::AncestorFailed(_) => StatusCode::FAILED_DEPENDENCY,
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BranchError::InvalidRequest(_) => "invalid_request",
            BranchError::Hook(_) => "hook_failure",
            BranchError::Dispatch(_) => "dispatch_failure",
            BranchError::AncestorFailed(_) => "ancestor_failed",
        }
    }

    /// The error response recorded in place of a real one.
    pub fn to_individual_response(&self) -> IndividualResponse {
        let status = self.status().as_u16();
        IndividualResponse {
            status,
            headers: Default::default(),
            body: Some(json!({
                "status": status,
                "message": self.to_string(),
            })),
        }
    }
}
