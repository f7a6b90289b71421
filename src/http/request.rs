//! Request ID helpers.
//!
//! # Responsibilities
//! - Name the request ID header shared by the middleware layers
//! - Read the ID assigned by `SetRequestIdLayer` for log correlation
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer)
//! - Synthetic requests inherit it only when `x-request-id` is whitelisted

use axum::http::Request;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Access to the request ID of an incoming request.
pub trait RequestIdExt {
    /// The request ID, or `"unknown"` when none was assigned.
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}
