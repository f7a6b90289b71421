//! Wire codecs and content negotiation.
//!
//! # Data Flow
//! ```text
//! Content-Type header (or none)
//!     → content_type.rs (parse base media type, registry lookup)
//!     → ContentType { header_key, codec }
//!     → codec.decode(body) → serde_json::Value
//!     → ... multiplexing ...
//!     → codec.encode(value) → response body
//! ```
//!
//! # Design Decisions
//! - `serde_json::Value` is the in-memory data model for every codec
//! - Registry is built once at startup and shared read-only
//! - Missing header resolves to JSON

pub mod content_type;
pub mod json;

use serde_json::Value;
use thiserror::Error;

pub use content_type::{ContentType, ContentTypeError, ContentTypeRegistry, APPLICATION_JSON};
pub use json::JsonCodec;

/// Errors raised while converting between wire bytes and the data model.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode body: {0}")]
    Decode(String),

    #[error("failed to encode body: {0}")]
    Encode(String),
}

/// Converts wire bytes to and from the structured data model.
pub trait DataCodec: Send + Sync + std::fmt::Debug {
    /// Decode a complete body.
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;

    /// Encode a value into a complete body.
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;
}
