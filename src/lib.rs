//! Request multiplexer library.
//!
//! Accepts one envelope request describing a tree of individual requests,
//! runs them against a single-request handler (siblings concurrently,
//! dependents after their parent) and answers with one aggregated response.

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod multiplexer;
pub mod observability;

pub use config::MuxConfig;
pub use dispatch::{HandlerError, RequestHandler, ServiceHandler, UpstreamHandler};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use multiplexer::{MultiplexedRequestHandler, MultiplexerFilter, MuxError};
