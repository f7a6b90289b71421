//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID for correlation)
//!     → path == mux path?
//!         yes → multiplexer::MultiplexedRequestHandler
//!         no  → dispatch::RequestHandler (passthrough)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
