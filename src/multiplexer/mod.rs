//! Request multiplexing subsystem.
//!
//! # Data Flow
//! ```text
//! Envelope request (POST /mux)
//!     → handler.rs (method + content type checks)
//!     → parser.rs (decode tree, count, validate ids)
//!     → scheduler.rs (fork-join over the tree)
//!         per request: adapter.rs → filter.rs → dispatch::RequestHandler
//!                      → types.rs (convert) → filter.rs → results.rs (record)
//!     → aggregator.rs (encode responses, merged cookies from cookies.rs)
//!     → Envelope response (200)
//! ```
//!
//! # Design Decisions
//! - Structural errors fail the envelope before anything is dispatched
//! - Per-request errors are recorded as that request's response
//! - Siblings run concurrently; dependents wait for their parent's record

pub mod adapter;
pub mod aggregator;
pub mod cookies;
pub mod error;
pub mod filter;
pub mod handler;
pub mod parser;
pub mod results;
pub mod scheduler;
pub mod types;

pub use adapter::{EnvelopeContext, HeaderWhitelist, RequestAdapter};
pub use cookies::{CookieKey, CookieMerger, SetCookie};
pub use error::{BranchError, MuxError};
pub use filter::{FilterError, MultiplexerFilter};
pub use handler::{MultiplexedRequestHandler, MultiplexerBuilder};
pub use parser::RequestTreeParser;
pub use results::ExecutionResultTable;
pub use scheduler::Scheduler;
pub use types::{
    HeaderField, IndividualRequest, IndividualRequestMap, IndividualResponse,
    IndividualResponseMap, IndividualResponseWithCookies, MultiplexedResponseContent,
};
