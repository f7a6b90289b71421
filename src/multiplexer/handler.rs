//! Envelope request handling.
//!
//! # Responsibilities
//! - Reject anything but POST before the body is read
//! - Require the JSON content type for the envelope
//! - Parse and validate the request tree
//! - Execute the tree and aggregate the results

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};

use crate::codec::ContentTypeRegistry;
use crate::config::MultiplexerConfig;
use crate::dispatch::RequestHandler;
use crate::multiplexer::adapter::{EnvelopeContext, HeaderWhitelist, RequestAdapter};
use crate::multiplexer::aggregator::aggregate;
use crate::multiplexer::error::MuxError;
use crate::multiplexer::filter::MultiplexerFilter;
use crate::multiplexer::parser::{total_request_count, RequestTreeParser};
use crate::multiplexer::scheduler::Scheduler;
use crate::observability::metrics;

/// Serves multiplexed envelope requests.
#[derive(Clone)]
pub struct MultiplexedRequestHandler {
    path: Arc<str>,
    registry: Arc<ContentTypeRegistry>,
    parser: RequestTreeParser,
    scheduler: Arc<Scheduler>,
    max_body_bytes: usize,
}

impl MultiplexedRequestHandler {
    /// Start building a multiplexer around a single-request handler.
    pub fn builder(handler: Arc<dyn RequestHandler>) -> MultiplexerBuilder {
        MultiplexerBuilder {
            handler,
            config: MultiplexerConfig::default(),
            registry: ContentTypeRegistry::default(),
            filter: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether a request targets the multiplexer. The method is not checked.
    pub fn is_multiplexed_request<B>(&self, request: &Request<B>) -> bool {
        request.uri().path() == &*self.path
    }

    /// Handle one envelope request.
    pub async fn handle_request(&self, request: Request<Body>) -> Result<Response<Body>, MuxError> {
        let start = Instant::now();
        let result = self.process(request).await;

        let status = match &result {
            Ok(response) => response.status(),
            Err(err) => {
                tracing::error!(error = %err, "Invalid multiplexed request");
                err.status()
            }
        };
        metrics::record_envelope(status.as_u16(), start);

        result
    }

    async fn process(&self, request: Request<Body>) -> Result<Response<Body>, MuxError> {
        if request.method() != Method::POST {
            return Err(MuxError::MethodNotAllowed(request.method().clone()));
        }

        let header_value = match request.headers().get(header::CONTENT_TYPE) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| MuxError::UnsupportedContentType("non-ASCII header value".to_string()))?,
            ),
            None => None,
        };
        let content_type = self.registry.resolve(header_value)?;
        if !content_type.is_json() {
            return Err(MuxError::UnsupportedContentType(content_type.header_key().to_string()));
        }

        let (parts, body) = request.into_parts();
        let envelope = EnvelopeContext::from_parts(&parts)?;
        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| MuxError::MalformedBody(format!("failed to read body: {}", e)))?;

        let requests = self.parser.parse(content_type.codec(), &body)?;
        let total = total_request_count(&requests);
        tracing::info!(
            top_level = requests.len(),
            total = total,
            "Processing multiplexed request"
        );

        let start = Instant::now();
        let table = self.scheduler.execute(&requests, &envelope).await;
        tracing::debug!(
            recorded = table.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "All individual requests completed"
        );

        aggregate(table, &content_type)
    }
}

/// Builder for [`MultiplexedRequestHandler`].
pub struct MultiplexerBuilder {
    handler: Arc<dyn RequestHandler>,
    config: MultiplexerConfig,
    registry: ContentTypeRegistry,
    filter: Option<Arc<dyn MultiplexerFilter>>,
}

impl MultiplexerBuilder {
    pub fn config(mut self, config: MultiplexerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(mut self, registry: ContentTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn filter(mut self, filter: Arc<dyn MultiplexerFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn build(self) -> MultiplexedRequestHandler {
        let whitelist = HeaderWhitelist::new(&self.config.header_whitelist);
        let scheduler = Scheduler::new(
            RequestAdapter::new(whitelist),
            self.handler,
            self.filter,
            self.config.max_concurrent_dispatches,
        );

        MultiplexedRequestHandler {
            path: Arc::from(self.config.path.as_str()),
            registry: Arc::new(self.registry),
            parser: RequestTreeParser::new(self.config.max_requests),
            scheduler: Arc::new(scheduler),
            max_body_bytes: self.config.max_body_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::dispatch::{HandlerError, IndividualRequestId};
    use axum::http::StatusCode;
    use futures_util::future::{BoxFuture, FutureExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    impl RequestHandler for CountingHandler {
        fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>, HandlerError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = request
                .extensions()
                .get::<IndividualRequestId>()
                .map(|id| id.as_str().to_string())
                .unwrap_or_default();
            async move { Ok(Response::new(Body::from(format!("{{\"id\": \"{}\"}}", id)))) }.boxed()
        }
    }

    fn multiplexer(max_requests: usize) -> (MultiplexedRequestHandler, Arc<AtomicUsize>) {
        let handler = CountingHandler::default();
        let calls = handler.calls.clone();
        let config = MultiplexerConfig {
            max_requests,
            ..MultiplexerConfig::default()
        };
        let mux = MultiplexedRequestHandler::builder(Arc::new(handler))
            .config(config)
            .build();
        (mux, calls)
    }

    fn envelope(method: Method, content_type: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri("/mux");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_method_checked_first() {
        let (mux, calls) = multiplexer(10);
        let err = mux
            .handle_request(envelope(Method::GET, Some("text/plain"), "garbage"))
            .await
            .unwrap_err();
        assert!(matches!(err, MuxError::MethodNotAllowed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_content_type_defaults_to_json() {
        let (mux, calls) = multiplexer(10);
        let response = mux
            .handle_request(envelope(Method::POST, None, r#"{"a": {"relativeUrl": "/a"}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_registered_non_json_type_rejected() {
        let handler = CountingHandler::default();
        let mut registry = ContentTypeRegistry::default();
        registry.register("application/x-other", Arc::new(JsonCodec));
        let mux = MultiplexedRequestHandler::builder(Arc::new(handler))
            .registry(registry)
            .build();

        let err = mux
            .handle_request(envelope(
                Method::POST,
                Some("application/x-other"),
                r#"{"a": {"relativeUrl": "/a"}}"#,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_too_many_requests_never_dispatches() {
        let (mux, calls) = multiplexer(2);
        let body = r#"{"a": {"relativeUrl": "/a", "dependentRequests": {
            "b": {"relativeUrl": "/b"}, "c": {"relativeUrl": "/c"}
        }}}"#;
        let err = mux
            .handle_request(envelope(Method::POST, Some("application/json"), body))
            .await
            .unwrap_err();
        assert!(matches!(err, MuxError::TooManyRequests { max: 2, received: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_is_multiplexed_request() {
        let (mux, _) = multiplexer(1);
        assert!(mux.is_multiplexed_request(&Request::get("/mux").body(()).unwrap()));
        assert!(!mux.is_multiplexed_request(&Request::get("/mux/extra").body(()).unwrap()));
    }
}
