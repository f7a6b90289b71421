//! Upstream forwarding handler.
//!
//! # Responsibilities
//! - Rewrite the request target to the configured upstream authority
//! - Forward through a pooled hyper client
//! - Enforce a per-request deadline covering headers and body
//!
//! # Design Decisions
//! - Path and query of the synthetic request are preserved as-is
//! - Responses are buffered before the deadline expires, so a stalled body
//!   surfaces as `Timeout` instead of hanging the caller
//! - Connection errors map to `Unavailable`, deadline expiry to `Timeout`

use std::str::FromStr;
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, InvalidUri, Scheme};
use axum::http::{Request, Response, Uri};
use futures_util::future::{BoxFuture, FutureExt};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::UpstreamConfig;
use crate::dispatch::{HandlerError, RequestHandler};

/// Largest upstream response body buffered per request.
const MAX_UPSTREAM_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Forwards every request to a single upstream HTTP server.
#[derive(Clone)]
pub struct UpstreamHandler {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    timeout: Duration,
}

impl UpstreamHandler {
    /// Create a handler for the configured upstream.
    pub fn new(config: &UpstreamConfig) -> Result<Self, InvalidUri> {
        let authority = Authority::from_str(&config.address)?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            authority,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    fn rewrite_uri(&self, uri: &Uri) -> Result<Uri, HandlerError> {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some("/".parse().map_err(|e: InvalidUri| HandlerError::Internal(e.to_string()))?);
        }
        Uri::from_parts(parts).map_err(|e| HandlerError::Internal(e.to_string()))
    }
}

impl RequestHandler for UpstreamHandler {
    fn handle(&self, mut request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>, HandlerError>> {
        let client = self.client.clone();
        let timeout = self.timeout;
        let rewritten = self.rewrite_uri(request.uri());

        async move {
            *request.uri_mut() = rewritten?;

            tracing::debug!(
                method = %request.method(),
                uri = %request.uri(),
                "Forwarding to upstream"
            );

            match tokio::time::timeout(timeout, fetch(client, request)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Upstream request timed out");
                    Err(HandlerError::Timeout(timeout))
                }
            }
        }
        .boxed()
    }
}

/// Send the request and read the whole response body.
async fn fetch(
    client: Client<HttpConnector, Body>,
    request: Request<Body>,
) -> Result<Response<Body>, HandlerError> {
    let response = client.request(request).await.map_err(|e| {
        tracing::warn!(error = %e, "Upstream request failed");
        HandlerError::Unavailable(e.to_string())
    })?;
    buffer_response(response).await
}

async fn buffer_response(response: Response<Incoming>) -> Result<Response<Body>, HandlerError> {
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(Body::new(body), MAX_UPSTREAM_BODY_BYTES)
        .await
        .map_err(|e| HandlerError::Unavailable(format!("failed to read upstream body: {}", e)))?;
    Ok(Response::from_parts(parts, Body::from(bytes)))
}
