//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the multiplexer and passthrough handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::MuxConfig;
use crate::dispatch::RequestHandler;
use crate::http::request::RequestIdExt;
use crate::lifecycle::shutdown::wait_for_shutdown;
use crate::multiplexer::types::ErrorBody;
use crate::multiplexer::{MultiplexedRequestHandler, MuxError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub multiplexer: MultiplexedRequestHandler,
    pub handler: Arc<dyn RequestHandler>,
}

/// HTTP server exposing the multiplexer and the single-request handler.
pub struct HttpServer {
    router: Router,
    config: MuxConfig,
}

impl HttpServer {
    /// Create a server whose multiplexer uses the default registry and no filter.
    pub fn new(config: MuxConfig, handler: Arc<dyn RequestHandler>) -> Self {
        let multiplexer = MultiplexedRequestHandler::builder(handler.clone())
            .config(config.multiplexer.clone())
            .build();
        Self::with_multiplexer(config, multiplexer, handler)
    }

    /// Create a server around a preconfigured multiplexer.
    pub fn with_multiplexer(
        config: MuxConfig,
        multiplexer: MultiplexedRequestHandler,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        let state = AppState {
            multiplexer,
            handler,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &MuxConfig, state: AppState) -> Router {
        let mux_path = state.multiplexer.path().to_string();
        Router::new()
            .route(&mux_path, any(mux_handler))
            .fallback(passthrough_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving in-process (e.g. with `tower::ServiceExt::oneshot`).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mux_path = %self.config.multiplexer.path,
            max_requests = self.config.multiplexer.max_requests,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }
}

/// Multiplexer endpoint. Accepts every method so non-POST gets 405 from the multiplexer.
async fn mux_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, MuxError> {
    let request_id = request.request_id().to_string();
    tracing::debug!(request_id = %request_id, method = %request.method(), "Multiplexed request received");

    state.multiplexer.handle_request(request).await
}

/// Every other path is served directly by the single-request handler.
async fn passthrough_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Response {
    let request_id = request.request_id().to_string();
    let path = request.uri().path().to_string();

    match state.handler.handle(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Request handling failed");
            let status = e.status();
            error_response(status, e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    let body = ErrorBody {
        status: status.as_u16(),
        message,
    };
    (status, Json(body)).into_response()
}
