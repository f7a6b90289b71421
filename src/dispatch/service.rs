//! Adapter from a tower `Service` to a `RequestHandler`.

use std::fmt::Display;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::{BoxFuture, FutureExt};
use tower::{Service, ServiceExt};

use crate::dispatch::{HandlerError, RequestHandler};

/// Dispatches requests to an in-process service such as an `axum::Router`.
#[derive(Debug, Clone)]
pub struct ServiceHandler<S> {
    service: S,
}

impl<S> ServiceHandler<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S> RequestHandler for ServiceHandler<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Error: Display,
{
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>, HandlerError>> {
        let service = self.service.clone();
        async move {
            service
                .oneshot(request)
                .await
                .map_err(|e| HandlerError::Internal(e.to_string()))
        }
        .boxed()
    }
}
