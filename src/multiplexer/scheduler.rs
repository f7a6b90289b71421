//! Dependency-aware execution of a request tree.
//!
//! # Execution Model
//! ```text
//! siblings:   [a] [b] [c]          ← joined concurrently
//!                  │
//! dependents:     [d] [e]          ← start only after b is recorded
//! ```
//! Each branch runs its own pipeline in sequence:
//! inherit envelope → filter request → build synthetic request → dispatch
//! → convert → filter response → record.
//!
//! # Design Decisions
//! - Branches are futures joined inside the envelope task, not spawned tasks,
//!   so dropping the envelope future cancels every in-flight dispatch
//! - A failed branch records an error response and its whole subtree is
//!   recorded as `AncestorFailed` without being dispatched
//! - Dispatch concurrency is bounded by a semaphore held only across the
//!   handler call

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::Semaphore;

use crate::dispatch::{HandlerError, RequestHandler};
use crate::multiplexer::adapter::{EnvelopeContext, RequestAdapter};
use crate::multiplexer::error::BranchError;
use crate::multiplexer::filter::MultiplexerFilter;
use crate::multiplexer::results::ExecutionResultTable;
use crate::multiplexer::types::{IndividualRequest, IndividualRequestMap, IndividualResponseWithCookies};
use crate::observability::metrics;

/// Largest handler response body buffered per individual request.
const MAX_RESPONSE_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Executes request trees against a single-request handler.
pub struct Scheduler {
    adapter: RequestAdapter,
    handler: Arc<dyn RequestHandler>,
    filter: Option<Arc<dyn MultiplexerFilter>>,
    dispatch_permits: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(
        adapter: RequestAdapter,
        handler: Arc<dyn RequestHandler>,
        filter: Option<Arc<dyn MultiplexerFilter>>,
        max_concurrent_dispatches: usize,
    ) -> Self {
        Self {
            adapter,
            handler,
            filter,
            dispatch_permits: Arc::new(Semaphore::new(
                max_concurrent_dispatches.clamp(1, Semaphore::MAX_PERMITS),
            )),
        }
    }

    /// Run every request in the tree once and collect the results.
    ///
    /// Completes only after every branch at every depth has been recorded.
    pub async fn execute(&self, requests: &IndividualRequestMap, envelope: &EnvelopeContext) -> ExecutionResultTable {
        let table = ExecutionResultTable::new();
        self.run_siblings(requests, envelope, &table).await;
        table
    }

    fn run_siblings<'a>(
        &'a self,
        requests: &'a IndividualRequestMap,
        envelope: &'a EnvelopeContext,
        table: &'a ExecutionResultTable,
    ) -> BoxFuture<'a, ()> {
        let branches: Vec<_> = requests
            .iter()
            .map(|(id, request)| self.run_branch(id, request, envelope, table))
            .collect();

        async move {
            join_all(branches).await;
        }
        .boxed()
    }

    async fn run_branch(
        &self,
        id: &str,
        request: &IndividualRequest,
        envelope: &EnvelopeContext,
        table: &ExecutionResultTable,
    ) {
        let succeeded = self.run_request(id, request, envelope, table).await;
        if request.dependent_requests.is_empty() {
            return;
        }

        if succeeded {
            self.run_siblings(&request.dependent_requests, envelope, table).await;
        } else {
            skip_dependents(id, &request.dependent_requests, table);
        }
    }

    /// Process one request and record its response. Returns whether it succeeded.
    async fn run_request(
        &self,
        id: &str,
        request: &IndividualRequest,
        envelope: &EnvelopeContext,
        table: &ExecutionResultTable,
    ) -> bool {
        let start = Instant::now();
        match self.process(id, request, envelope).await {
            Ok(IndividualResponseWithCookies { response, cookies }) => {
                tracing::debug!(
                    request_id = id,
                    status = response.status,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Individual request completed"
                );
                metrics::record_individual_request("completed");
                table.record(id, response, &cookies);
                true
            }
            Err(err) => {
                tracing::warn!(
                    request_id = id,
                    kind = err.kind(),
                    error = %err,
                    "Individual request failed"
                );
                metrics::record_individual_request(err.kind());
                table.record(id, err.to_individual_response(), &[]);
                false
            }
        }
    }

    async fn process(
        &self,
        id: &str,
        request: &IndividualRequest,
        envelope: &EnvelopeContext,
    ) -> Result<IndividualResponseWithCookies, BranchError> {
        let inherited = self.adapter.inherit_envelope(request, envelope);
        let filtered = match &self.filter {
            Some(filter) => filter.filter_request(inherited)?,
            None => inherited,
        };

        let synthetic = self.adapter.to_synthetic(id, &filtered, envelope)?;
        let converted = self.dispatch(synthetic).await?;

        match &self.filter {
            Some(filter) => Ok(filter.filter_response(converted)?),
            None => Ok(converted),
        }
    }

    async fn dispatch(&self, request: Request<Body>) -> Result<IndividualResponseWithCookies, HandlerError> {
        let _permit = self
            .dispatch_permits
            .acquire()
            .await
            .map_err(|_| HandlerError::Unavailable("dispatcher closed".to_string()))?;

        let response: Response<Body> = self.handler.handle(request).await?;
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, MAX_RESPONSE_BODY_BYTES)
            .await
            .map_err(|e| HandlerError::Internal(format!("failed to read response body: {}", e)))?;

        Ok(IndividualResponseWithCookies::from_parts(&parts, &body))
    }
}

fn skip_dependents(failed_id: &str, dependents: &IndividualRequestMap, table: &ExecutionResultTable) {
    for (id, request) in dependents {
        tracing::debug!(request_id = %id, ancestor = failed_id, "Skipping dependent of failed request");
        metrics::record_individual_request("ancestor_failed");
        let err = BranchError::AncestorFailed(failed_id.to_string());
        table.record(id, err.to_individual_response(), &[]);
        skip_dependents(failed_id, &request.dependent_requests, table);
    }
}
