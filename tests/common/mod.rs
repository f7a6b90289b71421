//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use futures_util::future::{BoxFuture, FutureExt};
use request_mux::dispatch::{HandlerError, IndividualRequestId, RequestHandler};

/// Canned behaviour for one individual request id.
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub cookies: Vec<String>,
    pub delay: Duration,
    pub fail: bool,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            cookies: Vec::new(),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok("")
        }
    }

    #[allow(dead_code)]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[allow(dead_code)]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[allow(dead_code)]
    pub fn cookie(mut self, cookie: &str) -> Self {
        self.cookies.push(cookie.to_string());
        self
    }
}

/// What the handler saw for one dispatch.
#[derive(Clone, Debug)]
pub struct Dispatch {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Default)]
struct Journal {
    calls: HashMap<String, usize>,
    dispatches: HashMap<String, Dispatch>,
}

/// Handler that answers from a script and records every dispatch.
///
/// Requests are identified by their individual request id, or by path for
/// plain requests. Unscripted ids answer `200 {"id": <id>}`.
#[derive(Clone, Default)]
pub struct ScriptedHandler {
    replies: Arc<HashMap<String, Reply>>,
    journal: Arc<Mutex<Journal>>,
}

impl ScriptedHandler {
    pub fn new(replies: Vec<(&str, Reply)>) -> Self {
        Self {
            replies: Arc::new(replies.into_iter().map(|(id, r)| (id.to_string(), r)).collect()),
            journal: Arc::default(),
        }
    }

    pub fn calls(&self, id: &str) -> usize {
        self.journal.lock().unwrap().calls.get(id).copied().unwrap_or(0)
    }

    #[allow(dead_code)]
    pub fn total_calls(&self) -> usize {
        self.journal.lock().unwrap().calls.values().sum()
    }

    /// Whether the handler ran to completion for `id`.
    #[allow(dead_code)]
    pub fn completed(&self, id: &str) -> bool {
        self.journal.lock().unwrap().dispatches.contains_key(id)
    }

    #[allow(dead_code)]
    pub fn dispatch(&self, id: &str) -> Dispatch {
        self.journal
            .lock()
            .unwrap()
            .dispatches
            .get(id)
            .cloned()
            .unwrap_or_else(|| panic!("`{}` was never dispatched", id))
    }
}

impl RequestHandler for ScriptedHandler {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>, HandlerError>> {
        let id = request
            .extensions()
            .get::<IndividualRequestId>()
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());
        let reply = self
            .replies
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Reply::ok(&format!("{{\"id\": \"{}\"}}", id)));
        let journal = self.journal.clone();
        let started = Instant::now();
        *journal.lock().unwrap().calls.entry(id.clone()).or_default() += 1;

        async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
            tokio::time::sleep(reply.delay).await;

            journal.lock().unwrap().dispatches.insert(
                id.clone(),
                Dispatch {
                    method: parts.method,
                    uri: parts.uri,
                    headers: parts.headers,
                    body,
                    started,
                    finished: Instant::now(),
                },
            );

            if reply.fail {
                return Err(HandlerError::Internal(format!("{} exploded", id)));
            }

            let mut response = Response::builder()
                .status(StatusCode::from_u16(reply.status).unwrap())
                .header("content-type", "application/json");
            for cookie in &reply.cookies {
                response = response.header("set-cookie", cookie.as_str());
            }
            Ok(response.body(Body::from(reply.body)).unwrap())
        }
        .boxed()
    }
}

/// Two dispatch windows overlap in time.
#[allow(dead_code)]
pub fn overlaps(a: &Dispatch, b: &Dispatch) -> bool {
    a.started < b.finished && b.started < a.finished
}
