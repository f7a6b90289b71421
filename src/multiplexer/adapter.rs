//! Conversion of individual requests into standalone synthetic requests.
//!
//! # Responsibilities
//! - Inherit whitelisted envelope headers the individual request does not set
//! - Resolve the relative URL against the envelope URL
//! - Build an `http::Request` the single-request handler can serve on its own
//!
//! # Design Decisions
//! - The whitelist is case-insensitive (header names are normalised)
//! - Entity headers of the envelope (length, type, encoding) are never inherited
//! - The parsed tree is never mutated; adaptation works on copies
//! - A relative URL may not change the envelope's origin

use std::collections::HashSet;

use axum::body::Body;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{request, HeaderMap, Method, Request, Uri};
use url::Url;

use crate::codec::APPLICATION_JSON;
use crate::dispatch::IndividualRequestId;
use crate::multiplexer::error::{BranchError, MuxError};
use crate::multiplexer::types::{HeaderField, IndividualRequest, IndividualRequestMap};

const NON_INHERITABLE: [HeaderName; 3] = [
    header::CONTENT_LENGTH,
    header::CONTENT_TYPE,
    header::TRANSFER_ENCODING,
];

/// Case-insensitive set of header names.
#[derive(Debug, Clone, Default)]
pub struct HeaderWhitelist {
    names: HashSet<HeaderName>,
}

impl HeaderWhitelist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .filter_map(|name| match HeaderName::from_bytes(name.as_ref().as_bytes()) {
                Ok(name) => Some(name),
                Err(_) => {
                    tracing::warn!(header = name.as_ref(), "Ignoring invalid whitelisted header name");
                    None
                }
            })
            .collect();
        Self { names }
    }

    pub fn allows(&self, name: &HeaderName) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Read-only view of the envelope request shared by every synthetic request.
#[derive(Debug, Clone)]
pub struct EnvelopeContext {
    base_url: Url,
    headers: HeaderMap,
}

impl EnvelopeContext {
    /// Capture the envelope URL and headers.
    ///
    /// The authority comes from the request URI when absolute, else from `Host`.
    pub fn from_parts(parts: &request::Parts) -> Result<Self, MuxError> {
        let scheme = parts.uri.scheme_str().unwrap_or("http");
        let authority = parts
            .uri
            .authority()
            .map(|a| a.as_str())
            .or_else(|| parts.headers.get(header::HOST).and_then(|h| h.to_str().ok()))
            .unwrap_or("localhost");

        let base_url = Url::parse(&format!("{}://{}{}", scheme, authority, parts.uri.path()))
            .map_err(|e| MuxError::InvalidEnvelope(e.to_string()))?;

        Ok(Self {
            base_url,
            headers: parts.headers.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Builds synthetic requests from individual requests.
#[derive(Debug, Clone, Default)]
pub struct RequestAdapter {
    whitelist: HeaderWhitelist,
}

impl RequestAdapter {
    pub fn new(whitelist: HeaderWhitelist) -> Self {
        Self { whitelist }
    }

    pub fn whitelist(&self) -> &HeaderWhitelist {
        &self.whitelist
    }

    /// Copy of `request` with inheritable envelope headers added.
    ///
    /// Headers already set on the individual request win. Dependents are not copied.
    pub fn inherit_envelope(&self, request: &IndividualRequest, envelope: &EnvelopeContext) -> IndividualRequest {
        let mut headers = request.headers.clone();

        for name in envelope.headers.keys() {
            if NON_INHERITABLE.contains(name)
                || !self.whitelist.allows(name)
                || request.has_header(name.as_str())
            {
                continue;
            }

            let mut values: Vec<String> = envelope
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_string)
                .collect();
            let field = match values.len() {
                0 => continue,
                1 => HeaderField::Single(values.remove(0)),
                _ => HeaderField::Multiple(values),
            };
            headers.insert(name.as_str().to_string(), field);
        }

        IndividualRequest {
            method: request.method.clone(),
            relative_url: request.relative_url.clone(),
            headers,
            body: request.body.clone(),
            dependent_requests: IndividualRequestMap::new(),
        }
    }

    /// Build the standalone request dispatched to the handler.
    pub fn to_synthetic(
        &self,
        id: &str,
        request: &IndividualRequest,
        envelope: &EnvelopeContext,
    ) -> Result<Request<Body>, BranchError> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| BranchError::InvalidRequest(format!("invalid method `{}`", request.method)))?;

        let uri = resolve_target(envelope.base_url(), &request.relative_url)?;

        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            for (name, field) in &request.headers {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| BranchError::InvalidRequest(format!("invalid header name `{}`", name)))?;
                for value in field.values() {
                    let value = HeaderValue::from_str(value).map_err(|_| {
                        BranchError::InvalidRequest(format!("invalid value for header `{}`", name))
                    })?;
                    headers.append(name.clone(), value);
                }
            }

            let structured_body = matches!(request.body, Some(ref v) if !v.is_string());
            if structured_body && !headers.contains_key(header::CONTENT_TYPE) {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
            }
        }

        builder
            .extension(IndividualRequestId(id.to_string()))
            .body(Body::from(request.body_bytes()))
            .map_err(|e| BranchError::InvalidRequest(e.to_string()))
    }
}

fn resolve_target(base: &Url, relative_url: &str) -> Result<Uri, BranchError> {
    let target = base
        .join(relative_url)
        .map_err(|e| BranchError::InvalidRequest(format!("invalid relative URL `{}`: {}", relative_url, e)))?;

    if target.origin() != base.origin() {
        return Err(BranchError::InvalidRequest(format!(
            "relative URL `{}` leaves the envelope origin",
            relative_url
        )));
    }

    target
        .as_str()
        .parse()
        .map_err(|_| BranchError::InvalidRequest(format!("invalid relative URL `{}`", relative_url)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(headers: &[(&str, &str)]) -> EnvelopeContext {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mux")
            .header("host", "api.example.com")
            .header("content-type", "application/json");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        EnvelopeContext::from_parts(&parts).unwrap()
    }

    fn adapter(whitelist: &[&str]) -> RequestAdapter {
        RequestAdapter::new(HeaderWhitelist::new(whitelist.iter().copied()))
    }

    #[test]
    fn test_base_url_from_host() {
        let envelope = envelope(&[]);
        assert_eq!(envelope.base_url().as_str(), "http://api.example.com/mux");
    }

    #[test]
    fn test_inherits_only_whitelisted_headers() {
        let envelope = envelope(&[("authorization", "Bearer t"), ("x-secret", "s")]);
        let adapter = adapter(&["Authorization"]);

        let adapted = adapter.inherit_envelope(&IndividualRequest::new("GET", "/a"), &envelope);
        assert_eq!(adapted.headers.get("authorization"), Some(&HeaderField::Single("Bearer t".into())));
        assert!(!adapted.has_header("x-secret"));
        assert!(!adapted.has_header("content-type"));
    }

    #[test]
    fn test_own_headers_win_case_insensitively() {
        let envelope = envelope(&[("authorization", "Bearer envelope")]);
        let adapter = adapter(&["authorization"]);
        let request = IndividualRequest::new("GET", "/a").with_header("Authorization", "Bearer own");

        let adapted = adapter.inherit_envelope(&request, &envelope);
        assert_eq!(adapted.headers.len(), 1);
        assert_eq!(adapted.headers["Authorization"], HeaderField::Single("Bearer own".into()));
    }

    #[test]
    fn test_entity_headers_never_inherited() {
        let envelope = envelope(&[("content-length", "42")]);
        let adapter = adapter(&["content-type", "content-length"]);

        let adapted = adapter.inherit_envelope(&IndividualRequest::new("GET", "/a"), &envelope);
        assert!(adapted.headers.is_empty());
    }

    #[test]
    fn test_inherit_does_not_touch_original() {
        let envelope = envelope(&[("x-tenant", "t1")]);
        let adapter = adapter(&["x-tenant"]);
        let original = IndividualRequest::new("GET", "/a")
            .with_dependent("b", IndividualRequest::new("GET", "/b"));
        let snapshot = original.clone();

        let adapted = adapter.inherit_envelope(&original, &envelope);
        assert_eq!(original, snapshot);
        assert!(adapted.dependent_requests.is_empty());
        assert!(adapted.has_header("x-tenant"));
    }

    #[test]
    fn test_synthetic_request() {
        let envelope = envelope(&[]);
        let request = IndividualRequest::new("put", "/greetings/1?fields=msg")
            .with_header("X-Many", "a")
            .with_body(json!({"msg": "hi"}));

        let synthetic = adapter(&[]).to_synthetic("g1", &request, &envelope).unwrap();
        assert_eq!(synthetic.method(), Method::PUT);
        assert_eq!(synthetic.uri().to_string(), "http://api.example.com/greetings/1?fields=msg");
        assert_eq!(synthetic.headers()["content-type"], APPLICATION_JSON);
        assert_eq!(
            synthetic.extensions().get::<IndividualRequestId>(),
            Some(&IndividualRequestId("g1".into()))
        );
    }

    #[test]
    fn test_multi_valued_headers_repeat() {
        let mut request = IndividualRequest::new("GET", "/a");
        request
            .headers
            .insert("x-many".into(), HeaderField::Multiple(vec!["a".into(), "b".into()]));

        let synthetic = adapter(&[]).to_synthetic("a", &request, &envelope(&[])).unwrap();
        let values: Vec<_> = synthetic.headers().get_all("x-many").iter().collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_requests() {
        let envelope = envelope(&[]);
        let adapter = adapter(&[]);

        let bad_method = IndividualRequest::new("GE T", "/a");
        assert!(matches!(
            adapter.to_synthetic("a", &bad_method, &envelope),
            Err(BranchError::InvalidRequest(_))
        ));

        let other_origin = IndividualRequest::new("GET", "http://elsewhere.example.com/a");
        assert!(matches!(
            adapter.to_synthetic("a", &other_origin, &envelope),
            Err(BranchError::InvalidRequest(_))
        ));

        let bad_header = IndividualRequest::new("GET", "/a").with_header("bad header", "x");
        assert!(matches!(
            adapter.to_synthetic("a", &bad_header, &envelope),
            Err(BranchError::InvalidRequest(_))
        ));
    }
}
