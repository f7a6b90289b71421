//! Wire model for multiplexed requests and responses.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{header, response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Individual requests keyed by id.
pub type IndividualRequestMap = BTreeMap<String, IndividualRequest>;

/// Individual responses keyed by request id.
pub type IndividualResponseMap = BTreeMap<String, IndividualResponse>;

/// One logical request inside a multiplexed envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualRequest {
    #[serde(default = "default_method")]
    pub method: String,

    /// Resource path (and query) relative to the envelope URL.
    pub relative_url: String,

    #[serde(default)]
    pub headers: BTreeMap<String, HeaderField>,

    /// String bodies are sent verbatim; other values are sent JSON-encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Requests that run only after this one has been recorded.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependent_requests: IndividualRequestMap,
}

fn default_method() -> String {
    "GET".to_string()
}

impl IndividualRequest {
    pub fn new(method: impl Into<String>, relative_url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            relative_url: relative_url.into(),
            headers: BTreeMap::new(),
            body: None,
            dependent_requests: IndividualRequestMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), HeaderField::Single(value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_dependent(mut self, id: impl Into<String>, request: IndividualRequest) -> Self {
        self.dependent_requests.insert(id.into(), request);
        self
    }

    /// Whether a header is set on this request, ignoring case.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.keys().any(|k| k.eq_ignore_ascii_case(name))
    }

    /// Body bytes as they go on the wire.
    pub fn body_bytes(&self) -> Bytes {
        match &self.body {
            None => Bytes::new(),
            Some(Value::String(s)) => Bytes::from(s.clone()),
            Some(value) => Bytes::from(value.to_string()),
        }
    }
}

/// A header carried as one value or as a list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderField {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderField {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        match self {
            HeaderField::Single(v) => std::slice::from_ref(v),
            HeaderField::Multiple(v) => v.as_slice(),
        }
        .iter()
        .map(String::as_str)
    }
}

/// The outcome of one individual request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualResponse {
    pub status: u16,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl IndividualResponse {
    /// Build from handler response parts and the fully read body.
    ///
    /// `Set-Cookie` headers are not kept here; see [`IndividualResponseWithCookies`].
    pub fn from_parts(parts: &response::Parts, body: &[u8]) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in parts.headers.iter() {
            if name == header::SET_COOKIE {
                continue;
            }
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        Self {
            status: parts.status.as_u16(),
            headers,
            body: decode_body(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn decode_body(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(body).into_owned())),
    }
}

/// An individual response plus the raw `Set-Cookie` values it emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct IndividualResponseWithCookies {
    pub response: IndividualResponse,
    pub cookies: Vec<String>,
}

impl IndividualResponseWithCookies {
    pub fn from_parts(parts: &response::Parts, body: &[u8]) -> Self {
        let cookies = parts
            .headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        Self {
            response: IndividualResponse::from_parts(parts, body),
            cookies,
        }
    }
}

/// Body of the aggregated envelope response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiplexedResponseContent {
    pub responses: IndividualResponseMap,
}

/// Error payload used for envelope errors and failed individual requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}
