//! Assembly of the envelope response.

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::{Response, StatusCode};

use crate::codec::ContentType;
use crate::multiplexer::error::MuxError;
use crate::multiplexer::results::ExecutionResultTable;
use crate::multiplexer::types::MultiplexedResponseContent;

/// Encode all recorded responses into one `200 OK` envelope response.
///
/// Individual failures are already inside the body; merged cookies become
/// `Set-Cookie` headers.
pub fn aggregate(table: ExecutionResultTable, content_type: &ContentType) -> Result<Response<Body>, MuxError> {
    let (responses, cookies) = table.into_parts();
    let content = MultiplexedResponseContent { responses };

    let value = serde_json::to_value(&content).map_err(|e| MuxError::Aggregation(e.to_string()))?;
    let bytes = content_type
        .codec()
        .encode(&value)
        .map_err(|e| MuxError::Aggregation(e.to_string()))?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type.header_key()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    for cookie in cookies.into_cookies() {
        match HeaderValue::from_str(cookie.as_header()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(_) => {
                tracing::warn!(cookie = cookie.name(), "Dropping cookie with invalid header value");
            }
        }
    }

    Ok(response)
}
