//! Request tree parsing and structural validation.
//!
//! # Responsibilities
//! - Decode the envelope body into a tree of individual requests
//! - Count requests across every nesting level and enforce the limit
//! - Reject ids that appear more than once anywhere in the tree
//!
//! # Design Decisions
//! - All-or-nothing: any structural problem fails the whole envelope
//! - Checks run before scheduling, so nothing is dispatched on failure

use std::collections::HashSet;

use crate::codec::DataCodec;
use crate::multiplexer::error::MuxError;
use crate::multiplexer::types::IndividualRequestMap;

/// Parses envelope bodies into validated request trees.
#[derive(Debug, Clone)]
pub struct RequestTreeParser {
    max_requests: usize,
}

impl RequestTreeParser {
    pub fn new(max_requests: usize) -> Self {
        Self { max_requests }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Decode and validate a request tree.
    pub fn parse(&self, codec: &dyn DataCodec, body: &[u8]) -> Result<IndividualRequestMap, MuxError> {
        let value = codec
            .decode(body)
            .map_err(|e| MuxError::MalformedBody(e.to_string()))?;
        let requests: IndividualRequestMap =
            serde_json::from_value(value).map_err(|e| MuxError::MalformedBody(e.to_string()))?;

        let total = total_request_count(&requests);
        if total == 0 {
            return Err(MuxError::EmptyRequestSet);
        }
        if total > self.max_requests {
            return Err(MuxError::TooManyRequests {
                max: self.max_requests,
                received: total,
            });
        }

        check_unique_ids(&requests, &mut HashSet::with_capacity(total))?;
        Ok(requests)
    }
}

/// Number of requests in the tree, counting every nesting level.
pub fn total_request_count(requests: &IndividualRequestMap) -> usize {
    requests.len()
        + requests
            .values()
            .map(|r| total_request_count(&r.dependent_requests))
            .sum::<usize>()
}

fn check_unique_ids<'a>(
    requests: &'a IndividualRequestMap,
    seen: &mut HashSet<&'a str>,
) -> Result<(), MuxError> {
    for (id, request) in requests {
        if !seen.insert(id.as_str()) {
            return Err(MuxError::MalformedBody(format!(
                "duplicate individual request id `{}`",
                id
            )));
        }
        check_unique_ids(&request.dependent_requests, seen)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;

    fn parse(max: usize, body: &str) -> Result<IndividualRequestMap, MuxError> {
        RequestTreeParser::new(max).parse(&JsonCodec, body.as_bytes())
    }

    #[test]
    fn test_parse_tree() {
        let requests = parse(
            10,
            r#"{
                "a": {"method": "GET", "relativeUrl": "/a"},
                "b": {"relativeUrl": "/b", "dependentRequests": {
                    "c": {"relativeUrl": "/c"}
                }}
            }"#,
        )
        .unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(total_request_count(&requests), 3);
    }

    #[test]
    fn test_empty_request_set() {
        assert!(matches!(parse(10, "{}"), Err(MuxError::EmptyRequestSet)));
    }

    #[test]
    fn test_nested_requests_count_toward_limit() {
        let body = r#"{"a": {"relativeUrl": "/a", "dependentRequests": {
            "b": {"relativeUrl": "/b", "dependentRequests": {"c": {"relativeUrl": "/c"}}}
        }}}"#;
        assert!(matches!(
            parse(2, body),
            Err(MuxError::TooManyRequests { max: 2, received: 3 })
        ));
        assert!(parse(3, body).is_ok());
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(parse(10, "{"), Err(MuxError::MalformedBody(_))));
        assert!(matches!(parse(10, "[]"), Err(MuxError::MalformedBody(_))));
        assert!(matches!(parse(10, r#"{"a": {"method": "GET"}}"#), Err(MuxError::MalformedBody(_))));
    }

    #[test]
    fn test_duplicate_ids_across_levels() {
        let body = r#"{
            "a": {"relativeUrl": "/a", "dependentRequests": {"b": {"relativeUrl": "/b"}}},
            "b": {"relativeUrl": "/b"}
        }"#;
        let err = parse(10, body).unwrap_err();
        assert!(err.to_string().contains("duplicate individual request id `b`"));
    }
}
