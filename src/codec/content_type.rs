//! Content-Type negotiation.
//!
//! # Responsibilities
//! - Parse `type/subtype[; params]` header values
//! - Map the lowercased base media type to a registered codec
//! - Default to JSON when no header is present

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::codec::{DataCodec, JsonCodec};

/// Header value for the structured-object codec.
pub const APPLICATION_JSON: &str = "application/json";

/// Errors from resolving a Content-Type header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentTypeError {
    /// The header value is not a valid media type.
    #[error("invalid content type `{0}`")]
    Invalid(String),

    /// The media type parsed but has no registered codec.
    #[error("unsupported content type `{0}`")]
    Unsupported(String),
}

/// A supported content type and the codec that handles it.
#[derive(Debug, Clone)]
pub struct ContentType {
    header_key: String,
    codec: Arc<dyn DataCodec>,
}

impl ContentType {
    fn new(header_key: impl Into<String>, codec: Arc<dyn DataCodec>) -> Self {
        Self {
            header_key: header_key.into().to_ascii_lowercase(),
            codec,
        }
    }

    /// The JSON content type.
    pub fn json() -> Self {
        Self::new(APPLICATION_JSON, Arc::new(JsonCodec))
    }

    /// Lowercased base media type, e.g. `application/json`.
    pub fn header_key(&self) -> &str {
        &self.header_key
    }

    pub fn codec(&self) -> &dyn DataCodec {
        self.codec.as_ref()
    }

    /// Whether this is the structured-object (JSON) type.
    pub fn is_json(&self) -> bool {
        self.header_key == APPLICATION_JSON
    }
}

/// Registry of supported content types, keyed by base media type.
#[derive(Debug, Clone)]
pub struct ContentTypeRegistry {
    types: HashMap<String, ContentType>,
}

impl Default for ContentTypeRegistry {
    fn default() -> Self {
        let mut types = HashMap::new();
        let json = ContentType::json();
        types.insert(json.header_key.clone(), json);
        Self { types }
    }
}

impl ContentTypeRegistry {
    /// Register a codec for a header key. Re-registering a key replaces its codec.
    pub fn register(&mut self, header_key: &str, codec: Arc<dyn DataCodec>) -> ContentType {
        let content_type = ContentType::new(header_key, codec);
        self.types
            .insert(content_type.header_key.clone(), content_type.clone());
        content_type
    }

    /// Resolve a Content-Type header value to a registered content type.
    pub fn resolve(&self, header_value: Option<&str>) -> Result<ContentType, ContentTypeError> {
        let Some(value) = header_value else {
            return Ok(ContentType::json());
        };

        let base = parse_base_type(value).ok_or_else(|| ContentTypeError::Invalid(value.to_string()))?;
        self.types
            .get(&base)
            .cloned()
            .ok_or(ContentTypeError::Unsupported(base))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Extract the lowercased `type/subtype` from a media type header value.
///
/// Returns `None` when the value is not a syntactically valid media type.
pub fn parse_base_type(value: &str) -> Option<String> {
    let mut segments = value.split(';');
    let base = segments.next()?.trim();

    let (primary, sub) = base.split_once('/')?;
    if !is_token(primary) || !is_token(sub) {
        return None;
    }

    for param in segments {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        let (name, _) = param.split_once('=')?;
        if !is_token(name.trim()) {
            return None;
        }
    }

    Some(format!("{}/{}", primary, sub).to_ascii_lowercase())
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(b, b'!' | b'#' | b'$' | b'&' | b'^' | b'_' | b'.' | b'+' | b'-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_header_defaults_to_json() {
        let registry = ContentTypeRegistry::default();
        assert!(registry.resolve(None).unwrap().is_json());
    }

    #[test]
    fn test_parameters_and_case_ignored() {
        let registry = ContentTypeRegistry::default();
        let ct = registry.resolve(Some("Application/JSON; charset=utf-8")).unwrap();
        assert!(ct.is_json());
        assert_eq!(ct.header_key(), "application/json");
    }

    #[test]
    fn test_unregistered_type() {
        let registry = ContentTypeRegistry::default();
        let err = registry.resolve(Some("text/plain")).unwrap_err();
        assert_eq!(err, ContentTypeError::Unsupported("text/plain".into()));
    }

    #[test]
    fn test_unparsable_type() {
        let registry = ContentTypeRegistry::default();
        for value in ["", "json", "application/", "/json", "application/json; charset"] {
            assert!(
                matches!(registry.resolve(Some(value)), Err(ContentTypeError::Invalid(_))),
                "{value:?} should be rejected"
            );
        }
    }

    /// Codec that wraps every decoded value with a fixed tag.
    #[derive(Debug)]
    struct TaggingCodec(&'static str);

    impl DataCodec for TaggingCodec {
        fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, crate::codec::CodecError> {
            let inner = JsonCodec.decode(bytes)?;
            Ok(serde_json::json!({ "tag": self.0, "value": inner }))
        }

        fn encode(&self, value: &serde_json::Value) -> Result<Vec<u8>, crate::codec::CodecError> {
            JsonCodec.encode(value)
        }
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ContentTypeRegistry::default();
        registry.register("application/x-custom", Arc::new(TaggingCodec("first")));
        registry.register("APPLICATION/X-CUSTOM", Arc::new(TaggingCodec("second")));
        assert_eq!(registry.len(), 2);

        let ct = registry.resolve(Some("application/x-custom")).unwrap();
        assert!(!ct.is_json());
        let decoded = ct.codec().decode(b"1").unwrap();
        assert_eq!(decoded, serde_json::json!({"tag": "second", "value": 1}));
    }
}
