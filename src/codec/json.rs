//! JSON codec.

use serde_json::Value;

use crate::codec::{CodecError, DataCodec};

/// Structured-object codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl DataCodec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_object() {
        let value = JsonCodec.decode(br#"{"a": {"method": "GET"}}"#).unwrap();
        assert_eq!(value, json!({"a": {"method": "GET"}}));
    }

    #[test]
    fn test_decode_garbage() {
        let err = JsonCodec.decode(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
