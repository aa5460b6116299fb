//! Canonical byte encodings.
//!
//! Reports are signed over RFC 8785 (JCS) canonical JSON so the signature is independent
//! of key order and whitespace chosen by the producer.

use serde_json::Value;

use crate::constants::SIGNATURE_FIELD;
use crate::error::{CoreError, Result};

/// Canonical bytes of `document` with the `signature` member removed.
pub fn signing_payload(document: &Value) -> Result<Vec<u8>> {
    let mut unsigned = document.clone();
    if let Some(map) = unsigned.as_object_mut() {
        map.remove(SIGNATURE_FIELD);
    }
    serde_jcs::to_vec(&unsigned).map_err(|e| CoreError::Canonicalization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signing_payload_ignores_signature_and_key_order() {
        let a = json!({ "b": 1, "a": { "y": 2, "x": 1 }, "signature": "abc" });
        let b = json!({ "a": { "x": 1, "y": 2 }, "b": 1 });

        let pa = signing_payload(&a).unwrap();
        let pb = signing_payload(&b).unwrap();
        assert_eq!(pa, pb);
        assert_eq!(pa, br#"{"a":{"x":1,"y":2},"b":1}"#.to_vec());
    }

    #[test]
    fn test_signing_payload_changes_with_content() {
        let a = json!({ "factors": { "overall": { "trustPercent": 0.85 } } });
        let b = json!({ "factors": { "overall": { "trustPercent": 0.95 } } });
        assert_ne!(signing_payload(&a).unwrap(), signing_payload(&b).unwrap());
    }
}
