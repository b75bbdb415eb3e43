//! Uniform success/error result wrapper.
//!
//! Every data-accessing operation (the direct query endpoint, every AI tool)
//! returns this shape. A failure always carries an `error` string and no
//! payload fields the caller should trust.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result envelope: `{success: true, ...payload}` or `{success: false, error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(flatten, skip_serializing_if = "Map::is_empty", default)]
    pub payload: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl Envelope {
    /// Success envelope from a JSON object payload.
    ///
    /// A non-object value is wrapped under a `data` key so the envelope
    /// always flattens into a JSON object.
    pub fn ok(payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".into(), other);
                map
            }
        };
        Self {
            success: true,
            payload,
            error: None,
        }
    }

    /// Success envelope with no payload.
    pub fn empty() -> Self {
        Self {
            success: true,
            payload: Map::new(),
            error: None,
        }
    }

    /// Failure envelope with an error message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: Map::new(),
            error: Some(message.into()),
        }
    }

    /// Look up a payload field by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

impl From<crate::error::Error> for Envelope {
    fn from(err: crate::error::Error) -> Self {
        Self::failure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_flattens_object_payload() {
        let env = Envelope::ok(json!({"rows": [1, 2], "row_count": 2}));
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["row_count"], json!(2));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_ok_wraps_non_object_payload() {
        let env = Envelope::ok(json!("Query OK. Rows affected: 3"));
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["data"], json!("Query OK. Rows affected: 3"));
    }

    #[test]
    fn test_failure_carries_error() {
        let env = Envelope::failure("boom");
        assert!(!env.success);
        assert_eq!(env.error.as_deref(), Some("boom"));
        assert!(env.payload.is_empty());
    }

    #[test]
    fn test_roundtrip() {
        let env = Envelope::ok(json!({"tables": ["users"]}));
        let text = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&text).unwrap();
        assert!(back.success);
        assert_eq!(back.get("tables"), Some(&json!(["users"])));
    }
}
