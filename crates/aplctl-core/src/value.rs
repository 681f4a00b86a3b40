//! Typed view of loosely-typed engine outputs

use crate::error::HookError;
use serde_json::{Map, Value};

/// An output that must be a non-empty string or a non-empty object
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Text(String),
    Object(Map<String, Value>),
}

impl OutputValue {
    pub fn decode(key: &str, value: &Value) -> Result<Self, HookError> {
        let invalid = |reason: &str| HookError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        match value {
            Value::String(s) if s.is_empty() => Err(invalid("string type variable has zero value")),
            Value::String(s) => Ok(OutputValue::Text(s.clone())),
            Value::Object(m) if m.is_empty() => Err(invalid("object type variable has zero value")),
            Value::Object(m) => Ok(OutputValue::Object(m.clone())),
            _ => Err(invalid("wants a string or an object")),
        }
    }

    pub fn into_text(self, key: &str) -> Result<String, HookError> {
        match self {
            OutputValue::Text(s) => Ok(s),
            OutputValue::Object(_) => Err(HookError::InvalidValue {
                key: key.to_string(),
                reason: "wants a string, got an object".to_string(),
            }),
        }
    }

    pub fn into_object(self, key: &str) -> Result<Map<String, Value>, HookError> {
        match self {
            OutputValue::Object(m) => Ok(m),
            OutputValue::Text(_) => Err(HookError::InvalidValue {
                key: key.to_string(),
                reason: "wants an object, got a string".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode() {
        assert_eq!(
            OutputValue::decode("k", &json!("123")).unwrap(),
            OutputValue::Text("123".into())
        );
        assert!(matches!(
            OutputValue::decode("k", &json!({"a": 1})).unwrap(),
            OutputValue::Object(_)
        ));

        for bad in [json!(""), json!({}), json!(12), json!(null), json!([1])] {
            assert!(matches!(
                OutputValue::decode("k", &bad),
                Err(HookError::InvalidValue { .. })
            ));
        }
    }

    #[test]
    fn test_into_wrong_variant() {
        let text = OutputValue::Text("x".into());
        assert!(text.clone().into_object("k").is_err());
        assert_eq!(text.into_text("k").unwrap(), "x");
    }
}
