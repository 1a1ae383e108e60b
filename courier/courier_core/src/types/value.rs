//! Values carried by bindings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::binding::DataType;
use crate::error::BindingError;

/// A value flowing through a binding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum BindingValue {
    /// No value.
    Null,

    /// Text.
    String(String),

    /// Materialized bytes.
    Bytes(Vec<u8>),

    /// Raw octet stream that has not yet been converted to the declared type.
    Stream(Vec<u8>),

    /// Structured document.
    Json(Value),
}

impl BindingValue {
    /// Convert a raw stream into the binding's declared data type.
    ///
    /// Values that are not streams are returned unchanged. Binary and stream
    /// types keep the bytes; text types require valid UTF-8.
    pub fn materialize(self, data_type: DataType, binding: &str) -> Result<Self, BindingError> {
        match self {
            Self::Stream(bytes) if data_type.is_binary() => Ok(Self::Bytes(bytes)),
            Self::Stream(bytes) => String::from_utf8(bytes).map(Self::String).map_err(|e| {
                BindingError::Materialization {
                    name: binding.to_string(),
                    message: e.to_string(),
                }
            }),
            other => Ok(other),
        }
    }

    /// Flat key/value view of the value's structured fields.
    ///
    /// JSON objects yield their top-level fields; text that parses as a JSON
    /// object yields that object's fields. Everything else has no fields.
    pub fn flat_fields(&self) -> Option<Map<String, Value>> {
        match self {
            Self::Json(Value::Object(map)) => Some(map.clone()),
            Self::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            },
            _ => None,
        }
    }

    /// The value as a structured record, if it is one.
    pub fn as_record(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Json(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Whether this is [`BindingValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render as JSON, e.g. for display or binding data.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::String(s) => Value::String(s.clone()),
            Self::Bytes(b) | Self::Stream(b) => Value::from(b.clone()),
            Self::Json(v) => v.clone(),
        }
    }
}

impl From<Value> for BindingValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::String(s) => Self::String(s),
            other => Self::Json(other),
        }
    }
}

impl From<&str> for BindingValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for BindingValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for BindingValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_materialize_stream() {
        let raw = BindingValue::Stream(b"hello".to_vec());
        assert_eq!(
            raw.clone().materialize(DataType::Undefined, "t").unwrap(),
            BindingValue::String("hello".to_string())
        );
        assert_eq!(
            raw.clone().materialize(DataType::Binary, "t").unwrap(),
            BindingValue::Bytes(b"hello".to_vec())
        );
        assert_eq!(
            raw.materialize(DataType::Stream, "t").unwrap(),
            BindingValue::Bytes(b"hello".to_vec())
        );
    }

    #[test]
    fn test_materialize_invalid_utf8() {
        let raw = BindingValue::Stream(vec![0xff, 0xfe]);
        let err = raw.materialize(DataType::String, "blob").unwrap_err();
        assert!(matches!(err, BindingError::Materialization { name, .. } if name == "blob"));
    }

    #[test]
    fn test_materialize_passthrough() {
        let value = BindingValue::Json(json!({ "id": 5 }));
        assert_eq!(
            value.clone().materialize(DataType::Binary, "t").unwrap(),
            value
        );
    }

    #[test]
    fn test_flat_fields() {
        let record = BindingValue::Json(json!({ "id": 5, "name": "x" }));
        let fields = record.flat_fields().unwrap();
        assert_eq!(fields.get("id"), Some(&json!(5)));

        let text = BindingValue::from(r#"{"id": 7}"#);
        assert_eq!(text.flat_fields().unwrap().get("id"), Some(&json!(7)));

        assert!(BindingValue::from("plain text").flat_fields().is_none());
        assert!(BindingValue::Json(json!([1, 2])).flat_fields().is_none());
        assert!(BindingValue::Bytes(vec![1]).flat_fields().is_none());
    }

    #[test]
    fn test_from_json_value() {
        assert_eq!(BindingValue::from(json!("s")), BindingValue::String("s".into()));
        assert_eq!(BindingValue::from(Value::Null), BindingValue::Null);
        assert_eq!(BindingValue::from(json!(1)), BindingValue::Json(json!(1)));
    }
}
