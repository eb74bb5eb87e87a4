//! Normalized result envelope returned by every gateway operation.
//!
//! The enum makes success/error exclusivity structural; the wire `success`
//! boolean only exists in the serialized form:
//!
//! ```json
//! { "success": true,  "data": ..., "from_cache": false, "timestamp": "..." }
//! { "success": false, "error": { "kind": "...", "message": "...", "details": ... }, "timestamp": "..." }
//! ```

use crate::error::{ApiError, ErrorKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::ser::SerializeMap as _;
use serde_json::{Value, json};

/// Outcome of one gateway operation.
#[derive(Debug, Clone)]
pub enum Envelope {
    Success {
        data: Value,
        from_cache: bool,
        timestamp: DateTime<Utc>,
    },
    Failure {
        error: ErrorBody,
        timestamp: DateTime<Utc>,
    },
}

/// Error payload of a failure envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    /// Structured context (HTTP status, offending path); `null` on the wire
    /// when absent.
    pub details: Option<Value>,
}

impl Envelope {
    #[must_use]
    pub fn success(data: Value, from_cache: bool) -> Self {
        Self::Success {
            data,
            from_cache,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn failure(err: &ApiError) -> Self {
        Self::Failure {
            error: ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
                details: err.wire_details(),
            },
            timestamp: Utc::now(),
        }
    }

    /// Failure envelope with the offending path merged into the details.
    #[must_use]
    pub fn failure_for(err: &ApiError, path: &str) -> Self {
        let details = match err.wire_details() {
            Some(Value::Object(mut map)) => {
                map.insert("path".to_string(), json!(path));
                Some(Value::Object(map))
            }
            _ => Some(json!({ "path": path })),
        };
        Self::Failure {
            error: ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
                details,
            },
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn from_cache(&self) -> bool {
        matches!(
            self,
            Self::Success {
                from_cache: true,
                ..
            }
        )
    }
}

impl Serialize for Envelope {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Success {
                data,
                from_cache,
                timestamp,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
                map.serialize_entry("from_cache", from_cache)?;
                map.serialize_entry("timestamp", &timestamp.to_rfc3339())?;
                map.end()
            }
            Self::Failure { error, timestamp } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.serialize_entry("timestamp", &timestamp.to_rfc3339())?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_wire_shape() {
        let env = Envelope::success(json!({"name": "Alice"}), true);
        let v = serde_json::to_value(&env).expect("serializes");

        assert_eq!(v["success"], json!(true));
        assert_eq!(v["data"], json!({"name": "Alice"}));
        assert_eq!(v["from_cache"], json!(true));
        assert!(v["timestamp"].is_string());
        assert!(v.get("error").is_none());
    }

    #[test]
    fn failure_wire_shape() {
        let err = ApiError::from_status(404, "no such user");
        let env = Envelope::failure_for(&err, "/users/999");
        let v = serde_json::to_value(&env).expect("serializes");

        assert_eq!(v["success"], json!(false));
        assert_eq!(v["error"]["kind"], json!("NOT_FOUND"));
        assert_eq!(v["error"]["message"], json!("resource not found: no such user"));
        assert_eq!(v["error"]["details"]["status"], json!(404));
        assert_eq!(v["error"]["details"]["path"], json!("/users/999"));
        assert!(v["timestamp"].is_string());
        assert!(v.get("data").is_none());
    }

    #[test]
    fn details_serialize_as_null_when_absent() {
        let env = Envelope::failure(&ApiError::Timeout("slow upstream".into()));
        let v = serde_json::to_value(&env).expect("serializes");
        assert_eq!(v["error"]["kind"], json!("TIMEOUT"));
        assert_eq!(v["error"]["details"], Value::Null);
    }

    #[test]
    fn exactly_one_of_data_and_error_is_populated() {
        let envelopes = [
            Envelope::success(json!(1), false),
            Envelope::failure(&ApiError::Network("down".into())),
        ];
        for env in &envelopes {
            let v = serde_json::to_value(env).expect("serializes");
            let obj = v.as_object().expect("object");
            assert_ne!(obj.contains_key("data"), obj.contains_key("error"));
        }
    }

    #[test]
    fn timestamps_are_iso8601() {
        let env = Envelope::success(json!(null), false);
        let v = serde_json::to_value(&env).expect("serializes");
        let ts = v["timestamp"].as_str().expect("string");
        DateTime::parse_from_rfc3339(ts).expect("rfc3339 timestamp");
    }
}
