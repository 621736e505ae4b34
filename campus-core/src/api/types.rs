//! Wire shapes shared by the REST calls.

use crate::error::{ApiError, Result};
use crate::resource::{EnrollmentStatus, RecordId};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accepts a plain array or a paginated `{"results": [...]}` object.
pub fn normalize_collection(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(ApiError::Serialization(serde_json::Error::custom(
                "`results` is not a list",
            ))),
        },
        Value::Null => Ok(Vec::new()),
        _ => Err(ApiError::Serialization(serde_json::Error::custom(
            "expected a list of records",
        ))),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateEnrollmentRequest<'a> {
    pub status: EnrollmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkGradeRequest<'a, T: Serialize> {
    pub module_id: RecordId,
    pub academic_year: &'a str,
    pub grades: &'a [T],
}

/// Grade values arrive as JSON numbers or as decimal strings ("12.50").
pub mod decimal {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_f64(*v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        match raw {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid decimal {:?}", s))),
            Some(other) => Err(serde::de::Error::custom(format!("invalid decimal {}", other))),
        }
    }
}
