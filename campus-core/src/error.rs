use serde_json::Value;
use thiserror::Error;

/// Fallback text when a failed response carries no readable message.
pub const GENERIC_FAILURE: &str = "The request could not be completed.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{field}: {message}")]
    Validation { field: String, message: String },
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Not authenticated")]
    NotAuthenticated,
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Builds the error for a non-2xx response from its status and raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        match parsed.as_ref().and_then(first_error_message) {
            Some(ErrorMessage::Field { field, message }) => ApiError::Validation { field, message },
            Some(ErrorMessage::General(message)) => ApiError::Server { status, message },
            None => ApiError::Server {
                status,
                message: format!("Request failed with status {}", status),
            },
        }
    }

    /// The text surfaced to the user, verbatim from the server when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation { message, .. } | ApiError::Server { message, .. } => {
                if message.trim().is_empty() {
                    GENERIC_FAILURE.to_string()
                } else {
                    message.clone()
                }
            }
            ApiError::Network(e) => format!("Network error: {}", e),
            ApiError::Serialization(_) => "Unexpected response from the server.".to_string(),
            ApiError::NotAuthenticated => "You must log in first.".to_string(),
        }
    }

    /// Field name of a server-side validation failure.
    pub fn field(&self) -> Option<&str> {
        match self {
            ApiError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Validation { .. } => Some(400),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::NotAuthenticated) || self.status() == Some(401)
    }
}

/// Draft and submission failures of a resource form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("{value} is not an option for {field}")]
    InvalidChoice { field: String, value: String },
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
    #[error("A submission is already in flight")]
    SubmissionInFlight,
    #[error("{0} records are read-only")]
    ReadOnly(&'static str),
    #[error("No record with id {0}")]
    NotFound(i64),
    #[error("No form is open")]
    NotOpen,
    #[error("{0}")]
    Rejected(String),
}

/// Grade entry and bulk-save failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradeError {
    #[error("Grade {0} is outside 0-20")]
    OutOfRange(f64),
    #[error("{0:?} is not a grade")]
    NotANumber(String),
    #[error("Unknown grade field: {0}")]
    UnknownField(String),
    #[error("Student {0} is not on this sheet")]
    UnknownStudent(i64),
    #[error("Grades are already being saved")]
    SaveInFlight,
    #[error("The grade sheet is not loaded")]
    NotLoaded,
    #[error("{0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored session is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Login failed: {}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("Not logged in")]
    LoggedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorMessage {
    Field { field: String, message: String },
    General(String),
}

/// Picks the first readable message out of an error body.
///
/// Order: `non_field_errors`, then the first field carrying a message list,
/// then `detail`. A bare list of strings counts as a general message.
pub fn first_error_message(body: &Value) -> Option<ErrorMessage> {
    match body {
        Value::Object(map) => {
            if let Some(message) = map.get("non_field_errors").and_then(first_string) {
                return Some(ErrorMessage::Field {
                    field: "non_field_errors".to_string(),
                    message,
                });
            }
            for (field, value) in map {
                if field == "detail" {
                    continue;
                }
                if let Value::Array(_) = value {
                    if let Some(message) = first_string(value) {
                        return Some(ErrorMessage::Field {
                            field: field.clone(),
                            message,
                        });
                    }
                }
            }
            map.get("detail").and_then(first_string).map(ErrorMessage::General)
        }
        Value::Array(_) => first_string(body).map(ErrorMessage::General),
        Value::String(s) if !s.trim().is_empty() => Some(ErrorMessage::General(s.clone())),
        _ => None,
    }
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_is_a_general_message() {
        let err = ApiError::from_response(403, r#"{"detail": "Permission denied."}"#);
        assert_eq!(err.user_message(), "Permission denied.");
        assert_eq!(err.status(), Some(403));
        assert!(err.field().is_none());
    }

    #[test]
    fn field_errors_win_over_detail() {
        let body = json!({"detail": "Invalid", "code": ["department with this code already exists."]});
        assert_eq!(
            first_error_message(&body),
            Some(ErrorMessage::Field {
                field: "code".into(),
                message: "department with this code already exists.".into()
            })
        );
    }

    #[test]
    fn non_field_errors_come_first() {
        let body = r#"{"filiere": ["This field is required."], "non_field_errors": ["Already applied."]}"#;
        let err = ApiError::from_response(400, body);
        assert_eq!(err.field(), Some("non_field_errors"));
        assert_eq!(err.user_message(), "Already applied.");
    }

    #[test]
    fn unreadable_body_falls_back_to_status() {
        let err = ApiError::from_response(502, "<html>Bad gateway</html>");
        assert_eq!(err.user_message(), "Request failed with status 502");
    }
}
