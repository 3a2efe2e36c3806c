use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Statement rejected by database: {message}")]
    Raised { message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// Transient failures that a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DatabaseError::Unavailable(_))
    }

    /// Classifies a non-success PostgREST response.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<PostgrestError> = serde_json::from_str(body).ok();
        let code = parsed.as_ref().and_then(|e| e.code.clone()).unwrap_or_default();
        let message = parsed
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| body.to_string());

        if code == "23505" || (status == 409 && code.is_empty()) {
            return DatabaseError::UniqueViolation {
                constraint: constraint_name(&message).unwrap_or_else(|| message.clone()),
            };
        }
        if code == "P0001" {
            return DatabaseError::Raised { message };
        }

        match status {
            401 | 403 => DatabaseError::Auth(message),
            404 => DatabaseError::NotFound(message),
            408 | 429 | 500..=599 => DatabaseError::Unavailable(format!("{}: {}", status, message)),
            _ => DatabaseError::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for DatabaseError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            DatabaseError::Decode(error.to_string())
        } else {
            DatabaseError::Unavailable(error.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

/// Pulls `name` out of `duplicate key value violates unique constraint "name"`.
fn constraint_name(message: &str) -> Option<String> {
    let start = message.find('"')? + 1;
    let end = start + message[start..].find('"')?;
    Some(message[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_unique_violation_is_classified() {
        let body = r#"{"code":"23505","details":"Key exists.","hint":null,"message":"duplicate key value violates unique constraint \"appointments_provider_slot_key\""}"#;

        assert_matches!(
            DatabaseError::from_response(409, body),
            DatabaseError::UniqueViolation { constraint } if constraint == "appointments_provider_slot_key"
        );
    }

    #[test]
    fn test_raised_exception_is_classified() {
        let body = r#"{"code":"P0001","details":null,"hint":null,"message":"provider_unavailable"}"#;

        assert_matches!(
            DatabaseError::from_response(400, body),
            DatabaseError::Raised { message } if message == "provider_unavailable"
        );
    }

    #[test]
    fn test_gateway_errors_are_retryable() {
        let error = DatabaseError::from_response(503, "upstream down");
        assert!(error.is_retryable());
        assert!(!DatabaseError::from_response(400, "bad filter").is_retryable());
    }
}
