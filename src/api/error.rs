//! Classification of service failures

use serde::Deserialize;
use thiserror::Error;

/// Failure of a call to the storefront API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server could not be reached at all
    #[error("server unreachable: {0}")]
    ServerDown(String),

    /// The server answered with a non-success status
    #[error("request rejected with status {status}")]
    Rejected {
        status: u16,
        custom_message: Option<String>,
    },

    /// The response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    message: Option<String>,
    custom_message: Option<String>,
}

impl ApiError {
    pub fn is_server_down(&self) -> bool {
        matches!(self, ApiError::ServerDown(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human readable text for notifications
    pub fn user_message(&self) -> String {
        match self {
            ApiError::ServerDown(_) => "Server is unreachable. Please try again later.".to_string(),
            ApiError::Decode(_) => "Unexpected response from server".to_string(),
            ApiError::Rejected {
                custom_message: Some(message),
                ..
            } => message.clone(),
            ApiError::Rejected { status, .. } => match status {
                400 => "Bad request".to_string(),
                401 => "Unauthorized".to_string(),
                403 => "Forbidden".to_string(),
                404 => "Not found".to_string(),
                409 => "Conflict".to_string(),
                422 => "Invalid data".to_string(),
                500..=599 => "Server error".to_string(),
                other => format!("Request failed (status {other})"),
            },
        }
    }

    /// Classify a non-success response using its body
    pub fn from_response(status: u16, body: &str) -> Self {
        let custom_message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.custom_message.or(b.message))
            .filter(|m| !m.trim().is_empty());
        ApiError::Rejected {
            status,
            custom_message,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::Rejected {
                status: status.as_u16(),
                custom_message: None,
            }
        } else {
            ApiError::ServerDown(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_down_flag() {
        let err = ApiError::ServerDown("connection refused".into());
        assert!(err.is_server_down());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_rejected_uses_body_message() {
        let err = ApiError::from_response(400, r#"{"message":"SKU already exists"}"#);
        assert!(!err.is_server_down());
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.user_message(), "SKU already exists");
    }

    #[test]
    fn test_custom_message_preferred() {
        let err = ApiError::from_response(
            422,
            r#"{"message":"Validation failed","customMessage":"Price too high"}"#,
        );
        assert_eq!(err.user_message(), "Price too high");
    }

    #[test]
    fn test_status_defaults_without_body() {
        assert_eq!(ApiError::from_response(400, "").user_message(), "Bad request");
        assert_eq!(ApiError::from_response(401, "oops").user_message(), "Unauthorized");
        assert_eq!(ApiError::from_response(404, "{}").user_message(), "Not found");
        assert_eq!(ApiError::from_response(503, "").user_message(), "Server error");
        assert_eq!(
            ApiError::from_response(418, "").user_message(),
            "Request failed (status 418)"
        );
    }

    #[test]
    fn test_blank_message_falls_back() {
        let err = ApiError::from_response(400, r#"{"message":"  "}"#);
        assert_eq!(err.user_message(), "Bad request");
    }
}
