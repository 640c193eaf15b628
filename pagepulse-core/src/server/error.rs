//! Ingest endpoint outcomes and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;

pub const SUCCESS_MESSAGE: &str = "Tracking data received successfully.";
pub const ACCEPTED_MESSAGE: &str = "Tracking data accepted for relay.";

/// JSON body returned by the ingest endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    /// `success`, `accepted` or `error`
    pub status: String,
    pub message: String,
}

impl IngestResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn accepted() -> Self {
        Self {
            status: "accepted".to_string(),
            message: ACCEPTED_MESSAGE.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Reasons an ingest request does not end in a successful relay.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The caller holds a login session
    #[error("Logged-in users are not tracked.")]
    Authenticated,

    /// Body is not a JSON object, or a required field is missing or empty
    #[error("Invalid tracking data: missing essential fields.")]
    InvalidPayload,

    /// The reported user agent looks automated
    #[error("Bot detected.")]
    Bot,

    /// The collector could not be reached or rejected the event
    #[error("{}", relay_message(.0))]
    Relay(Error),
}

fn relay_message(err: &Error) -> String {
    match err {
        Error::RelayStatus { status, .. } => {
            format!("External API returned non-success status. HTTP {}", status)
        }
        Error::Relay(reason) => reason.clone(),
        other => other.to_string(),
    }
}

impl IngestError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Authenticated | Self::Bot => StatusCode::FORBIDDEN,
            Self::InvalidPayload => StatusCode::BAD_REQUEST,
            Self::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(IngestResponse::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            IngestError::Authenticated.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            IngestError::InvalidPayload.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(IngestError::Bot.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            IngestError::Relay(Error::Relay("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_relay_messages() {
        let status = IngestError::Relay(Error::RelayStatus {
            status: 503,
            body: "maintenance".into(),
        });
        assert_eq!(
            status.to_string(),
            "External API returned non-success status. HTTP 503"
        );

        let transport = IngestError::Relay(Error::Relay("request timed out: deadline".into()));
        assert_eq!(transport.to_string(), "request timed out: deadline");
    }

    #[test]
    fn test_error_response_status() {
        let response = IngestError::Bot.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = IngestError::Relay(Error::Relay("down".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
