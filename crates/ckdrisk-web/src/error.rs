use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ckdrisk_core::RecordError;
use ckdrisk_model::ModelError;
use thiserror::Error;
use tracing::{error, warn};

/// Shown in place of the real message for server-side failures.
const INTERNAL_MESSAGE: &str = "prediction failed, please try again later";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{field} must be {expected}, got '{value}'")]
    Malformed {
        field: &'static str,
        expected: &'static str,
        value: String,
    },

    /// Body could not be extracted at all (wrong content type, missing field).
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Malformed { .. }
            | Self::Rejected(_)
            | Self::Record(_)
            | Self::Model(ModelError::Encode(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Message safe to show the caller.
    pub fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            INTERNAL_MESSAGE.to_string()
        }
    }

    fn kind(&self) -> &'static str {
        if self.is_client_error() {
            "invalid_input"
        } else {
            "internal_error"
        }
    }

    /// Record the failure at the level it deserves.
    pub fn log(&self) {
        if self.is_client_error() {
            warn!(error = %self, "rejected prediction request");
        } else {
            error!(error = %self, "prediction request failed");
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let body = serde_json::json!({
            "error": {
                "message": self.public_message(),
                "type": self.kind(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}
