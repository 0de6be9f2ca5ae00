// Error handling
//
// Contract failures are relayed as plain text carrying the contract's message.
// In legacy mode the status is always 200, matching what existing device
// firmware expects; otherwise the status reflects the failure kind.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use device_ledger::ErrorKind;

/// A contract failure on its way back to the client
#[derive(Debug)]
pub struct ContractFailure {
    pub error: device_ledger::Error,
    pub legacy_status: bool,
}

impl ContractFailure {
    pub fn status(&self) -> StatusCode {
        if self.legacy_status {
            return StatusCode::OK;
        }
        match self.error.kind() {
            ErrorKind::AlreadyExists => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Blacklisted => StatusCode::FORBIDDEN,
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::ReadOnly | ErrorKind::Decode | ErrorKind::Infrastructure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ContractFailure {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.error.to_string(),
        )
            .into_response()
    }
}

/// A request body that could not be read as a device request
#[derive(Debug)]
pub struct BodyRejection {
    pub rejection: JsonRejection,
    pub legacy_status: bool,
}

impl BodyRejection {
    pub fn status(&self) -> StatusCode {
        if self.legacy_status {
            StatusCode::OK
        } else {
            self.rejection.status()
        }
    }
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.rejection.body_text(),
        )
            .into_response()
    }
}

/// Failures of the gateway itself (never contract failures)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": self.to_string(),
                "timestamp": Utc::now(),
            })),
        )
            .into_response()
    }
}
