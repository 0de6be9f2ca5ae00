// HTTP handlers
// Each device endpoint maps to exactly one contract invocation.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{ErrorResponse, IntoResponse},
    Json,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::error::{BodyRejection, ContractFailure, GatewayError};
use crate::metrics::METRICS;
use crate::models::{DeviceRequest, HealthResponse};
use crate::AppState;

impl AppState {
    fn failure(&self, endpoint: &'static str, error: device_ledger::Error) -> ContractFailure {
        METRICS
            .contract_failures_total
            .with_label_values(&[endpoint, error.kind().as_str()])
            .inc();
        warn!(endpoint, kind = %error.kind(), "Transaction failed: {}", error);

        ContractFailure {
            error,
            legacy_status: self.legacy_error_status,
        }
    }

    // A body sent without a JSON content type reads as an empty request
    fn device_request(
        &self,
        endpoint: &'static str,
        body: Result<Json<DeviceRequest>, JsonRejection>,
    ) -> Result<DeviceRequest, BodyRejection> {
        match body {
            Ok(Json(request)) => Ok(request),
            Err(JsonRejection::MissingJsonContentType(_)) => Ok(DeviceRequest::default()),
            Err(rejection) => {
                METRICS
                    .contract_failures_total
                    .with_label_values(&[endpoint, "invalid_body"])
                    .inc();
                warn!(endpoint, "Rejected request body: {}", rejection.body_text());

                Err(BodyRejection {
                    rejection,
                    legacy_status: self.legacy_error_status,
                })
            }
        }
    }
}

// POST /register - submit RegisterDevice
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<DeviceRequest>, JsonRejection>,
) -> Result<&'static str, ErrorResponse> {
    let _guard = METRICS.track_request("register");
    let body = state.device_request("register", body)?;
    info!(device_id = %body.esp32id, "--> Submit Transaction: RegisterDevice");

    state
        .ledger
        .register_device(&body.esp32id, &body.status)
        .await
        .map_err(|e| state.failure("register", e))?;

    Ok("Device Registered")
}

// POST /update - submit UpdateDevice
pub async fn update(
    State(state): State<AppState>,
    body: Result<Json<DeviceRequest>, JsonRejection>,
) -> Result<&'static str, ErrorResponse> {
    let _guard = METRICS.track_request("update");
    let body = state.device_request("update", body)?;
    info!(device_id = %body.esp32id, "--> Submit Transaction: UpdateDevice");

    state
        .ledger
        .update_device(&body.esp32id, &body.status)
        .await
        .map_err(|e| state.failure("update", e))?;

    Ok("Device Status Updated")
}

// POST /auth - evaluate AuthenticateDevice
pub async fn auth(
    State(state): State<AppState>,
    body: Result<Json<DeviceRequest>, JsonRejection>,
) -> Result<&'static str, ErrorResponse> {
    let _guard = METRICS.track_request("auth");
    let body = state.device_request("auth", body)?;
    info!(device_id = %body.esp32id, "--> Evaluate Transaction: AuthenticateDevice");

    state
        .ledger
        .authenticate_device(&body.esp32id)
        .await
        .map_err(|e| state.failure("auth", e))?;

    Ok("Device Authenticated")
}

// GET /getall - evaluate ListAllDevices
pub async fn get_all(State(state): State<AppState>) -> Result<impl IntoResponse, ErrorResponse> {
    let _guard = METRICS.track_request("getall");
    info!("--> Evaluate Transaction: ListAllDevices");

    let devices = state
        .ledger
        .list_all_devices_raw()
        .await
        .map_err(|e| state.failure("getall", e))?;

    Ok(([(header::CONTENT_TYPE, "application/json")], devices))
}

// POST /delete - submit DeleteDevice
pub async fn delete(
    State(state): State<AppState>,
    body: Result<Json<DeviceRequest>, JsonRejection>,
) -> Result<&'static str, ErrorResponse> {
    let _guard = METRICS.track_request("delete");
    let body = state.device_request("delete", body)?;
    info!(device_id = %body.esp32id, "--> Submit Transaction: DeleteDevice");

    state
        .ledger
        .delete_device(&body.esp32id)
        .await
        .map_err(|e| state.failure("delete", e))?;

    Ok("Device Deleted")
}

// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ledger = state.ledger.clone();
    let state_digest = match tokio::task::spawn_blocking(move || ledger.state_digest()).await {
        Ok(Ok(digest)) => Some(digest),
        Ok(Err(e)) => {
            warn!("World state unreadable: {}", e);
            None
        }
        Err(e) => {
            warn!("Digest task failed: {}", e);
            None
        }
    };

    Json(HealthResponse {
        status: if state_digest.is_some() { "healthy" } else { "degraded" },
        service: "device-gateway",
        version: env!("CARGO_PKG_VERSION"),
        ledger_backend: state.ledger.config().backend,
        state_digest,
        timestamp: Utc::now(),
    })
}

// Prometheus metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, GatewayError> {
    METRICS
        .export(&[state.ledger.metrics().registry()])
        .map_err(|e| GatewayError::Internal(format!("Failed to export metrics: {}", e)))
}
