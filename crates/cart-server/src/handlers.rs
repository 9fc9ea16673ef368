//! HTTP Handlers

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use cart_checkout::{CheckoutRequest, CheckoutSession, PaymentError};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.sessions.is_some(),
    })
}

/// Create a checkout session for the posted cart items
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutSession>, ApiError> {
    let sessions = state.sessions.as_ref().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Payments not configured",
            "PAYMENTS_DISABLED",
        )
    })?;

    payload.validate().map_err(|e| {
        tracing::debug!(error = %e, "Rejected checkout request");
        api_error(StatusCode::BAD_REQUEST, e.to_string(), "INVALID_REQUEST")
    })?;

    let request = payload.with_default_urls(&state.config.success_url(), &state.config.cancel_url());

    let session = sessions.create_session(&request).await.map_err(|e| {
        tracing::error!(mode = %request.mode, error = %e, "Checkout error");
        match e {
            PaymentError::InvalidRequest(_) => {
                api_error(StatusCode::BAD_REQUEST, e.to_string(), "INVALID_REQUEST")
            }
            _ => api_error(StatusCode::BAD_GATEWAY, e.user_message(), "CHECKOUT_ERROR"),
        }
    })?;

    tracing::info!(
        session_id = %session.session_id,
        mode = %request.mode,
        items = request.items.len(),
        "Checkout session created"
    );

    Ok(Json(session))
}
