/// Health check endpoint
///
/// Reports whether the server is running and whether the configured store
/// answers a ping.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "store": { "backend": "postgres", "connected": true }
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the store does not answer
    pub status: String,

    /// Application version
    pub version: String,

    /// Store status
    pub store: StoreHealth,
}

/// Backend name and reachability
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreHealth {
    pub backend: String,
    pub connected: bool,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match state.principals.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store ping failed");
            false
        }
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: StoreHealth {
            backend: state.principals.backend().to_string(),
            connected,
        },
    })
}
