/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/v1/register` - Register a new principal
/// - `POST /api/v1/login` - Exchange email and password for a token
/// - `GET /api/v1/get-token` - Exchange basic-auth credentials for a token

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use bookvault_shared::{
    auth::{authenticator::Credentials, jwt::Claims, middleware::CurrentPrincipal},
    models::principal::PrincipalView,
};
use serde::{Deserialize, Serialize};

/// Token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed bearer token
    pub token: String,
}

/// Register a new principal
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/register
/// Content-Type: application/json
///
/// {
///   "email": "a@x.com",
///   "password": "password123"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the principal (never the secret digest):
///
/// ```json
/// {
///   "id": 1700000000000000,
///   "email": "a@x.com",
///   "created_at": "...",
///   "updated_at": "..."
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or validation failed
/// - `409 Conflict`: Email already exists
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PrincipalView>)> {
    let Json(credentials) = body?;

    let principal = state.authenticator.register(credentials).await?;

    Ok((StatusCode::CREATED, Json(PrincipalView::from(principal))))
}

/// Login with email and password
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/login
/// Content-Type: application/json
///
/// {
///   "email": "a@x.com",
///   "password": "password123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body
/// - `401 Unauthorized`: Unknown email or wrong password (same response for both)
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(credentials) = body?;

    let token = state.authenticator.login(credentials).await?;

    Ok(Json(TokenResponse { token }))
}

/// Issue a token for the principal admitted by the basic gate
///
/// With authentication disabled the caller is the anonymous principal, so
/// this hands out an anonymous token without asking for credentials.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/get-token
/// Authorization: Basic base64(email:password)
/// ```
///
/// # Errors
///
/// - `401 Unauthorized` with `WWW-Authenticate: Basic realm="Restricted"`
pub async fn get_token(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> ApiResult<Json<TokenResponse>> {
    let claims = Claims::new(principal.user_id, principal.email.clone());
    let token = state.codec.issue_default(&claims)?;

    tracing::info!(principal_id = principal.user_id, "Token issued");
    Ok(Json(TokenResponse { token }))
}
