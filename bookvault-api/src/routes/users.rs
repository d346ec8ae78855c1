/// Principal management endpoints
///
/// All routes sit behind the bearer gate. Any authenticated caller may read
/// any principal; only the principal itself may update or delete its record.
///
/// # Endpoints
///
/// - `GET /api/v1/users/me` - The calling principal
/// - `GET /api/v1/users/:id` - Any principal by id
/// - `PUT /api/v1/users/:id` - Replace own email and optionally password
/// - `DELETE /api/v1/users/:id` - Delete own record and books

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use bookvault_shared::{
    auth::{authenticator::CredentialUpdate, middleware::CurrentPrincipal},
    models::principal::PrincipalView,
    store::StoreError,
};

fn principal_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    let Path(id) = path?;
    if id <= 0 {
        return Err(ApiError::BadRequest("User id must be a positive integer".to_string()));
    }
    Ok(id)
}

fn require_self(caller: &CurrentPrincipal, id: i64) -> ApiResult<()> {
    if caller.user_id != id {
        tracing::debug!(
            caller = caller.user_id,
            target = id,
            "Rejected modification of another principal"
        );
        return Err(ApiError::Forbidden(
            "Cannot modify another user's account".to_string(),
        ));
    }
    Ok(())
}

fn not_found(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("User not found".to_string()),
        other => other.into(),
    }
}

/// The calling principal
///
/// # Errors
///
/// - `404 Not Found`: The caller's record no longer exists
pub async fn me(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> ApiResult<Json<PrincipalView>> {
    let record = state
        .principals
        .get_by_id(principal.user_id)
        .await
        .map_err(not_found)?;

    Ok(Json(record.into()))
}

/// A principal by id
///
/// # Errors
///
/// - `400 Bad Request`: Non-numeric or non-positive id
/// - `404 Not Found`: No such principal
pub async fn get_user(
    State(state): State<AppState>,
    _principal: CurrentPrincipal,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PrincipalView>> {
    let id = principal_id(path)?;

    let record = state.principals.get_by_id(id).await.map_err(not_found)?;

    Ok(Json(record.into()))
}

/// Replace the caller's email and, optionally, password
///
/// # Endpoint
///
/// ```text
/// PUT /api/v1/users/:id
/// Content-Type: application/json
///
/// {
///   "email": "new@x.com",
///   "password": "newpassword123"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Bad id, malformed body or validation failed
/// - `403 Forbidden`: `:id` is not the caller
/// - `404 Not Found`: The caller's record no longer exists
/// - `409 Conflict`: The email belongs to another principal
pub async fn update_user(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<CredentialUpdate>, JsonRejection>,
) -> ApiResult<Json<PrincipalView>> {
    let id = principal_id(path)?;
    require_self(&principal, id)?;
    let Json(update) = body?;

    let updated = state.authenticator.update_credentials(id, update).await?;

    Ok(Json(updated.into()))
}

/// Delete the caller's record and all of its books
///
/// # Errors
///
/// - `400 Bad Request`: Bad id
/// - `403 Forbidden`: `:id` is not the caller
/// - `404 Not Found`: The caller's record no longer exists
pub async fn delete_user(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = principal_id(path)?;
    require_self(&principal, id)?;

    state.principals.delete_principal(id).await.map_err(not_found)?;

    tracing::info!(principal_id = id, "Principal deleted");
    Ok(StatusCode::NO_CONTENT)
}
