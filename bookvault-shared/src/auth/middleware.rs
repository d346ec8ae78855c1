/// Request gates for Axum
///
/// Two gates compose in front of handlers:
///
/// - [`bearer_gate`]: requires `Authorization: Bearer <token>` and verifies the
///   token with the process [`TokenCodec`]
/// - [`basic_gate`]: requires HTTP basic credentials and checks them through
///   the [`Authenticator`]; used only in front of the token-issuance endpoint
///
/// On success both gates insert an [`AuthContext`] into the request extensions.
/// Handlers read it back through the [`CurrentPrincipal`] extractor or
/// [`current_principal_id`]. Rejected requests never reach the handler.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Router};
/// use bookvault_shared::auth::jwt::{default_ttl, TokenCodec};
/// use bookvault_shared::auth::middleware::{bearer_gate, CurrentPrincipal};
///
/// async fn me(principal: CurrentPrincipal) -> String {
///     format!("Hello, principal {}!", principal.user_id)
/// }
///
/// let codec = Arc::new(TokenCodec::new("your-secret-key-at-least-32-bytes!!", default_ttl()));
/// let app: Router = Router::new()
///     .route("/me", get(me))
///     .route_layer(middleware::from_fn_with_state(codec, bearer_gate));
/// ```

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, Extensions, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use tracing::{debug, error};

use super::{
    authenticator::{AuthError, Authenticator},
    jwt::{TokenCodec, TokenError},
};

/// Challenge sent with every basic-gate rejection
pub const BASIC_CHALLENGE: &str = "Basic realm=\"Restricted\"";

/// Identity resolved for the in-flight request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub email: Option<String>,
}

/// Id of the principal admitted by a gate, if any
pub fn current_principal_id(extensions: &Extensions) -> Option<i64> {
    extensions.get::<AuthContext>().map(|ctx| ctx.user_id)
}

/// Error type for the gates and the identity extractor
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Authorization header must use the Bearer scheme")]
    MalformedHeader,

    #[error("Invalid or expired token")]
    InvalidToken(TokenError),

    #[error("Basic credentials required")]
    MissingBasic,

    #[error("Invalid email or password")]
    BadBasic,

    /// A handler asked for an identity on a route no gate admitted
    #[error("Not authenticated")]
    NoIdentity,

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            GateError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            _ => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };

        let body = Json(json!({
            "error": error,
            "message": self.to_string(),
        }));

        let mut response = (status, body).into_response();
        if matches!(self, GateError::MissingBasic | GateError::BadBasic) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_CHALLENGE),
            );
        }
        response
    }
}

/// Typed access to the [`AuthContext`] a gate attached
///
/// Rejects with 401 when no gate ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentPrincipal(pub AuthContext);

impl std::ops::Deref for CurrentPrincipal {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or(GateError::NoIdentity)
    }
}

/// Extracts the token from a raw `Authorization` value
///
/// The scheme prefix is matched exactly, including case and the single space.
pub fn parse_bearer(value: Option<&HeaderValue>) -> Result<&str, GateError> {
    let value = value.ok_or(GateError::MissingHeader)?;
    let value = value.to_str().map_err(|_| GateError::MalformedHeader)?;
    value.strip_prefix("Bearer ").ok_or(GateError::MalformedHeader)
}

/// Decodes `Basic base64(email:password)`
///
/// Returns `None` for a missing scheme, bad base64, non-UTF-8 payload or a
/// payload without a colon. The scheme name itself is case-insensitive.
pub fn parse_basic(value: &HeaderValue) -> Option<(String, String)> {
    let value = value.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}

/// Bearer-token gate
///
/// # Errors
///
/// Returns 401 when the header is missing, does not start with `Bearer `, or
/// carries a token that fails verification for any reason.
pub async fn bearer_gate(
    State(codec): State<Arc<TokenCodec>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let token = parse_bearer(req.headers().get(header::AUTHORIZATION)).map_err(|e| {
        debug!(reason = %e, "Bearer gate rejected request");
        e
    })?;

    let claims = codec.verify(token).map_err(|e| {
        debug!(kind = e.kind(), "Bearer token rejected");
        GateError::InvalidToken(e)
    })?;

    req.extensions_mut().insert(AuthContext {
        user_id: claims.user_id,
        email: claims.email,
    });

    Ok(next.run(req).await)
}

/// Basic-credential gate
///
/// # Errors
///
/// Returns 401 with a `WWW-Authenticate` challenge when credentials are
/// absent or do not match a principal; 500 if the store is unavailable.
pub async fn basic_gate(
    State(authenticator): State<Arc<Authenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let (email, password) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(parse_basic)
        .ok_or(GateError::MissingBasic)?;

    let principal = authenticator
        .authenticate(&email, &password)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials => GateError::BadBasic,
            other => {
                error!(error = %other, "Basic gate could not check credentials");
                GateError::Internal
            }
        })?;

    req.extensions_mut().insert(AuthContext {
        user_id: principal.id,
        email: Some(principal.email),
    });

    Ok(next.run(req).await)
}

/// Attaches a fixed identity to every request
///
/// Mounted instead of the gates when authentication is switched off, so
/// handlers resolve the anonymous principal the same way they resolve a real one.
pub async fn anonymous_identity(
    State(identity): State<AuthContext>,
    mut req: Request,
    next: Next,
) -> Response {
    req.extensions_mut().insert(identity);
    next.run(req).await
}
