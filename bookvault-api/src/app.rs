/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bookvault_api::{app::{build_router, AppState}, config::Config};
/// use bookvault_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config)?;
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use bookvault_shared::{
    auth::{
        authenticator::Authenticator,
        jwt::TokenCodec,
        middleware::{anonymous_identity, basic_gate, bearer_gate, AuthContext},
        password::SecretHasher,
    },
    store::{BookStore, PrincipalStore},
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Principal id every request acts as when authentication is disabled
pub const ANONYMOUS_PRINCIPAL_ID: i64 = 0;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
/// Everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Principal persistence
    pub principals: Arc<dyn PrincipalStore>,

    /// Book persistence
    pub books: Arc<dyn BookStore>,

    /// Registration and login
    pub authenticator: Arc<Authenticator>,

    /// Process-wide token codec
    pub codec: Arc<TokenCodec>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the auth core on top of a store implementing both contracts
    ///
    /// # Errors
    ///
    /// Returns an error if the Argon2 parameters in `config` are invalid.
    pub fn new<S>(store: Arc<S>, config: Config) -> anyhow::Result<Self>
    where
        S: PrincipalStore + BookStore + 'static,
    {
        let codec = Arc::new(TokenCodec::new(&config.jwt.secret, config.token_ttl()));
        let hasher = SecretHasher::new(config.hashing)?;
        let principals: Arc<dyn PrincipalStore> = store.clone();
        let authenticator = Arc::new(Authenticator::new(
            Arc::clone(&principals),
            hasher,
            Arc::clone(&codec),
        )?);

        Ok(Self {
            principals,
            books: store,
            authenticator,
            codec,
            config: Arc::new(config),
        })
    }

    /// Identity attached to every request when authentication is disabled
    pub fn anonymous_identity(&self) -> AuthContext {
        AuthContext {
            user_id: ANONYMOUS_PRINCIPAL_ID,
            email: Some(self.config.auth.anonymous_email.clone()),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                   # Health check (public)
/// └── /api/v1/
///     ├── POST /register        # public
///     ├── POST /login           # public
///     ├── GET  /get-token       # basic gate
///     ├── /users/               # bearer gate
///     │   ├── GET    /me
///     │   ├── GET    /:id
///     │   ├── PUT    /:id
///     │   └── DELETE /:id
///     └── /books/               # bearer gate
///         ├── GET    /
///         ├── POST   /
///         ├── GET    /:uuid
///         ├── PUT    /:uuid
///         └── DELETE /:uuid
/// ```
///
/// With authentication disabled the gates are replaced by a layer that
/// attaches the anonymous identity.
///
/// # Middleware Stack
///
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Gates (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let token_routes = Router::new().route("/get-token", get(routes::auth::get_token));

    let user_routes = Router::new()
        .route("/me", get(routes::users::me))
        .route(
            "/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        );

    let book_routes = Router::new()
        .route("/", get(routes::books::list_books).post(routes::books::create_book))
        .route(
            "/:uuid",
            get(routes::books::get_book)
                .put(routes::books::update_book)
                .delete(routes::books::delete_book),
        );

    let (token_routes, user_routes, book_routes) = if state.config.auth.enabled {
        let bearer = from_fn_with_state(Arc::clone(&state.codec), bearer_gate);
        (
            token_routes.route_layer(from_fn_with_state(
                Arc::clone(&state.authenticator),
                basic_gate,
            )),
            user_routes.route_layer(bearer.clone()),
            book_routes.route_layer(bearer),
        )
    } else {
        tracing::warn!("Authentication is disabled; all requests act as the anonymous principal");
        let anonymous = from_fn_with_state(state.anonymous_identity(), anonymous_identity);
        (
            token_routes.route_layer(anonymous.clone()),
            user_routes.route_layer(anonymous.clone()),
            book_routes.route_layer(anonymous),
        )
    };

    let v1_routes = Router::new()
        .merge(auth_routes)
        .merge(token_routes)
        .nest("/users", user_routes)
        .nest("/books", book_routes);

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
