/// Registration, login and credential changes
///
/// The [`Authenticator`] ties the secret hasher, the principal store and the
/// token codec together. HTTP handlers and the basic-auth gate call into it;
/// it never touches request or response types itself.
///
/// Login failures are deliberately flattened: an unknown email and a wrong
/// password both come back as [`AuthError::InvalidCredentials`], and both
/// paths run one Argon2 verification so response timing does not reveal which
/// accounts exist.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bookvault_shared::auth::authenticator::{Authenticator, Credentials};
/// use bookvault_shared::auth::jwt::TokenCodec;
/// use bookvault_shared::auth::password::{HashingConfig, SecretHasher};
/// use bookvault_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let authenticator = Authenticator::new(
///     Arc::new(MemoryStore::new()),
///     SecretHasher::new(HashingConfig::default())?,
///     Arc::new(TokenCodec::new("your-secret-key-at-least-32-bytes!!", chrono::Duration::hours(24))),
/// )?;
///
/// let credentials = Credentials::new("a@x.com", "password123");
/// authenticator.register(credentials.clone()).await?;
/// let token = authenticator.login(credentials).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use super::{
    jwt::{Claims, TokenCodec, TokenError},
    password::{PasswordError, SecretHasher},
};
use crate::{
    models::principal::{NewPrincipal, Principal},
    store::{PrincipalStore, StoreError},
};

/// Digest verified against when the email is unknown
const DECOY_SECRET: &str = "decoy-secret-never-matches";

/// Accepted password length, in characters
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 1024;

fn validate_password_length(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::new("length").with_message(
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN).into(),
        ));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(ValidationError::new("length").with_message(
            format!("Password must be at most {} characters", MAX_PASSWORD_LEN).into(),
        ));
    }
    Ok(())
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Error type for authenticator operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Input failed validation
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// A unique key (email) is already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown email or wrong password; intentionally non-specific
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No principal with the given id
    #[error("Principal not found")]
    NotFound,

    /// Hashing, signing or storage infrastructure failed
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Internal(format!("Token operation failed: {}", err))
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate("email") => AuthError::Conflict("Email already exists".to_string()),
            StoreError::NotFound => AuthError::NotFound,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| FieldError {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        AuthError::Validation(details)
    }
}

/// Email + plaintext password, as sent to `/register` and `/login`
///
/// Never persisted. `Debug` hides the password.
#[derive(Clone, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_password_length"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Replacement email and optional new password for an existing principal
#[derive(Clone, Deserialize, Validate)]
pub struct CredentialUpdate {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    #[validate(custom(function = "validate_password_length"))]
    pub password: Option<String>,
}

impl std::fmt::Debug for CredentialUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialUpdate")
            .field("email", &self.email)
            .field("password_changed", &self.password.is_some())
            .finish()
    }
}

/// Time-derived, strictly increasing principal ids
///
/// Seeds from the wall clock in milliseconds times 1000, leaving the low
/// three digits as a per-millisecond counter, and never hands out the same
/// value twice within a process. Values stay below 2^53 so JSON clients that
/// parse numbers as doubles read them exactly.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> i64 {
        let floor = Utc::now().timestamp_millis() * 1000;
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = floor.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Orchestrates registration and login
pub struct Authenticator {
    store: Arc<dyn PrincipalStore>,
    hasher: SecretHasher,
    codec: Arc<TokenCodec>,
    ids: IdGenerator,
    decoy_digest: String,
}

impl Authenticator {
    /// Creates an authenticator
    ///
    /// Hashes a decoy secret once so unknown-email logins cost the same as
    /// wrong-password logins.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError` if the decoy cannot be hashed.
    pub fn new(
        store: Arc<dyn PrincipalStore>,
        hasher: SecretHasher,
        codec: Arc<TokenCodec>,
    ) -> Result<Self, PasswordError> {
        let decoy_digest = hasher.hash(DECOY_SECRET)?;

        Ok(Self {
            store,
            hasher,
            codec,
            ids: IdGenerator::new(),
            decoy_digest,
        })
    }

    /// Token codec used for issuing
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Registers a new principal
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` for a bad email or short password
    /// - `AuthError::Conflict` if the email is taken
    /// - `AuthError::Internal` if hashing or the store fails
    pub async fn register(&self, credentials: Credentials) -> Result<Principal, AuthError> {
        credentials.validate()?;

        let secret_digest = self.hash_off_thread(credentials.password).await?;

        let principal = self
            .store
            .create_principal(NewPrincipal {
                id: self.ids.next_id(),
                email: credentials.email,
                secret_digest,
            })
            .await
            .map_err(|e| {
                if matches!(e, StoreError::Duplicate("email")) {
                    debug!("Registration rejected: email already exists");
                }
                AuthError::from(e)
            })?;

        info!(principal_id = principal.id, "Principal registered");
        Ok(principal)
    }

    /// Checks an email/password pair and returns the matching principal
    ///
    /// Shared by `login` and the basic-auth gate.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredentials` for unknown email or wrong password
    /// - `AuthError::Internal` if the store fails
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let found = match self.store.get_by_email(email).await {
            Ok(principal) => Some(principal),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(AuthError::Internal(e.to_string())),
        };

        let digest = found
            .as_ref()
            .map(|p| p.secret_digest.clone())
            .unwrap_or_else(|| self.decoy_digest.clone());

        let matches = self.verify_off_thread(password.to_string(), digest).await?;

        match found {
            Some(principal) if matches => Ok(principal),
            _ => {
                debug!("Authentication failed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Exchanges credentials for a signed token
    ///
    /// The token embeds the principal's id and email and lives for the
    /// codec's configured TTL.
    pub async fn login(&self, credentials: Credentials) -> Result<String, AuthError> {
        let principal = self
            .authenticate(&credentials.email, &credentials.password)
            .await?;

        let token = self.issue_token(&principal)?;
        info!(principal_id = principal.id, "Principal logged in");
        Ok(token)
    }

    /// Issues a token for an already-authenticated principal
    pub fn issue_token(&self, principal: &Principal) -> Result<String, AuthError> {
        let claims = Claims::new(principal.id, Some(principal.email.clone()));
        Ok(self.codec.issue_default(&claims)?)
    }

    /// Replaces a principal's email and, optionally, its password
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` for a bad email or short password
    /// - `AuthError::NotFound` if the principal does not exist
    /// - `AuthError::Conflict` if the new email belongs to someone else
    pub async fn update_credentials(
        &self,
        id: i64,
        update: CredentialUpdate,
    ) -> Result<Principal, AuthError> {
        update.validate()?;

        let mut principal = self.store.get_by_id(id).await?;
        principal.email = update.email;

        if let Some(password) = update.password {
            principal.secret_digest = self.hash_off_thread(password).await?;
        }

        let updated = self.store.update_principal(principal).await?;
        info!(principal_id = updated.id, "Principal updated");
        Ok(updated)
    }

    async fn hash_off_thread(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {}", e)))??;
        Ok(digest)
    }

    async fn verify_off_thread(&self, password: String, digest: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| {
                warn!(error = %e, "Verification task failed");
                AuthError::Internal(format!("Verification task failed: {}", e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{jwt::default_ttl, password::HashingConfig};
    use crate::store::memory::MemoryStore;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn authenticator() -> Authenticator {
        let hasher = SecretHasher::new(HashingConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        Authenticator::new(
            Arc::new(MemoryStore::new()),
            hasher,
            Arc::new(TokenCodec::new(SECRET, default_ttl())),
        )
        .unwrap()
    }

    #[test]
    fn test_id_generator_is_strictly_increasing() {
        let ids = IdGenerator::new();
        let mut prev = ids.next_id();
        assert!(prev > 0);

        for _ in 0..1000 {
            let next = ids.next_id();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_ids_are_exact_as_json_numbers() {
        let ids = IdGenerator::new();
        let floor = Utc::now().timestamp_millis() * 1000;

        for _ in 0..5000 {
            let id = ids.next_id();
            assert!(id >= floor);
            assert!(id < 1 << 53);
            assert_eq!(id as f64 as i64, id);
        }
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let rendered = format!("{:?}", Credentials::new("a@x.com", "password123"));
        assert!(rendered.contains("a@x.com"));
        assert!(!rendered.contains("password123"));
    }

    #[tokio::test]
    async fn test_register_stores_digest_not_plaintext() {
        let auth = authenticator();
        let principal = auth
            .register(Credentials::new("a@x.com", "password123"))
            .await
            .unwrap();

        assert!(principal.id > 0);
        assert_eq!(principal.email, "a@x.com");
        assert_ne!(principal.secret_digest, "password123");
        assert!(principal.secret_digest.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let auth = authenticator();

        match auth.register(Credentials::new("invalid", "password123")).await {
            Err(AuthError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "email");
                assert_eq!(errors[0].message, "Invalid email format");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        match auth.register(Credentials::new("b@x.com", "short")).await {
            Err(AuthError::Validation(errors)) => {
                assert_eq!(errors[0].field, "password");
                assert!(errors[0].message.contains("at least 8"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let long = "p".repeat(MAX_PASSWORD_LEN + 1);
        match auth.register(Credentials::new("b@x.com", long)).await {
            Err(AuthError::Validation(errors)) => {
                assert_eq!(errors[0].field, "password");
                assert_eq!(errors[0].message, "Password must be at most 1024 characters");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let longest = "p".repeat(MAX_PASSWORD_LEN);
        assert!(auth.register(Credentials::new("c@x.com", longest)).await.is_ok());

        match auth.register(Credentials::new("invalid", "")).await {
            Err(AuthError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "password"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let auth = authenticator();
        auth.register(Credentials::new("a@x.com", "password123")).await.unwrap();

        let result = auth.register(Credentials::new("a@x.com", "different123")).await;
        assert!(matches!(result, Err(AuthError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_concurrent_registration_single_winner() {
        let auth = Arc::new(authenticator());

        let attempts = (0..6).map(|_| {
            let auth = Arc::clone(&auth);
            async move { auth.register(Credentials::new("race@x.com", "password123")).await }
        });
        let results = futures::future::join_all(attempts).await;

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(AuthError::Conflict(_))))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 5);
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let auth = authenticator();
        let principal = auth
            .register(Credentials::new("a@x.com", "password123"))
            .await
            .unwrap();

        let token = auth.login(Credentials::new("a@x.com", "password123")).await.unwrap();
        let claims = auth.codec().verify(&token).unwrap();

        assert_eq!(claims.user_id, principal.id);
        assert_eq!(claims.email.as_deref(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let auth = authenticator();
        auth.register(Credentials::new("a@x.com", "password123")).await.unwrap();

        let wrong_password = auth.login(Credentials::new("a@x.com", "wrongpass1")).await;
        let unknown_email = auth.login(Credentials::new("nobody@x.com", "password123")).await;
        let wrong_case = auth.login(Credentials::new("A@X.COM", "password123")).await;

        for result in [&wrong_password, &unknown_email, &wrong_case] {
            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        }
        assert_eq!(
            wrong_password.unwrap_err().to_string(),
            unknown_email.unwrap_err().to_string()
        );
    }

    #[tokio::test]
    async fn test_decoy_secret_never_authenticates_unknown_user() {
        let auth = authenticator();
        let result = auth.authenticate("ghost@x.com", DECOY_SECRET).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_update_credentials() {
        let auth = authenticator();
        let principal = auth
            .register(Credentials::new("a@x.com", "password123"))
            .await
            .unwrap();

        let updated = auth
            .update_credentials(
                principal.id,
                CredentialUpdate {
                    email: "new@x.com".to_string(),
                    password: Some("newpassword123".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.email, "new@x.com");
        assert!(auth.authenticate("new@x.com", "newpassword123").await.is_ok());
        assert!(matches!(
            auth.authenticate("new@x.com", "password123").await,
            Err(AuthError::InvalidCredentials)
        ));

        // Email-only update keeps the old digest
        let kept = auth
            .update_credentials(
                principal.id,
                CredentialUpdate {
                    email: "newer@x.com".to_string(),
                    password: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(kept.secret_digest, updated.secret_digest);
    }

    #[tokio::test]
    async fn test_update_credentials_errors() {
        let auth = authenticator();
        let principal = auth
            .register(Credentials::new("a@x.com", "password123"))
            .await
            .unwrap();
        auth.register(Credentials::new("b@x.com", "password123")).await.unwrap();

        let missing = auth
            .update_credentials(
                999,
                CredentialUpdate {
                    email: "c@x.com".to_string(),
                    password: None,
                },
            )
            .await;
        assert!(matches!(missing, Err(AuthError::NotFound)));

        let taken = auth
            .update_credentials(
                principal.id,
                CredentialUpdate {
                    email: "b@x.com".to_string(),
                    password: None,
                },
            )
            .await;
        assert!(matches!(taken, Err(AuthError::Conflict(_))));

        let short = auth
            .update_credentials(
                principal.id,
                CredentialUpdate {
                    email: "a@x.com".to_string(),
                    password: Some("short".to_string()),
                },
            )
            .await;
        assert!(matches!(short, Err(AuthError::Validation(_))));

        let long = auth
            .update_credentials(
                principal.id,
                CredentialUpdate {
                    email: "a@x.com".to_string(),
                    password: Some("p".repeat(MAX_PASSWORD_LEN + 1)),
                },
            )
            .await;
        match long {
            Err(AuthError::Validation(errors)) => {
                assert!(errors[0].message.contains("at most 1024"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
