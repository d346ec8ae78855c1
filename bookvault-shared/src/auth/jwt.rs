/// JWT token issuance and verification
///
/// Tokens are compact HS256 JWTs carrying the principal's `user_id`, an
/// optional `email`, and an `exp` instant in Unix seconds. The signing key is
/// loaded once into a [`TokenCodec`] at startup and shared read-only.
///
/// # Security
///
/// - **Algorithm**: HS256 only. The header algorithm is checked before the
///   signature, so `none`, RS256 and friends are rejected as bad signatures.
/// - **Expiration**: no leeway. A token is dead from the second its `exp`
///   is reached.
/// - **Secret Management**: secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use bookvault_shared::auth::jwt::{Claims, TokenCodec};
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = TokenCodec::new("your-secret-key-at-least-32-bytes!!", Duration::hours(24));
///
/// let token = codec.issue_default(&Claims::new(42, Some("a@x.com".to_string())))?;
/// let claims = codec.verify(&token)?;
/// assert_eq!(claims.user_id, 42);
/// # Ok(())
/// # }
/// ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// The only algorithm tokens may be signed with
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Default lifetime of an issued token
pub fn default_ttl() -> Duration {
    Duration::hours(24)
}

/// Error type for token operations
///
/// The verification kinds are kept apart for logging; the HTTP layer maps
/// all of them to the same 401.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    /// Failed to sign a token
    #[error("Failed to create token: {0}")]
    Signing(String),

    /// Not decodable, not three segments, bad JSON, missing required claims
    #[error("Malformed token")]
    Malformed,

    /// Signature does not match, or the header names an unexpected algorithm
    #[error("Invalid token signature")]
    BadSignature,

    /// Signature is valid but `exp` has been reached
    #[error("Token has expired")]
    Expired,
}

impl TokenError {
    /// Short label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Signing(_) => "signing",
            TokenError::Malformed => "malformed",
            TokenError::BadSignature => "bad_signature",
            TokenError::Expired => "expired",
        }
    }
}

/// JWT claims structure
///
/// `user_id` and `exp` are required on decode; a token missing either is
/// rejected as malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal ID
    pub user_id: i64,

    /// Principal email, if embedded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates identity claims; `iat` and `exp` are stamped by [`TokenCodec::issue`]
    pub fn new(user_id: i64, email: Option<String>) -> Self {
        Self {
            user_id,
            email,
            iat: 0,
            exp: 0,
        }
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs and verifies tokens with the process signing key
///
/// Built once from configuration and shared behind an `Arc`; all methods
/// take `&self` and are safe to call concurrently.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("ttl_seconds", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Creates a codec for the given secret and default token lifetime
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Lifetime applied by [`TokenCodec::issue_default`]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs `claims` with `iat = now` and `exp = now + ttl`
    ///
    /// A negative `ttl` yields an already-expired token, which is handy in tests.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails or `now + ttl` is
    /// outside the representable date range
    pub fn issue(&self, claims: &Claims, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Signing("Token expiry out of range".to_string()))?;
        let stamped = Claims {
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            ..claims.clone()
        };

        encode(&Header::new(SIGNING_ALGORITHM), &stamped, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Signs `claims` with the codec's configured lifetime
    pub fn issue_default(&self, claims: &Claims) -> Result<String, TokenError> {
        self.issue(claims, self.ttl)
    }

    /// Verifies a token and returns its claims
    ///
    /// Checks, in order: structure, header algorithm, signature, required
    /// claims, expiry.
    ///
    /// # Errors
    ///
    /// - `TokenError::Malformed` if the token cannot be parsed
    /// - `TokenError::BadSignature` on algorithm or signature mismatch
    /// - `TokenError::Expired` if `exp` is at or before now
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        check_header_algorithm(token)?;

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::BadSignature
                }
                _ => TokenError::Malformed,
            }
        })?;

        // jsonwebtoken accepts exp == now; the token is already dead at that instant
        if data.claims.is_expired() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

/// Rejects tokens whose header names anything other than HS256
///
/// jsonwebtoken cannot even parse a header with `"alg": "none"`, which would
/// surface as a generic decode failure. Reading the raw header first lets
/// algorithm substitution be reported as a signature problem.
fn check_header_algorithm(token: &str) -> Result<(), TokenError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(TokenError::Malformed);
    };

    let raw = URL_SAFE_NO_PAD
        .decode(header.trim_end_matches('='))
        .map_err(|_| TokenError::Malformed)?;
    let header: serde_json::Value =
        serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)?;

    match header.get("alg").and_then(|alg| alg.as_str()) {
        Some("HS256") => Ok(()),
        Some(_) => Err(TokenError::BadSignature),
        None => Err(TokenError::Malformed),
    }
}
