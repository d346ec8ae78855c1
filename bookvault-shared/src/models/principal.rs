/// Principal model
///
/// A principal is an account that can authenticate: a surrogate integer id,
/// a unique email used as the login key, and an Argon2id secret digest.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE principals (
///     id BIGINT PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     secret_digest TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The digest never leaves the process: `Principal` does not implement
/// `Serialize`, and its `Debug` output redacts the digest. Anything sent to a
/// client goes through [`PrincipalView`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Principal record as held by a store
#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Principal {
    /// Surrogate ID, positive and immutable
    pub id: i64,

    /// Email address (case-sensitive, unique)
    pub email: String,

    /// Argon2id PHC digest of the secret
    pub secret_digest: String,

    /// When the principal was created
    pub created_at: DateTime<Utc>,

    /// When the principal was last updated
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("secret_digest", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Input for creating a principal
///
/// The id is chosen by the caller (the authenticator), not the store.
#[derive(Clone)]
pub struct NewPrincipal {
    /// Pre-generated surrogate ID
    pub id: i64,

    /// Email address
    pub email: String,

    /// Argon2id digest (NOT the plaintext)
    pub secret_digest: String,
}

impl std::fmt::Debug for NewPrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewPrincipal")
            .field("id", &self.id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Outbound representation of a principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalView {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Principal> for PrincipalView {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            email: principal.email.clone(),
            created_at: principal.created_at,
            updated_at: principal.updated_at,
        }
    }
}

impl From<Principal> for PrincipalView {
    fn from(principal: Principal) -> Self {
        Self::from(&principal)
    }
}
