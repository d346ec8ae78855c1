/// Password hashing module using Argon2id
///
/// Plaintext secrets are turned into PHC-format Argon2id digests with a fresh
/// random salt per call. Verification re-derives the digest using the
/// parameters embedded in the stored string, so digests produced under older
/// cost settings keep verifying after the configuration changes.
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Memory**: 64 MB by default (65536 KB)
/// - **Iterations**: 3 passes by default
/// - **Parallelism**: 4 lanes by default
/// - **Output**: 32-byte hash
///
/// # Example
///
/// ```
/// use bookvault_shared::auth::password::{HashingConfig, SecretHasher};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = SecretHasher::new(HashingConfig::default())?;
///
/// let digest = hasher.hash("super_secret_password_123")?;
/// assert!(hasher.verify("super_secret_password_123", &digest));
/// assert!(!hasher.verify("wrong_password", &digest));
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

/// Longest plaintext accepted for hashing, in bytes (1024 four-byte characters)
pub const MAX_SECRET_LEN: usize = 4096;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Cost parameters were rejected by Argon2
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    /// Plaintext is empty or longer than [`MAX_SECRET_LEN`]
    #[error("Secret must be between 1 and {MAX_SECRET_LEN} bytes")]
    InvalidInput,
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Hashes and verifies plaintext secrets
///
/// Cheap to clone; holds only the validated Argon2 parameters.
#[derive(Debug, Clone)]
pub struct SecretHasher {
    params: Params,
}

impl SecretHasher {
    /// Creates a hasher, validating the cost parameters up front
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidParams` if Argon2 rejects the parameters
    /// (for example, memory smaller than 8 KiB per lane).
    pub fn new(config: HashingConfig) -> Result<Self, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(config.memory_kib)
            .t_cost(config.iterations)
            .p_cost(config.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self { params })
    }

    /// Hashes a plaintext secret
    ///
    /// Returns a PHC string such as:
    /// ```text
    /// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
    /// ```
    ///
    /// Every call draws a new 16-byte salt from the OS RNG, so hashing the
    /// same input twice yields different digests.
    ///
    /// # Errors
    ///
    /// - `PasswordError::InvalidInput` for empty or oversized input
    /// - `PasswordError::HashError` if Argon2 itself fails
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        if plaintext.is_empty() || plaintext.len() > MAX_SECRET_LEN {
            return Err(PasswordError::InvalidInput);
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, self.params.clone());

        let digest = argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(e.to_string()))?;

        Ok(digest.to_string())
    }

    /// Verifies a plaintext secret against a stored digest
    ///
    /// The comparison inside Argon2 is constant-time. Malformed digests and
    /// empty plaintexts verify as `false` instead of erroring, so callers can
    /// treat every failure the same way.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        if plaintext.is_empty() || digest.is_empty() {
            return false;
        }

        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored secret digest is not a valid PHC string");
                return false;
            }
        };

        // Parameters come from the digest, not from self.params
        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Secret verification failed on a malformed digest");
                false
            }
        }
    }
}
