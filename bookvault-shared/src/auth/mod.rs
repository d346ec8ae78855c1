/// Authentication and request authorization
///
/// # Modules
///
/// - [`password`]: Argon2id secret hashing and verification
/// - [`jwt`]: HS256 token issuance and verification
/// - [`authenticator`]: registration, login and credential changes
/// - [`middleware`]: bearer and basic gates, identity extractor
///
/// # Security Features
///
/// - **Secret Hashing**: Argon2id, 64 MB memory, 3 iterations by default
/// - **Tokens**: HS256 only, zero expiry leeway, algorithm checked on decode
/// - **Login**: unknown email and wrong password are indistinguishable
///
/// # Example
///
/// ```no_run
/// use bookvault_shared::auth::jwt::{default_ttl, Claims, TokenCodec};
/// use bookvault_shared::auth::password::{HashingConfig, SecretHasher};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = SecretHasher::new(HashingConfig::default())?;
/// let digest = hasher.hash("password123")?;
/// assert!(hasher.verify("password123", &digest));
///
/// let codec = TokenCodec::new("your-secret-key-at-least-32-bytes!!", default_ttl());
/// let token = codec.issue_default(&Claims::new(42, None))?;
/// # Ok(())
/// # }
/// ```

pub mod authenticator;
pub mod jwt;
pub mod middleware;
pub mod password;
