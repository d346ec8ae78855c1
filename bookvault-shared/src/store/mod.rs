/// Storage contracts and backends
///
/// The authentication core only talks to [`PrincipalStore`]; book handlers
/// talk to [`BookStore`]. Both are object-safe so the API can pick a backend
/// at startup and hold it as `Arc<dyn ...>`.
///
/// # Backends
///
/// - [`memory::MemoryStore`]: process-local maps, used by default and in tests
/// - [`postgres::PgStore`]: PostgreSQL via sqlx
///
/// # Contract
///
/// - `create_principal` is atomic with respect to email uniqueness: of two
///   concurrent inserts with the same email, exactly one returns `Duplicate`.
/// - Email lookups are exact, case-sensitive matches.
/// - Book operations are keyed by `(owner_id, uuid)`; a book owned by someone
///   else is indistinguishable from a missing one.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    book::Book,
    principal::{NewPrincipal, Principal},
};

pub mod memory;
pub mod postgres;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key is already taken
    #[error("Duplicate {0}")]
    Duplicate(&'static str),

    /// No record with the requested key
    #[error("Record not found")]
    NotFound,

    /// Backend failure (connection, query, ...)
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let field = match db_err.constraint() {
                    Some(constraint) if constraint.contains("email") => "email",
                    _ => "key",
                };
                StoreError::Duplicate(field)
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Principal persistence
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Inserts a principal; `Duplicate("email")` if the email is taken
    async fn create_principal(&self, data: NewPrincipal) -> Result<Principal, StoreError>;

    /// Fetches a principal by surrogate ID
    async fn get_by_id(&self, id: i64) -> Result<Principal, StoreError>;

    /// Fetches a principal by exact email
    async fn get_by_email(&self, email: &str) -> Result<Principal, StoreError>;

    /// Replaces email and digest of an existing principal, bumping `updated_at`
    async fn update_principal(&self, principal: Principal) -> Result<Principal, StoreError>;

    /// Deletes a principal and the books it owns
    async fn delete_principal(&self, id: i64) -> Result<(), StoreError>;

    /// Backend name for health reporting
    fn backend(&self) -> &'static str;

    /// Cheap liveness check
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Book persistence, keyed by owner
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Lists all books owned by `owner_id`
    async fn list_books(&self, owner_id: i64) -> Result<Vec<Book>, StoreError>;

    /// Inserts a book
    async fn create_book(&self, book: Book) -> Result<Book, StoreError>;

    /// Fetches one of the owner's books
    async fn get_book(&self, owner_id: i64, uuid: Uuid) -> Result<Book, StoreError>;

    /// Replaces one of the owner's books
    async fn update_book(&self, book: Book) -> Result<Book, StoreError>;

    /// Deletes one of the owner's books
    async fn delete_book(&self, owner_id: i64, uuid: Uuid) -> Result<(), StoreError>;
}
