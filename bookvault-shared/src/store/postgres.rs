/// PostgreSQL store
///
/// Backs both store traits with the `principals` and `books` tables created by
/// the embedded migrations (see [`crate::db::migrations`]). Email uniqueness
/// is a `UNIQUE` constraint, so concurrent duplicate inserts are arbitrated by
/// the database and the loser surfaces as `StoreError::Duplicate("email")`.
///
/// # Example
///
/// ```no_run
/// use bookvault_shared::db::pool::{create_pool, DatabaseConfig};
/// use bookvault_shared::store::{postgres::PgStore, PrincipalStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgStore::new(pool);
/// let principal = store.get_by_email("a@x.com").await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{BookStore, PrincipalStore, StoreError};
use crate::models::{
    book::Book,
    principal::{NewPrincipal, Principal},
};

const PRINCIPAL_COLUMNS: &str = "id, email, secret_digest, created_at, updated_at";
const BOOK_COLUMNS: &str = "uuid, owner_id, name, author_list, publish_date, isbn";

/// sqlx-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalStore for PgStore {
    async fn create_principal(&self, data: NewPrincipal) -> Result<Principal, StoreError> {
        let principal = sqlx::query_as::<_, Principal>(&format!(
            "INSERT INTO principals (id, email, secret_digest) VALUES ($1, $2, $3) RETURNING {PRINCIPAL_COLUMNS}"
        ))
        .bind(data.id)
        .bind(data.email)
        .bind(data.secret_digest)
        .fetch_one(&self.pool)
        .await?;

        Ok(principal)
    }

    async fn get_by_id(&self, id: i64) -> Result<Principal, StoreError> {
        let principal = sqlx::query_as::<_, Principal>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        principal.ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<Principal, StoreError> {
        let principal = sqlx::query_as::<_, Principal>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        principal.ok_or(StoreError::NotFound)
    }

    async fn update_principal(&self, principal: Principal) -> Result<Principal, StoreError> {
        let updated = sqlx::query_as::<_, Principal>(&format!(
            "UPDATE principals SET email = $2, secret_digest = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {PRINCIPAL_COLUMNS}"
        ))
        .bind(principal.id)
        .bind(principal.email)
        .bind(principal.secret_digest)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(StoreError::NotFound)
    }

    async fn delete_principal(&self, id: i64) -> Result<(), StoreError> {
        // books.owner_id has no foreign key (the anonymous owner 0 has no row)
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM principals WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM books WHERE owner_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl BookStore for PgStore {
    async fn list_books(&self, owner_id: i64) -> Result<Vec<Book>, StoreError> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE owner_id = $1 ORDER BY name, uuid"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn create_book(&self, book: Book) -> Result<Book, StoreError> {
        let created = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books ({BOOK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book.uuid)
        .bind(book.owner_id)
        .bind(book.name)
        .bind(book.author_list)
        .bind(book.publish_date)
        .bind(book.isbn)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_book(&self, owner_id: i64, uuid: Uuid) -> Result<Book, StoreError> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE owner_id = $1 AND uuid = $2"
        ))
        .bind(owner_id)
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;

        book.ok_or(StoreError::NotFound)
    }

    async fn update_book(&self, book: Book) -> Result<Book, StoreError> {
        let updated = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET name = $3, author_list = $4, publish_date = $5, isbn = $6 \
             WHERE owner_id = $1 AND uuid = $2 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book.owner_id)
        .bind(book.uuid)
        .bind(book.name)
        .bind(book.author_list)
        .bind(book.publish_date)
        .bind(book.isbn)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(StoreError::NotFound)
    }

    async fn delete_book(&self, owner_id: i64, uuid: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE owner_id = $1 AND uuid = $2")
            .bind(owner_id)
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
