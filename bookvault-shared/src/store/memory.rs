/// In-memory store
///
/// Principals live in an id-keyed map with a secondary email index, books in
/// a map keyed by owner then UUID. Every mutation holds the write lock for its
/// whole check-then-insert, which is what makes duplicate-email detection
/// atomic.
///
/// # Example
///
/// ```
/// use bookvault_shared::models::principal::NewPrincipal;
/// use bookvault_shared::store::{memory::MemoryStore, PrincipalStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store
///     .create_principal(NewPrincipal {
///         id: 1,
///         email: "a@x.com".to_string(),
///         secret_digest: "$argon2id$...".to_string(),
///     })
///     .await?;
///
/// assert_eq!(store.get_by_email("a@x.com").await?.id, 1);
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BookStore, PrincipalStore, StoreError};
use crate::models::{
    book::Book,
    principal::{NewPrincipal, Principal},
};

#[derive(Default)]
struct Principals {
    by_id: HashMap<i64, Principal>,
    by_email: HashMap<String, i64>,
}

/// Process-local store for principals and books
#[derive(Default)]
pub struct MemoryStore {
    principals: RwLock<Principals>,
    books: RwLock<HashMap<i64, HashMap<Uuid, Book>>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn create_principal(&self, data: NewPrincipal) -> Result<Principal, StoreError> {
        let mut principals = self.principals.write().await;

        if principals.by_email.contains_key(&data.email) {
            return Err(StoreError::Duplicate("email"));
        }
        if principals.by_id.contains_key(&data.id) {
            return Err(StoreError::Duplicate("id"));
        }

        let now = Utc::now();
        let principal = Principal {
            id: data.id,
            email: data.email,
            secret_digest: data.secret_digest,
            created_at: now,
            updated_at: now,
        };

        principals.by_email.insert(principal.email.clone(), principal.id);
        principals.by_id.insert(principal.id, principal.clone());

        Ok(principal)
    }

    async fn get_by_id(&self, id: i64) -> Result<Principal, StoreError> {
        self.principals
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<Principal, StoreError> {
        let principals = self.principals.read().await;
        principals
            .by_email
            .get(email)
            .and_then(|id| principals.by_id.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_principal(&self, principal: Principal) -> Result<Principal, StoreError> {
        let mut principals = self.principals.write().await;

        let existing = principals
            .by_id
            .get(&principal.id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        if existing.email != principal.email {
            if principals.by_email.contains_key(&principal.email) {
                return Err(StoreError::Duplicate("email"));
            }
            principals.by_email.remove(&existing.email);
            principals.by_email.insert(principal.email.clone(), principal.id);
        }

        let updated = Principal {
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..principal
        };
        principals.by_id.insert(updated.id, updated.clone());

        Ok(updated)
    }

    async fn delete_principal(&self, id: i64) -> Result<(), StoreError> {
        {
            let mut principals = self.principals.write().await;
            let removed = principals.by_id.remove(&id).ok_or(StoreError::NotFound)?;
            principals.by_email.remove(&removed.email);
        }

        self.books.write().await.remove(&id);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list_books(&self, owner_id: i64) -> Result<Vec<Book>, StoreError> {
        let books = self.books.read().await;
        let mut owned: Vec<Book> = books
            .get(&owner_id)
            .map(|shelf| shelf.values().cloned().collect())
            .unwrap_or_default();
        owned.sort_by(|a, b| a.name.cmp(&b.name).then(a.uuid.cmp(&b.uuid)));
        Ok(owned)
    }

    async fn create_book(&self, book: Book) -> Result<Book, StoreError> {
        let mut books = self.books.write().await;
        let shelf = books.entry(book.owner_id).or_default();

        if shelf.contains_key(&book.uuid) {
            return Err(StoreError::Duplicate("uuid"));
        }
        shelf.insert(book.uuid, book.clone());

        Ok(book)
    }

    async fn get_book(&self, owner_id: i64, uuid: Uuid) -> Result<Book, StoreError> {
        self.books
            .read()
            .await
            .get(&owner_id)
            .and_then(|shelf| shelf.get(&uuid))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_book(&self, book: Book) -> Result<Book, StoreError> {
        let mut books = self.books.write().await;
        let slot = books
            .get_mut(&book.owner_id)
            .and_then(|shelf| shelf.get_mut(&book.uuid))
            .ok_or(StoreError::NotFound)?;

        *slot = book.clone();
        Ok(book)
    }

    async fn delete_book(&self, owner_id: i64, uuid: Uuid) -> Result<(), StoreError> {
        self.books
            .write()
            .await
            .get_mut(&owner_id)
            .and_then(|shelf| shelf.remove(&uuid))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
