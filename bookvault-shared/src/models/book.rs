/// Book model
///
/// Books belong to exactly one principal (`owner_id`). Stores key them by
/// owner first, so one principal can never see another's books.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE books (
///     uuid UUID PRIMARY KEY,
///     owner_id BIGINT NOT NULL,
///     name TEXT NOT NULL,
///     author_list TEXT[] NOT NULL DEFAULT '{}',
///     publish_date TEXT NOT NULL DEFAULT '',
///     isbn TEXT NOT NULL DEFAULT ''
/// );
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Server-generated identifier
    pub uuid: Uuid,

    /// Owning principal
    pub owner_id: i64,

    /// Title
    pub name: String,

    /// Authors, in display order
    pub author_list: Vec<String>,

    /// Publication date as supplied by the client
    pub publish_date: String,

    /// ISBN as supplied by the client
    pub isbn: String,
}

/// Client-supplied book fields, used for both create and replace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    #[validate(length(min = 1, max = 512, message = "Name must be between 1 and 512 characters"))]
    pub name: String,

    #[serde(default)]
    pub author_list: Vec<String>,

    #[serde(default)]
    pub publish_date: String,

    #[serde(default)]
    #[validate(length(max = 32, message = "ISBN must be at most 32 characters"))]
    pub isbn: String,
}

impl Book {
    /// Builds a new book with a fresh UUID
    pub fn new(owner_id: i64, input: BookInput) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            owner_id,
            name: input.name,
            author_list: input.author_list,
            publish_date: input.publish_date,
            isbn: input.isbn,
        }
    }

    /// Replaces the mutable fields, keeping identity and ownership
    pub fn apply(&mut self, input: BookInput) {
        self.name = input.name;
        self.author_list = input.author_list;
        self.publish_date = input.publish_date;
        self.isbn = input.isbn;
    }
}
