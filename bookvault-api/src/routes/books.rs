/// Book endpoints
///
/// Every operation is scoped to the calling principal: a book created by
/// someone else answers 404 exactly like a missing one.
///
/// # Endpoints
///
/// - `GET /api/v1/books` - List own books
/// - `POST /api/v1/books` - Create a book
/// - `GET /api/v1/books/:uuid` - Fetch a book
/// - `PUT /api/v1/books/:uuid` - Replace a book's fields
/// - `DELETE /api/v1/books/:uuid` - Delete a book

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use bookvault_shared::{
    auth::middleware::CurrentPrincipal,
    models::book::{Book, BookInput},
    store::StoreError,
};
use uuid::Uuid;
use validator::Validate;

fn book_uuid(path: Result<Path<Uuid>, PathRejection>) -> ApiResult<Uuid> {
    let Path(uuid) = path?;
    Ok(uuid)
}

fn validated(body: Result<Json<BookInput>, JsonRejection>) -> ApiResult<BookInput> {
    let Json(input) = body?;
    input.validate()?;
    Ok(input)
}

fn not_found(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("Book not found".to_string()),
        other => other.into(),
    }
}

/// List the caller's books, ordered by name
pub async fn list_books(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> ApiResult<Json<Vec<Book>>> {
    let books = state.books.list_books(principal.user_id).await?;
    Ok(Json(books))
}

/// Create a book owned by the caller
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/books
/// Content-Type: application/json
///
/// {
///   "name": "Learn API",
///   "authorList": ["Urmi"],
///   "publishDate": "2022-01-02",
///   "isbn": "0999-0555-5914"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or validation failed
pub async fn create_book(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    body: Result<Json<BookInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let input = validated(body)?;

    let book = state
        .books
        .create_book(Book::new(principal.user_id, input))
        .await?;

    tracing::info!(owner_id = book.owner_id, book = %book.uuid, "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// Fetch one of the caller's books
pub async fn get_book(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Book>> {
    let uuid = book_uuid(path)?;

    let book = state
        .books
        .get_book(principal.user_id, uuid)
        .await
        .map_err(not_found)?;

    Ok(Json(book))
}

/// Replace the fields of one of the caller's books
pub async fn update_book(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<BookInput>, JsonRejection>,
) -> ApiResult<Json<Book>> {
    let uuid = book_uuid(path)?;
    let input = validated(body)?;

    let mut book = state
        .books
        .get_book(principal.user_id, uuid)
        .await
        .map_err(not_found)?;
    book.apply(input);

    let updated = state.books.update_book(book).await.map_err(not_found)?;
    Ok(Json(updated))
}

/// Delete one of the caller's books
pub async fn delete_book(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let uuid = book_uuid(path)?;

    state
        .books
        .delete_book(principal.user_id, uuid)
        .await
        .map_err(not_found)?;

    tracing::info!(owner_id = principal.user_id, book = %uuid, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}
