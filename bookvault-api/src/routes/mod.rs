/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and token issuance
/// - `users`: Principal lookup, update and deletion
/// - `books`: Book CRUD scoped to the calling principal

pub mod auth;
pub mod books;
pub mod health;
pub mod users;
