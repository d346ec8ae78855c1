/// Domain models
///
/// # Models
///
/// - `principal`: Authenticatable accounts and their outbound view
/// - `book`: Books owned by a principal

pub mod book;
pub mod principal;
