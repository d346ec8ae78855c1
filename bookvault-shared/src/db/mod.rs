/// Database layer for the PostgreSQL store
///
/// # Modules
///
/// - `pool`: connection pool creation and health checks
/// - `migrations`: embedded schema migrations

pub mod migrations;
pub mod pool;
