//! # BookVault Shared Library
//!
//! Authentication core, data models and storage backends used by the
//! BookVault API server.
//!
//! ## Module Organization
//!
//! - `auth`: secret hashing, tokens, authenticator and request gates
//! - `models`: principals and books
//! - `store`: storage contracts with in-memory and PostgreSQL backends
//! - `db`: PostgreSQL pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the BookVault shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
