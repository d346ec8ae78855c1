//! # BookVault API Server Library
//!
//! HTTP surface of BookVault: a small book catalogue where every book belongs
//! to the principal that created it, guarded by token authentication.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
