//! # TaskDeck Shared Library
//!
//! This crate contains shared types, persistence, and authentication logic used
//! by the TaskDeck API server.
//!
//! ## Module Organization
//!
//! - `auth`: Token codec, password hashing, and the session gate
//! - `db`: Lazily connected PostgreSQL pool and migrations
//! - `models`: Database models (users, tasks, task groups)
//! - `store`: The `Store` trait routes use to reach the collections

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the TaskDeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
