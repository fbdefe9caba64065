//! # agora-store
//!
//! Local persistence for the Agora application, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model: the user directory, the community registry with its membership
//! counter, the post feed with like/comment counters, and direct-message
//! conversations identified by their participant set.

pub mod communities;
pub mod conversations;
pub mod database;
pub mod migrations;
pub mod models;
pub mod posts;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
