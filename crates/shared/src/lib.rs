//! Duochat Shared Types and Utilities
//!
//! This crate contains types, errors, and persistence shared across the Duochat services.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use db::*;
pub use error::*;
pub use store::{MemoryStore, MessageStore, PgStore, UserDirectory};
pub use types::*;
