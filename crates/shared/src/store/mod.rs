//! Persistence seams for users and messages
//!
//! The realtime core never talks to these directly; the HTTP layer persists
//! through them and hands the stored [`Message`] to the relay afterwards.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::ChatResult;
use crate::types::{Message, NewMessage, NewUser, User, UserCredentials, UserId};

/// Credential store and user lookup
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Create a user. Fails with `Conflict` when the email is taken.
    async fn create_user(&self, new_user: NewUser) -> ChatResult<User>;

    /// Look up a user and its password hash by (case-insensitive) email
    async fn find_credentials_by_email(&self, email: &str) -> ChatResult<Option<UserCredentials>>;

    async fn find_user(&self, id: UserId) -> ChatResult<Option<User>>;

    /// Every user except `exclude`, for the sidebar
    async fn list_users_except(&self, exclude: UserId) -> ChatResult<Vec<User>>;

    async fn update_profile_pic(&self, id: UserId, profile_pic: &str) -> ChatResult<Option<User>>;
}

/// Durable, append-only message history
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(&self, message: NewMessage) -> ChatResult<Message>;

    /// Both directions of the conversation between `a` and `b`, oldest first
    async fn conversation(&self, a: UserId, b: UserId) -> ChatResult<Vec<Message>>;

    /// Cheap connectivity probe for readiness checks
    async fn ping(&self) -> ChatResult<()>;
}
