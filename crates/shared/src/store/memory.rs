//! In-memory stores for tests and database-less local runs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MessageStore, UserDirectory};
use crate::error::{ChatError, ChatResult};
use crate::types::{Message, NewMessage, NewUser, User, UserCredentials, UserId};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, UserCredentials>,
    // Append-only, so insertion order is chronological order
    messages: Vec<Message>,
}

/// Users and messages held in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> ChatResult<User> {
        let email = new_user.email.to_lowercase();
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|c| c.user.email == email) {
            return Err(ChatError::Conflict(format!("email {email} already registered")));
        }

        let user = User {
            id: UserId::new(),
            full_name: new_user.full_name,
            email,
            profile_pic: None,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: new_user.password_hash,
            },
        );

        Ok(user)
    }

    async fn find_credentials_by_email(&self, email: &str) -> ChatResult<Option<UserCredentials>> {
        let email = email.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|c| c.user.email == email).cloned())
    }

    async fn find_user(&self, id: UserId) -> ChatResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).map(|c| c.user.clone()))
    }

    async fn list_users_except(&self, exclude: UserId) -> ChatResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|c| c.user.id != exclude)
            .map(|c| c.user.clone())
            .collect();
        users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(users)
    }

    async fn update_profile_pic(&self, id: UserId, profile_pic: &str) -> ChatResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|c| {
            c.user.profile_pic = Some(profile_pic.to_string());
            c.user.clone()
        }))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn save_message(&self, message: NewMessage) -> ChatResult<Message> {
        let saved = Message {
            id: Uuid::new_v4(),
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            text: message.text,
            image_url: message.image_url,
            created_at: OffsetDateTime::now_utc(),
        };

        let mut inner = self.inner.write().await;
        inner.messages.push(saved.clone());
        Ok(saved)
    }

    async fn conversation(&self, a: UserId, b: UserId) -> ChatResult<Vec<Message>> {
        let inner = self.inner.read().await;
        Ok(inner
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
            })
            .cloned()
            .collect())
    }

    async fn ping(&self) -> ChatResult<()> {
        Ok(())
    }
}
