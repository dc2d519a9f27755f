//! Postgres-backed stores

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{MessageStore, UserDirectory};
use crate::error::ChatResult;
use crate::types::{Message, NewMessage, NewUser, User, UserCredentials, UserId};

#[derive(Debug, sqlx::FromRow)]
struct CredentialsRow {
    id: Uuid,
    full_name: String,
    email: String,
    profile_pic: Option<String>,
    created_at: time::OffsetDateTime,
    password_hash: String,
}

impl From<CredentialsRow> for UserCredentials {
    fn from(row: CredentialsRow) -> Self {
        Self {
            user: User {
                id: UserId(row.id),
                full_name: row.full_name,
                email: row.email,
                profile_pic: row.profile_pic,
                created_at: row.created_at,
            },
            password_hash: row.password_hash,
        }
    }
}

/// Users and messages stored in Postgres
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn create_user(&self, new_user: NewUser) -> ChatResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, password_hash)
            VALUES ($1, LOWER($2), $3)
            RETURNING id, full_name, email, profile_pic, created_at
            "#,
        )
        .bind(&new_user.full_name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_credentials_by_email(&self, email: &str) -> ChatResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            r#"
            SELECT id, full_name, email, profile_pic, created_at, password_hash
            FROM users
            WHERE email = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_user(&self, id: UserId) -> ChatResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, full_name, email, profile_pic, created_at FROM users WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users_except(&self, exclude: UserId) -> ChatResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, profile_pic, created_at
            FROM users
            WHERE id <> $1
            ORDER BY full_name ASC
            "#,
        )
        .bind(exclude.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn update_profile_pic(&self, id: UserId, profile_pic: &str) -> ChatResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET profile_pic = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, full_name, email, profile_pic, created_at
            "#,
        )
        .bind(id.0)
        .bind(profile_pic)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn save_message(&self, message: NewMessage) -> ChatResult<Message> {
        let saved = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender_id, receiver_id, text, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sender_id, receiver_id, text, image_url, created_at
            "#,
        )
        .bind(message.sender_id.0)
        .bind(message.receiver_id.0)
        .bind(&message.text)
        .bind(&message.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn conversation(&self, a: UserId, b: UserId) -> ChatResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, text, image_url, created_at
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(a.0)
        .bind(b.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn ping(&self) -> ChatResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
