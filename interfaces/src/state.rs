use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::defs::{SourceDescriptor, SourceId, StoreError, SubscriptionStore, UserId};

/// SQLite-backed subscription store.
pub struct SqliteSubscriptionStore {
    pool: SqlitePool,
}

impl SqliteSubscriptionStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        // Every connection to `:memory:` opens its own database, so keep
        // exactly one alive for the lifetime of the pool.
        let in_memory = database_url.contains(":memory:");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(database_url).await?;
        debug!("Connected to subscription database (in_memory: {})", in_memory);
        Ok(Self { pool })
    }

    pub async fn setup_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nickname TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                token TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                keywords TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_feeds_user_id ON feeds(user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Registers a user and issues the token that unlocks their merged feed.
    pub async fn create_user(&self, nickname: &str, email: &str) -> Result<(UserId, String), StoreError> {
        let token = Uuid::new_v4().simple().to_string();

        let result = sqlx::query(
            "INSERT INTO users (nickname, email, token, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(nickname)
        .bind(email)
        .bind(&token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let user_id = result.last_insert_rowid();
        info!("Created user {} ({})", user_id, email);
        Ok((user_id, token))
    }

    pub async fn add_source(
        &self,
        user_id: UserId,
        name: &str,
        url: &str,
        keywords: &str,
    ) -> Result<SourceId, StoreError> {
        let result = sqlx::query(
            "INSERT INTO feeds (user_id, name, url, keywords, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(name)
        .bind(url)
        .bind(keywords)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let source_id = result.last_insert_rowid();
        info!("Added feed {} for user {}: {}", source_id, user_id, url);
        Ok(source_id)
    }
}

#[async_trait]
impl SubscriptionStore for SqliteSubscriptionStore {
    async fn list_sources(&self, user_id: UserId) -> Result<Vec<SourceDescriptor>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, url, keywords FROM feeds WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let sources = rows
            .into_iter()
            .map(|r| SourceDescriptor {
                id: r.get("id"),
                owner_user_id: r.get("user_id"),
                display_name: r.get("name"),
                url: r.get("url"),
                keyword_filter: r.get("keywords"),
            })
            .collect();

        Ok(sources)
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        let row = sqlx::query("SELECT id FROM users WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("id")))
    }
}
