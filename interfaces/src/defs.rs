use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type SourceId = i64;

/// One subscribed syndication feed, as stored for a user.
///
/// The aggregation engine only ever reads these: each pass works on a
/// snapshot returned by [`SubscriptionStore::list_sources`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: SourceId,
    pub owner_user_id: UserId,
    pub url: String,
    pub display_name: String,
    /// Raw keyword string as the user typed it, possibly empty.
    pub keyword_filter: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read side of the subscription store. The user id or token is passed on
/// every call; no "current user" is kept in the process.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Sources owned by `user_id`, in creation order.
    async fn list_sources(&self, user_id: UserId) -> Result<Vec<SourceDescriptor>, StoreError>;

    /// Resolves an opaque feed token to its owner, `None` if unknown.
    async fn user_by_token(&self, token: &str) -> Result<Option<UserId>, StoreError>;
}
