pub mod defs;
pub mod state;

pub use defs::{SourceDescriptor, SourceId, StoreError, SubscriptionStore, UserId};
pub use state::SqliteSubscriptionStore;
