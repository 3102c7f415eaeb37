use crate::filter::Keywords;
use crate::types::{ParsedFeed, SourceDescriptor, SourceError, SourceId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Identity of one cached pipeline result. Editing a subscription's URL or
/// keywords changes the key, so stale results never leak across edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source_id: SourceId,
    pub url: String,
    pub keywords: Keywords,
}

impl From<&SourceDescriptor> for CacheKey {
    fn from(source: &SourceDescriptor) -> Self {
        Self {
            source_id: source.id,
            url: source.url.clone(),
            keywords: Keywords::parse(&source.keyword_filter),
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    value: Option<(ParsedFeed, Instant)>,
    refreshing: bool,
}

/// Per-source result cache with stale-while-revalidate refresh.
///
/// Fresh entries are served as is. A stale entry is still served, and at
/// most one background refresh per key replaces it once it completes.
/// Only successful results are stored, and entries older than four TTLs
/// are evicted on the next write.
pub struct FeedCache {
    ttl: Duration,
    slots: Arc<RwLock<HashMap<CacheKey, Slot>>>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<ParsedFeed, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ParsedFeed, SourceError>> + Send + 'static,
    {
        let cached = {
            let slots = self.slots.read().await;
            slots
                .get(&key)
                .and_then(|slot| slot.value.as_ref())
                .map(|(feed, fetched_at)| (feed.clone(), *fetched_at))
        };

        match cached {
            Some((feed, fetched_at)) if fetched_at.elapsed() < self.ttl => {
                debug!("Cache hit for source {}", key.source_id);
                Ok(feed)
            }
            Some((feed, _)) => {
                if self.begin_refresh(&key).await {
                    debug!("Serving stale source {} while refreshing", key.source_id);
                    self.spawn_refresh(key, fetch());
                }
                Ok(feed)
            }
            None => {
                let result = fetch().await;
                if let Ok(feed) = &result {
                    self.store(key, feed.clone()).await;
                }
                result
            }
        }
    }

    async fn begin_refresh(&self, key: &CacheKey) -> bool {
        let mut slots = self.slots.write().await;
        let slot = slots.entry(key.clone()).or_default();
        if slot.refreshing {
            false
        } else {
            slot.refreshing = true;
            true
        }
    }

    fn spawn_refresh<Fut>(&self, key: CacheKey, refresh: Fut)
    where
        Fut: Future<Output = Result<ParsedFeed, SourceError>> + Send + 'static,
    {
        let slots = self.slots.clone();
        let max_age = self.max_age();
        let task = tokio::spawn(refresh);

        // The flag is cleared from a second task so a panicking refresh
        // cannot leave the key stuck on its stale value.
        tokio::spawn(async move {
            let joined = task.await;
            let mut slots = slots.write().await;
            let slot = slots.entry(key.clone()).or_default();
            slot.refreshing = false;
            match joined {
                Ok(Ok(feed)) => slot.value = Some((feed, Instant::now())),
                Ok(Err(e)) => warn!(
                    "Refresh of source {} failed, keeping stale entry: {}",
                    key.source_id, e
                ),
                Err(e) => warn!(
                    "Refresh of source {} aborted, keeping stale entry: {}",
                    key.source_id, e
                ),
            }
            evict_expired(&mut slots, max_age);
        });
    }

    async fn store(&self, key: CacheKey, feed: ParsedFeed) {
        let mut slots = self.slots.write().await;
        slots.entry(key).or_default().value = Some((feed, Instant::now()));
        evict_expired(&mut slots, self.max_age());
    }

    fn max_age(&self) -> Duration {
        self.ttl * EVICT_AFTER_TTLS
    }

    /// Number of keys currently held, including ones being refreshed.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

/// Entries untouched for this many TTLs are dropped on the next write.
const EVICT_AFTER_TTLS: u32 = 4;

// Keys of edited or deleted subscriptions are never read again, so they
// only leave the map through here.
fn evict_expired(slots: &mut HashMap<CacheKey, Slot>, max_age: Duration) {
    let before = slots.len();
    slots.retain(|_, slot| {
        slot.refreshing
            || slot
                .value
                .as_ref()
                .is_some_and(|(_, fetched_at)| fetched_at.elapsed() < max_age)
    });
    let evicted = before - slots.len();
    if evicted > 0 {
        debug!("Evicted {} expired cache entries", evicted);
    }
}
