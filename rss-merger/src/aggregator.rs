use crate::cache::{CacheKey, FeedCache};
use crate::filter::{filter_items, Keywords};
use crate::parser;
use crate::types::{
    AggregationReport, ErrorKind, FetchConfig, FetchError, FetchOutcome, FetchedBody, MergedFeed,
    ParsedFeed, Result, SourceDescriptor, SourceError,
};
use crate::Fetcher;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct AggregatorConfig {
    pub fetch: FetchConfig,
    /// Upper bound on a whole pass; sources still running are reported as timed out.
    pub pass_deadline: Option<Duration>,
    /// Freshness window of the per-source cache. `None` disables caching.
    pub cache_ttl: Option<Duration>,
    /// Items kept per source after parsing, before filtering.
    pub max_items_per_source: Option<usize>,
}

/// Fetch, parse and filter for a single source.
struct SourcePipeline {
    fetcher: Fetcher,
    max_items: Option<usize>,
}

impl SourcePipeline {
    async fn run(&self, url: &str, keywords: &Keywords) -> std::result::Result<ParsedFeed, SourceError> {
        let body = self.fetch_with_retry(url).await?;
        let mut feed = parser::parse(&body.bytes)?;

        if let Some(limit) = self.max_items {
            feed.items.truncate(limit);
        }
        let total = feed.items.len();
        feed.items = filter_items(feed.items, keywords);

        debug!(
            "Source {}: kept {}/{} items for keywords '{}'",
            url,
            feed.items.len(),
            total,
            keywords
        );
        Ok(feed)
    }

    async fn fetch_with_retry(&self, url: &str) -> std::result::Result<FetchedBody, FetchError> {
        let config = self.fetcher.config();
        let retry_delay = Duration::from_secs(config.retry_delay_seconds);
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: retry_delay,
            initial_interval: retry_delay,
            max_interval: retry_delay * 32,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            match self.fetcher.fetch(url, config.timeout()).await {
                Err(e) if e.is_transient() && attempt < config.max_retries => {
                    attempt += 1;
                    let delay = backoff.next_backoff().unwrap_or(retry_delay);
                    warn!("Attempt {} failed for {}, retrying in {:?}: {}", attempt, url, delay, e);
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

/// Runs one fetch-parse-filter pipeline per source and merges the results.
pub struct Aggregator {
    pipeline: Arc<SourcePipeline>,
    cache: Option<Arc<FeedCache>>,
    pass_deadline: Option<Duration>,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        let fetcher = Fetcher::new(config.fetch)?;
        let cache = config
            .cache_ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| Arc::new(FeedCache::new(ttl)));

        Ok(Self {
            pipeline: Arc::new(SourcePipeline {
                fetcher,
                max_items: config.max_items_per_source,
            }),
            cache,
            pass_deadline: config.pass_deadline,
        })
    }

    /// Single-source path used before a subscription is saved. Never cached,
    /// and errors are handed back to the caller.
    pub async fn preview(&self, url: &str, keywords: &Keywords) -> std::result::Result<ParsedFeed, SourceError> {
        info!("Previewing feed {} with keywords '{}'", url, keywords);
        self.pipeline.run(url, keywords).await
    }

    /// Fetches every source concurrently and merges surviving items in
    /// source order. Per-source failures are recorded in the report and
    /// never fail the pass.
    pub async fn aggregate(&self, title: &str, sources: &[SourceDescriptor]) -> AggregationReport {
        let started = Instant::now();
        let deadline = self.pass_deadline.map(|d| started + d);

        let handles: Vec<_> = sources
            .iter()
            .map(|source| (source.id, self.spawn_source(source.clone())))
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (source_id, mut handle) in handles {
            let joined = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        handle.abort();
                        let error = FetchError::Timeout(deadline - started);
                        outcomes.push(FetchOutcome::failure(source_id, &SourceError::from(error)));
                        continue;
                    }
                },
                None => (&mut handle).await,
            };

            outcomes.push(match joined {
                Ok(outcome) => outcome,
                // A panic while parsing must only cost this one source.
                Err(e) if e.is_panic() => FetchOutcome::Failure {
                    source_id,
                    kind: ErrorKind::MalformedFeed,
                    message: "feed pipeline panicked".to_string(),
                },
                Err(e) => FetchOutcome::Failure {
                    source_id,
                    kind: ErrorKind::Network,
                    message: format!("source pipeline cancelled: {}", e),
                },
            });
        }

        for outcome in &outcomes {
            if let FetchOutcome::Failure { source_id, kind, message } = outcome {
                warn!("Source {} failed ({}): {}", source_id, kind, message);
            }
        }

        let merged = MergedFeed::merge(title, &outcomes);
        info!(
            "Aggregated {} sources ({} ok) into {} items in {}ms",
            sources.len(),
            outcomes.iter().filter(|o| o.is_success()).count(),
            merged.items.len(),
            started.elapsed().as_millis()
        );

        AggregationReport { merged, outcomes }
    }

    fn spawn_source(&self, source: SourceDescriptor) -> JoinHandle<FetchOutcome> {
        let pipeline = self.pipeline.clone();
        let cache = self.cache.clone();

        tokio::spawn(async move {
            let keywords = Keywords::parse(&source.keyword_filter);
            let result = match cache {
                Some(cache) => {
                    let url = source.url.clone();
                    let task_keywords = keywords.clone();
                    cache
                        .get_or_fetch(CacheKey::from(&source), move || async move {
                            pipeline.run(&url, &task_keywords).await
                        })
                        .await
                }
                None => pipeline.run(&source.url, &keywords).await,
            };
            FetchOutcome::from_result(source.id, result)
        })
    }
}
