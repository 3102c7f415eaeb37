use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;

use crate::aggregator::AggregatorConfig;
use crate::types::FetchConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "rss-merger", version, about = "Merges keyword-filtered RSS feeds into one per-user feed")]
pub struct Config {
    /// SQLite database holding users and their subscriptions
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://rss-merger.db?mode=rwc", global = true)]
    pub database_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the merged feed and preview endpoints
    Serve(ServeArgs),
    /// Register a user and print the token for their merged feed
    AddUser {
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        email: String,
    },
    /// Subscribe a user to a feed
    AddFeed {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        /// Space-separated keywords that every kept title must contain
        #[arg(long, default_value = "")]
        keywords: String,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServeArgs {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Channel title of every merged feed
    #[arg(long, env = "MERGED_FEED_TITLE", default_value = "MIOR")]
    pub feed_title: String,

    #[arg(long, env = "FETCH_TIMEOUT_SECONDS", default_value_t = 30)]
    pub timeout_seconds: u64,

    /// Bound on one whole aggregation pass, 0 for none
    #[arg(long, env = "PASS_DEADLINE_SECONDS", default_value_t = 0)]
    pub pass_deadline_seconds: u64,

    /// Per-source cache freshness window, 0 disables the cache
    #[arg(long, env = "CACHE_TTL_SECONDS", default_value_t = 300)]
    pub cache_ttl_seconds: u64,

    /// Items kept per source before filtering, 0 for all
    #[arg(long, env = "MAX_ITEMS_PER_SOURCE", default_value_t = 0)]
    pub max_items_per_source: usize,

    /// Extra attempts after a network error or timeout
    #[arg(long, env = "FETCH_MAX_RETRIES", default_value_t = 0)]
    pub max_retries: u32,

    #[arg(long, env = "FETCH_USER_AGENT", default_value = "rss-merger/0.1")]
    pub user_agent: String,
}

impl ServeArgs {
    pub fn aggregator_config(&self) -> AggregatorConfig {
        let non_zero_secs = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

        AggregatorConfig {
            fetch: FetchConfig {
                user_agent: self.user_agent.clone(),
                timeout_seconds: self.timeout_seconds,
                max_retries: self.max_retries,
                ..FetchConfig::default()
            },
            pass_deadline: non_zero_secs(self.pass_deadline_seconds),
            cache_ttl: non_zero_secs(self.cache_ttl_seconds),
            max_items_per_source: (self.max_items_per_source > 0).then_some(self.max_items_per_source),
        }
    }
}
