pub mod types;
pub mod rss_utils;
pub mod fetcher;
pub mod parser;
pub mod filter;
pub mod cache;
pub mod aggregator;
pub mod render;
pub mod error;
pub mod handlers;
pub mod server;
pub mod config;

pub use types::*;
pub use fetcher::Fetcher;
pub use filter::{filter_items, Keywords};
pub use cache::{CacheKey, FeedCache};
pub use aggregator::{Aggregator, AggregatorConfig};
pub use render::render;
pub use server::{create_app, AppState};
