// Shared fixtures: sample feeds and an in-process HTTP server that serves them.
#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use interfaces::SourceDescriptor;
use rss_merger::{Aggregator, AggregatorConfig, FetchConfig};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();
    });
}

pub const SINGLE_ITEM_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Single</title>
    <link>https://example.com/</link>
    <item>
      <title>Only episode</title>
      <link>https://example.com/only</link>
    </item>
  </channel>
</rss>"#;

pub const ANIME_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Mikan Project - 葬送的芙莉莲</title>
    <item>
      <title>[LoliHouse] 葬送的芙莉莲 - 01 [1080p 简日内嵌]</title>
      <link>https://mikanani.me/Home/Episode/aaa</link>
    </item>
    <item>
      <title>[LoliHouse] 葬送的芙莉莲 - 01 [720p 简日内嵌]</title>
      <link>https://mikanani.me/Home/Episode/bbb</link>
    </item>
    <item>
      <title>[Nekomoe] 葬送的芙莉莲 - 02 [1080p 简日双语]</title>
      <link>https://mikanani.me/Home/Episode/ccc</link>
    </item>
  </channel>
</rss>"#;

pub const TWO_ITEM_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Blog</title>
    <item><title>First post</title><link>https://blog.example.com/1</link></item>
    <item><title>Second post</title><link>https://blog.example.com/2</link></item>
  </channel>
</rss>"#;

pub const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Quiet</title></channel></rss>"#;

pub const MALFORMED_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Broken</title><item><title>x</link></item></channel></rss>"#;

/// Well-formed markup carrying a character XML 1.0 forbids.
pub const CONTROL_CHAR_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Noisy</title><item><title>bell &#7; here</title><link>https://example.com/bell</link></item></channel></rss>"#;

/// How long `/slow.xml` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(3);

fn rss(body: &'static str) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/rss+xml")], body)
}

async fn versioned(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    let version = hits.fetch_add(1, Ordering::SeqCst) + 1;
    let body = format!(
        r#"<rss version="2.0"><channel><title>Versioned</title><item><title>v{0}</title><link>https://example.com/v{0}</link></item></channel></rss>"#,
        version
    );
    ([(header::CONTENT_TYPE, "application/rss+xml")], body)
}

pub struct FeedServer {
    pub addr: SocketAddr,
    /// Requests served by `/versioned.xml`.
    pub versioned_hits: Arc<AtomicUsize>,
}

impl FeedServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.versioned_hits.load(Ordering::SeqCst)
    }
}

pub async fn spawn_feed_server() -> FeedServer {
    let versioned_hits = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route("/single.xml", get(|| async { rss(SINGLE_ITEM_FEED) }))
        .route("/anime.xml", get(|| async { rss(ANIME_FEED) }))
        .route("/two.xml", get(|| async { rss(TWO_ITEM_FEED) }))
        .route("/empty.xml", get(|| async { rss(EMPTY_FEED) }))
        .route("/malformed.xml", get(|| async { rss(MALFORMED_FEED) }))
        .route("/control.xml", get(|| async { rss(CONTROL_CHAR_FEED) }))
        .route(
            "/slow.xml",
            get(|| async {
                tokio::time::sleep(SLOW_DELAY).await;
                rss(TWO_ITEM_FEED)
            }),
        )
        .route("/missing.xml", get(|| async { StatusCode::NOT_FOUND }))
        .route("/boom.xml", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/versioned.xml", get(versioned))
        .with_state(versioned_hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FeedServer { addr, versioned_hits }
}

/// A local URL nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/feed.xml", addr)
}

pub fn test_fetch_config() -> FetchConfig {
    FetchConfig {
        user_agent: "rss-merger-test/1.0".to_string(),
        timeout_seconds: 1,
        max_retries: 0,
        retry_delay_seconds: 0,
        max_feed_size_mb: 10,
        max_redirects: 5,
    }
}

pub fn test_aggregator() -> Aggregator {
    Aggregator::new(AggregatorConfig {
        fetch: test_fetch_config(),
        ..AggregatorConfig::default()
    })
    .unwrap()
}

pub fn source(id: i64, url: String, keywords: &str) -> SourceDescriptor {
    SourceDescriptor {
        id,
        owner_user_id: 1,
        url,
        display_name: format!("source {}", id),
        keyword_filter: keywords.to_string(),
    }
}
