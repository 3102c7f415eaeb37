mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::*;
use http_body_util::BodyExt;
use interfaces::SqliteSubscriptionStore;
use rss_merger::parser::parse;
use rss_merger::{create_app, AppState};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    token: String,
}

async fn memory_store() -> SqliteSubscriptionStore {
    let store = SqliteSubscriptionStore::connect("sqlite::memory:").await.unwrap();
    store.setup_schema().await.unwrap();
    store
}

fn app_with(store: SqliteSubscriptionStore) -> Router {
    let state = AppState::new(Arc::new(store), Arc::new(test_aggregator()), "MIOR");
    create_app(state)
}

async fn app_with_subscriptions(server: &FeedServer) -> TestApp {
    let store = memory_store().await;
    let (user_id, token) = store.create_user("tester", "tester@example.com").await.unwrap();
    store
        .add_source(user_id, "Frieren", &server.url("/anime.xml"), "1080p 简日")
        .await
        .unwrap();
    store
        .add_source(user_id, "Broken", &server.url("/missing.xml"), "")
        .await
        .unwrap();
    store
        .add_source(user_id, "Blog", &server.url("/two.xml"), "")
        .await
        .unwrap();

    TestApp {
        app: app_with(store),
        token,
    }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, content_type, body)
}

fn query(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

#[tokio::test]
async fn test_merged_feed_for_valid_token() {
    init_tracing();
    let server = spawn_feed_server().await;
    let test_app = app_with_subscriptions(&server).await;

    let (status, content_type, body) =
        get(&test_app.app, &format!("/rss?token={}", test_app.token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/rss+xml; charset=utf-8"));
    let feed = parse(&body).unwrap();
    assert_eq!(feed.title, "MIOR");
    let titles: Vec<&str> = feed.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "[LoliHouse] 葬送的芙莉莲 - 01 [1080p 简日内嵌]",
            "[Nekomoe] 葬送的芙莉莲 - 02 [1080p 简日双语]",
            "First post",
            "Second post",
        ]
    );
}

#[tokio::test]
async fn test_user_without_sources_gets_empty_feed() {
    init_tracing();
    let store = memory_store().await;
    let (_, token) = store.create_user("new", "new@example.com").await.unwrap();
    let app = app_with(store);

    let (status, _, body) = get(&app, &format!("/rss?token={}", token)).await;

    assert_eq!(status, StatusCode::OK);
    let feed = parse(&body).unwrap();
    assert!(feed.items.is_empty());
}

#[tokio::test]
async fn test_unknown_token_is_not_found() {
    init_tracing();
    let app = app_with(memory_store().await);

    let (status, _, body) = get(&app, "/rss?token=0123456789abcdef0123456789abcdef").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status_code"], 404);
}

#[tokio::test]
async fn test_missing_token_is_bad_request() {
    init_tracing();
    let app = app_with(memory_store().await);

    for uri in ["/rss", "/rss?token=", "/rss?token=%20%20"] {
        let (status, _, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_store_failure_is_server_error() {
    init_tracing();
    // No schema: every query fails.
    let store = SqliteSubscriptionStore::connect("sqlite::memory:").await.unwrap();
    let app = app_with(store);

    let (status, _, body) = get(&app, "/rss?token=anything").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "storage_unavailable");
}

#[tokio::test]
async fn test_preview_lists_filtered_items() {
    init_tracing();
    let server = spawn_feed_server().await;
    let app = app_with(memory_store().await);
    let uri = format!(
        "/api/fetch?{}",
        query(&[("url", server.url("/anime.xml").as_str()), ("keywords", "1080p 简日")])
    );

    let (status, content_type, body) = get(&app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["title"], "Mikan Project - 葬送的芙莉莲");
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["index"], 0);
    assert_eq!(items[1]["index"], 2);
    assert_eq!(items[1]["link"], "https://mikanani.me/Home/Episode/ccc");
}

#[tokio::test]
async fn test_preview_without_keywords_lists_everything() {
    init_tracing();
    let server = spawn_feed_server().await;
    let app = app_with(memory_store().await);
    let uri = format!("/api/fetch?{}", query(&[("url", server.url("/two.xml").as_str())]));

    let (status, _, body) = get(&app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_preview_reports_source_error_kind() {
    init_tracing();
    let server = spawn_feed_server().await;
    let app = app_with(memory_store().await);
    let cases = [
        (server.url("/missing.xml"), "http_status"),
        (server.url("/malformed.xml"), "malformed_feed"),
        ("ftp://example.com/feed.xml".to_string(), "invalid_url"),
    ];

    for (url, expected) in cases {
        let uri = format!("/api/fetch?{}", query(&[("url", url.as_str())]));
        let (status, _, body) = get(&app, &uri).await;

        assert_eq!(status, StatusCode::FAILED_DEPENDENCY, "{}", url);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], expected, "{}", url);
        assert_eq!(json["status_code"], 424);
    }
}

#[tokio::test]
async fn test_preview_requires_url() {
    init_tracing();
    let app = app_with(memory_store().await);

    for uri in ["/api/fetch?keywords=x", "/api/fetch?url=&keywords=x", "/api/fetch"] {
        let (status, content_type, body) = get(&app, uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(content_type.as_deref(), Some("application/json"), "{}", uri);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "bad_request");
        assert_eq!(json["status_code"], 400);
    }
}

#[tokio::test]
async fn test_health_check() {
    init_tracing();
    let app = app_with(memory_store().await);

    let (status, _, body) = get(&app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}
