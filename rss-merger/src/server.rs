use axum::{routing::get, Router};
use interfaces::SubscriptionStore;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::Aggregator;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubscriptionStore>,
    pub aggregator: Arc<Aggregator>,
    /// Channel title of every merged feed.
    pub feed_title: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        aggregator: Arc<Aggregator>,
        feed_title: impl Into<String>,
    ) -> Self {
        Self {
            store,
            aggregator,
            feed_title: feed_title.into(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/rss", get(handlers::feed::get_merged_feed))
        .route("/api/fetch", get(handlers::preview::preview_feed))
        .route("/api/health", get(handlers::health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
