use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::render::{render, RSS_CONTENT_TYPE};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub token: Option<String>,
}

/// Merged feed of the user owning `token`.
///
/// Broken subscriptions only shrink the document; the response is a valid
/// feed as long as the token and the store are fine.
pub async fn get_merged_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Response> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("missing feed token"))?;

    let user_id = state
        .store
        .user_by_token(&token)
        .await?
        .ok_or_else(|| AppError::not_found("unknown feed token"))?;

    let sources = state.store.list_sources(user_id).await?;
    let report = state.aggregator.aggregate(&state.feed_title, &sources).await;

    info!(
        "Serving merged feed for user {}: {} items, {} failed sources",
        user_id,
        report.merged.items.len(),
        report.failures().count()
    );

    let body = render(&report.merged);
    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], body).into_response())
}
