use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::filter::Keywords;
use crate::server::AppState;
use crate::types::ParsedFeed;

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub url: Option<String>,
    #[serde(default)]
    pub keywords: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewItem {
    pub index: usize,
    pub title: String,
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub title: String,
    pub items: Vec<PreviewItem>,
}

impl From<ParsedFeed> for PreviewResponse {
    fn from(feed: ParsedFeed) -> Self {
        Self {
            title: feed.title,
            items: feed
                .items
                .into_iter()
                .map(|item| PreviewItem {
                    index: item.sequence_index,
                    title: item.title,
                    link: item.link,
                })
                .collect(),
        }
    }
}

// Lets a user check a URL and keyword string before saving the subscription.
pub async fn preview_feed(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> AppResult<Json<PreviewResponse>> {
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("missing feed url"))?;

    let keywords = Keywords::parse(&query.keywords);
    let feed = state.aggregator.preview(&url, &keywords).await?;
    Ok(Json(feed.into()))
}
