//! API endpoints.

mod auth;
mod comments;
mod communities;
mod feed;
mod posts;
mod users;

use agora_common::AppError;
use agora_db::entities::vote::Polarity;
use axum::{Json, Router, routing::get};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(communities::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(feed::router())
        .merge(users::router())
}

async fn health() -> Json<Value> {
    Json(json!({ "healthy": true }))
}

/// Body of the vote endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    vote_value: i64,
}

impl VoteRequest {
    fn polarity(&self) -> Result<Polarity, AppError> {
        Polarity::from_value(self.vote_value)
            .ok_or_else(|| AppError::Validation("voteValue must be 1 or -1".to_string()))
    }
}
