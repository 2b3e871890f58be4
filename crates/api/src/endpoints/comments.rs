//! Comment endpoints.

use agora_common::AppResult;
use agora_core::PageParams;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use super::VoteRequest;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Paged},
    views::CommentView,
};

/// Direct replies of a comment, newest first.
async fn replies(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Paged<CommentView>> {
    let page = state
        .comment_service
        .replies(&comment_id, params, &identity.user_id)
        .await?;

    Ok(Paged::from_page(page, CommentView::from))
}

async fn vote(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<CommentView>> {
    let polarity = req.polarity()?;
    let details = state
        .comment_service
        .vote(&comment_id, &identity.user_id, polarity)
        .await?;

    Ok(ApiResponse::ok(details.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments/{comment_id}/replies", get(replies))
        .route("/comments/{comment_id}/vote", post(vote))
}
