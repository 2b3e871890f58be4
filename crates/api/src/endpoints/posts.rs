//! Post endpoints.

use agora_common::AppResult;
use agora_core::{CreateCommentInput, CreatePostInput, PageParams};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde_json::{Value, json};

use super::VoteRequest;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Paged},
    views::{CommentView, PostThreadView, PostView},
};

/// Create a post in a community.
async fn create(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(community): Path<String>,
    Json(input): Json<CreatePostInput>,
) -> AppResult<ApiResponse<PostView>> {
    let details = state
        .post_service
        .create(&community, &identity.user_id, input)
        .await?;

    Ok(ApiResponse::created(details.into()))
}

/// A post with the first page of its comments.
async fn show(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((community, post_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<PostThreadView>> {
    let thread = state
        .post_service
        .get(&community, &post_id, &identity.user_id)
        .await?;

    Ok(ApiResponse::ok(PostThreadView {
        post: thread.post.into(),
        comments: thread.comments.items.into_iter().map(Into::into).collect(),
        next_cursor: thread.comments.next_cursor,
    }))
}

async fn vote(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((community, post_id)): Path<(String, String)>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<PostView>> {
    let polarity = req.polarity()?;
    let details = state
        .post_service
        .vote(&community, &post_id, &identity.user_id, polarity)
        .await?;

    Ok(ApiResponse::ok(details.into()))
}

async fn toggle_bookmark(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((community, post_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<Value>> {
    let bookmarked = state
        .post_service
        .toggle_bookmark(&community, &post_id, &identity.user_id)
        .await?;

    Ok(ApiResponse::ok(json!({ "bookmarked": bookmarked })))
}

async fn create_comment(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((community, post_id)): Path<(String, String)>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<CommentView>> {
    let details = state
        .comment_service
        .create(&community, &post_id, &identity.user_id, input)
        .await?;

    Ok(ApiResponse::created(details.into()))
}

/// Top-level comments of a post, newest first.
async fn comments(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((community, post_id)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> AppResult<Paged<CommentView>> {
    let page = state
        .comment_service
        .top_level(&community, &post_id, params, &identity.user_id)
        .await?;

    Ok(Paged::from_page(page, CommentView::from))
}

async fn reply(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((community, post_id, comment_id)): Path<(String, String, String)>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<CommentView>> {
    let details = state
        .comment_service
        .reply(&community, &post_id, &comment_id, &identity.user_id, input)
        .await?;

    Ok(ApiResponse::created(details.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/{community}", post(create))
        .route("/post/{community}/{post_id}", get(show))
        .route("/post/{community}/{post_id}/vote", post(vote))
        .route("/post/{community}/{post_id}/bookmark", post(toggle_bookmark))
        .route(
            "/post/{community}/{post_id}/comments",
            get(comments).post(create_comment),
        )
        .route(
            "/post/{community}/{post_id}/comments/{comment_id}/reply",
            post(reply),
        )
}
