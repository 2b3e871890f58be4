//! Community endpoints.

use agora_common::AppResult;
use agora_core::{CreateCommunityInput, PageParams};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Paged},
    views::{CommunityView, PostView},
};

/// Create a community moderated by the caller.
async fn create(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCommunityInput>,
) -> AppResult<ApiResponse<CommunityView>> {
    let community = state
        .community_service
        .create(&identity.user_id, input)
        .await?;

    Ok(ApiResponse::created(community.into()))
}

/// Community details with the caller's membership.
async fn show(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<ApiResponse<CommunityView>> {
    let details = state
        .community_service
        .details(&name, &identity.user_id)
        .await?;

    Ok(ApiResponse::ok(details.into()))
}

/// Subscribe or unsubscribe.
async fn toggle_subscription(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<ApiResponse<Value>> {
    let subscribed = state
        .community_service
        .toggle_subscription(&name, &identity.user_id)
        .await?;

    Ok(ApiResponse::ok(json!({ "subscribed": subscribed })))
}

/// Posts of the community, newest first.
async fn posts(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Paged<PostView>> {
    let page = state
        .feed_service
        .community(&name, params, &identity.user_id)
        .await?;

    Ok(Paged::from_page(page, PostView::from))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/community", post(create))
        .route("/community/{name}", get(show))
        .route("/community/{name}/subscribe", post(toggle_subscription))
        .route("/community/{name}/posts", get(posts))
}
