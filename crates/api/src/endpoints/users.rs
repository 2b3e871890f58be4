//! User endpoints.

use agora_common::AppResult;
use agora_core::PageParams;
use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Paged},
    views::{CommunityName, PostView, ProfileView},
};

/// Communities the caller subscribes to.
async fn communities(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<CommunityName>>> {
    let communities = state
        .community_service
        .subscribed(&identity.user_id)
        .await?;

    Ok(ApiResponse::ok(
        communities.into_iter().map(Into::into).collect(),
    ))
}

async fn profile(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<ProfileView>> {
    let profile = state
        .user_service
        .profile(&username, &identity.user_id)
        .await?;

    Ok(ApiResponse::ok(profile.into()))
}

async fn posts(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Paged<PostView>> {
    let page = state
        .user_service
        .submitted_posts(&username, params, &identity.user_id)
        .await?;

    Ok(Paged::from_page(page, PostView::from))
}

/// Bookmarked posts. Only visible to their owner.
async fn bookmarks(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Paged<PostView>> {
    let page = state
        .user_service
        .bookmarks(&username, params, &identity.user_id)
        .await?;

    Ok(Paged::from_page(page, PostView::from))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/communities", get(communities))
        .route("/user/{username}", get(profile))
        .route("/user/{username}/posts", get(posts))
        .route("/user/{username}/bookmarks", get(bookmarks))
}
