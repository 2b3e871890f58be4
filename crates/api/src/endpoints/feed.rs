//! Feed endpoints.

use agora_common::AppResult;
use agora_core::PageParams;
use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};

use crate::{extractors::AuthUser, middleware::AppState, response::Paged, views::PostView};

/// Posts from the caller's subscribed communities.
async fn home(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Paged<PostView>> {
    let page = state.feed_service.home(params, &identity.user_id).await?;
    Ok(Paged::from_page(page, PostView::from))
}

/// Posts from every community.
async fn all(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Paged<PostView>> {
    let page = state.feed_service.all(params, &identity.user_id).await?;
    Ok(Paged::from_page(page, PostView::from))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed/home", get(home))
        .route("/feed/all", get(all))
}
