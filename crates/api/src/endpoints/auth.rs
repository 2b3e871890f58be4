//! Authentication endpoints.

use agora_common::AppResult;
use agora_core::{Identity, LoginInput, RegisterInput};
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create a new account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<ApiResponse<Identity>> {
    let user = state.session_service.register(input).await?;

    Ok(ApiResponse::created(Identity {
        user_id: user.id,
        username: user.username,
    }))
}

/// Sign in and set the session cookie.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> AppResult<impl IntoResponse> {
    let session = state.session_service.login(input).await?;
    tracing::info!(user_id = %session.identity.user_id, "User logged in");

    let jar = jar.add(state.cookie.session(session.token, session.max_age_secs));
    Ok((jar, ApiResponse::ok(session.identity)))
}

/// Clear the session cookie.
async fn logout(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> impl IntoResponse {
    tracing::debug!(user_id = %identity.user_id, "User logged out");

    // Added rather than removed: a Bearer caller has no cookie in the jar.
    (
        jar.add(state.cookie.cleared()),
        ApiResponse::ok(serde_json::json!({ "loggedOut": true })),
    )
}

/// The signed-in caller.
async fn me(AuthUser(identity): AuthUser) -> ApiResponse<Identity> {
    ApiResponse::ok(identity)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}
