//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use agora_common::Config;
use agora_core::{
    CommentService, CommunityService, FeedService, PostService, Projector, SessionService,
    SqlVoteStore, UserService, VoteEngine,
};
use agora_db::repositories::{
    BookmarkRepository, CommentRepository, CommunityRepository, PostRepository, UserRepository,
    VoteRepository,
};
use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sea_orm::DatabaseConnection;

/// How the session cookie is written.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

impl CookieSettings {
    fn base(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    /// Session cookie carrying `token`.
    #[must_use]
    pub fn session(&self, token: String, max_age_secs: i64) -> Cookie<'static> {
        let mut cookie = self.base(token);
        cookie.set_max_age(time::Duration::seconds(max_age_secs));
        cookie
    }

    /// Expired cookie that makes the browser drop the session.
    #[must_use]
    pub fn cleared(&self) -> Cookie<'static> {
        let mut cookie = self.base(String::new());
        cookie.make_removal();
        cookie
    }
}

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub session_service: SessionService,
    pub community_service: CommunityService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub feed_service: FeedService,
    pub user_service: UserService,
    pub cookie: CookieSettings,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let community_repo = CommunityRepository::new(Arc::clone(&db));
        let post_repo = PostRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(Arc::clone(&db));
        let bookmark_repo = BookmarkRepository::new(Arc::clone(&db));

        let votes = VoteEngine::new(Arc::new(SqlVoteStore::new(vote_repo.clone())));
        let projector = Projector::new(
            user_repo.clone(),
            community_repo.clone(),
            vote_repo,
            bookmark_repo.clone(),
        );
        let pagination = config.pagination.clone();

        Self {
            session_service: SessionService::new(user_repo.clone(), config),
            community_service: CommunityService::new(community_repo.clone()),
            post_service: PostService::new(
                post_repo.clone(),
                community_repo.clone(),
                comment_repo.clone(),
                bookmark_repo,
                votes.clone(),
                projector.clone(),
                pagination.clone(),
            ),
            comment_service: CommentService::new(
                comment_repo.clone(),
                post_repo.clone(),
                community_repo.clone(),
                votes,
                projector.clone(),
                pagination.clone(),
            ),
            feed_service: FeedService::new(
                post_repo.clone(),
                community_repo,
                projector.clone(),
                pagination.clone(),
            ),
            user_service: UserService::new(user_repo, post_repo, comment_repo, projector, pagination),
            cookie: CookieSettings {
                name: config.auth.cookie_name.clone(),
                secure: config.auth.secure_cookie,
            },
        }
    }
}

/// Session token from the cookie, or from an `Authorization: Bearer` header.
fn session_token(req: &Request<Body>, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(req.headers());
    if let Some(cookie) = jar.get(cookie_name) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(ToString::to_string)
}

/// Authentication middleware.
///
/// Places the caller's [`agora_core::Identity`] in the request extensions
/// when a valid session token is presented. Handlers that require a caller
/// reject requests without one.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = session_token(&req, &state.cookie.name) {
        match state.session_service.authenticate(&token).await {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring session token"),
        }
    }

    next.run(req).await
}
