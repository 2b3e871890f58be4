//! API integration tests.
//!
//! These drive the full router, including the auth middleware, against a
//! mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use agora_api::{AppState, auth_middleware, router as api_router};
use agora_common::config::{
    AuthConfig, Config, DatabaseConfig, PaginationConfig, RateLimitSettings, ServerConfig,
};
use agora_db::entities::{community, post, user};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware::from_fn_with_state,
    response::Response,
};
use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Create a test configuration.
fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            frontend_url: None,
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: "integration-secret".to_string(),
            session_ttl_hours: 3,
            cookie_name: "authToken".to_string(),
            secure_cookie: false,
        },
        pagination: PaginationConfig::default(),
        rate_limit: RateLimitSettings::default(),
    }
}

fn create_test_user(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        username_lower: username.to_lowercase(),
        email: format!("{}@example.com", username.to_lowercase()),
        password_hash: "not-a-real-hash".to_string(),
        created_at: Utc::now().into(),
    }
}

/// Create the test router and its state over `db`.
fn create_test_app(db: DatabaseConnection) -> (Router, AppState) {
    let state = AppState::new(Arc::new(db), &create_test_config());
    let app = api_router()
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state.clone());
    (app, state)
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn bearer(state: &AppState, user: &user::Model) -> String {
    let session = state.session_service.issue(user).unwrap();
    format!("Bearer {}", session.token)
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = create_test_app(empty_db());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["healthy"], true);
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let (app, _) = create_test_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_protected_route_requires_session() {
    let (app, _) = create_test_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/feed/all")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let (app, _) = create_test_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::AUTHORIZATION, "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let alice = create_test_user("u1", "Alice_01");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[alice.clone()]])
        .into_connection();
    let (app, state) = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::AUTHORIZATION, bearer(&state, &alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["userId"], "u1");
    assert_eq!(body["data"]["username"], "Alice_01");
}

#[tokio::test]
async fn test_me_with_session_cookie() {
    let alice = create_test_user("u1", "Alice_01");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[alice.clone()]])
        .into_connection();
    let (app, state) = create_test_app(db);
    let token = state.session_service.issue(&alice).unwrap().token;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::COOKIE, format!("theme=dark; authToken={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_of_deleted_user_is_unauthorized() {
    let alice = create_test_user("u1", "Alice_01");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let (app, state) = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::AUTHORIZATION, bearer(&state, &alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let alice = create_test_user("u1", "Alice_01");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[alice.clone()]])
        .into_connection();
    let (app, state) = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/logout")
                .method("POST")
                .header(header::AUTHORIZATION, bearer(&state, &alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("authToken=;"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_register_with_invalid_json_returns_error() {
    let (app, _) = create_test_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/register")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("invalid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_register_with_weak_password() {
    let (app, _) = create_test_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/register")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"email":"bob@example.com","username":"bob_builder","password":"password123"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_with_unknown_email() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let (app, _) = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/login")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"email":"nobody@example.com","password":"Secret123!"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_vote_value_must_be_one_or_minus_one() {
    let alice = create_test_user("u1", "Alice_01");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[alice.clone()]])
        .into_connection();
    let (app, state) = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/post/rust/p1/vote")
                .method("POST")
                .header(header::AUTHORIZATION, bearer(&state, &alice))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"voteValue":0}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_bookmarks_of_other_user_are_forbidden() {
    let alice = create_test_user("u1", "Alice_01");
    let bob = create_test_user("u2", "Bob_0001");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[alice.clone()]])
        .append_query_results([[bob]])
        .into_connection();
    let (app, state) = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/user/Bob_0001/bookmarks")
                .header(header::AUTHORIZATION, bearer(&state, &alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_all_feed_empty_page() {
    let alice = create_test_user("u1", "Alice_01");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[alice.clone()]])
        .append_query_results([Vec::<post::Model>::new()])
        .into_connection();
    let (app, state) = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/feed/all?limit=5")
                .header(header::AUTHORIZATION, bearer(&state, &alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"], serde_json::json!([]));
    assert!(body["meta"]["nextCursor"].is_null());
}

#[tokio::test]
async fn test_blank_paging_params_use_defaults() {
    for uri in ["/feed/all?limit=&cursor=", "/feed/all?limit=abc", "/feed/all?limit=0"] {
        let alice = create_test_user("u1", "Alice_01");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[alice.clone()]])
            .append_query_results([Vec::<post::Model>::new()])
            .into_connection();
        let (app, state) = create_test_app(db);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::AUTHORIZATION, bearer(&state, &alice))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert!(json_body(response).await["meta"]["nextCursor"].is_null());
    }
}

#[test]
fn test_blank_limit_deserializes_to_none() {
    use agora_core::PageParams;
    use axum::{extract::Query, http::Uri};

    let uri: Uri = "/comments/x/replies?limit=&cursor=".parse().unwrap();
    let Query(params) = Query::<PageParams>::try_from_uri(&uri).unwrap();
    assert_eq!(params.limit, None);
    assert_eq!(params.resolve(4, 100).limit, 4);

    let uri: Uri = "/comments/x/replies?limit=7".parse().unwrap();
    let Query(params) = Query::<PageParams>::try_from_uri(&uri).unwrap();
    assert_eq!(params.limit, Some(7));
}

#[tokio::test]
async fn test_unknown_cursor_is_rejected() {
    let alice = create_test_user("u1", "Alice_01");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[alice.clone()]])
        .append_query_results([Vec::<post::Model>::new()])
        .into_connection();
    let (app, state) = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/feed/home?cursor=does-not-exist")
                .header(header::AUTHORIZATION, bearer(&state, &alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_community_details() {
    let alice = create_test_user("u1", "Alice_01");
    let rust = community::Model {
        id: "c1".to_string(),
        name: "Rust".to_string(),
        normalized_name: "rust".to_string(),
        description: Some("Systems programming".to_string()),
        subscribers_count: 1,
        created_at: Utc::now().into(),
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[alice.clone()]])
        .append_query_results([[rust]])
        .append_query_results([Vec::<agora_db::entities::subscription::Model>::new()])
        .into_connection();
    let (app, state) = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/community/RUST")
                .header(header::AUTHORIZATION, bearer(&state, &alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["normalizedName"], "rust");
    assert_eq!(body["data"]["isSubscribed"], false);
    assert_eq!(body["data"]["subscribersCount"], 1);
}
