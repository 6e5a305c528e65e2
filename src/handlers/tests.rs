//! # Tests for Handlers
//!
//! End-to-end handler tests running the full router against an in-memory
//! database.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::auth::Role;
use crate::config::AppConfig;
use crate::repositories::CommunityRepository;
use crate::repositories::community::CreateCommunityRequest;
use crate::server::{AppState, create_app, create_test_app_state};

async fn setup_test_app() -> (AppState, Router) {
    let config = AppConfig {
        profile: "test".to_string(),
        superadmin_email: Some("root@example.com".to_string()),
        crypto_key: Some(vec![7u8; 32]),
        ..AppConfig::default()
    };

    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let communities = CommunityRepository::new(&db);
    for slug in ["default", "sunrise-court"] {
        communities
            .create(CreateCommunityRequest {
                slug: slug.to_string(),
                name: None,
                credentials_ciphertext: None,
            })
            .await
            .unwrap();
    }

    let state = create_test_app_state(config, db);
    let app = create_app(state.clone());
    (state, app)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Register an account and return its bearer token.
async fn sign_up(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/auth/sign-up",
        None,
        Some(json!({ "email": email, "password": "correct horse battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "sign-up failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

/// Promote an account by email; handler paths only allow this for system
/// admins, so tests adjust roles directly through the repository.
async fn set_role(state: &AppState, email: &str, role: Role) {
    let repo = crate::repositories::PrincipalRepository::new(&state.db);
    let principal = repo.find_by_email(email).await.unwrap().unwrap();
    repo.set_role(principal.id, role).await.unwrap();
}

#[tokio::test]
async fn root_reports_service_info() {
    let (_state, app) = setup_test_app().await;

    let (status, body) = send(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "courtyard");
}

#[tokio::test]
async fn health_probe_reports_ok() {
    let (_state, app) = setup_test_app().await;

    let (status, _) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn sign_up_then_sign_in_round_trip() {
    let (_state, app) = setup_test_app().await;

    sign_up(&app, "resident@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/sign-in",
        None,
        Some(json!({ "email": "Resident@Example.com", "password": "correct horse battery" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["principal"]["role"], "resident");
    assert_eq!(body["data"]["principal"]["community_slug"], "default");
    assert!(body["data"]["token"].as_str().is_some());
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (_state, app) = setup_test_app().await;
    sign_up(&app, "resident@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/sign-in",
        None,
        Some(json!({ "email": "resident@example.com", "password": "nope nope nope" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn first_sign_in_auto_provisions_a_resident() {
    let (_state, app) = setup_test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/sign-in",
        None,
        Some(json!({ "email": "new@example.com", "password": "correct horse battery" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["principal"]["role"], "resident");
    assert_eq!(body["data"]["principal"]["community_slug"], "default");

    // Second sign-in reuses the account and still checks the password.
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/sign-in",
        None,
        Some(json!({ "email": "new@example.com", "password": "something else" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let (_state, app) = setup_test_app().await;

    let (status, body) = send(&app, "GET", "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some("bogus-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_out_revokes_the_session() {
    let (_state, app) = setup_test_app().await;
    let token = sign_up(&app, "resident@example.com").await;

    let (status, _) = send(&app, "POST", "/api/v1/auth/sign-out", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn resident_is_refused_admin_area_and_loses_session() {
    let (_state, app) = setup_test_app().await;
    let token = sign_up(&app, "resident@example.com").await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/communities/default/principals",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // The refusal revoked the session.
    let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn superadmin_email_reaches_the_system_console() {
    let (_state, app) = setup_test_app().await;
    let token = sign_up(&app, "root@example.com").await;

    let (status, body) = send(&app, "GET", "/api/v1/communities", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn disabled_account_is_rejected_with_distinct_code() {
    let (state, app) = setup_test_app().await;
    let admin_token = sign_up(&app, "root@example.com").await;
    let resident_token = sign_up(&app, "resident@example.com").await;

    let repo = crate::repositories::PrincipalRepository::new(&state.db);
    let resident = repo
        .find_by_email("resident@example.com")
        .await
        .unwrap()
        .unwrap();

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/v1/principals/{}", resident.id),
        Some(&admin_token),
        Some(json!({ "status": "disabled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The disabled account's old token is dead, and a fresh sign-in gets
    // the distinct code rather than a generic 401.
    let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some(&resident_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/sign-in",
        None,
        Some(json!({ "email": "resident@example.com", "password": "correct horse battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCOUNT_DISABLED");
}

#[tokio::test]
async fn community_crud_with_encrypted_credentials() {
    let (_state, app) = setup_test_app().await;
    let token = sign_up(&app, "root@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/communities",
        Some(&token),
        Some(json!({
            "slug": "harbor-view",
            "name": "海景灣",
            "credentials": { "api_key": "secret-123" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["has_credentials"], true);

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/communities/harbor-view/credentials",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["api_key"], "secret-123");

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/v1/communities/harbor-view",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn the_default_community_cannot_be_deleted() {
    let (_state, app) = setup_test_app().await;
    let token = sign_up(&app, "root@example.com").await;

    let (status, body) = send(
        &app,
        "DELETE",
        "/api/v1/communities/default",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn resident_entering_foreign_community_is_redirected() {
    let (state, app) = setup_test_app().await;
    sign_up(&app, "resident@example.com").await;
    set_role(&state, "resident@example.com", Role::Resident).await;

    let repo = crate::repositories::PrincipalRepository::new(&state.db);
    let resident = repo
        .find_by_email("resident@example.com")
        .await
        .unwrap()
        .unwrap();
    repo.set_community(resident.id, Some("sunrise-court".to_string()))
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/sign-in",
        None,
        Some(json!({ "email": "resident@example.com", "password": "correct horse battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/enter/default")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "/api/v1/enter/sunrise-court"
    );

    // Following the redirect enters the canonical community.
    let (status, body) = send(&app, "GET", "/api/v1/enter/sunrise-court", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["community"]["slug"], "sunrise-court");
    assert_eq!(body["data"]["fell_back"], false);
}

#[tokio::test]
async fn entering_a_disabled_community_is_refused() {
    let (_state, app) = setup_test_app().await;
    let token = sign_up(&app, "root@example.com").await;

    let (status, _) = send(
        &app,
        "PATCH",
        "/api/v1/communities/sunrise-court",
        Some(&token),
        Some(json!({ "status": "disabled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/v1/enter/sunrise-court", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "COMMUNITY_DISABLED");
}

#[tokio::test]
async fn unknown_community_falls_back_to_default() {
    let (_state, app) = setup_test_app().await;
    let token = sign_up(&app, "root@example.com").await;

    let (status, body) = send(&app, "GET", "/api/v1/enter/no-such-place", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["community"]["slug"], "default");
    assert_eq!(body["data"]["fell_back"], true);
}

#[tokio::test]
async fn carousel_put_sanitizes_and_get_round_trips() {
    let (_state, app) = setup_test_app().await;
    let token = sign_up(&app, "root@example.com").await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/communities/sunrise-court/carousel",
        Some(&token),
        Some(json!({
            "items": [
                { "idx": 9, "url": "https://cdn.example.com/a.jpg", "type": "image", "autoplay": false },
                { "idx": 1, "url": "", "type": "image", "autoplay": false },
                { "idx": 5, "url": "https://youtu.be/abc123", "type": "image", "autoplay": true }
            ],
            "config": { "interval": 1, "effect": "slide", "loop": "infinite", "nav": true }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["idx"], 1);
    assert_eq!(items[1]["idx"], 2);
    assert_eq!(items[1]["type"], "youtube");
    // The 1-second interval was clamped up to the floor.
    assert_eq!(body["data"]["config"]["interval"], 2);

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/communities/sunrise-court/carousel",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["source"], "community");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn front_config_serves_the_default_documents_until_saved() {
    let (_state, app) = setup_test_app().await;
    let token = sign_up(&app, "resident@example.com").await;

    let (status, body) = send(&app, "GET", "/api/v1/front/config", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["community"]["slug"], "default");
    assert_eq!(body["data"]["carousel"]["source"], "empty");
    assert_eq!(body["data"]["buttons"]["source"], "empty");
    assert_eq!(body["data"]["buttons"]["a6"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn alert_workflow_moves_forward_only() {
    let (state, app) = setup_test_app().await;
    let admin_token = sign_up(&app, "root@example.com").await;
    let resident_token = sign_up(&app, "resident@example.com").await;
    set_role(&state, "resident@example.com", Role::Resident).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/alerts",
        Some(&resident_token),
        Some(json!({ "unit": "A棟 3F-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let alert_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "active");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/alerts/{alert_id}/acknowledge"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "acknowledged");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/alerts/{alert_id}/resolve"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Backwards transition is refused.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/alerts/{alert_id}/acknowledge"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn import_endpoint_reports_per_row_outcomes() {
    let (_state, app) = setup_test_app().await;
    let token = sign_up(&app, "root@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/communities/sunrise-court/residents/import",
        Some(&token),
        Some(json!({
            "rows": [
                { "email": "a@example.com", "displayName": "王小明", "unit": "3F-1" },
                { "email": "broken" },
                { "email": "b@example.com" }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["succeeded"], 2);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["failures"][0]["row"], 2);
}

#[tokio::test]
async fn community_admin_cannot_touch_a_foreign_community() {
    let (state, app) = setup_test_app().await;
    sign_up(&app, "admin@example.com").await;
    set_role(&state, "admin@example.com", Role::CommunityAdmin).await;

    let repo = crate::repositories::PrincipalRepository::new(&state.db);
    let admin = repo
        .find_by_email("admin@example.com")
        .await
        .unwrap()
        .unwrap();
    repo.set_community(admin.id, Some("sunrise-court".to_string()))
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/sign-in",
        None,
        Some(json!({ "email": "admin@example.com", "password": "correct horse battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "GET",
        "/api/v1/communities/default/principals",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Their own community works.
    let (status, _) = send(
        &app,
        "GET",
        "/api/v1/communities/sunrise-court/principals",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
