//! Account, guard and profile flows under `/api/v1/auth`.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use bazaar_integration_tests::TestApp;

#[tokio::test]
async fn test_register_requires_every_field() {
    let app = TestApp::new();

    let mut body = TestApp::registration("Jane", "jane@bazaar.test", "secret1");
    body.as_object_mut().unwrap().remove("phone");
    let response = app.post("/api/v1/auth/register", None, body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let json = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Phone is required");
}

#[tokio::test]
async fn test_register_stores_hash_and_hides_it() {
    let app = TestApp::new();
    let body = app.register("Jane", "jane@bazaar.test", "secret1").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "jane@bazaar.test");
    assert_eq!(body["user"]["role"], 0);
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("answer").is_none());

    let hash = app.password_hash("jane@bazaar.test").await;
    assert_ne!(hash, "secret1");
    assert!(hash.starts_with("$2"));
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.register("Jane", "jane@bazaar.test", "secret1").await;

    let response = app
        .post(
            "/api/v1/auth/register",
            None,
            TestApp::registration("Other", "jane@bazaar.test", "secret2"),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.json()["message"], "Already registered, please login");
}

#[tokio::test]
async fn test_login_outcomes() {
    let app = TestApp::new();
    app.register("Jane", "jane@bazaar.test", "secret1").await;

    let missing = app
        .post("/api/v1/auth/login", None, json!({ "email": "jane@bazaar.test" }))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.json()["message"], "Invalid email or password");

    let unknown = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "nobody@bazaar.test", "password": "secret1" }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.json()["message"], "Email is not registered");

    let wrong = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "jane@bazaar.test", "password": "nope123" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json()["message"], "Invalid password");

    let ok = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "jane@bazaar.test", "password": "secret1" }),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    let body = ok.json();
    assert_eq!(body["message"], "Login successfully");
    assert_eq!(body["user"]["name"], "Jane");
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_user_guard() {
    let app = TestApp::new();
    let token = app.buyer_token("buyer@bazaar.test").await;

    let ok = app.get("/api/v1/auth/user-auth", Some(&token)).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.json()["ok"], true);

    let missing = app.get("/api/v1/auth/user-auth", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let garbage = app.get("/api/v1/auth/user-auth", Some("not-a-jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.json()["error"], "jwt malformed");
}

#[tokio::test]
async fn test_bearer_prefix_is_not_accepted() {
    let app = TestApp::new();
    let token = app.buyer_token("buyer@bazaar.test").await;

    let response = app
        .get("/api/v1/auth/user-auth", Some(&format!("Bearer {token}")))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_guard() {
    let app = TestApp::new();
    let buyer = app.buyer_token("buyer@bazaar.test").await;
    let admin = app.admin_token().await;

    let denied = app.get("/api/v1/auth/admin-auth", Some(&buyer)).await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
    assert_eq!(denied.json()["message"], "Unauthorized Access");

    let allowed = app.get("/api/v1/auth/admin-auth", Some(&admin)).await;
    assert_eq!(allowed.status, StatusCode::OK);
    assert_eq!(allowed.json()["ok"], true);

    let test = app.get("/api/v1/auth/test", Some(&admin)).await;
    assert_eq!(test.status, StatusCode::OK);
    assert_eq!(test.text(), "Protected Routes");

    // Sign-in runs before the admin check.
    let anonymous = app.get("/api/v1/auth/test", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.json()["message"], "Unauthorized");
}

#[tokio::test]
async fn test_forgot_password() {
    let app = TestApp::new();
    app.register("Jane", "jane@bazaar.test", "secret1").await;

    let missing = app
        .post(
            "/api/v1/auth/forgot-password",
            None,
            json!({ "email": "jane@bazaar.test", "answer": "football" }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.json()["message"], "New password is required");

    let wrong = app
        .post(
            "/api/v1/auth/forgot-password",
            None,
            json!({ "email": "jane@bazaar.test", "answer": "tennis", "newPassword": "changed1" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::NOT_FOUND);
    assert_eq!(wrong.json()["message"], "Wrong email or answer");

    let reset = app
        .post(
            "/api/v1/auth/forgot-password",
            None,
            json!({ "email": "jane@bazaar.test", "answer": "football", "newPassword": "changed1" }),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK);
    assert_eq!(reset.json()["message"], "Password reset successfully");

    app.login("jane@bazaar.test", "changed1").await;
}

#[tokio::test]
async fn test_update_profile() {
    let app = TestApp::new();
    let token = app.buyer_token("buyer@bazaar.test").await;

    let short = app
        .put(
            "/api/v1/auth/update-profile",
            Some(&token),
            json!({ "password": "abc" }),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);

    let response = app
        .put(
            "/api/v1/auth/update-profile",
            Some(&token),
            json!({ "name": "Renamed", "address": "2 Side St", "email": "ignored@bazaar.test" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["updatedUser"]["name"], "Renamed");
    assert_eq!(body["updatedUser"]["address"], "2 Side St");
    assert_eq!(body["updatedUser"]["phone"], "1234");
    assert_eq!(body["updatedUser"]["email"], "buyer@bazaar.test");

    // The old password still works.
    app.login("buyer@bazaar.test", "buyer-pass").await;
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    assert_eq!(app.get("/health", None).await.text(), "ok");
    assert_eq!(app.get("/health/ready", None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    assert!(response.headers.contains_key("x-request-id"));
}
