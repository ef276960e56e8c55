//! Tests of the login-token and session flow.

mod common;

use common::TestApp;
use linkstash_access::{get_or_create_telegram_user, issue_login_token};
use serde_json::Value;

#[tokio::test]
async fn protected_routes_reject_missing_or_bogus_tokens() {
    let app = TestApp::spawn().await.unwrap();

    let response = app
        .client
        .get(format!("{}/api/contents", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = app
        .client
        .get(format!("{}/api/contents", app.address))
        .bearer_auth("not-a-real-session")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn login_token_exchanges_for_a_working_session() {
    let app = TestApp::spawn().await.unwrap();
    let user = get_or_create_telegram_user(&app.app_state.store.db, "2002", Some("alice"))
        .await
        .unwrap();
    let login_token = issue_login_token(&app.app_state.store.db, &user.id)
        .await
        .unwrap();

    let response = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "token": login_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let session = body["data"]["session_token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["telegram_id"], "2002");

    // The session works against a protected route.
    let me: Value = app
        .client
        .get(format!("{}/api/auth/me", app.address))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["data"]["id"], user.id);

    // The login token is single use.
    let replay = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "token": body["data"]["session_token"].as_str().unwrap() })) // wrong kind
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status(), 400);
}

#[tokio::test]
async fn reused_login_token_is_rejected() {
    let app = TestApp::spawn().await.unwrap();
    let user = get_or_create_telegram_user(&app.app_state.store.db, "2003", None)
        .await
        .unwrap();
    let login_token = issue_login_token(&app.app_state.store.db, &user.id)
        .await
        .unwrap();

    let first = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "token": login_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    let second = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "token": login_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 400);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let app = TestApp::spawn().await.unwrap();
    let (_, token) = app.authenticate("2004").await.unwrap();

    let response = app
        .client
        .post(format!("{}/api/auth/logout", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .get(format!("{}/api/auth/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}
