//! End-to-end tests of the save pipeline over HTTP.

mod common;

use common::TestApp;
use serde_json::Value;

#[tokio::test]
async fn save_endpoint_persists_content_with_generated_tags() {
    let app = TestApp::spawn().await.unwrap();
    app.mock_page("/post", "A Great Post");
    app.mock_tagger(&["reading", "tech", "web"]);
    let (_, token) = app.authenticate("1001").await.unwrap();

    let response = app
        .client
        .post(format!("{}/api/contents", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "url": app.mock_server.url("/post"),
            "memo": "from the test"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["content"]["title"], "A Great Post");
    assert_eq!(body["content"]["memo"], "from the test");
    assert_eq!(body["tag_strategy"], "openai");
    let tags = body["content"]["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 3);
}

#[tokio::test]
async fn saving_the_same_url_twice_is_a_conflict() {
    let app = TestApp::spawn().await.unwrap();
    app.mock_page("/post", "A Great Post");
    app.mock_tagger(&["reading", "tech", "web"]);
    let (_, token) = app.authenticate("1001").await.unwrap();

    let url = app.mock_server.url("/post");
    let first = app
        .client
        .post(format!("{}/api/contents", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "url": url }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    // Tracking params are stripped, so this resolves to the same URL.
    let second = app
        .client
        .post(format!("{}/api/contents", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "url": format!("{url}?utm_source=share") }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 409);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["code"], "DUPLICATE");
    assert_eq!(body["error"], "Content already saved");

    // Still only one row.
    let list: Value = app
        .client
        .get(format!("{}/api/contents", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["data"]["total"], 1);
}

#[tokio::test]
async fn invalid_url_is_a_bad_request() {
    let app = TestApp::spawn().await.unwrap();
    let (_, token) = app.authenticate("1001").await.unwrap();

    let response = app
        .client
        .post(format!("{}/api/contents", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "url": "not a url" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_URL");
    assert_eq!(body["step"], "validation");
}

#[tokio::test]
async fn failed_tag_providers_degrade_to_the_platform_tag() {
    let app = TestApp::spawn().await.unwrap();
    app.mock_page("/post", "Untagged Post");
    app.mock_server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/chat/completions");
        then.status(500);
    });
    let (_, token) = app.authenticate("1001").await.unwrap();

    let response = app
        .client
        .post(format!("{}/api/contents", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "url": app.mock_server.url("/post") }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tag_strategy"], "fallback");
    let tags = body["content"]["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["name"], "web");
}

#[tokio::test]
async fn list_filters_by_comma_separated_tags() {
    let app = TestApp::spawn().await.unwrap();
    app.mock_page("/bread", "Bread Basics");
    app.mock_page("/engine", "Engine Notes");
    // One tagger mock per page, keyed on the title inside the prompt.
    for (title, tags) in [
        ("Bread Basics", r#"{"tags": [{"name": "baking", "confidence": 0.9}, {"name": "bread", "confidence": 0.9}, {"name": "food", "confidence": 0.9}]}"#),
        ("Engine Notes", r#"{"tags": [{"name": "rust", "confidence": 0.9}, {"name": "compilers", "confidence": 0.9}, {"name": "tools", "confidence": 0.9}]}"#),
    ] {
        app.mock_server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/chat/completions")
                .body_contains(title);
            then.status(200).json_body(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": tags}}]
            }));
        });
    }
    let (_, token) = app.authenticate("1001").await.unwrap();

    for path in ["/bread", "/engine"] {
        let response = app
            .client
            .post(format!("{}/api/contents", app.address))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "url": app.mock_server.url(path) }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }

    let body: Value = app
        .client
        .get(format!("{}/api/contents?tags=baking,food", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Bread Basics");

    let body: Value = app
        .client
        .get(format!("{}/api/contents?tags=knitting", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_finds_saved_content_by_title() {
    let app = TestApp::spawn().await.unwrap();
    app.mock_page("/post", "Sourdough Primer");
    app.mock_tagger(&["baking", "bread", "food"]);
    let (_, token) = app.authenticate("1001").await.unwrap();

    app.client
        .post(format!("{}/api/contents", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "url": app.mock_server.url("/post") }))
        .send()
        .await
        .unwrap();

    let body: Value = app
        .client
        .get(format!("{}/api/search?q=sourdough", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["title"], "Sourdough Primer");

    let empty: Value = app
        .client
        .get(format!("{}/api/search?q=nomatch", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty["data"]["total"], 0);
}
