use crate::helpers::spawn_app;
use serde_json::{json, Value};

#[tokio::test]
async fn the_worker_script_carries_its_policy() {
    // arrange
    let app = spawn_app().await;

    // act
    let response = app.get("/sw.js").send().await.unwrap();

    // assert
    assert_eq!(200, response.status().as_u16());
    assert_eq!(response.headers()["Service-Worker-Allowed"], "/");
    assert_eq!(response.headers()["Cache-Control"], "no-cache");
    assert!(response.headers()["Content-Type"]
        .to_str()
        .unwrap()
        .starts_with("application/javascript"));
    let script = response.text().await.unwrap();
    assert!(script.starts_with("self.__OFFLINE_POLICY__ = {"));
    assert!(script.contains("\"neverCached\""));
}

#[tokio::test]
async fn the_offline_page_and_manifest_are_served() {
    let app = spawn_app().await;

    let offline = app.get("/offline.html").send().await.unwrap();
    let manifest = app.get("/manifest.webmanifest").send().await.unwrap();

    assert_eq!(200, offline.status().as_u16());
    assert!(offline.headers()["Content-Type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(200, manifest.status().as_u16());
    assert!(manifest.headers()["Content-Type"]
        .to_str()
        .unwrap()
        .starts_with("application/manifest+json"));
}

#[tokio::test]
async fn static_assets_are_cached_after_the_first_fetch() {
    // arrange
    let app = spawn_app().await;

    // act
    let first = app.get("/static/css/app.css").send().await.unwrap();
    let first_source = first.headers()["X-Cache-Source"].to_str().unwrap().to_string();
    let first_body = first.text().await.unwrap();
    let second = app.get("/static/css/app.css").send().await.unwrap();

    // assert
    assert_eq!(first_source, "network");
    assert_eq!(200, second.status().as_u16());
    assert_eq!(second.headers()["X-Cache-Source"], "cache");
    assert_eq!(second.text().await.unwrap(), first_body);
}

#[tokio::test]
async fn missing_static_assets_are_not_cached() {
    let app = spawn_app().await;

    let first = app.get("/static/css/missing.css").send().await.unwrap();
    let second = app.get("/static/css/missing.css").send().await.unwrap();

    assert_eq!(404, first.status().as_u16());
    assert_eq!(second.headers()["X-Cache-Source"], "network");
}

#[tokio::test]
async fn unsafe_asset_requests_are_forbidden() {
    let app = spawn_app().await;
    let test_cases = vec![
        (
            app.get("/static/css/app.css?next=javascript:alert(1)"),
            "a javascript: query",
        ),
        (
            app.get("/static/css/app.css").header("Origin", "https://evil.example"),
            "a foreign origin",
        ),
    ];

    for (request, description) in test_cases {
        let response = request.send().await.unwrap();

        assert_eq!(
            403,
            response.status().as_u16(),
            "The request with {} was not blocked.",
            description
        );
    }
}

#[tokio::test]
async fn worker_messages_report_version_and_stats() {
    // arrange
    let app = spawn_app().await;
    app.get("/static/icons/icon.svg").send().await.unwrap();

    // act
    let version: Value = app
        .post("/api/pwa/message")
        .json(&json!({"type": "GET_VERSION"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let stats: Value = app
        .post("/api/pwa/message")
        .json(&json!({"type": "CACHE_STATS"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let cleared: Value = app
        .post("/api/pwa/message")
        .json(&json!({"type": "CLEAR_CACHE"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // assert
    assert_eq!(version, json!({"type": "VERSION", "version": "1"}));
    assert_eq!(stats["type"], "CACHE_STATS");
    assert_eq!(stats["totalEntries"], 1);
    assert_eq!(cleared, json!({"type": "CACHE_CLEARED", "removedEntries": 1}));
}

#[tokio::test]
async fn unknown_worker_messages_are_400() {
    let app = spawn_app().await;

    let response = app
        .post("/api/pwa/message")
        .json(&json!({"type": "NUKE"}))
        .send()
        .await
        .unwrap();

    assert_eq!(400, response.status().as_u16());
}
