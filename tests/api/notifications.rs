use crate::helpers::spawn_app;
use diesel::RunQueryDsl;
use serde_json::{json, Value};

#[tokio::test]
async fn requests_without_credentials_are_challenged() {
    // arrange
    let app = spawn_app().await;

    // act
    let response = app.get("/api/notifications").send().await.unwrap();

    // assert
    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        r#"Basic realm="voicemailai""#,
        response.headers()["WWW-Authenticate"]
    );
}

#[tokio::test]
async fn wrong_passwords_are_rejected() {
    let app = spawn_app().await;

    let response = app
        .get("/api/notifications")
        .basic_auth(&app.test_user.email, Some("definitely-not-it"))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn created_notifications_are_listed_newest_first() {
    // arrange
    let app = spawn_app().await;
    for title in ["First", "Second"] {
        let response = app
            .authenticated(app.post("/api/notifications"))
            .json(&json!({
                "action": "create",
                "title": title,
                "message": "Hello",
                "kind": "success"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(201, response.status().as_u16());
    }

    // act
    let response = app
        .authenticated(app.get("/api/notifications"))
        .send()
        .await
        .unwrap();

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["source"], "database");
    assert_eq!(body["unreadCount"], 2);
    assert_eq!(body["notifications"][0]["title"], "Second");
    assert_eq!(body["notifications"][1]["kind"], "success");
}

#[tokio::test]
async fn notifications_can_be_marked_as_read() {
    // arrange
    let app = spawn_app().await;
    let mut ids = Vec::new();
    for title in ["One", "Two", "Three"] {
        let created: Value = app
            .authenticated(app.post("/api/notifications"))
            .json(&json!({"action": "create", "title": title, "message": "Hello"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(created["notification"]["id"].clone());
    }

    // act
    let marked: Value = app
        .authenticated(app.post("/api/notifications"))
        .json(&json!({"action": "markRead", "ids": [ids[0]]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let marked_all: Value = app
        .authenticated(app.post("/api/notifications"))
        .json(&json!({"action": "markAllRead"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // assert
    assert_eq!(marked["updated"], 1);
    assert_eq!(marked_all["updated"], 2);
    let listed: Value = app
        .authenticated(app.get("/api/notifications"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["unreadCount"], 0);
}

#[tokio::test]
async fn unknown_actions_and_invalid_notifications_are_400() {
    let app = spawn_app().await;
    let test_cases = vec![
        (json!({"action": "explode"}), "an unknown action"),
        (json!({"title": "No action"}), "no action"),
        (json!({"action": "create", "title": "", "message": "Hi"}), "an empty title"),
        (
            json!({"action": "create", "title": "Hi", "message": "Hi", "kind": "urgent"}),
            "an unknown kind",
        ),
    ];

    for (body, description) in test_cases {
        let response = app
            .authenticated(app.post("/api/notifications"))
            .json(&body)
            .send()
            .await
            .unwrap();

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not return a 400 Bad Request for {}.",
            description
        );
    }
}

#[tokio::test]
async fn a_fallback_list_is_served_when_the_database_fails() {
    // arrange
    let mut app = spawn_app().await;
    diesel::sql_query("DROP TABLE notifications")
        .execute(&mut app.db_connection)
        .unwrap();

    // act
    let response = app
        .authenticated(app.get("/api/notifications"))
        .send()
        .await
        .unwrap();

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["notifications"].as_array().unwrap().len(), 2);
    assert_eq!(body["unreadCount"], 2);
}
