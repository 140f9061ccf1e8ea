use crate::helpers::spawn_app;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::{json, Value};
use uuid::Uuid;
use voicemail_ai::schema::agenda_events;

fn event_body(user_id: Uuid) -> Value {
    json!({
        "title": "Call back Mrs. Jones",
        "startTime": "2024-03-01T10:00:00Z",
        "endTime": "2024-03-01T10:30:00Z",
        "userId": user_id,
        "location": "Phone"
    })
}

#[tokio::test]
async fn creating_an_event_returns_201_with_the_event() {
    // arrange
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();

    // act
    let response = app.post_agenda_event(&event_body(user_id)).await;

    // assert
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Call back Mrs. Jones");
    assert_eq!(body["userId"], user_id.to_string());
    assert_eq!(body["location"], "Phone");
    assert!(body["description"].is_null());
}

#[tokio::test]
async fn creating_an_event_returns_400_when_required_fields_are_missing() {
    // arrange
    let app = spawn_app().await;
    let test_cases = vec!["title", "startTime", "endTime", "userId"];

    for missing in test_cases {
        let mut body = event_body(Uuid::new_v4());
        body.as_object_mut().unwrap().remove(missing);

        // act
        let response = app.post_agenda_event(&body).await;

        // assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when {} was missing.",
            missing
        );
        let error: Value = response.json().await.unwrap();
        assert!(error["error"].as_str().unwrap().contains(missing));
    }
}

#[tokio::test]
async fn creating_an_event_returns_400_for_invalid_fields() {
    // arrange
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let test_cases = vec![
        (json!({"title": ""}), "empty title"),
        (json!({"startTime": "tomorrow"}), "unparsable start"),
        (json!({"endTime": "2024-03-01T09:00:00Z"}), "end before start"),
        (json!({"endTime": "2024-03-01T10:00:00Z"}), "end equal to start"),
        (json!({"userId": "42"}), "malformed user id"),
    ];

    for (overrides, description) in test_cases {
        let mut body = event_body(user_id);
        for (key, value) in overrides.as_object().unwrap() {
            body[key] = value.clone();
        }

        // act
        let response = app.post_agenda_event(&body).await;

        // assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not return a 400 Bad Request when the payload had an {}.",
            description
        );
    }
}

#[tokio::test]
async fn listing_requires_a_user_id() {
    let app = spawn_app().await;

    let response = app.get("/api/agenda-events").send().await.unwrap();

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn events_are_listed_in_start_order_and_filtered_by_range() {
    // arrange
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    for (title, start, end) in [
        ("Late", "2024-03-02T15:00:00Z", "2024-03-02T16:00:00Z"),
        ("Early", "2024-03-01T08:00:00Z", "2024-03-01T09:00:00Z"),
    ] {
        let body = json!({"title": title, "startTime": start, "endTime": end, "userId": user_id});
        assert_eq!(201, app.post_agenda_event(&body).await.status().as_u16());
    }
    app.post_agenda_event(&event_body(Uuid::new_v4())).await;

    // act
    let all: Value = app
        .get(&format!("/api/agenda-events?userId={}", user_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ranged: Value = app
        .get(&format!(
            "/api/agenda-events?userId={}&from=2024-03-02T00:00:00Z",
            user_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // assert
    let titles: Vec<&str> = all["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Early", "Late"]);
    assert_eq!(ranged["events"].as_array().unwrap().len(), 1);
    assert_eq!(ranged["events"][0]["title"], "Late");
}

#[tokio::test]
async fn deleting_an_event_soft_deletes_it() {
    // arrange
    let mut app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let created: Value = app
        .post_agenda_event(&event_body(user_id))
        .await
        .json()
        .await
        .unwrap();
    let event_id = created["id"].as_str().unwrap().to_string();

    // act
    let response = app
        .delete(&format!(
            "/api/agenda-events?id={}&userId={}",
            event_id, user_id
        ))
        .send()
        .await
        .unwrap();

    // assert
    assert_eq!(200, response.status().as_u16());
    let listed: Value = app
        .get(&format!("/api/agenda-events?userId={}", user_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed["events"].as_array().unwrap().is_empty());

    let deleted_at = agenda_events::table
        .select(agenda_events::deleted_at)
        .filter(agenda_events::id.eq(Uuid::parse_str(&event_id).unwrap()))
        .first::<Option<DateTime<Utc>>>(&mut app.db_connection)
        .expect("The row was removed instead of soft deleted.");
    assert!(deleted_at.is_some());
}

#[tokio::test]
async fn deleting_twice_returns_404() {
    // arrange
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let created: Value = app
        .post_agenda_event(&event_body(user_id))
        .await
        .json()
        .await
        .unwrap();
    let path = format!(
        "/api/agenda-events?id={}&userId={}",
        created["id"].as_str().unwrap(),
        user_id
    );

    // act
    let first = app.delete(&path).send().await.unwrap();
    let second = app.delete(&path).send().await.unwrap();

    // assert
    assert_eq!(200, first.status().as_u16());
    assert_eq!(404, second.status().as_u16());
}

#[tokio::test]
async fn updating_an_event_changes_only_the_given_fields() {
    // arrange
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let created: Value = app
        .post_agenda_event(&event_body(user_id))
        .await
        .json()
        .await
        .unwrap();

    // act
    let response = app
        .put("/api/agenda-events")
        .json(&json!({
            "id": created["id"],
            "userId": user_id,
            "endTime": "2024-03-01T11:00:00Z",
            "location": ""
        }))
        .send()
        .await
        .unwrap();

    // assert
    assert_eq!(200, response.status().as_u16());
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["title"], "Call back Mrs. Jones");
    assert!(updated["location"].is_null());
    let end: DateTime<Utc> = updated["endTime"].as_str().unwrap().parse().unwrap();
    assert_eq!(end.to_rfc3339(), "2024-03-01T11:00:00+00:00");
}

#[tokio::test]
async fn updates_are_validated_against_the_stored_window() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let created: Value = app
        .post_agenda_event(&event_body(user_id))
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .put("/api/agenda-events")
        .json(&json!({"id": created["id"], "userId": user_id, "startTime": "2024-03-01T12:00:00Z"}))
        .send()
        .await
        .unwrap();

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn updating_someone_elses_event_returns_404() {
    let app = spawn_app().await;
    let created: Value = app
        .post_agenda_event(&event_body(Uuid::new_v4()))
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .put("/api/agenda-events")
        .json(&json!({"id": created["id"], "userId": Uuid::new_v4(), "title": "Mine now"}))
        .send()
        .await
        .unwrap();

    assert_eq!(404, response.status().as_u16());
}
