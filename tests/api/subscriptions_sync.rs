use crate::helpers::spawn_app;
use diesel::prelude::*;
use mockito::Matcher;
use serde_json::{json, Value};
use voicemail_ai::schema::subscriptions;

#[tokio::test]
async fn sync_requires_authentication() {
    let app = spawn_app().await;

    let response = app.post("/api/subscriptions/sync").send().await.unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn sync_inserts_missing_rows_and_deactivates_stale_ones() {
    // arrange
    let mut app = spawn_app().await;
    let stale = json!({
        "id": "evt_1",
        "type": "customer.subscription.created",
        "data": {"object": {
            "id": "sub_stale",
            "customer": "cus_old",
            "status": "active",
            "metadata": {"user_id": app.test_user.user_id.to_string()}
        }}
    })
    .to_string();
    assert_eq!(200, app.post_webhook(&stale).await.status().as_u16());

    let list = app
        .stripe_server
        .mock("GET", "/v1/subscriptions")
        .match_query(Matcher::UrlEncoded("status".into(), "active".into()))
        .with_body(
            json!({
                "data": [{
                    "id": "sub_new",
                    "customer": "cus_9",
                    "status": "active",
                    "items": {"data": [{"price": {"id": "price_1", "lookup_key": "business"}}]}
                }],
                "has_more": false
            })
            .to_string(),
        )
        .create_async()
        .await;
    let customer = app
        .stripe_server
        .mock("GET", "/v1/customers/cus_9")
        .with_body(
            json!({"id": "cus_9", "email": app.test_user.email.to_uppercase()}).to_string(),
        )
        .create_async()
        .await;
    let write_back = app
        .stripe_server
        .mock("POST", "/v1/subscriptions/sub_new")
        .match_body(Matcher::UrlEncoded(
            "metadata[user_id]".into(),
            app.test_user.user_id.to_string(),
        ))
        .with_body(r#"{"id":"sub_new","customer":"cus_9","status":"active"}"#)
        .expect(1)
        .create_async()
        .await;

    // act
    let response = app
        .authenticated(app.post("/api/subscriptions/sync"))
        .send()
        .await
        .unwrap();

    // assert
    assert_eq!(200, response.status().as_u16());
    let report: Value = response.json().await.unwrap();
    assert_eq!(report["stripeActive"], 1);
    assert_eq!(report["inserted"], 1);
    assert_eq!(report["deactivated"], 1);
    assert_eq!(report["failed"], 0);
    list.assert_async().await;
    customer.assert_async().await;
    write_back.assert_async().await;

    let rows = subscriptions::table
        .select((
            subscriptions::stripe_subscription_id,
            subscriptions::status,
            subscriptions::plan_id,
        ))
        .order(subscriptions::stripe_subscription_id.asc())
        .load::<(String, String, String)>(&mut app.db_connection)
        .unwrap();
    assert_eq!(
        rows,
        vec![
            ("sub_new".to_string(), "active".to_string(), "business".to_string()),
            ("sub_stale".to_string(), "canceled".to_string(), "unknown".to_string()),
        ]
    );
}

#[tokio::test]
async fn a_second_sync_changes_nothing() {
    // arrange
    let mut app = spawn_app().await;
    let subscription = json!({
        "id": "sub_1",
        "customer": "cus_1",
        "status": "active",
        "metadata": {"user_id": app.test_user.user_id.to_string(), "plan_id": "pro"}
    });
    let _list = app
        .stripe_server
        .mock("GET", "/v1/subscriptions")
        .match_query(Matcher::Any)
        .with_body(json!({"data": [subscription], "has_more": false}).to_string())
        .expect(2)
        .create_async()
        .await;

    // act
    let first: Value = app
        .authenticated(app.post("/api/subscriptions/sync"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: Value = app
        .authenticated(app.post("/api/subscriptions/sync"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // assert
    assert_eq!(first["inserted"], 1);
    assert_eq!(second["inserted"], 0);
    assert_eq!(second["updated"], 0);
    assert_eq!(second["deactivated"], 0);
}

#[tokio::test]
async fn sync_is_503_when_stripe_is_down() {
    // arrange
    let mut app = spawn_app().await;
    let _list = app
        .stripe_server
        .mock("GET", "/v1/subscriptions")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    // act
    let response = app
        .authenticated(app.post("/api/subscriptions/sync"))
        .send()
        .await
        .unwrap();

    // assert
    assert_eq!(503, response.status().as_u16());
}
