use crate::helpers::{spawn_app, TestApp};
use diesel::prelude::*;
use mockito::Matcher;
use serde_json::{json, Value};
use voicemail_ai::schema::subscriptions;

fn subscription_event(event_type: &str, subscription: Value) -> String {
    json!({
        "id": "evt_test",
        "type": event_type,
        "data": {"object": subscription}
    })
    .to_string()
}

fn subscription_for(app: &TestApp, id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "customer": "cus_test",
        "status": status,
        "metadata": {"user_id": app.test_user.user_id.to_string(), "plan_id": "pro"},
        "current_period_start": 1700000000,
        "current_period_end": 1702592000,
        "cancel_at_period_end": false
    })
}

fn stored_status(app: &mut TestApp, stripe_subscription_id: &str) -> Option<String> {
    subscriptions::table
        .select(subscriptions::status)
        .filter(subscriptions::stripe_subscription_id.eq(stripe_subscription_id))
        .first::<String>(&mut app.db_connection)
        .optional()
        .expect("Failed to query subscriptions.")
}

#[tokio::test]
async fn the_endpoint_answers_probes() {
    let app = spawn_app().await;

    let response = app.api_client.head(app.url("/api/webhook/stripe")).send().await.unwrap();

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn unsigned_or_badly_signed_events_are_rejected() {
    // arrange
    let mut app = spawn_app().await;
    let payload = subscription_event(
        "customer.subscription.created",
        subscription_for(&app, "sub_1", "active"),
    );
    let test_cases = vec![
        (None, "a missing signature"),
        (Some("t=1,v1=deadbeef".to_string()), "a stale, wrong signature"),
        (Some("garbage".to_string()), "a malformed signature"),
    ];

    for (signature, description) in test_cases {
        // act
        let mut request = app.post("/api/webhook/stripe").body(payload.clone());
        if let Some(signature) = signature {
            request = request.header("Stripe-Signature", signature);
        }
        let response = request.send().await.unwrap();

        // assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The webhook did not return a 400 Bad Request for {}.",
            description
        );
    }
    assert_eq!(stored_status(&mut app, "sub_1"), None);
}

#[tokio::test]
async fn unknown_events_are_acknowledged() {
    let app = spawn_app().await;
    let payload =
        json!({"id": "evt_1", "type": "charge.refunded", "data": {"object": {}}}).to_string();

    let response = app.post_webhook(&payload).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"received": true}));
}

#[tokio::test]
async fn malformed_events_with_a_valid_signature_are_400() {
    let app = spawn_app().await;

    let response = app.post_webhook("{not json").await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn created_subscriptions_are_mirrored_locally() {
    // arrange
    let mut app = spawn_app().await;
    let payload = subscription_event(
        "customer.subscription.created",
        subscription_for(&app, "sub_1", "trialing"),
    );

    // act
    let response = app.post_webhook(&payload).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let (user_id, plan_id, customer) = subscriptions::table
        .select((
            subscriptions::user_id,
            subscriptions::plan_id,
            subscriptions::stripe_customer_id,
        ))
        .filter(subscriptions::stripe_subscription_id.eq("sub_1"))
        .first::<(uuid::Uuid, String, String)>(&mut app.db_connection)
        .unwrap();
    assert_eq!(user_id, app.test_user.user_id);
    assert_eq!(plan_id, "pro");
    assert_eq!(customer, "cus_test");
    assert_eq!(stored_status(&mut app, "sub_1").as_deref(), Some("trialing"));
}

#[tokio::test]
async fn redelivered_events_do_not_duplicate_rows() {
    let mut app = spawn_app().await;
    let payload = subscription_event(
        "customer.subscription.updated",
        subscription_for(&app, "sub_1", "active"),
    );

    app.post_webhook(&payload).await;
    app.post_webhook(&payload).await;

    let count: i64 = subscriptions::table
        .filter(subscriptions::stripe_subscription_id.eq("sub_1"))
        .count()
        .get_result(&mut app.db_connection)
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn lifecycle_events_update_the_stored_status() {
    // arrange
    let mut app = spawn_app().await;
    let created = subscription_event(
        "customer.subscription.created",
        subscription_for(&app, "sub_1", "active"),
    );
    app.post_webhook(&created).await;
    let payment_failed = json!({
        "id": "evt_2",
        "type": "invoice.payment_failed",
        "data": {"object": {"id": "in_1", "subscription": "sub_1"}}
    })
    .to_string();
    let deleted = subscription_event(
        "customer.subscription.deleted",
        subscription_for(&app, "sub_1", "canceled"),
    );

    // act
    let failed_response = app.post_webhook(&payment_failed).await;
    let after_failure = stored_status(&mut app, "sub_1");
    let deleted_response = app.post_webhook(&deleted).await;
    let after_deletion = stored_status(&mut app, "sub_1");

    // assert
    assert_eq!(200, failed_response.status().as_u16());
    assert_eq!(after_failure.as_deref(), Some("past_due"));
    assert_eq!(200, deleted_response.status().as_u16());
    assert_eq!(after_deletion.as_deref(), Some("canceled"));
}

#[tokio::test]
async fn subscriptions_without_a_known_owner_are_acknowledged() {
    // arrange
    let mut app = spawn_app().await;
    let _customer = app
        .stripe_server
        .mock("GET", "/v1/customers/cus_unknown")
        .with_body(r#"{"id":"cus_unknown","email":"nobody@example.com"}"#)
        .create_async()
        .await;
    let payload = subscription_event(
        "customer.subscription.created",
        json!({"id": "sub_orphan", "customer": "cus_unknown", "status": "active"}),
    );

    // act
    let response = app.post_webhook(&payload).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    assert_eq!(stored_status(&mut app, "sub_orphan"), None);
}

fn checkout_completed(session: Value) -> String {
    json!({
        "id": "evt_checkout",
        "type": "checkout.session.completed",
        "data": {"object": session}
    })
    .to_string()
}

#[tokio::test]
async fn completed_checkouts_store_the_subscription_for_the_referenced_user() {
    // arrange
    let mut app = spawn_app().await;
    let retrieve = app
        .stripe_server
        .mock("GET", "/v1/subscriptions/sub_checkout")
        .with_body(
            json!({
                "id": "sub_checkout",
                "customer": "cus_checkout",
                "status": "active",
                "metadata": {"plan_id": "business"}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let write_back = app
        .stripe_server
        .mock("POST", "/v1/subscriptions/sub_checkout")
        .match_body(Matcher::UrlEncoded(
            "metadata[user_id]".into(),
            app.test_user.user_id.to_string(),
        ))
        .with_body(r#"{"id":"sub_checkout","customer":"cus_checkout","status":"active"}"#)
        .expect(1)
        .create_async()
        .await;
    let payload = checkout_completed(json!({
        "id": "cs_1",
        "mode": "subscription",
        "client_reference_id": app.test_user.user_id.to_string(),
        "customer": "cus_checkout",
        "subscription": "sub_checkout"
    }));

    // act
    let response = app.post_webhook(&payload).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    retrieve.assert_async().await;
    write_back.assert_async().await;
    let (user_id, plan_id) = subscriptions::table
        .select((subscriptions::user_id, subscriptions::plan_id))
        .filter(subscriptions::stripe_subscription_id.eq("sub_checkout"))
        .first::<(uuid::Uuid, String)>(&mut app.db_connection)
        .unwrap();
    assert_eq!(user_id, app.test_user.user_id);
    assert_eq!(plan_id, "business");
}

#[tokio::test]
async fn one_off_payment_checkouts_are_ignored() {
    // arrange
    let mut app = spawn_app().await;
    let retrieve = app
        .stripe_server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let payload = checkout_completed(json!({
        "id": "cs_2",
        "mode": "payment",
        "client_reference_id": app.test_user.user_id.to_string()
    }));

    // act
    let response = app.post_webhook(&payload).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    retrieve.assert_async().await;
}

#[tokio::test]
async fn paid_invoices_reactivate_the_subscription() {
    // arrange
    let mut app = spawn_app().await;
    let created = subscription_event(
        "customer.subscription.created",
        subscription_for(&app, "sub_1", "past_due"),
    );
    app.post_webhook(&created).await;
    let paid = json!({
        "id": "evt_paid",
        "type": "invoice.paid",
        "data": {"object": {"id": "in_1", "subscription": "sub_1"}}
    })
    .to_string();

    // act
    let response = app.post_webhook(&paid).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    assert_eq!(stored_status(&mut app, "sub_1").as_deref(), Some("active"));
}

#[tokio::test]
async fn processing_failures_are_500_so_stripe_retries() {
    // arrange
    let mut app = spawn_app().await;
    let _retrieve = app
        .stripe_server
        .mock("GET", "/v1/subscriptions/sub_unreachable")
        .with_status(500)
        .create_async()
        .await;
    let payload = checkout_completed(json!({
        "id": "cs_3",
        "mode": "subscription",
        "client_reference_id": app.test_user.user_id.to_string(),
        "subscription": "sub_unreachable"
    }));

    // act
    let response = app.post_webhook(&payload).await;

    // assert
    assert_eq!(500, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Internal server error.");
    assert_eq!(stored_status(&mut app, "sub_unreachable"), None);
}
