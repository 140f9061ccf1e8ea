use crate::domain::SubscriptionStatus;
use crate::guards::StripeSignature;
use crate::routes::ApiError;
use crate::startup::VoicemailDbConn;
use crate::stripe::{
    resolve_user_id, set_status_by_stripe_id, upsert_subscription, verify_signature,
    CheckoutSession, DbUserDirectory, Event, Expandable, StripeApi, StripeSubscription,
    SubscriptionRecord, WebhookEvent,
};
use anyhow::Context;
use chrono::Utc;
use diesel::PgConnection;
use rocket::data::{Data, ToByteUnit};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub struct StripeWebhookConfig {
    pub secret: Secret<String>,
    pub tolerance_seconds: i64,
}

/// Lets Stripe (and load balancers) check the endpoint exists.
#[head("/webhook/stripe")]
pub async fn stripe_webhook_probe() -> Status {
    Status::Ok
}

#[tracing::instrument(
    name = "Handle Stripe webhook",
    skip(signature, payload, conn, stripe, config),
    fields(
        request_id = %Uuid::new_v4(),
        event_id = tracing::field::Empty,
        event_type = tracing::field::Empty
    )
)]
#[post("/webhook/stripe", data = "<payload>")]
pub async fn receive_stripe_webhook(
    signature: StripeSignature,
    payload: Data<'_>,
    conn: VoicemailDbConn,
    stripe: &State<Arc<dyn StripeApi>>,
    config: &State<StripeWebhookConfig>,
) -> Result<Json<Value>, ApiError> {
    let payload = payload
        .open(1.mebibytes())
        .into_string()
        .await
        .context("Failed to read the webhook body.")?;
    if !payload.is_complete() {
        return Err(ApiError::Validation("The webhook body is too large.".into()));
    }
    let payload = payload.into_inner();

    verify_signature(
        &payload,
        &signature.0,
        &config.secret,
        config.tolerance_seconds,
        Utc::now().timestamp(),
    )
    .map_err(|e| ApiError::Validation(format!("Invalid signature: {}", e)))?;

    let event = Event::parse(&payload)
        .map_err(|e| ApiError::Validation(format!("Malformed event: {}", e)))?;
    tracing::Span::current()
        .record("event_id", &tracing::field::display(&event.id))
        .record("event_type", &tracing::field::display(&event.event_type));
    let event = event
        .into_webhook_event()
        .map_err(|e| ApiError::Validation(format!("Malformed event object: {}", e)))?;

    process_event(event, stripe.inner().as_ref(), &conn).await?;
    Ok(Json(json!({ "received": true })))
}

async fn process_event(
    event: WebhookEvent,
    stripe: &dyn StripeApi,
    conn: &VoicemailDbConn,
) -> Result<(), anyhow::Error> {
    match event {
        WebhookEvent::CheckoutCompleted(session) => checkout_completed(session, stripe, conn).await,
        WebhookEvent::SubscriptionUpserted(subscription) => {
            let user_id = resolve_user_id(stripe, &DbUserDirectory(conn), &subscription)
                .await?
                .map(|(user_id, _)| user_id);
            mirror_subscription(&subscription, user_id, conn).await
        }
        WebhookEvent::SubscriptionDeleted(subscription) => {
            set_status(conn, subscription.id, SubscriptionStatus::Canceled).await
        }
        WebhookEvent::InvoicePaid(invoice) => match invoice.subscription {
            Some(subscription) => {
                set_status(conn, subscription.id().to_string(), SubscriptionStatus::Active).await
            }
            None => Ok(()),
        },
        WebhookEvent::InvoicePaymentFailed(invoice) => match invoice.subscription {
            Some(subscription) => {
                set_status(conn, subscription.id().to_string(), SubscriptionStatus::PastDue).await
            }
            None => Ok(()),
        },
        WebhookEvent::Ignored(event_type) => {
            tracing::info!(%event_type, "Ignoring Stripe event");
            Ok(())
        }
    }
}

async fn checkout_completed(
    session: CheckoutSession,
    stripe: &dyn StripeApi,
    conn: &VoicemailDbConn,
) -> Result<(), anyhow::Error> {
    if session.mode.as_deref() != Some("subscription") {
        return Ok(());
    }
    let subscription_id = match session.subscription.as_ref().map(Expandable::id) {
        Some(id) => id.to_string(),
        None => {
            tracing::warn!(session_id = %session.id, "Checkout session has no subscription");
            return Ok(());
        }
    };
    let subscription = stripe.retrieve_subscription(&subscription_id).await?;

    let hinted = session
        .client_reference_id
        .as_deref()
        .or_else(|| session.metadata.get("user_id").map(String::as_str))
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok());
    let user_id = match hinted {
        Some(user_id) => {
            if !subscription.metadata.contains_key("user_id") {
                if let Err(e) = stripe.set_subscription_user(&subscription.id, user_id).await {
                    tracing::warn!(
                        error.cause_chain = ?e,
                        "Failed to tag the subscription with its user"
                    );
                }
            }
            Some(user_id)
        }
        None => resolve_user_id(stripe, &DbUserDirectory(conn), &subscription)
            .await?
            .map(|(user_id, _)| user_id),
    };
    mirror_subscription(&subscription, user_id, conn).await
}

async fn mirror_subscription(
    subscription: &StripeSubscription,
    user_id: Option<Uuid>,
    conn: &VoicemailDbConn,
) -> Result<(), anyhow::Error> {
    let user_id = match user_id {
        Some(user_id) => user_id,
        None => {
            // Acknowledged anyway: retries would not find the owner either.
            tracing::warn!(
                stripe_subscription_id = %subscription.id,
                "No user matches this Stripe subscription"
            );
            return Ok(());
        }
    };
    let record =
        SubscriptionRecord::from_stripe(subscription, user_id).map_err(anyhow::Error::msg)?;
    conn.run(move |c: &mut PgConnection| upsert_subscription(c, &record))
        .await
        .context("Failed to upsert the subscription.")?;
    Ok(())
}

async fn set_status(
    conn: &VoicemailDbConn,
    stripe_subscription_id: String,
    status: SubscriptionStatus,
) -> Result<(), anyhow::Error> {
    let updated = conn
        .run(move |c: &mut PgConnection| {
            set_status_by_stripe_id(c, &stripe_subscription_id, status)
        })
        .await
        .context("Failed to update the subscription status.")?;
    if updated == 0 {
        tracing::info!(status = status.as_str(), "No local subscription to update");
    }
    Ok(())
}
