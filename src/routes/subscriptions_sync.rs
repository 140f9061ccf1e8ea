use crate::guards::AuthenticatedUser;
use crate::routes::ApiError;
use crate::startup::VoicemailDbConn;
use crate::stripe::{
    deactivate_subscription, insert_subscription, load_local_subscriptions, plan_sync,
    resolve_subscriptions, update_subscription, DbUserDirectory, StripeApi, SyncReport,
};
use anyhow::Context;
use diesel::PgConnection;
use rocket::serde::json::Json;
use rocket::State;
use std::sync::Arc;
use uuid::Uuid;

/// Reconciles our `subscriptions` table with Stripe's active subscriptions.
///
/// Every change is applied on its own; one failing row does not stop the pass.
#[tracing::instrument(
    name = "Sync subscriptions with Stripe",
    skip(user, conn, stripe),
    fields(request_id = %Uuid::new_v4(), requested_by = %user.user_id)
)]
#[post("/subscriptions/sync")]
pub async fn sync_subscriptions(
    user: AuthenticatedUser,
    conn: VoicemailDbConn,
    stripe: &State<Arc<dyn StripeApi>>,
) -> Result<Json<SyncReport>, ApiError> {
    let stripe: &dyn StripeApi = stripe.inner().as_ref();
    let remote = stripe.list_active_subscriptions().await.map_err(|e| {
        tracing::error!(error.cause_chain = ?e, "Failed to list Stripe subscriptions");
        ApiError::Unavailable("Stripe is unavailable.".into())
    })?;

    let resolved = resolve_subscriptions(stripe, &DbUserDirectory(&conn), &remote).await;
    let local = conn
        .run(|c: &mut PgConnection| load_local_subscriptions(c))
        .await
        .context("Failed to load local subscriptions.")?;
    let plan = plan_sync(&resolved, &local);

    let mut report = SyncReport {
        stripe_active: remote.len(),
        unresolved: resolved.unresolved,
        failed: resolved.failed,
        ..SyncReport::default()
    };
    for record in plan.inserts {
        match conn.run(move |c| insert_subscription(c, &record)).await {
            Ok(_) => report.inserted += 1,
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to insert a subscription");
                report.failed += 1;
            }
        }
    }
    for record in plan.updates {
        match conn.run(move |c| update_subscription(c, &record)).await {
            Ok(_) => report.updated += 1,
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to update a subscription");
                report.failed += 1;
            }
        }
    }
    for stripe_subscription_id in plan.deactivations {
        match conn
            .run(move |c| deactivate_subscription(c, &stripe_subscription_id))
            .await
        {
            Ok(_) => report.deactivated += 1,
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to deactivate a subscription");
                report.failed += 1;
            }
        }
    }
    tracing::info!(?report, "Subscription sync finished");
    Ok(Json(report))
}
