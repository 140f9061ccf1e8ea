use crate::domain::SubscriptionStatus;
use crate::models::{NewSubscription, Subscription, SubscriptionChanges};
use crate::startup::VoicemailDbConn;
use crate::stripe::{SubscriptionRecord, UserDirectory};
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

/// Inserts the record, or overwrites the row with the same Stripe id.
#[tracing::instrument(
    name = "Upsert subscription",
    skip(conn, record),
    fields(stripe_subscription_id = %record.stripe_subscription_id)
)]
pub fn upsert_subscription(
    conn: &mut PgConnection,
    record: &SubscriptionRecord,
) -> QueryResult<usize> {
    use crate::schema::subscriptions;
    diesel::insert_into(subscriptions::table)
        .values(new_subscription(record, &Uuid::new_v4()))
        .on_conflict(subscriptions::stripe_subscription_id)
        .do_update()
        .set(changes(record))
        .execute(conn)
}

pub fn insert_subscription(
    conn: &mut PgConnection,
    record: &SubscriptionRecord,
) -> QueryResult<usize> {
    use crate::schema::subscriptions;
    diesel::insert_into(subscriptions::table)
        .values(new_subscription(record, &Uuid::new_v4()))
        .execute(conn)
}

pub fn update_subscription(
    conn: &mut PgConnection,
    record: &SubscriptionRecord,
) -> QueryResult<usize> {
    use crate::schema::subscriptions;
    diesel::update(
        subscriptions::table
            .filter(subscriptions::stripe_subscription_id.eq(&record.stripe_subscription_id)),
    )
    .set(changes(record))
    .execute(conn)
}

/// Returns the number of rows touched; zero when we never mirrored this subscription.
pub fn set_status_by_stripe_id(
    conn: &mut PgConnection,
    stripe_subscription_id: &str,
    status: SubscriptionStatus,
) -> QueryResult<usize> {
    use crate::schema::subscriptions;
    diesel::update(
        subscriptions::table
            .filter(subscriptions::stripe_subscription_id.eq(stripe_subscription_id)),
    )
    .set((
        subscriptions::status.eq(status.as_str()),
        subscriptions::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
}

pub fn deactivate_subscription(
    conn: &mut PgConnection,
    stripe_subscription_id: &str,
) -> QueryResult<usize> {
    set_status_by_stripe_id(conn, stripe_subscription_id, SubscriptionStatus::Canceled)
}

pub fn load_local_subscriptions(conn: &mut PgConnection) -> QueryResult<Vec<Subscription>> {
    use crate::schema::subscriptions;
    subscriptions::table
        .select(Subscription::as_select())
        .load(conn)
}

pub fn find_user_id_by_email(conn: &mut PgConnection, email: &str) -> QueryResult<Option<Uuid>> {
    use crate::schema::users;
    users::table
        .select(users::user_id)
        .filter(users::email.eq(email))
        .first::<Uuid>(conn)
        .optional()
}

fn new_subscription<'a>(record: &'a SubscriptionRecord, id: &'a Uuid) -> NewSubscription<'a> {
    NewSubscription {
        id,
        user_id: &record.user_id,
        plan_id: &record.plan_id,
        status: record.status.as_str(),
        stripe_subscription_id: &record.stripe_subscription_id,
        stripe_customer_id: &record.stripe_customer_id,
        current_period_start: record.current_period_start,
        current_period_end: record.current_period_end,
        cancel_at_period_end: record.cancel_at_period_end,
    }
}

fn changes(record: &SubscriptionRecord) -> SubscriptionChanges<'_> {
    SubscriptionChanges {
        user_id: &record.user_id,
        plan_id: &record.plan_id,
        status: record.status.as_str(),
        stripe_customer_id: &record.stripe_customer_id,
        current_period_start: record.current_period_start,
        current_period_end: record.current_period_end,
        cancel_at_period_end: record.cancel_at_period_end,
        updated_at: Utc::now(),
    }
}

/// [`UserDirectory`] over the `users` table.
pub struct DbUserDirectory<'a>(pub &'a VoicemailDbConn);

#[async_trait]
impl UserDirectory for DbUserDirectory<'_> {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<Uuid>, anyhow::Error> {
        let email = email.to_string();
        self.0
            .run(move |conn: &mut PgConnection| find_user_id_by_email(conn, &email))
            .await
            .map_err(anyhow::Error::from)
    }
}
