use diesel::prelude::*;
use crate::schema::subscriptions;
use chrono::offset::Utc;
use chrono::DateTime;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = subscriptions)]
pub struct Subscription {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub plan_id: String,
    pub status: String,
    pub stripe_subscription_id: String,
    pub stripe_customer_id: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscription<'a> {
    pub id: &'a uuid::Uuid,
    pub user_id: &'a uuid::Uuid,
    pub plan_id: &'a str,
    pub status: &'a str,
    pub stripe_subscription_id: &'a str,
    pub stripe_customer_id: &'a str,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

#[derive(AsChangeset)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionChanges<'a> {
    pub user_id: &'a uuid::Uuid,
    pub plan_id: &'a str,
    pub status: &'a str,
    pub stripe_customer_id: &'a str,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub updated_at: DateTime<Utc>,
}
