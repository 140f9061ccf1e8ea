use crate::domain::SubscriptionStatus;
use crate::models::Subscription;
use crate::stripe::{StripeApi, StripeSubscription};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Looks users up by email, for subscriptions that carry no `user_id` metadata.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<Uuid>, anyhow::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIdSource {
    SubscriptionMetadata,
    CustomerMetadata,
    CustomerEmail,
}

/// The row a Stripe subscription should be mirrored as.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    pub user_id: Uuid,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub stripe_subscription_id: String,
    pub stripe_customer_id: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

impl SubscriptionRecord {
    pub fn from_stripe(
        subscription: &StripeSubscription,
        user_id: Uuid,
    ) -> Result<SubscriptionRecord, String> {
        let status = SubscriptionStatus::parse(&subscription.status)?;
        let (current_period_start, current_period_end) = subscription.period();
        Ok(SubscriptionRecord {
            user_id,
            plan_id: subscription
                .plan_id()
                .unwrap_or_else(|| "unknown".to_string()),
            status,
            stripe_subscription_id: subscription.id.clone(),
            stripe_customer_id: subscription.customer_id().to_string(),
            current_period_start,
            current_period_end,
            cancel_at_period_end: subscription.cancel_at_period_end,
        })
    }

    fn differs_from(&self, local: &Subscription) -> bool {
        self.status.as_str() != local.status
            || self.plan_id != local.plan_id
            || self.current_period_start != local.current_period_start
            || self.current_period_end != local.current_period_end
            || self.cancel_at_period_end != local.cancel_at_period_end
    }
}

/// Finds the user a subscription belongs to: the subscription's own
/// `metadata.user_id`, then the customer's, then the customer's email.
///
/// When a fallback found the user the id is written back to the subscription's
/// metadata so the next lookup is direct. A failed write-back is only logged.
#[tracing::instrument(
    name = "Resolve subscription owner",
    skip(stripe, directory, subscription),
    fields(stripe_subscription_id = %subscription.id)
)]
pub async fn resolve_user_id<D>(
    stripe: &dyn StripeApi,
    directory: &D,
    subscription: &StripeSubscription,
) -> Result<Option<(Uuid, UserIdSource)>, anyhow::Error>
where
    D: UserDirectory + ?Sized,
{
    if let Some(user_id) = metadata_user_id(&subscription.metadata) {
        return Ok(Some((user_id, UserIdSource::SubscriptionMetadata)));
    }

    let customer = stripe.retrieve_customer(subscription.customer_id()).await?;
    let resolved = match metadata_user_id(&customer.metadata) {
        Some(user_id) => Some((user_id, UserIdSource::CustomerMetadata)),
        None => match customer.email.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(email) => directory
                .find_user_by_email(&email.trim().to_lowercase())
                .await?
                .map(|user_id| (user_id, UserIdSource::CustomerEmail)),
            None => None,
        },
    };

    if let Some((user_id, source)) = resolved {
        if let Err(e) = stripe.set_subscription_user(&subscription.id, user_id).await {
            tracing::warn!(
                error.cause_chain = ?e,
                ?source,
                "Failed to write the resolved user id back to Stripe"
            );
        }
    }
    Ok(resolved)
}

fn metadata_user_id(metadata: &HashMap<String, String>) -> Option<Uuid> {
    metadata
        .get("user_id")
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
}

/// Remote subscriptions turned into records, with the ones we could not place.
#[derive(Debug, Default)]
pub struct ResolvedSubscriptions {
    /// Every listed Stripe id, placed or not.
    pub stripe_ids: HashSet<String>,
    pub records: Vec<SubscriptionRecord>,
    pub unresolved: usize,
    pub failed: usize,
}

pub async fn resolve_subscriptions<D>(
    stripe: &dyn StripeApi,
    directory: &D,
    subscriptions: &[StripeSubscription],
) -> ResolvedSubscriptions
where
    D: UserDirectory + ?Sized,
{
    let mut resolved = ResolvedSubscriptions::default();
    for subscription in subscriptions {
        resolved.stripe_ids.insert(subscription.id.clone());
        match resolve_user_id(stripe, directory, subscription).await {
            Ok(Some((user_id, _))) => match SubscriptionRecord::from_stripe(subscription, user_id) {
                Ok(record) => resolved.records.push(record),
                Err(e) => {
                    tracing::warn!(stripe_subscription_id = %subscription.id, "{}", e);
                    resolved.failed += 1;
                }
            },
            Ok(None) => {
                tracing::warn!(
                    stripe_subscription_id = %subscription.id,
                    "No user matches this Stripe subscription"
                );
                resolved.unresolved += 1;
            }
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    stripe_subscription_id = %subscription.id,
                    "Failed to resolve the owner of a Stripe subscription"
                );
                resolved.failed += 1;
            }
        }
    }
    resolved
}

#[derive(Debug, Default, PartialEq)]
pub struct SyncPlan {
    pub inserts: Vec<SubscriptionRecord>,
    pub updates: Vec<SubscriptionRecord>,
    /// Stripe ids of local rows to mark `canceled`.
    pub deactivations: Vec<String>,
}

/// Diffs Stripe's active subscriptions against our rows.
///
/// Only resolved records are inserted or updated, but a local row is kept
/// whenever Stripe listed its id, even if its owner could not be resolved.
pub fn plan_sync(remote: &ResolvedSubscriptions, local: &[Subscription]) -> SyncPlan {
    let local_by_id: HashMap<&str, &Subscription> = local
        .iter()
        .map(|row| (row.stripe_subscription_id.as_str(), row))
        .collect();

    let mut plan = SyncPlan::default();
    for record in &remote.records {
        match local_by_id.get(record.stripe_subscription_id.as_str()) {
            None => plan.inserts.push(record.clone()),
            Some(row) if record.differs_from(row) => plan.updates.push(record.clone()),
            Some(_) => {}
        }
    }
    plan.deactivations = local
        .iter()
        .filter(|row| {
            SubscriptionStatus::parse(&row.status)
                .map(|status| status.is_active())
                .unwrap_or(false)
        })
        .filter(|row| !remote.stripe_ids.contains(&row.stripe_subscription_id))
        .map(|row| row.stripe_subscription_id.clone())
        .collect();
    plan
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub stripe_active: usize,
    pub inserted: usize,
    pub updated: usize,
    pub deactivated: usize,
    pub unresolved: usize,
    pub failed: usize,
}
