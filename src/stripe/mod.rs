//! Stripe integration: the REST client, webhook verification, and the
//! reconciliation between Stripe subscriptions and our `subscriptions` table.

mod http_client;
mod store;
mod sync;
mod types;
mod webhook;

use async_trait::async_trait;
pub use http_client::HttpStripeClient;
pub use store::*;
pub use sync::*;
pub use types::*;
use uuid::Uuid;
pub use webhook::*;

#[async_trait]
pub trait StripeApi: Send + Sync {
    /// Every subscription in status `active`, across all result pages.
    async fn list_active_subscriptions(&self) -> Result<Vec<StripeSubscription>, anyhow::Error>;

    async fn retrieve_subscription(&self, id: &str) -> Result<StripeSubscription, anyhow::Error>;

    async fn retrieve_customer(&self, id: &str) -> Result<StripeCustomer, anyhow::Error>;

    /// Writes `metadata[user_id]` on the subscription.
    async fn set_subscription_user(
        &self,
        subscription_id: &str,
        user_id: Uuid,
    ) -> Result<(), anyhow::Error>;
}
