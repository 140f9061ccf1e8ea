use crate::stripe::{StripeApi, StripeCustomer, StripeList, StripeSubscription};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use uuid::Uuid;

const PAGE_SIZE: &str = "100";

pub struct HttpStripeClient {
    http_client: Client,
    base_url: String,
    secret_key: Secret<String>,
}

impl HttpStripeClient {
    pub fn new(
        base_url: String,
        secret_key: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build the Stripe HTTP client.")?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http_client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(self.secret_key.expose_secret())
    }
}

#[async_trait]
impl StripeApi for HttpStripeClient {
    #[tracing::instrument(name = "List active Stripe subscriptions", skip(self))]
    async fn list_active_subscriptions(&self) -> Result<Vec<StripeSubscription>, anyhow::Error> {
        let mut subscriptions = Vec::new();
        let mut starting_after: Option<String> = None;
        loop {
            let mut query = vec![
                ("status", "active".to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ];
            if let Some(cursor) = &starting_after {
                query.push(("starting_after", cursor.clone()));
            }
            let page: StripeList<StripeSubscription> = self
                .get("/v1/subscriptions")
                .query(&query)
                .send()
                .await
                .context("Failed to reach Stripe.")?
                .error_for_status()
                .context("Stripe refused to list subscriptions.")?
                .json()
                .await
                .context("Failed to decode a page of subscriptions.")?;

            starting_after = page.data.last().map(|s| s.id.clone());
            let has_more = page.has_more;
            subscriptions.extend(page.data);
            if !has_more || starting_after.is_none() {
                break;
            }
        }
        Ok(subscriptions)
    }

    #[tracing::instrument(name = "Retrieve Stripe subscription", skip(self))]
    async fn retrieve_subscription(&self, id: &str) -> Result<StripeSubscription, anyhow::Error> {
        self.get(&format!("/v1/subscriptions/{}", id))
            .send()
            .await
            .context("Failed to reach Stripe.")?
            .error_for_status()
            .with_context(|| format!("Stripe refused to return subscription {}.", id))?
            .json()
            .await
            .context("Failed to decode the subscription.")
    }

    #[tracing::instrument(name = "Retrieve Stripe customer", skip(self))]
    async fn retrieve_customer(&self, id: &str) -> Result<StripeCustomer, anyhow::Error> {
        self.get(&format!("/v1/customers/{}", id))
            .send()
            .await
            .context("Failed to reach Stripe.")?
            .error_for_status()
            .with_context(|| format!("Stripe refused to return customer {}.", id))?
            .json()
            .await
            .context("Failed to decode the customer.")
    }

    #[tracing::instrument(name = "Tag Stripe subscription with user", skip(self))]
    async fn set_subscription_user(
        &self,
        subscription_id: &str,
        user_id: Uuid,
    ) -> Result<(), anyhow::Error> {
        self.http_client
            .post(format!("{}/v1/subscriptions/{}", self.base_url, subscription_id))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&[("metadata[user_id]", user_id.to_string())])
            .send()
            .await
            .context("Failed to reach Stripe.")?
            .error_for_status()
            .with_context(|| {
                format!("Stripe refused to update subscription {}.", subscription_id)
            })?;
        Ok(())
    }
}
