use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

/// Stripe fields that may come back either as an id or as the expanded object.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Default for StripeList<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct StripePrice {
    pub id: String,
    pub lookup_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct SubscriptionItem {
    pub price: Option<StripePrice>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: Expandable,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub items: StripeList<SubscriptionItem>,
}

impl StripeSubscription {
    pub fn customer_id(&self) -> &str {
        self.customer.id()
    }

    /// `metadata.plan_id`, else the first price's lookup key, else its id.
    pub fn plan_id(&self) -> Option<String> {
        if let Some(plan) = self.metadata.get("plan_id").filter(|p| !p.is_empty()) {
            return Some(plan.clone());
        }
        let price = self.items.data.first()?.price.as_ref()?;
        Some(price.lookup_key.clone().unwrap_or_else(|| price.id.clone()))
    }

    /// Newer API versions report billing periods per item only.
    pub fn period(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let item = self.items.data.first();
        let start = self
            .current_period_start
            .or_else(|| item.and_then(|i| i.current_period_start));
        let end = self
            .current_period_end
            .or_else(|| item.and_then(|i| i.current_period_end));
        (start.and_then(from_unix), end.and_then(from_unix))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub mode: Option<String>,
    pub client_reference_id: Option<String>,
    pub customer: Option<Expandable>,
    pub subscription: Option<Expandable>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Invoice {
    pub id: String,
    pub subscription: Option<Expandable>,
}

fn from_unix(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}
