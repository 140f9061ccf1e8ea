use crate::stripe::{CheckoutSession, Invoice, StripeSubscription};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("The Stripe-Signature header is malformed.")]
    MalformedHeader,
    #[error("The signature timestamp is outside the tolerance window.")]
    TimestampOutOfTolerance,
    #[error("No signature matched the payload.")]
    NoMatchingSignature,
}

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`) against
/// the raw request body. Any `v1` entry may match; other schemes are ignored.
pub fn verify_signature(
    payload: &str,
    header: &str,
    secret: &Secret<String>,
    tolerance_seconds: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(SignatureError::MalformedHeader)?;
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    if (now - timestamp).abs() > tolerance_seconds {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let signed = signed_mac(payload, secret, timestamp)?;
    let matches = signatures
        .iter()
        .filter_map(|signature| hex::decode(signature).ok())
        .any(|expected| signed.clone().verify_slice(&expected).is_ok());
    if matches {
        Ok(())
    } else {
        Err(SignatureError::NoMatchingSignature)
    }
}

/// Produces a header the way Stripe does. Handy for tests and local tooling.
pub fn sign_payload(payload: &str, secret: &Secret<String>, timestamp: i64) -> String {
    let signature = signed_mac(payload, secret, timestamp)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, signature)
}

fn signed_mac(
    payload: &str,
    secret: &Secret<String>,
    timestamp: i64,
) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| SignatureError::MalformedHeader)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(mac)
}

#[derive(Debug, serde::Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, serde::Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The events we act on. Everything else is acknowledged and dropped.
#[derive(Debug)]
pub enum WebhookEvent {
    CheckoutCompleted(CheckoutSession),
    SubscriptionUpserted(StripeSubscription),
    SubscriptionDeleted(StripeSubscription),
    InvoicePaid(Invoice),
    InvoicePaymentFailed(Invoice),
    Ignored(String),
}

impl Event {
    pub fn parse(payload: &str) -> Result<Event, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn into_webhook_event(self) -> Result<WebhookEvent, serde_json::Error> {
        let object = self.data.object;
        Ok(match self.event_type.as_str() {
            "checkout.session.completed" => {
                WebhookEvent::CheckoutCompleted(serde_json::from_value(object)?)
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                WebhookEvent::SubscriptionUpserted(serde_json::from_value(object)?)
            }
            "customer.subscription.deleted" => {
                WebhookEvent::SubscriptionDeleted(serde_json::from_value(object)?)
            }
            "invoice.payment_succeeded" | "invoice.paid" => {
                WebhookEvent::InvoicePaid(serde_json::from_value(object)?)
            }
            "invoice.payment_failed" => {
                WebhookEvent::InvoicePaymentFailed(serde_json::from_value(object)?)
            }
            _ => WebhookEvent::Ignored(self.event_type),
        })
    }
}
