use anyhow::anyhow;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;

/// The raw `Stripe-Signature` header. Verification happens once the body is read.
pub struct StripeSignature(pub String);

#[async_trait]
impl<'r> FromRequest<'r> for StripeSignature {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.headers().get_one("Stripe-Signature") {
            Some(value) if !value.trim().is_empty() => {
                Outcome::Success(StripeSignature(value.to_string()))
            }
            _ => Outcome::Error((
                Status::BadRequest,
                anyhow!("The 'Stripe-Signature' header was missing"),
            )),
        }
    }
}
