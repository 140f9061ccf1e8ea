use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use std::convert::Infallible;

/// Best-effort identity of the caller, used as the rate limiting key.
///
/// The first `X-Forwarded-For` hop wins over the socket peer address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientAddress(pub String);

#[async_trait]
impl<'r> FromRequest<'r> for ClientAddress {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let forwarded = request
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .map(str::to_string);
        let address = forwarded
            .or_else(|| request.client_ip().map(|ip| ip.to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientAddress(address))
    }
}
