use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use std::convert::Infallible;

/// The parts of an incoming request the offline cache strategy looks at.
pub struct AssetRequestParts {
    /// Path and query, as sent by the client.
    pub path_and_query: String,
    pub method: String,
    pub origin: Option<String>,
    pub accepts_html: bool,
}

#[async_trait]
impl<'r> FromRequest<'r> for AssetRequestParts {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = request.headers();
        Outcome::Success(AssetRequestParts {
            path_and_query: request.uri().to_string(),
            method: request.method().as_str().to_string(),
            origin: headers.get_one("Origin").map(str::to_string),
            accepts_html: headers
                .get_one("Accept")
                .map(|accept| accept.contains("text/html"))
                .unwrap_or(false),
        })
    }
}
