use anyhow::{anyhow, Context};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use secrecy::Secret;

/// `Authorization: Basic base64(email:password)`. The email is normalized the
/// same way it is stored.
#[derive(Debug)]
pub struct BasicAuth {
    pub email: String,
    pub password: Secret<String>,
}

#[async_trait]
impl<'r> FromRequest<'r> for BasicAuth {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let parsed = request
            .headers()
            .get_one("Authorization")
            .context("The 'Authorization' header was missing")
            .and_then(parse_basic_credentials);
        match parsed {
            Ok(auth) => Outcome::Success(auth),
            Err(e) => Outcome::Error((Status::Unauthorized, e)),
        }
    }
}

pub fn parse_basic_credentials(header_value: &str) -> Result<BasicAuth, anyhow::Error> {
    let (scheme, encoded) = header_value
        .trim()
        .split_once(' ')
        .context("The 'Authorization' header has no credentials.")?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(anyhow!("The authorization scheme was not 'Basic'."));
    }

    let decoded_bytes = base64::decode_config(encoded.trim(), base64::STANDARD)
        .context("Failed to base64-decode 'Basic' credentials.")?;
    let decoded = String::from_utf8(decoded_bytes)
        .context("The decoded credential string is not valid UTF8.")?;

    let (email, password) = decoded
        .split_once(':')
        .ok_or_else(|| anyhow!("A password must be provided in 'Basic' auth."))?;
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(anyhow!("An email must be provided in 'Basic' auth."));
    }

    Ok(BasicAuth {
        email,
        password: Secret::new(password.to_string()),
    })
}
