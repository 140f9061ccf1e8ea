use crate::routes::json_error;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use serde_json::Value;

#[catch(401)]
pub fn unauthorized_request_credentials() -> RequestBasicAuth {
    RequestBasicAuth::new()
}

struct RequestBasicAuthHeader;

impl<'h> From<RequestBasicAuthHeader> for Header<'h> {
    fn from(_: RequestBasicAuthHeader) -> Self {
        Header::new("WWW-Authenticate", r#"Basic realm="voicemailai""#)
    }
}

#[derive(Responder)]
#[response(status = 401)]
pub struct RequestBasicAuth {
    inner: Json<Value>,
    basic_auth: RequestBasicAuthHeader,
}

impl RequestBasicAuth {
    fn new() -> RequestBasicAuth {
        let (_, body) = json_error(Status::Unauthorized, "Authentication required.");
        RequestBasicAuth {
            inner: body,
            basic_auth: RequestBasicAuthHeader,
        }
    }
}

impl Default for RequestBasicAuth {
    fn default() -> Self {
        Self::new()
    }
}
