use crate::routes::json_error;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::Value;

/// Bodies that fail to deserialize are the client's fault: report them as 400.
#[catch(422)]
pub fn unprocessable_entity_to_bad_request(_req: &Request) -> (Status, Json<Value>) {
    json_error(Status::BadRequest, "The request body is malformed.")
}
