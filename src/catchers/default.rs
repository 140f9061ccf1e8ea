use crate::routes::json_error;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::Value;

#[catch(default)]
pub fn json_default(status: Status, _req: &Request) -> (Status, Json<Value>) {
    json_error(status, status.reason().unwrap_or("Unknown error"))
}
