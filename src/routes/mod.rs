mod agenda_events;
mod agent_chat;
mod dev;
mod health_check;
mod notifications;
mod pwa;
mod stripe_webhook;
mod subscriptions_sync;
mod transcriptions;
mod user_profile;

pub use agenda_events::*;
pub use agent_chat::*;
pub use dev::*;
pub use health_check::*;
pub use notifications::*;
pub use pwa::*;
pub use stripe_webhook::*;
pub use subscriptions_sync::*;
pub use transcriptions::*;
pub use user_profile::*;

use rocket::http::{Header, Status};
use rocket::response::Responder;
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::{json, Value};

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

/// `{"error": message}` with the given status.
pub fn json_error(status: Status, message: &str) -> (Status, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Too many requests, retry in {0} seconds.")]
    RateLimited(u64),
    #[error("{0}")]
    Unavailable(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::RateLimited(_) => Status::TooManyRequests,
            ApiError::Unavailable(_) => Status::ServiceUnavailable,
            ApiError::UnexpectedError(_) => Status::InternalServerError,
        }
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();
        let message = match &self {
            ApiError::UnexpectedError(_) => {
                tracing::error!("ApiError: {:?}", self);
                "Internal server error.".to_string()
            }
            other => {
                tracing::warn!("ApiError: {:?}", other);
                other.to_string()
            }
        };
        let mut response = json_error(status, &message).respond_to(request)?;
        if let ApiError::RateLimited(seconds) = self {
            response.set_header(Header::new("Retry-After", seconds.to_string()));
        }
        Ok(response)
    }
}
