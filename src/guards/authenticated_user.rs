use crate::authentication::{verify_password_hash, AuthError};
use crate::guards::{BasicAuth, OrStatus};
use crate::models::User;
use crate::startup::VoicemailDbConn;
use anyhow::Context;
use diesel::OptionalExtension;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use secrecy::Secret;
use uuid::Uuid;

/// A user whose Basic credentials matched a stored argon2 hash.
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    // prevents construction outside of this module
    _private: (),
}

#[async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match from_request_result(request).await {
            Ok(user) => Outcome::Success(user),
            Err(failure) => Outcome::Error(failure),
        }
    }
}

async fn from_request_result(
    request: &Request<'_>,
) -> Result<AuthenticatedUser, (Status, anyhow::Error)> {
    let basic_auth = match request.guard::<BasicAuth>().await {
        Outcome::Success(auth) => auth,
        Outcome::Error((status, e)) => return Err((status, e)),
        Outcome::Forward(_) => {
            return Err((
                Status::Unauthorized,
                anyhow::anyhow!("User has not been authenticated."),
            ))
        }
    };
    let conn = request
        .guard::<VoicemailDbConn>()
        .await
        .succeeded()
        .or_status(
            Status::ServiceUnavailable,
            "Failed to retrieve a connection from the DB pool.",
        )?;

    let email = basic_auth.email;
    let password = basic_auth.password;
    conn.run(move |conn: &mut PgConnection| validate_credentials(conn, email, password))
        .await
}

#[tracing::instrument(name = "Validate credentials", skip(conn, password))]
fn validate_credentials(
    conn: &mut PgConnection,
    email: String,
    password: Secret<String>,
) -> Result<AuthenticatedUser, (Status, anyhow::Error)> {
    use crate::schema::users;

    let stored = users::table
        .select(User::as_select())
        .filter(users::email.eq(&email))
        .first(conn)
        .optional()
        .context("Failed to perform a query to validate auth credentials.")
        .map_err(|e| (Status::InternalServerError, e))?;

    let user = stored.or_status(Status::Unauthorized, "Unknown username.")?;

    match verify_password_hash(Secret::new(user.password_hash), password) {
        Ok(()) => Ok(AuthenticatedUser {
            user_id: user.user_id,
            email: user.email,
            _private: (),
        }),
        Err(AuthError::InvalidCredentials(e)) => Err((Status::Unauthorized, e)),
        Err(AuthError::UnexpectedError(e)) => Err((Status::InternalServerError, e)),
    }
}
