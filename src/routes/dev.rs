use crate::authentication::compute_password_hash;
use crate::domain::UserEmail;
use crate::models::{NewAgendaEvent, NewNotification, NewTranscription, NewUser};
use crate::routes::ApiError;
use crate::startup::VoicemailDbConn;
use anyhow::Context;
use chrono::{Duration, Timelike, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::PgConnection;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::Rng;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};
use uuid::Uuid;

const SEEDED_TRANSCRIPTIONS: usize = 3;

/// Which integrations have credentials. Booleans only, never the values.
#[derive(serde::Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStatus {
    pub stripe: bool,
    pub stripe_webhook: bool,
    pub gemini: bool,
}

#[derive(serde::Deserialize)]
pub struct NewUserBody {
    email: String,
    password: String,
}

#[tracing::instrument(
    name = "Create development user",
    skip(body, conn),
    fields(request_id = %Uuid::new_v4())
)]
#[post("/dev/users", data = "<body>")]
pub async fn create_dev_user(
    body: Json<NewUserBody>,
    conn: VoicemailDbConn,
) -> Result<(Status, Json<Value>), ApiError> {
    let NewUserBody { email, password } = body.into_inner();
    let email = UserEmail::parse(email).map_err(ApiError::Validation)?;
    if password.chars().count() < 8 {
        return Err(ApiError::Validation(
            "A password must be at least 8 characters long.".into(),
        ));
    }

    let user_id = Uuid::new_v4();
    let stored_email = email.as_ref().to_string();
    let inserted = conn
        .run(move |c: &mut PgConnection| -> Result<usize, ApiError> {
            use crate::schema::users;
            // Hashing is CPU bound; this closure already runs on a blocking thread.
            let password_hash = compute_password_hash(Secret::new(password))?;
            let result = diesel::insert_into(users::table)
                .values(NewUser {
                    user_id: &user_id,
                    email: &stored_email,
                    password_hash: password_hash.expose_secret(),
                })
                .execute(c);
            match result {
                Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Err(
                    ApiError::Validation("A user with this email already exists.".into()),
                ),
                other => Ok(other.context("Failed to insert the user.")?),
            }
        })
        .await?;
    tracing::info!(inserted, %user_id, "Created development user");
    Ok((
        Status::Created,
        Json(json!({ "userId": user_id, "email": email.as_ref() })),
    ))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedBody {
    user_id: Uuid,
}

#[tracing::instrument(
    name = "Seed development data",
    skip(body, conn),
    fields(request_id = %Uuid::new_v4())
)]
#[post("/dev/seed", data = "<body>")]
pub async fn seed_dev_data(
    body: Json<SeedBody>,
    conn: VoicemailDbConn,
) -> Result<(Status, Json<Value>), ApiError> {
    let user_id = body.user_id;
    let counts = conn
        .run(move |c: &mut PgConnection| -> Result<Value, ApiError> {
            use crate::schema::users;
            let exists = users::table
                .select(users::user_id)
                .filter(users::user_id.eq(user_id))
                .first::<Uuid>(c)
                .optional()
                .context("Failed to look up the user.")?
                .is_some();
            if !exists {
                return Err(ApiError::NotFound("User not found.".into()));
            }
            c.transaction(|c| seed(c, user_id))
                .context("Failed to seed development data.")
                .map_err(ApiError::from)
        })
        .await?;
    Ok((Status::Created, Json(counts)))
}

fn seed(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Value> {
    use crate::schema::{agenda_events, notifications, transcriptions};
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    for i in 0..SEEDED_TRANSCRIPTIONS {
        let customer_name: String = Name().fake();
        let caller_number: String = PhoneNumber().fake();
        let turns = json!([
            {
                "speaker": "caller",
                "text": format!(
                    "Hi, this is {}. Could you call me back about my appointment?",
                    customer_name
                ),
                "offsetSeconds": 0
            },
            {
                "speaker": "assistant",
                "text": "Of course. When is a good time to reach you?",
                "offsetSeconds": 6
            },
            {"speaker": "caller", "text": "Any time tomorrow morning works.", "offsetSeconds": 11}
        ]);
        let summary = format!("{} asks for a call back tomorrow morning.", customer_name);
        diesel::insert_into(transcriptions::table)
            .values(NewTranscription {
                id: &Uuid::new_v4(),
                user_id: &user_id,
                customer_name: &customer_name,
                caller_number: Some(caller_number.as_str()),
                turns: &turns,
                summary: Some(summary.as_str()),
                duration_seconds: Some(rng.gen_range(15..180)),
                received_at: &(now - Duration::hours(i as i64 * 5)),
            })
            .execute(conn)?;
    }

    let seeded_notifications = [
        ("New voicemail", "You have a new transcribed voicemail.", "info"),
        ("Appointment booked", "A caller booked an appointment for tomorrow.", "success"),
    ];
    for (title, message, kind) in seeded_notifications {
        diesel::insert_into(notifications::table)
            .values(NewNotification {
                id: &Uuid::new_v4(),
                user_id: &user_id,
                title,
                message,
                kind,
            })
            .execute(conn)?;
    }

    let start = (now + Duration::days(1))
        .with_hour(10)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now + Duration::days(1));
    diesel::insert_into(agenda_events::table)
        .values(NewAgendaEvent {
            id: &Uuid::new_v4(),
            user_id: &user_id,
            title: "Call back",
            description: Some("Follow up on yesterday's voicemail."),
            location: None,
            start_time: &start,
            end_time: &(start + Duration::minutes(30)),
        })
        .execute(conn)?;

    Ok(json!({
        "transcriptions": SEEDED_TRANSCRIPTIONS,
        "notifications": seeded_notifications.len(),
        "agendaEvents": 1,
    }))
}

#[tracing::instrument(name = "Report integration status", skip(status))]
#[get("/dev/status")]
pub async fn dev_status(status: &State<IntegrationStatus>) -> Json<IntegrationStatus> {
    Json(*status.inner())
}
