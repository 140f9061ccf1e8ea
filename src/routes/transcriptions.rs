use crate::guards::AuthenticatedUser;
use crate::models::Transcription;
use crate::routes::ApiError;
use crate::startup::VoicemailDbConn;
use anyhow::Context;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use rocket::serde::json::Json;
use serde_json::{json, Value};
use uuid::Uuid;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionView {
    pub id: Uuid,
    pub customer_name: String,
    pub caller_number: Option<String>,
    /// `[{speaker, text, offsetSeconds?}]`, as stored.
    pub turns: Value,
    pub summary: Option<String>,
    pub duration_seconds: Option<i32>,
    pub received_at: DateTime<Utc>,
}

impl From<Transcription> for TranscriptionView {
    fn from(t: Transcription) -> Self {
        Self {
            id: t.id,
            customer_name: t.customer_name,
            caller_number: t.caller_number,
            turns: t.turns,
            summary: t.summary,
            duration_seconds: t.duration_seconds,
            received_at: t.received_at,
        }
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[tracing::instrument(
    name = "List transcriptions",
    skip(user, conn),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[get("/transcriptions?<limit>")]
pub async fn list_transcriptions(
    limit: Option<i64>,
    user: AuthenticatedUser,
    conn: VoicemailDbConn,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.user_id;
    let limit = clamp_limit(limit);
    let rows = conn
        .run(move |c: &mut PgConnection| {
            use crate::schema::transcriptions;
            transcriptions::table
                .select(Transcription::as_select())
                .filter(transcriptions::user_id.eq(user_id))
                .order(transcriptions::received_at.desc())
                .limit(limit)
                .load(c)
        })
        .await
        .context("Failed to load transcriptions.")?;
    let transcriptions: Vec<TranscriptionView> = rows.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "transcriptions": transcriptions })))
}

#[tracing::instrument(
    name = "Get transcription",
    skip(user, conn),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[get("/transcriptions/<id>")]
pub async fn get_transcription(
    id: Uuid,
    user: AuthenticatedUser,
    conn: VoicemailDbConn,
) -> Result<Json<TranscriptionView>, ApiError> {
    let user_id = user.user_id;
    let row = conn
        .run(move |c: &mut PgConnection| {
            use crate::schema::transcriptions;
            transcriptions::table
                .select(Transcription::as_select())
                .filter(transcriptions::id.eq(id))
                .filter(transcriptions::user_id.eq(user_id))
                .first(c)
                .optional()
        })
        .await
        .context("Failed to load the transcription.")?;
    row.map(|t| Json(t.into()))
        .ok_or_else(|| ApiError::NotFound("Transcription not found.".into()))
}
