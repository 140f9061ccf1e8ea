use diesel::prelude::*;
use crate::schema::transcriptions;
use chrono::{DateTime, Utc};

#[derive(Queryable, Selectable)]
#[diesel(table_name = transcriptions)]
pub struct Transcription {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub customer_name: String,
    pub caller_number: Option<String>,
    pub turns: serde_json::Value,
    pub summary: Option<String>,
    pub duration_seconds: Option<i32>,
    pub received_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = transcriptions)]
pub struct NewTranscription<'a> {
    pub id: &'a uuid::Uuid,
    pub user_id: &'a uuid::Uuid,
    pub customer_name: &'a str,
    pub caller_number: Option<&'a str>,
    pub turns: &'a serde_json::Value,
    pub summary: Option<&'a str>,
    pub duration_seconds: Option<i32>,
    pub received_at: &'a DateTime<Utc>,
}
