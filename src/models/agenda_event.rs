use diesel::prelude::*;
use crate::schema::agenda_events;
use chrono::{DateTime, Utc};

#[derive(Queryable, Selectable)]
#[diesel(table_name = agenda_events)]
pub struct AgendaEvent {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Insertable)]
#[diesel(table_name = agenda_events)]
pub struct NewAgendaEvent<'a> {
    pub id: &'a uuid::Uuid,
    pub user_id: &'a uuid::Uuid,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub start_time: &'a DateTime<Utc>,
    pub end_time: &'a DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = agenda_events)]
pub struct AgendaEventChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
