use crate::domain::{EventTitle, EventWindow};
use crate::models::{AgendaEvent, AgendaEventChanges, NewAgendaEvent};
use crate::routes::ApiError;
use crate::startup::VoicemailDbConn;
use anyhow::Context;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use rocket::http::Status;
use rocket::serde::json::Json;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AgendaEventView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AgendaEvent> for AgendaEventView {
    fn from(event: AgendaEvent) -> Self {
        Self {
            id: event.id,
            user_id: event.user_id,
            title: event.title,
            description: event.description,
            location: event.location,
            start_time: event.start_time,
            end_time: event.end_time,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[derive(FromForm, Debug)]
pub struct ListEventsQuery {
    #[field(name = "userId")]
    user_id: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

#[tracing::instrument(
    name = "List agenda events",
    skip(query, conn),
    fields(request_id = %Uuid::new_v4(), user_id = ?query.user_id)
)]
#[get("/agenda-events?<query..>")]
pub async fn list_agenda_events(
    query: ListEventsQuery,
    conn: VoicemailDbConn,
) -> Result<Json<Value>, ApiError> {
    let user_id = parse_user_id(query.user_id.as_deref())?;
    let from = parse_optional_timestamp(query.from.as_deref(), "from")?;
    let to = parse_optional_timestamp(query.to.as_deref(), "to")?;

    let events = conn
        .run(move |c: &mut PgConnection| load_events(c, user_id, from, to))
        .await
        .context("Failed to load agenda events.")?;
    let events: Vec<AgendaEventView> = events.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "events": events })))
}

fn load_events(
    conn: &mut PgConnection,
    user_id: Uuid,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> QueryResult<Vec<AgendaEvent>> {
    use crate::schema::agenda_events;
    let mut query = agenda_events::table
        .select(AgendaEvent::as_select())
        .filter(agenda_events::user_id.eq(user_id))
        .filter(agenda_events::deleted_at.is_null())
        .into_boxed();
    if let Some(from) = from {
        query = query.filter(agenda_events::start_time.ge(from));
    }
    if let Some(to) = to {
        query = query.filter(agenda_events::start_time.le(to));
    }
    query.order(agenda_events::start_time.asc()).load(conn)
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventBody {
    title: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    user_id: Option<String>,
    description: Option<String>,
    location: Option<String>,
}

#[derive(Debug)]
pub struct ValidNewEvent {
    user_id: Uuid,
    title: EventTitle,
    window: EventWindow,
    description: Option<String>,
    location: Option<String>,
}

impl TryFrom<CreateEventBody> for ValidNewEvent {
    type Error = String;

    fn try_from(body: CreateEventBody) -> Result<Self, Self::Error> {
        let missing: Vec<&str> = [
            ("title", body.title.is_none()),
            ("startTime", body.start_time.is_none()),
            ("endTime", body.end_time.is_none()),
            ("userId", body.user_id.is_none()),
        ]
        .iter()
        .filter(|(_, is_missing)| *is_missing)
        .map(|(name, _)| *name)
        .collect();
        if !missing.is_empty() {
            return Err(format!("Missing required fields: {}", missing.join(", ")));
        }

        let user_id = parse_uuid(body.user_id.unwrap_or_default().as_str(), "userId")?;
        let title = EventTitle::parse(body.title.unwrap_or_default())?;
        let window = EventWindow::parse(
            &body.start_time.unwrap_or_default(),
            &body.end_time.unwrap_or_default(),
        )?;
        Ok(ValidNewEvent {
            user_id,
            title,
            window,
            description: non_empty(body.description),
            location: non_empty(body.location),
        })
    }
}

#[tracing::instrument(
    name = "Create agenda event",
    skip(body, conn),
    fields(request_id = %Uuid::new_v4())
)]
#[post("/agenda-events", data = "<body>")]
pub async fn create_agenda_event(
    body: Json<CreateEventBody>,
    conn: VoicemailDbConn,
) -> Result<(Status, Json<AgendaEventView>), ApiError> {
    let event: ValidNewEvent = body.into_inner().try_into().map_err(ApiError::Validation)?;
    let created = conn
        .run(move |c: &mut PgConnection| insert_event(c, &event))
        .await
        .context("Failed to insert a new agenda event.")?;
    Ok((Status::Created, Json(created.into())))
}

fn insert_event(conn: &mut PgConnection, event: &ValidNewEvent) -> QueryResult<AgendaEvent> {
    use crate::schema::agenda_events;
    diesel::insert_into(agenda_events::table)
        .values(NewAgendaEvent {
            id: &Uuid::new_v4(),
            user_id: &event.user_id,
            title: event.title.as_ref(),
            description: event.description.as_deref(),
            location: event.location.as_deref(),
            start_time: &event.window.start(),
            end_time: &event.window.end(),
        })
        .returning(AgendaEvent::as_returning())
        .get_result(conn)
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventBody {
    id: Option<String>,
    user_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
}

#[tracing::instrument(
    name = "Update agenda event",
    skip(body, conn),
    fields(request_id = %Uuid::new_v4())
)]
#[put("/agenda-events", data = "<body>")]
pub async fn update_agenda_event(
    body: Json<UpdateEventBody>,
    conn: VoicemailDbConn,
) -> Result<Json<AgendaEventView>, ApiError> {
    let body = body.into_inner();
    let id = parse_uuid(body.id.as_deref().unwrap_or_default(), "id")
        .map_err(ApiError::Validation)?;
    let user_id = parse_user_id(body.user_id.as_deref())?;
    let title = body
        .title
        .map(EventTitle::parse)
        .transpose()
        .map_err(ApiError::Validation)?;
    let start = parse_optional_timestamp(body.start_time.as_deref(), "startTime")?;
    let end = parse_optional_timestamp(body.end_time.as_deref(), "endTime")?;
    // An empty string clears the field.
    let description = body.description.map(|d| non_empty(Some(d)));
    let location = body.location.map(|l| non_empty(Some(l)));

    let updated = conn
        .run(move |c: &mut PgConnection| -> Result<AgendaEvent, ApiError> {
            use crate::schema::agenda_events;
            let existing = find_live_event(c, id, user_id)
                .context("Failed to look up the agenda event.")?
                .ok_or_else(|| ApiError::NotFound("Agenda event not found.".into()))?;
            let window = EventWindow::new(
                start.unwrap_or(existing.start_time),
                end.unwrap_or(existing.end_time),
            )
            .map_err(ApiError::Validation)?;

            let changes = AgendaEventChanges {
                title: title.map(|t| t.as_ref().to_string()),
                description,
                location,
                start_time: Some(window.start()),
                end_time: Some(window.end()),
                updated_at: Utc::now(),
            };
            diesel::update(
                agenda_events::table
                    .filter(agenda_events::id.eq(id))
                    .filter(agenda_events::user_id.eq(user_id))
                    .filter(agenda_events::deleted_at.is_null()),
            )
            .set(&changes)
            .returning(AgendaEvent::as_returning())
            .get_result(c)
            .optional()
            .context("Failed to update the agenda event.")?
            .ok_or_else(|| ApiError::NotFound("Agenda event not found.".into()))
        })
        .await?;
    Ok(Json(updated.into()))
}

#[derive(FromForm, Debug)]
pub struct DeleteEventQuery {
    id: Option<String>,
    #[field(name = "userId")]
    user_id: Option<String>,
}

/// Soft delete: the row stays, stamped with `deleted_at`.
#[tracing::instrument(
    name = "Delete agenda event",
    skip(query, conn),
    fields(request_id = %Uuid::new_v4())
)]
#[delete("/agenda-events?<query..>")]
pub async fn delete_agenda_event(
    query: DeleteEventQuery,
    conn: VoicemailDbConn,
) -> Result<Json<Value>, ApiError> {
    let id = parse_uuid(query.id.as_deref().unwrap_or_default(), "id")
        .map_err(ApiError::Validation)?;
    let user_id = parse_user_id(query.user_id.as_deref())?;

    let deleted = conn
        .run(move |c: &mut PgConnection| {
            use crate::schema::agenda_events;
            diesel::update(
                agenda_events::table
                    .filter(agenda_events::id.eq(id))
                    .filter(agenda_events::user_id.eq(user_id))
                    .filter(agenda_events::deleted_at.is_null()),
            )
            .set(agenda_events::deleted_at.eq(Some(Utc::now())))
            .execute(c)
        })
        .await
        .context("Failed to soft delete the agenda event.")?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Agenda event not found.".into()));
    }
    Ok(Json(json!({ "deleted": true, "id": id })))
}

fn find_live_event(
    conn: &mut PgConnection,
    id: Uuid,
    user_id: Uuid,
) -> QueryResult<Option<AgendaEvent>> {
    use crate::schema::agenda_events;
    agenda_events::table
        .select(AgendaEvent::as_select())
        .filter(agenda_events::id.eq(id))
        .filter(agenda_events::user_id.eq(user_id))
        .filter(agenda_events::deleted_at.is_null())
        .first(conn)
        .optional()
}

fn parse_user_id(raw: Option<&str>) -> Result<Uuid, ApiError> {
    match raw {
        None => Err(ApiError::Validation("Missing required field: userId".into())),
        Some(raw) => parse_uuid(raw, "userId").map_err(ApiError::Validation),
    }
}

fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("{} is not a valid id.", field))
}

fn parse_optional_timestamp(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    raw.map(|value| {
        crate::domain::parse_timestamp(value)
            .map_err(|e| ApiError::Validation(format!("{}: {}", field, e)))
    })
    .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
