use crate::domain::{CompanyName, MobileNumber, ProfileName};
use crate::guards::AuthenticatedUser;
use crate::models::{Profile, ProfileChanges};
use crate::routes::ApiError;
use crate::startup::VoicemailDbConn;
use anyhow::Context;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use rocket::serde::json::Json;
use uuid::Uuid;

#[derive(serde::Serialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub mobile_number: Option<String>,
    pub cal_username: Option<String>,
    pub cal_event_type_id: Option<String>,
    /// The key itself never leaves the server.
    pub cal_api_key_configured: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileView {
    fn new(user: &AuthenticatedUser, profile: Option<Profile>) -> Self {
        let mut view = ProfileView {
            user_id: user.user_id,
            email: user.email.clone(),
            ..ProfileView::default()
        };
        if let Some(profile) = profile {
            view.name = profile.name;
            view.company_name = profile.company_name;
            view.mobile_number = profile.mobile_number;
            view.cal_username = profile.cal_username;
            view.cal_event_type_id = profile.cal_event_type_id;
            view.cal_api_key_configured = profile
                .cal_api_key
                .map(|key| !key.is_empty())
                .unwrap_or(false);
            view.updated_at = Some(profile.updated_at);
        }
        view
    }
}

#[tracing::instrument(
    name = "Get user profile",
    skip(user, conn),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[get("/user/profile")]
pub async fn get_profile(
    user: AuthenticatedUser,
    conn: VoicemailDbConn,
) -> Result<Json<ProfileView>, ApiError> {
    let user_id = user.user_id;
    let profile = conn
        .run(move |c: &mut PgConnection| find_profile(c, user_id))
        .await
        .context("Failed to load the user profile.")?;
    Ok(Json(ProfileView::new(&user, profile)))
}

#[derive(serde::Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateBody {
    name: Option<String>,
    company_name: Option<String>,
    mobile_number: Option<String>,
    cal_username: Option<String>,
    cal_api_key: Option<String>,
    cal_event_type_id: Option<String>,
}

impl TryFrom<ProfileUpdateBody> for ProfileChanges {
    type Error = String;

    /// Absent fields stay untouched; empty strings clear the column.
    fn try_from(body: ProfileUpdateBody) -> Result<Self, Self::Error> {
        Ok(ProfileChanges {
            name: validate_field(body.name, |s| {
                ProfileName::parse(s).map(|n| n.as_ref().to_string())
            })?,
            company_name: validate_field(body.company_name, |s| {
                CompanyName::parse(s).map(|n| n.as_ref().to_string())
            })?,
            mobile_number: validate_field(body.mobile_number, |s| {
                MobileNumber::parse(s).map(|n| n.as_ref().to_string())
            })?,
            cal_username: validate_field(body.cal_username, parse_cal_username)?,
            cal_api_key: validate_field(body.cal_api_key, Ok)?,
            cal_event_type_id: validate_field(body.cal_event_type_id, parse_event_type_id)?,
            updated_at: Utc::now(),
        })
    }
}

fn validate_field<F>(value: Option<String>, parse: F) -> Result<Option<Option<String>>, String>
where
    F: FnOnce(String) -> Result<String, String>,
{
    match value {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(Some(None)),
        Some(value) => parse(value.trim().to_string()).map(|v| Some(Some(v))),
    }
}

fn parse_cal_username(s: String) -> Result<String, String> {
    let valid = s.len() <= 100
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(s)
    } else {
        Err(format!("{} is not a valid Cal.com username.", s))
    }
}

fn parse_event_type_id(s: String) -> Result<String, String> {
    if s.len() <= 20 && s.chars().all(|c| c.is_ascii_digit()) {
        Ok(s)
    } else {
        Err(format!("{} is not a valid Cal.com event type id.", s))
    }
}

#[tracing::instrument(
    name = "Update user profile",
    skip(user, conn, body),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[put("/user/profile", data = "<body>")]
pub async fn update_profile(
    body: Json<ProfileUpdateBody>,
    user: AuthenticatedUser,
    conn: VoicemailDbConn,
) -> Result<Json<ProfileView>, ApiError> {
    let changes: ProfileChanges = body.into_inner().try_into().map_err(ApiError::Validation)?;
    let user_id = user.user_id;
    let profile = conn
        .run(move |c: &mut PgConnection| upsert_profile(c, user_id, &changes))
        .await
        .context("Failed to save the user profile.")?;
    Ok(Json(ProfileView::new(&user, Some(profile))))
}

fn find_profile(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Option<Profile>> {
    use crate::schema::profiles;
    profiles::table
        .select(Profile::as_select())
        .filter(profiles::user_id.eq(user_id))
        .first(conn)
        .optional()
}

fn upsert_profile(
    conn: &mut PgConnection,
    user_id: Uuid,
    changes: &ProfileChanges,
) -> QueryResult<Profile> {
    use crate::schema::profiles;
    diesel::insert_into(profiles::table)
        .values((profiles::user_id.eq(user_id), changes))
        .on_conflict(profiles::user_id)
        .do_update()
        .set(changes)
        .returning(Profile::as_returning())
        .get_result(conn)
}
