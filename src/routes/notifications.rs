use crate::guards::AuthenticatedUser;
use crate::models::{NewNotification, Notification};
use crate::routes::ApiError;
use crate::startup::VoicemailDbConn;
use anyhow::Context;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use rocket::http::Status;
use rocket::serde::json::Json;
use serde_json::{json, Value};
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

const PAGE_SIZE: i64 = 50;
const DEFAULT_KIND: &str = "info";
const KINDS: [&str; 4] = ["info", "success", "warning", "error"];

#[derive(serde::Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationView {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            title: notification.title,
            message: notification.message,
            kind: notification.kind,
            read: notification.read,
            created_at: notification.created_at,
        }
    }
}

#[derive(serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<NotificationView>,
    pub unread_count: usize,
    pub source: &'static str,
}

impl NotificationList {
    fn new(notifications: Vec<NotificationView>, source: &'static str) -> Self {
        let unread_count = notifications.iter().filter(|n| !n.read).count();
        Self {
            notifications,
            unread_count,
            source,
        }
    }
}

#[tracing::instrument(
    name = "List notifications",
    skip(user, conn),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[get("/notifications")]
pub async fn list_notifications(
    user: AuthenticatedUser,
    conn: VoicemailDbConn,
) -> Json<NotificationList> {
    let user_id = user.user_id;
    match conn
        .run(move |c: &mut PgConnection| latest_notifications(c, user_id))
        .await
    {
        Ok(rows) => Json(NotificationList::new(
            rows.into_iter().map(Into::into).collect(),
            "database",
        )),
        Err(e) => {
            tracing::warn!(error.cause_chain = ?e, "Serving fallback notifications");
            Json(NotificationList::new(fallback_notifications(), "fallback"))
        }
    }
}

fn latest_notifications(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> QueryResult<Vec<Notification>> {
    use crate::schema::notifications;
    notifications::table
        .select(Notification::as_select())
        .filter(notifications::user_id.eq(user_id))
        .order(notifications::created_at.desc())
        .limit(PAGE_SIZE)
        .load(conn)
}

/// Shown when the database cannot be reached.
fn fallback_notifications() -> Vec<NotificationView> {
    let now = Utc::now();
    vec![
        NotificationView {
            id: Uuid::from_u128(1),
            title: "Welcome to VoicemailAI".into(),
            message: "New voicemails are transcribed and summarised as soon as they arrive."
                .into(),
            kind: "info".into(),
            read: false,
            created_at: now,
        },
        NotificationView {
            id: Uuid::from_u128(2),
            title: "Connect your calendar".into(),
            message: "Add your Cal.com details in your profile to let callers book appointments."
                .into(),
            kind: "info".into(),
            read: false,
            created_at: now,
        },
    ]
}

#[derive(serde::Deserialize, Debug)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum NotificationAction {
    Create {
        title: String,
        message: String,
        kind: Option<String>,
    },
    MarkRead {
        ids: Vec<Uuid>,
    },
    MarkAllRead,
}

#[derive(Debug)]
pub struct ValidNotification {
    title: String,
    message: String,
    kind: String,
}

impl ValidNotification {
    fn parse(title: String, message: String, kind: Option<String>) -> Result<Self, String> {
        let title = title.trim().to_string();
        let message = message.trim().to_string();
        if title.is_empty() || title.graphemes(true).count() > 200 {
            return Err("A notification title must be between 1 and 200 characters.".into());
        }
        if message.is_empty() || message.graphemes(true).count() > 2000 {
            return Err("A notification message must be between 1 and 2000 characters.".into());
        }
        let kind = kind
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| DEFAULT_KIND.to_string());
        if !KINDS.contains(&kind.as_str()) {
            return Err(format!("{} is not a notification kind.", kind));
        }
        Ok(Self {
            title,
            message,
            kind,
        })
    }
}

#[tracing::instrument(
    name = "Update notifications",
    skip(user, conn, action),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[post("/notifications", data = "<action>")]
pub async fn post_notifications(
    action: Json<NotificationAction>,
    user: AuthenticatedUser,
    conn: VoicemailDbConn,
) -> Result<(Status, Json<Value>), ApiError> {
    let user_id = user.user_id;
    match action.into_inner() {
        NotificationAction::Create {
            title,
            message,
            kind,
        } => {
            let notification =
                ValidNotification::parse(title, message, kind).map_err(ApiError::Validation)?;
            let created = conn
                .run(move |c: &mut PgConnection| {
                    use crate::schema::notifications;
                    diesel::insert_into(notifications::table)
                        .values(NewNotification {
                            id: &Uuid::new_v4(),
                            user_id: &user_id,
                            title: &notification.title,
                            message: &notification.message,
                            kind: &notification.kind,
                        })
                        .returning(Notification::as_returning())
                        .get_result(c)
                })
                .await
                .context("Failed to insert a notification.")?;
            let view = NotificationView::from(created);
            Ok((Status::Created, Json(json!({ "notification": view }))))
        }
        NotificationAction::MarkRead { ids } => {
            let updated = conn
                .run(move |c: &mut PgConnection| {
                    use crate::schema::notifications;
                    diesel::update(
                        notifications::table
                            .filter(notifications::user_id.eq(user_id))
                            .filter(notifications::id.eq_any(ids)),
                    )
                    .set(notifications::read.eq(true))
                    .execute(c)
                })
                .await
                .context("Failed to mark notifications as read.")?;
            Ok((Status::Ok, Json(json!({ "updated": updated }))))
        }
        NotificationAction::MarkAllRead => {
            let updated = conn
                .run(move |c: &mut PgConnection| {
                    use crate::schema::notifications;
                    diesel::update(
                        notifications::table
                            .filter(notifications::user_id.eq(user_id))
                            .filter(notifications::read.eq(false)),
                    )
                    .set(notifications::read.eq(true))
                    .execute(c)
                })
                .await
                .context("Failed to mark all notifications as read.")?;
            Ok((Status::Ok, Json(json!({ "updated": updated }))))
        }
    }
}
