use diesel::prelude::*;
use crate::schema::notifications;
use chrono::{DateTime, Utc};

#[derive(Queryable, Selectable)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification<'a> {
    pub id: &'a uuid::Uuid,
    pub user_id: &'a uuid::Uuid,
    pub title: &'a str,
    pub message: &'a str,
    pub kind: &'a str,
}
