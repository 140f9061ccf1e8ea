use diesel::prelude::*;
use crate::schema::users;
use chrono::{DateTime, Utc};

#[derive(Queryable, Selectable)]
#[diesel(table_name = users)]
pub struct User {
    pub user_id: uuid::Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub user_id: &'a uuid::Uuid,
    pub email: &'a str,
    pub password_hash: &'a str,
}
