use diesel::prelude::*;
use crate::schema::profiles;
use chrono::{DateTime, Utc};

#[derive(Queryable, Selectable)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub user_id: uuid::Uuid,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub mobile_number: Option<String>,
    pub cal_username: Option<String>,
    pub cal_api_key: Option<String>,
    pub cal_event_type_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Column updates for a profile upsert.
///
/// The outer `Option` means "leave untouched", the inner one "set to NULL".
#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = profiles)]
pub struct ProfileChanges {
    pub name: Option<Option<String>>,
    pub company_name: Option<Option<String>>,
    pub mobile_number: Option<Option<String>>,
    pub cal_username: Option<Option<String>>,
    pub cal_api_key: Option<Option<String>>,
    pub cal_event_type_id: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}
