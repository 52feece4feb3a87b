use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle flag. Rows are created `ACTIVE` and removed by hard delete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Active,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phonenumber: String,
    #[serde(skip_serializing)]
    pub password: String, // argon2 hash, not exposed in JSON
    pub role: String,
    pub status: String,
    pub created_at: i64, // unix millis
    pub updated_at: i64, // unix millis
}

/// Row handed to the store on insert. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phonenumber: String,
    pub password_hash: String,
    pub role: String,
    pub status: UserStatus,
    pub created_at: i64,
}

/// Partial update of the profile fields; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phonenumber: Option<String>,
    pub role: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phonenumber.is_none() && self.role.is_none()
    }
}

/// One page of users plus the total row count.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub total: i64,
    pub rows: Vec<User>,
}

/// Which unique column a conflicting write hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Phone,
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
