use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{error::UserError, repo_types::{User, UserChanges}, services::NewUserInput};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles");
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(raw: &str) -> Result<String, UserError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(UserError::InvalidEmail);
    }
    Ok(email)
}

/// Blank strings count as missing.
fn required(field: Option<String>) -> Result<String, UserError> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(UserError::IncompleteRequest)
}

fn optional(field: Option<String>) -> Result<Option<String>, UserError> {
    field.map(|v| required(Some(v))).transpose()
}

/// Request body for `POST /add`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phonenumber: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<NewUserInput, UserError> {
        let name = required(self.name)?;
        let email = required(self.email)?;
        let phonenumber = required(self.phonenumber)?;
        // the password is taken verbatim, surrounding spaces included
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or(UserError::IncompleteRequest)?;
        let role = required(self.role)?;
        Ok(NewUserInput {
            name,
            email: normalize_email(&email)?,
            phonenumber,
            password,
            role,
        })
    }
}

/// Request body for `PUT /update/:id`. Absent fields stay as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phonenumber: Option<String>,
    pub role: Option<String>,
}

impl UpdateUserRequest {
    pub fn into_changes(self) -> Result<UserChanges, UserError> {
        let email = optional(self.email)?
            .map(|e| normalize_email(&e))
            .transpose()?;
        Ok(UserChanges {
            name: optional(self.name)?,
            email,
            phonenumber: optional(self.phonenumber)?,
            role: optional(self.role)?,
        })
    }
}

/// Request body for `PUT /changepw/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: Option<String>,
}

/// User as returned to clients; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phonenumber: String,
    pub role: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phonenumber: u.phonenumber,
            role: u.role,
            status: u.status,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListData {
    pub total_users: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub users: Vec<PublicUser>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> CreateUserRequest {
        CreateUserRequest {
            name: Some("A".into()),
            email: Some("  A@X.com ".into()),
            phonenumber: Some("111".into()),
            password: Some("p".into()),
            role: Some("user".into()),
        }
    }

    #[test]
    fn complete_request_is_normalized() {
        let input = full().validate().unwrap();
        assert_eq!(input.email, "a@x.com");
        assert_eq!(input.password, "p");
    }

    #[test]
    fn any_missing_or_blank_field_is_incomplete() {
        let cases = [
            CreateUserRequest { name: None, ..full() },
            CreateUserRequest { email: Some("   ".into()), ..full() },
            CreateUserRequest { phonenumber: None, ..full() },
            CreateUserRequest { password: Some(String::new()), ..full() },
            CreateUserRequest { role: None, ..full() },
        ];
        for req in cases {
            assert!(matches!(req.validate(), Err(UserError::IncompleteRequest)));
        }
    }

    #[test]
    fn malformed_email_is_rejected() {
        let req = CreateUserRequest { email: Some("not-an-email".into()), ..full() };
        assert!(matches!(req.validate(), Err(UserError::InvalidEmail)));
    }

    #[test]
    fn update_keeps_absent_fields_absent() {
        let changes = UpdateUserRequest {
            email: Some("B@X.com".into()),
            ..Default::default()
        }
        .into_changes()
        .unwrap();
        assert_eq!(changes.email.as_deref(), Some("b@x.com"));
        assert!(changes.name.is_none() && changes.phonenumber.is_none() && changes.role.is_none());
    }

    #[test]
    fn public_user_has_no_password() {
        let user = User {
            id: Uuid::new_v4(),
            name: "A".into(),
            email: "a@x.com".into(),
            phonenumber: "111".into(),
            password: "$argon2id$secret".into(),
            role: "user".into(),
            status: "ACTIVE".into(),
            created_at: 1,
            updated_at: 1,
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }
}
