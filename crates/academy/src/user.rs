use chrono::{DateTime, Utc};
use serde::Serialize;

use masjedi_core::{CircleId, DomainError, DomainResult, MosqueId, UserId, UserRole};

use crate::text;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Validated input for a new local user. Holds the plaintext password until
/// the caller hashes it with [`UserDraft::into_new_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub username: String,
    password: String,
    pub role: UserRole,
    pub circle_id: Option<CircleId>,
    pub mosque_id: Option<MosqueId>,
}

impl UserDraft {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        role: UserRole,
        circle_id: Option<CircleId>,
        mosque_id: Option<MosqueId>,
    ) -> DomainResult<Self> {
        let password = password.into();
        validate_password(&password)?;
        Ok(Self {
            username: text::required("username", username)?,
            password,
            role,
            circle_id,
            mosque_id,
        })
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            username: self.username,
            password_hash,
            role: self.role,
            circle_id: self.circle_id,
            mosque_id: self.mosque_id,
        }
    }
}

/// A user ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
    pub circle_id: Option<CircleId>,
    pub mosque_id: Option<MosqueId>,
}

/// Full replacement of the mutable profile fields. Username never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserChanges {
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub circle_id: Option<CircleId>,
    pub mosque_id: Option<MosqueId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReadModel {
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
    pub circle_id: Option<CircleId>,
    pub circle_title: Option<String>,
    pub mosque_id: Option<MosqueId>,
    pub mosque_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_is_rejected() {
        let err = UserDraft::new("yusuf", "12345", UserRole::Student, None, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn username_is_trimmed_and_password_kept_verbatim() {
        let draft = UserDraft::new(" yusuf ", " secret ", UserRole::Teacher, None, None).unwrap();
        assert_eq!(draft.username, "yusuf");
        assert_eq!(draft.password(), " secret ");
    }

    #[test]
    fn read_model_never_serializes_a_password() {
        let now = Utc::now();
        let rm = UserReadModel {
            id: UserId::new(1),
            username: "amina".into(),
            role: UserRole::Student,
            circle_id: None,
            circle_title: None,
            mosque_id: None,
            mosque_title: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&rm).unwrap();
        assert_eq!(json["role"], "STUDENT");
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
