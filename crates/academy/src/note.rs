use chrono::{DateTime, Utc};
use serde::Serialize;

use masjedi_core::{DomainResult, NoteId, UserId};

use crate::text;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub text: String,
    pub student_id: UserId,
}

impl NoteDraft {
    pub fn new(text: impl Into<String>, student_id: UserId) -> DomainResult<Self> {
        Ok(Self {
            text: text::required("text", text)?,
            student_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteReadModel {
    pub id: NoteId,
    pub text: String,
    pub student_id: UserId,
    pub student_name: String,
    pub author_id: Option<UserId>,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteReadModel {
    pub fn is_authored_by(&self, user_id: UserId) -> bool {
        self.author_id == Some(user_id)
    }
}
