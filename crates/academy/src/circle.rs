use chrono::{DateTime, Utc};
use serde::Serialize;

use masjedi_core::{CircleId, DomainResult, MosqueId, UserId};

use crate::text;

/// Validated circle fields.
///
/// The mosque is mandatory; the teacher may be assigned later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircleDraft {
    pub title: String,
    pub mosque_id: MosqueId,
    pub teacher_id: Option<UserId>,
}

impl CircleDraft {
    pub fn new(
        title: impl Into<String>,
        mosque_id: MosqueId,
        teacher_id: Option<UserId>,
    ) -> DomainResult<Self> {
        Ok(Self {
            title: text::required("title", title)?,
            mosque_id,
            teacher_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircleReadModel {
    pub id: CircleId,
    pub title: String,
    pub mosque_id: MosqueId,
    pub mosque_title: String,
    pub teacher_id: Option<UserId>,
    pub teacher_name: Option<String>,
    pub number_of_students: u64,
    pub number_of_courses: u64,
    pub created_at: DateTime<Utc>,
}

impl CircleReadModel {
    pub fn is_taught_by(&self, teacher_id: UserId) -> bool {
        self.teacher_id == Some(teacher_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teacher_is_optional() {
        let draft = CircleDraft::new("Hifz A", MosqueId::new(1), None).unwrap();
        assert_eq!(draft.title, "Hifz A");
        assert!(draft.teacher_id.is_none());
    }

    #[test]
    fn blank_title_is_rejected() {
        assert!(CircleDraft::new("", MosqueId::new(1), Some(UserId::new(2))).is_err());
    }
}
