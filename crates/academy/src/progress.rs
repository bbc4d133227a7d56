use chrono::{DateTime, Utc};
use serde::Serialize;

use masjedi_core::{CourseId, LessonId, ProgressId, UserId};

use crate::text;

/// Per-lesson completion record for a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressDraft {
    pub student_id: UserId,
    pub lesson_id: LessonId,
    pub completed: bool,
    pub notes: Option<String>,
}

impl ProgressDraft {
    pub fn new(student_id: UserId, lesson_id: LessonId, completed: bool, notes: Option<String>) -> Self {
        Self {
            student_id,
            lesson_id,
            completed,
            notes: text::optional(notes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReadModel {
    pub id: ProgressId,
    pub student_id: UserId,
    pub lesson_id: LessonId,
    pub lesson_title: String,
    pub course_id: CourseId,
    #[serde(rename = "is_completed")]
    pub completed: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_completion_flag_as_is_completed() {
        let now = Utc::now();
        let rm = ProgressReadModel {
            id: ProgressId::new(1),
            student_id: UserId::new(2),
            lesson_id: LessonId::new(3),
            lesson_title: "Tajweed basics".into(),
            course_id: CourseId::new(4),
            completed: true,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&rm).unwrap();
        assert_eq!(json["is_completed"], true);
        assert!(json.get("completed").is_none());
    }
}
