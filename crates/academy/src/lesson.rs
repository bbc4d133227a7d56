use chrono::{DateTime, Utc};
use serde::Serialize;

use masjedi_core::{CourseId, DomainError, DomainResult, LessonId};

use crate::text;

/// Validated lesson fields.
///
/// `order` is the lesson's position inside its course. When absent on create,
/// the store appends the lesson after the current last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDraft {
    pub title: String,
    pub description: Option<String>,
    pub order: Option<i32>,
    pub course_id: CourseId,
}

impl LessonDraft {
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        order: Option<i32>,
        course_id: CourseId,
    ) -> DomainResult<Self> {
        if let Some(order) = order {
            if order < 0 {
                return Err(DomainError::validation("order must not be negative"));
            }
        }
        Ok(Self {
            title: text::required("title", title)?,
            description: text::optional(description),
            order,
            course_id,
        })
    }
}

/// Order given to a lesson appended to a course whose highest order is `max`.
pub fn next_order(max: Option<i32>) -> i32 {
    max.map_or(1, |m| m.saturating_add(1))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonReadModel {
    pub id: LessonId,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    pub course_id: CourseId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn negative_order_is_rejected() {
        let err = LessonDraft::new("Al-Fatiha", None, Some(-1), CourseId::new(1)).unwrap_err();
        assert_eq!(err, DomainError::validation("order must not be negative"));
    }

    #[test]
    fn first_lesson_gets_order_one() {
        assert_eq!(next_order(None), 1);
        assert_eq!(next_order(Some(4)), 5);
    }

    proptest! {
        #[test]
        fn appended_order_is_strictly_after_max(max in 0i32..i32::MAX) {
            prop_assert!(next_order(Some(max)) > max);
        }
    }
}
