use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use masjedi_core::{CourseId, DomainError, DomainResult, LogbookId, UserId};

use crate::text;

/// A dated free-text entry for a student in a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogbookDraft {
    pub student_id: UserId,
    pub course_id: CourseId,
    pub text: String,
    pub day: NaiveDate,
}

impl LogbookDraft {
    pub fn new(
        student_id: UserId,
        course_id: CourseId,
        text: impl Into<String>,
        day: NaiveDate,
    ) -> DomainResult<Self> {
        Ok(Self {
            student_id,
            course_id,
            text: text::required("text", text)?,
            day,
        })
    }
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if start > end {
            return Err(DomainError::validation("start_date must not be after end_date"));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogbookReadModel {
    pub id: LogbookId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub course_title: String,
    pub text: String,
    pub day: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
