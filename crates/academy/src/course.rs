use chrono::{DateTime, Utc};
use serde::Serialize;

use masjedi_core::{CourseId, DomainResult};

use crate::text;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDraft {
    pub title: String,
    pub description: Option<String>,
}

impl CourseDraft {
    pub fn new(title: impl Into<String>, description: Option<String>) -> DomainResult<Self> {
        Ok(Self {
            title: text::required("title", title)?,
            description: text::optional(description),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseReadModel {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub number_of_lessons: u64,
    pub created_at: DateTime<Utc>,
}
