use std::str::FromStr;

use axum::response::Response;
use chrono::NaiveDate;
use serde::Deserialize;

use masjedi_academy::{
    CircleDraft, CourseDraft, DateRange, LessonDraft, LogbookDraft, MosqueDraft, NoteDraft, ProgressDraft,
};
use masjedi_core::{
    CircleId, CourseId, DomainResult, LessonId, MosqueId, PageRequest, UserId, UserRole,
};

use crate::app::errors;

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

#[derive(Debug, Deserialize)]
pub struct TitleParams {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationParams {
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct DateParams {
    pub date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub struct OptionalDateParams {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRangeParams {
    pub fn range(&self) -> DomainResult<DateRange> {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleParams {
    pub role: Option<String>,
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct MosqueRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl MosqueRequest {
    pub fn into_draft(self) -> DomainResult<MosqueDraft> {
        MosqueDraft::new(self.title, self.description, self.location)
    }
}

#[derive(Debug, Deserialize)]
pub struct CircleRequest {
    pub title: String,
    pub mosque_id: MosqueId,
    pub teacher_id: Option<UserId>,
}

impl CircleRequest {
    pub fn into_draft(self) -> DomainResult<CircleDraft> {
        CircleDraft::new(self.title, self.mosque_id, self.teacher_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CourseRequest {
    pub title: String,
    pub description: Option<String>,
}

impl CourseRequest {
    pub fn into_draft(self) -> DomainResult<CourseDraft> {
        CourseDraft::new(self.title, self.description)
    }
}

#[derive(Debug, Deserialize)]
pub struct LessonRequest {
    pub title: String,
    pub description: Option<String>,
    pub order: Option<i32>,
    pub course_id: CourseId,
}

impl LessonRequest {
    pub fn into_draft(self) -> DomainResult<LessonDraft> {
        LessonDraft::new(self.title, self.description, self.order, self.course_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub student_id: UserId,
    pub lesson_id: LessonId,
    #[serde(default)]
    pub is_completed: bool,
    pub notes: Option<String>,
}

impl ProgressRequest {
    pub fn into_draft(self) -> ProgressDraft {
        ProgressDraft::new(self.student_id, self.lesson_id, self.is_completed, self.notes)
    }
}

#[derive(Debug, Deserialize)]
pub struct LogbookRequest {
    pub student_id: UserId,
    pub course_id: CourseId,
    pub text: String,
    #[serde(alias = "date")]
    pub day: NaiveDate,
}

impl LogbookRequest {
    pub fn into_draft(self) -> DomainResult<LogbookDraft> {
        LogbookDraft::new(self.student_id, self.course_id, self.text, self.day)
    }
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub text: String,
    pub student_id: UserId,
}

impl NoteRequest {
    pub fn into_draft(self) -> DomainResult<NoteDraft> {
        NoteDraft::new(self.text, self.student_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
    pub circle_id: Option<CircleId>,
    pub mosque_id: Option<MosqueId>,
}

/// Profile update. Absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub circle_id: Option<CircleId>,
    pub mosque_id: Option<MosqueId>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// -------------------------
// Mapping helpers
// -------------------------

pub fn parse_role(raw: &str) -> Result<UserRole, Response> {
    UserRole::from_str(raw).map_err(errors::domain_error_to_response)
}

/// Lift a draft validation result into a handler result.
pub fn validated<T>(result: DomainResult<T>) -> Result<T, Response> {
    result.map_err(errors::domain_error_to_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_request_defaults_to_not_completed() {
        let req: ProgressRequest = serde_json::from_str(r#"{"student_id":3,"lesson_id":4}"#).unwrap();
        let draft = req.into_draft();
        assert!(!draft.completed);
        assert_eq!(draft.student_id, UserId::new(3));
    }

    #[test]
    fn logbook_request_reads_day_like_the_read_model() {
        let req: LogbookRequest =
            serde_json::from_str(r#"{"student_id":3,"course_id":4,"text":"Juz 1","day":"2024-05-01"}"#).unwrap();
        assert_eq!(req.into_draft().unwrap().day, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        let legacy: LogbookRequest =
            serde_json::from_str(r#"{"student_id":3,"course_id":4,"text":"Juz 1","date":"2024-05-02"}"#).unwrap();
        assert_eq!(legacy.day, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(parse_role("teacher").unwrap(), UserRole::Teacher);
        assert!(parse_role("janitor").is_err());
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let params = DateRangeParams {
            start_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        };
        assert!(params.range().is_err());
    }

    #[test]
    fn page_params_fall_back_to_defaults() {
        let req = PageParams::default().request();
        assert_eq!(req.page(), 0);
        assert_eq!(req.size(), PageRequest::DEFAULT_SIZE);
    }
}
