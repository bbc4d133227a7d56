//! Repository abstractions for the academy data model.
//!
//! One trait per entity area, combined into [`AcademyStore`]. Two
//! implementations: [`InMemoryAcademyStore`] (dev/test) and
//! [`PostgresAcademyStore`]. Both enforce the same delete rules:
//!
//! - mosque → its circles are deleted
//! - circle → students are detached, course links removed
//! - course → lessons, logbook entries and circle links are deleted
//! - lesson → progress records are deleted
//! - user → progress, logbook entries and notes about them are deleted;
//!   circles they teach lose their teacher; notes they wrote lose their author

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use masjedi_academy::{
    CircleDraft, CircleReadModel, CourseDraft, CourseReadModel, DateRange, LessonDraft, LessonReadModel,
    LogbookDraft, LogbookReadModel, MosqueDraft, MosqueReadModel, NewUser, NoteDraft, NoteReadModel,
    ProgressDraft, ProgressReadModel, UserChanges, UserReadModel,
};
use masjedi_core::{
    CircleId, CourseId, LessonId, LogbookId, MosqueId, NoteId, Page, PageRequest, ProgressId, UserId, UserRole,
};

pub use in_memory::InMemoryAcademyStore;
pub use postgres::PostgresAcademyStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    /// A reference exists but is not acceptable (e.g. a non-teacher as circle teacher).
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("storage failure in {operation}: {message}")]
    Backend { operation: &'static str, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MosqueFilter {
    All,
    TitleContains(String),
    LocationContains(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircleFilter {
    Mosque(MosqueId),
    Teacher(UserId),
    /// Circles with at least one student.
    WithStudents,
    WithoutTeacherInMosque(MosqueId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseFilter {
    All,
    TitleContains(String),
    Circle(CircleId),
    /// Courses linked to the student's circle plus courses the student has progress in.
    Student(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonOrder {
    Id,
    Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    Role(UserRole),
    Mosque(MosqueId),
    MosqueAndRole(MosqueId, UserRole),
    StudentsInCircle(CircleId),
    /// Teachers in the mosque or not attached to any mosque.
    AvailableTeachers(MosqueId),
    /// Students in the mosque without a circle.
    UnassignedStudents(MosqueId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogbookFilter {
    StudentCourseDay { student: UserId, course: CourseId, day: NaiveDate },
    StudentDay { student: UserId, day: NaiveDate },
    StudentCourseRange { student: UserId, course: CourseId, range: DateRange },
    StudentCourse { student: UserId, course: CourseId },
    CircleCourseDay { circle: CircleId, course: CourseId, day: NaiveDate },
}

#[async_trait]
pub trait MosqueRepository: Send + Sync {
    async fn create_mosque(&self, draft: &MosqueDraft) -> StoreResult<MosqueReadModel>;
    async fn get_mosque(&self, id: MosqueId) -> StoreResult<MosqueReadModel>;
    async fn list_mosques(&self, filter: &MosqueFilter, page: PageRequest) -> StoreResult<Page<MosqueReadModel>>;
    async fn update_mosque(&self, id: MosqueId, draft: &MosqueDraft) -> StoreResult<MosqueReadModel>;
    async fn delete_mosque(&self, id: MosqueId) -> StoreResult<()>;
}

#[async_trait]
pub trait CircleRepository: Send + Sync {
    /// The mosque must exist; a given teacher must exist and hold the TEACHER role.
    async fn create_circle(&self, draft: &CircleDraft) -> StoreResult<CircleReadModel>;
    async fn get_circle(&self, id: CircleId) -> StoreResult<CircleReadModel>;
    async fn list_circles(&self, filter: CircleFilter, page: PageRequest) -> StoreResult<Page<CircleReadModel>>;
    async fn update_circle(&self, id: CircleId, draft: &CircleDraft) -> StoreResult<CircleReadModel>;
    async fn set_circle_teacher(&self, id: CircleId, teacher: Option<UserId>) -> StoreResult<()>;
    async fn delete_circle(&self, id: CircleId) -> StoreResult<()>;
    /// Idempotent.
    async fn link_course(&self, circle: CircleId, course: CourseId) -> StoreResult<()>;
    async fn unlink_course(&self, circle: CircleId, course: CourseId) -> StoreResult<()>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create_course(&self, draft: &CourseDraft) -> StoreResult<CourseReadModel>;
    async fn get_course(&self, id: CourseId) -> StoreResult<CourseReadModel>;
    async fn list_courses(&self, filter: &CourseFilter, page: PageRequest) -> StoreResult<Page<CourseReadModel>>;
    async fn update_course(&self, id: CourseId, draft: &CourseDraft) -> StoreResult<CourseReadModel>;
    async fn delete_course(&self, id: CourseId) -> StoreResult<()>;
}

#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Places the lesson inside its course: appended when `order` is absent,
    /// otherwise lessons at or after `order` move up by one.
    async fn create_lesson(&self, draft: &LessonDraft) -> StoreResult<LessonReadModel>;
    async fn get_lesson(&self, id: LessonId) -> StoreResult<LessonReadModel>;
    async fn list_lessons(&self, course: CourseId, order: LessonOrder) -> StoreResult<Vec<LessonReadModel>>;
    async fn max_lesson_order(&self, course: CourseId) -> StoreResult<Option<i32>>;
    /// A draft without `order` keeps the lesson's current position.
    async fn update_lesson(&self, id: LessonId, draft: &LessonDraft) -> StoreResult<LessonReadModel>;
    async fn delete_lesson(&self, id: LessonId) -> StoreResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> StoreResult<UserReadModel>;
    async fn get_user(&self, id: UserId) -> StoreResult<UserReadModel>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserReadModel>>;
    async fn list_users(&self, filter: UserFilter, page: PageRequest) -> StoreResult<Page<UserReadModel>>;
    async fn update_user(&self, id: UserId, changes: &UserChanges) -> StoreResult<UserReadModel>;
    async fn password_hash(&self, id: UserId) -> StoreResult<String>;
    async fn set_password_hash(&self, id: UserId, hash: &str) -> StoreResult<()>;
    async fn set_user_circle(&self, id: UserId, circle: Option<CircleId>) -> StoreResult<()>;
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn create_progress(&self, draft: &ProgressDraft) -> StoreResult<ProgressReadModel>;
    async fn get_progress(&self, id: ProgressId) -> StoreResult<ProgressReadModel>;
    async fn list_progress(
        &self,
        student: UserId,
        course: CourseId,
        completed_only: bool,
    ) -> StoreResult<Vec<ProgressReadModel>>;
    async fn count_completed(&self, student: UserId, course: CourseId) -> StoreResult<u64>;
    async fn update_progress(&self, id: ProgressId, draft: &ProgressDraft) -> StoreResult<ProgressReadModel>;
    async fn delete_progress(&self, id: ProgressId) -> StoreResult<()>;
}

#[async_trait]
pub trait LogbookRepository: Send + Sync {
    async fn create_logbook(&self, draft: &LogbookDraft) -> StoreResult<LogbookReadModel>;
    async fn get_logbook(&self, id: LogbookId) -> StoreResult<LogbookReadModel>;
    async fn list_logbook(&self, filter: LogbookFilter, page: PageRequest) -> StoreResult<Page<LogbookReadModel>>;
    async fn update_logbook(&self, id: LogbookId, draft: &LogbookDraft) -> StoreResult<LogbookReadModel>;
    async fn delete_logbook(&self, id: LogbookId) -> StoreResult<()>;
}

#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn create_note(&self, draft: &NoteDraft, author: Option<UserId>) -> StoreResult<NoteReadModel>;
    async fn get_note(&self, id: NoteId) -> StoreResult<NoteReadModel>;
    async fn list_notes(&self, student: UserId, page: PageRequest) -> StoreResult<Page<NoteReadModel>>;
    async fn update_note(&self, id: NoteId, draft: &NoteDraft) -> StoreResult<NoteReadModel>;
    async fn delete_note(&self, id: NoteId) -> StoreResult<()>;
}

/// Everything the API needs from persistence.
pub trait AcademyStore:
    MosqueRepository
    + CircleRepository
    + CourseRepository
    + LessonRepository
    + UserRepository
    + ProgressRepository
    + LogbookRepository
    + NoteRepository
{
}

impl<T> AcademyStore for T where
    T: MosqueRepository
        + CircleRepository
        + CourseRepository
        + LessonRepository
        + UserRepository
        + ProgressRepository
        + LogbookRepository
        + NoteRepository
{
}

pub type SharedStore = Arc<dyn AcademyStore>;
