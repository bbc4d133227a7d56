//! `masjedi-core` — shared domain primitives.
//!
//! Identifiers, the domain error model, roles and pagination. No storage or
//! transport concerns live here.

pub mod error;
pub mod id;
pub mod page;
pub mod role;

pub use error::{DomainError, DomainResult};
pub use id::{CircleId, CourseId, LessonId, LogbookId, MosqueId, NoteId, ProgressId, UserId};
pub use page::{Page, PageRequest};
pub use role::UserRole;
