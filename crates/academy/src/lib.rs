//! `masjedi-academy` — the teaching domain.
//!
//! Each module holds two things for one entity:
//! - a *draft*: validated input for create/update (constructors reject blanks)
//! - a *read model*: the stored entity plus the derived fields responses need
//!
//! Storage lives in `masjedi-infra`; this crate has no IO.

pub mod circle;
pub mod course;
pub mod lesson;
pub mod logbook;
pub mod mosque;
pub mod note;
pub mod progress;
mod text;
pub mod user;

pub use circle::{CircleDraft, CircleReadModel};
pub use course::{CourseDraft, CourseReadModel};
pub use lesson::{LessonDraft, LessonReadModel, next_order};
pub use logbook::{DateRange, LogbookDraft, LogbookReadModel};
pub use mosque::{MosqueDraft, MosqueReadModel};
pub use note::{NoteDraft, NoteReadModel};
pub use progress::{ProgressDraft, ProgressReadModel};
pub use user::{NewUser, UserChanges, UserDraft, UserReadModel, validate_password};
