//! Infrastructure layer: configuration and persistence.

pub mod config;
pub mod store;

pub use config::{AppConfig, ConfigError, DatabaseConfig, JwtConfig, JwtKey};
pub use store::{
    AcademyStore, CircleFilter, CourseFilter, InMemoryAcademyStore, LessonOrder, LogbookFilter, MosqueFilter,
    PostgresAcademyStore, SharedStore, StoreError, StoreResult, UserFilter,
};

/// Repository traits, for calling store methods through [`SharedStore`].
pub mod prelude {
    pub use crate::store::{
        AcademyStore, CircleRepository, CourseRepository, LessonRepository, LogbookRepository, MosqueRepository,
        NoteRepository, ProgressRepository, UserRepository,
    };
}
