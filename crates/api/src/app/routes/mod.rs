use axum::{routing::get, Router};

pub mod circles;
pub mod common;
pub mod courses;
pub mod lessons;
pub mod logbook;
pub mod mosques;
pub mod notes;
pub mod progress;
pub mod student;
pub mod system;
pub mod teacher;
pub mod users;

/// Router for all authenticated endpoints (mounted under `/api`).
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/mosques", mosques::router())
        .nest("/circles", circles::router())
        .nest("/courses", courses::router())
        .nest("/lessons", lessons::router())
        .nest("/student-progress", progress::router())
        .nest("/logbook", logbook::router())
        .nest("/notes", notes::router())
        .nest("/users", users::router())
        .nest("/teacher", teacher::router())
        .nest("/student", student::router())
}
