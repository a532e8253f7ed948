//! Postgres access for the campus schema and the ReID gallery.

pub mod attendance;
pub mod classes;
pub mod courses;
pub mod faces;
pub mod health;
pub mod models;
pub mod notifications;
pub mod quizzes;
pub mod reports;
pub mod timetable;

pub use faces::PgFaceStore;
