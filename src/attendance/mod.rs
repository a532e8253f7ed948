//! Attendance reconciliation for live classrooms.

pub mod reconcile;
pub mod session;

pub use reconcile::{
    AttendanceStatus, Detected, Reconciliation, RosterEntry, attendance_rate, enroll,
    is_placeholder, reconcile,
};
pub use session::{LiveSession, SessionStats};
