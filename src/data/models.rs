//! Row types for the campus schema.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::forms::Role;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub student_id: Option<String>,
    pub employee_id: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub department: String,
    pub semester: i32,
    pub credits: i32,
    pub description: Option<String>,
    pub syllabus_url: Option<String>,
    pub hod_id: Option<Uuid>,
    pub is_active: bool,
}

/// A class joined with its course and enrolment count.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClassSummary {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub teacher_id: Uuid,
    pub class_name: String,
    pub room_number: Option<String>,
    pub max_students: Option<i32>,
    pub student_count: i64,
}

/// An actively enrolled student.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RosterStudent {
    pub student_id: Uuid,
    pub full_name: String,
    pub email: String,
    /// Institutional roll number, distinct from the profile id.
    pub roll_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AttendanceSession {
    pub id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub topic: Option<String>,
    pub ai_enabled: bool,
    pub session_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub status: String,
    pub confidence_score: Option<f32>,
    pub manual_override: bool,
    pub marked_by: Option<Uuid>,
    pub notes: Option<String>,
    pub marked_at: DateTime<Utc>,
}

/// Per-class attendance summary for reports.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClassAttendanceReport {
    pub class_id: Uuid,
    pub class_name: String,
    pub course_code: String,
    pub session_count: i64,
    /// Mean of each student's attendance percentage, 0 when no sessions ran.
    pub average_attendance: f64,
    pub students_below_threshold: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: Option<String>,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TimetableSlot {
    pub id: Uuid,
    pub class_id: Uuid,
    /// 0 = Sunday.
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Quiz {
    pub id: Uuid,
    pub course_id: Uuid,
    pub teacher_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub quiz_type: String,
    pub difficulty_level: Option<String>,
    pub duration_minutes: Option<i32>,
    pub total_marks: Option<i32>,
    pub scheduled_date: Option<DateTime<Utc>>,
}

/// One student's mark in a manual attendance sheet.
#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ManualMark {
    pub student_id: Uuid,
    pub status: crate::attendance::AttendanceStatus,
    #[serde(default)]
    pub notes: Option<String>,
}
