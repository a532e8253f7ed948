//! Attendance reporting.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::models::ClassAttendanceReport;

/// Students under this percentage are flagged in reports.
pub const DEFAULT_LOW_ATTENDANCE_THRESHOLD: f64 = 75.0;

/// Average attendance per class plus the number of students below `threshold`.
///
/// A student's percentage counts `present` and `late` marks as attended.
/// Classes without any session report 0 with no flagged students.
pub async fn attendance_by_class(
    pool: &PgPool,
    threshold: f64,
    teacher_id: Option<Uuid>,
) -> Result<Vec<ClassAttendanceReport>> {
    let rows = sqlx::query_as::<_, ClassAttendanceReport>(
        r#"
        WITH per_student AS (
            SELECT s.class_id,
                   r.student_id,
                   100.0 * COUNT(*) FILTER (WHERE r.status IN ('present', 'late')) / COUNT(*) AS pct
            FROM attendance_records r
            JOIN attendance_sessions s ON s.id = r.session_id
            GROUP BY s.class_id, r.student_id
        ),
        session_counts AS (
            SELECT class_id, COUNT(*) AS session_count
            FROM attendance_sessions
            GROUP BY class_id
        )
        SELECT c.id AS class_id,
               c.class_name,
               co.course_code,
               COALESCE(sc.session_count, 0) AS session_count,
               COALESCE(AVG(ps.pct), 0)::float8 AS average_attendance,
               COUNT(ps.student_id) FILTER (WHERE ps.pct < $1) AS students_below_threshold
        FROM classes c
        JOIN courses co ON co.id = c.course_id
        LEFT JOIN session_counts sc ON sc.class_id = c.id
        LEFT JOIN per_student ps ON ps.class_id = c.id
        WHERE ($2::uuid IS NULL OR c.teacher_id = $2)
        GROUP BY c.id, c.class_name, co.course_code, sc.session_count
        ORDER BY co.course_code, c.class_name
        "#,
    )
    .bind(threshold)
    .bind(teacher_id)
    .fetch_all(pool)
    .await
    .context("failed to compute attendance report")?;
    Ok(rows)
}
