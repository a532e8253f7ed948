//! Classes and their enrolled students.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::models::{ClassSummary, RosterStudent};

const CLASS_SELECT: &str = "SELECT c.id, c.course_id, co.course_code, co.course_name, c.teacher_id, \
            c.class_name, c.room_number, c.max_students, \
            (SELECT COUNT(*) FROM enrollments e WHERE e.class_id = c.id AND e.is_active) AS student_count \
     FROM classes c \
     JOIN courses co ON co.id = c.course_id";

/// Classes taught by `teacher_id`, or every class when `None`.
pub async fn list(pool: &PgPool, teacher_id: Option<Uuid>) -> Result<Vec<ClassSummary>> {
    let rows = sqlx::query_as::<_, ClassSummary>(&format!(
        "{CLASS_SELECT} WHERE ($1::uuid IS NULL OR c.teacher_id = $1) \
         ORDER BY co.course_code, c.class_name"
    ))
    .bind(teacher_id)
    .fetch_all(pool)
    .await
    .context("failed to list classes")?;
    Ok(rows)
}

pub async fn get(pool: &PgPool, class_id: Uuid) -> Result<Option<ClassSummary>> {
    let row = sqlx::query_as::<_, ClassSummary>(&format!("{CLASS_SELECT} WHERE c.id = $1"))
        .bind(class_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch class")?;
    Ok(row)
}

/// Actively enrolled students, alphabetical.
pub async fn roster(pool: &PgPool, class_id: Uuid) -> Result<Vec<RosterStudent>> {
    let rows = sqlx::query_as::<_, RosterStudent>(
        r#"
        SELECT p.id AS student_id, p.full_name, p.email, p.student_id AS roll_number
        FROM enrollments e
        JOIN profiles p ON p.id = e.student_id
        WHERE e.class_id = $1 AND e.is_active AND p.is_active
        ORDER BY p.full_name
        "#,
    )
    .bind(class_id)
    .fetch_all(pool)
    .await
    .context("failed to fetch class roster")?;
    Ok(rows)
}
