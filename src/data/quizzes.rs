//! Quiz listings.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::models::Quiz;

/// Published quizzes for a course, soonest scheduled first.
pub async fn list_published(pool: &PgPool, course_id: Uuid) -> Result<Vec<Quiz>> {
    let rows = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, course_id, teacher_id, title, description, quiz_type, difficulty_level,
               duration_minutes, total_marks, scheduled_date
        FROM quizzes
        WHERE course_id = $1 AND is_published
        ORDER BY scheduled_date ASC NULLS LAST, created_at DESC
        "#,
    )
    .bind(course_id)
    .fetch_all(pool)
    .await
    .context("failed to list quizzes")?;
    Ok(rows)
}
