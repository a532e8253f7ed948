//! Course catalogue queries.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::models::Course;

const COURSE_COLUMNS: &str = "id, course_code, course_name, department, semester, credits, \
     description, syllabus_url, hod_id, is_active";

/// Active courses, optionally limited to one department.
pub async fn list_active(pool: &PgPool, department: Option<&str>) -> Result<Vec<Course>> {
    let rows = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses \
         WHERE is_active AND ($1::text IS NULL OR department = $1) \
         ORDER BY semester, course_code"
    ))
    .bind(department)
    .fetch_all(pool)
    .await
    .context("failed to list courses")?;
    Ok(rows)
}

pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Course>> {
    let row = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch course")?;
    Ok(row)
}
