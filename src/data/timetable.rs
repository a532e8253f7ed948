//! Weekly timetable slots.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::models::TimetableSlot;

/// Active slots for a class, by weekday then start time.
pub async fn list_for_class(pool: &PgPool, class_id: Uuid) -> Result<Vec<TimetableSlot>> {
    let rows = sqlx::query_as::<_, TimetableSlot>(
        r#"
        SELECT id, class_id, day_of_week, start_time, end_time, room_number
        FROM timetable
        WHERE class_id = $1 AND is_active
        ORDER BY day_of_week, start_time
        "#,
    )
    .bind(class_id)
    .fetch_all(pool)
    .await
    .context("failed to fetch timetable")?;
    Ok(rows)
}
