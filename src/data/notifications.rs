//! User notifications.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::models::Notification;

/// A user's notifications, unread first, newest first within each group.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, title, message, type, priority, action_url, is_read, created_at
        FROM notifications
        WHERE user_id = $1
        ORDER BY is_read ASC, created_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list notifications")?;
    Ok(rows)
}

/// Returns `false` when the notification does not exist.
pub async fn mark_read(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to mark notification read")?;
    Ok(result.rows_affected() > 0)
}

pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("failed to count unread notifications")?;
    Ok(count)
}
