//! Database liveness probe for `/health`.

use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DbHealth {
    #[ts(type = "number")]
    pub latency_ms: u64,
    pub stored_faces: i64,
}

/// Round-trip the database and report how many identities it holds.
pub async fn check(pool: &PgPool) -> Result<DbHealth> {
    let start = Instant::now();
    let stored_faces: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM face_identities")
        .fetch_one(pool)
        .await
        .context("database health check failed")?;
    Ok(DbHealth {
        latency_ms: start.elapsed().as_millis() as u64,
        stored_faces,
    })
}
