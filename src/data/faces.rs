//! Postgres-backed ReID gallery (`face_identities`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::face::FaceStore;
use crate::face::embedding::Embedding;
use crate::face::registry::FaceIdentity;

#[derive(sqlx::FromRow)]
struct FaceRow {
    reid_num: i32,
    name: String,
    embedding: Vec<f32>,
}

pub struct PgFaceStore {
    pool: PgPool,
}

impl PgFaceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FaceStore for PgFaceStore {
    async fn load_all(&self) -> Result<Vec<FaceIdentity>> {
        let rows = sqlx::query_as::<_, FaceRow>(
            "SELECT reid_num, name, embedding FROM face_identities ORDER BY reid_num",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load face identities")?;

        rows.into_iter()
            .map(|row| {
                let reid_num = u32::try_from(row.reid_num)
                    .with_context(|| format!("negative reid_num {}", row.reid_num))?;
                Ok(FaceIdentity {
                    reid_num,
                    name: row.name,
                    embedding: Embedding::new(row.embedding),
                })
            })
            .collect()
    }

    async fn insert(&self, identity: &FaceIdentity) -> Result<()> {
        let reid_num = i32::try_from(identity.reid_num).context("reid_num out of range")?;
        sqlx::query(
            r#"
            INSERT INTO face_identities (reid_num, name, embedding)
            VALUES ($1, $2, $3)
            ON CONFLICT (reid_num)
            DO UPDATE SET name = EXCLUDED.name, embedding = EXCLUDED.embedding, updated_at = now()
            "#,
        )
        .bind(reid_num)
        .bind(&identity.name)
        .bind(identity.embedding.as_slice())
        .execute(&self.pool)
        .await
        .context("failed to insert face identity")?;
        Ok(())
    }

    async fn update_name(&self, reid_num: u32, name: &str) -> Result<bool> {
        let reid_num = i32::try_from(reid_num).context("reid_num out of range")?;
        let result = sqlx::query(
            "UPDATE face_identities SET name = $2, updated_at = now() WHERE reid_num = $1",
        )
        .bind(reid_num)
        .bind(name)
        .execute(&self.pool)
        .await
        .context("failed to rename face identity")?;
        Ok(result.rows_affected() > 0)
    }
}
