use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::resume::{ArtifactRefs, ResumeContent, ResumeRecord};

/// Persistence for resume records. The service only sees this trait; the
/// PostgreSQL implementation is wired in `main`.
#[async_trait]
pub trait ResumeRepository: Send + Sync {
    async fn insert(&self, record: &ResumeRecord) -> Result<(), sqlx::Error>;

    async fn find(&self, id: Uuid) -> Result<Option<ResumeRecord>, sqlx::Error>;

    /// Most recently updated first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ResumeRecord>, sqlx::Error>;

    /// Saves name, template, content and `last_updated`. Artifact references
    /// are not touched.
    async fn save_content(&self, record: &ResumeRecord) -> Result<(), sqlx::Error>;

    async fn save_artifacts(&self, id: Uuid, artifacts: &ArtifactRefs) -> Result<(), sqlx::Error>;

    /// Returns false when no row existed.
    async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error>;
}

#[derive(Debug, FromRow)]
struct ResumeRow {
    id: Uuid,
    user_id: String,
    name: String,
    template: String,
    content: Json<ResumeContent>,
    preview_image: Option<String>,
    pdf_path: Option<String>,
    latex_path: Option<String>,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl From<ResumeRow> for ResumeRecord {
    fn from(row: ResumeRow) -> Self {
        ResumeRecord {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            template: row.template,
            content: row.content.0,
            artifacts: ArtifactRefs {
                preview_image: row.preview_image,
                pdf_path: row.pdf_path,
                latex_path: row.latex_path,
            },
            created_at: row.created_at,
            last_updated: row.last_updated,
        }
    }
}

#[derive(Clone)]
pub struct PgResumeRepository {
    pool: PgPool,
}

impl PgResumeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeRepository for PgResumeRepository {
    async fn insert(&self, record: &ResumeRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO resumes
                (id, user_id, name, template, content,
                 preview_image, pdf_path, latex_path, created_at, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(&record.name)
        .bind(&record.template)
        .bind(Json(&record.content))
        .bind(&record.artifacts.preview_image)
        .bind(&record.artifacts.pdf_path)
        .bind(&record.artifacts.latex_path)
        .bind(record.created_at)
        .bind(record.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<ResumeRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ResumeRecord::from))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ResumeRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE user_id = $1 ORDER BY last_updated DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ResumeRecord::from).collect())
    }

    async fn save_content(&self, record: &ResumeRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE resumes
            SET name = $2, template = $3, content = $4, last_updated = $5
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.template)
        .bind(Json(&record.content))
        .bind(record.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_artifacts(&self, id: Uuid, artifacts: &ArtifactRefs) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE resumes SET preview_image = $2, pdf_path = $3, latex_path = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(&artifacts.preview_image)
        .bind(&artifacts.pdf_path)
        .bind(&artifacts.latex_path)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
