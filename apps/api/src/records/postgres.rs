use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{RecordStore, RecordStoreError};
use crate::models::application::{
    ApplicationRecord, ApplicationStats, ApplicationUpdate, NewApplication, RecordFilter,
};

/// `job_applications` table on PostgreSQL.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `%term%` for ILIKE, with the pattern metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Inserts one record, or returns the id of the record already stored for
/// the same posting URL.
async fn insert_one(
    conn: &mut PgConnection,
    user_id: Uuid,
    record: &NewApplication,
) -> Result<Uuid, RecordStoreError> {
    let inserted: Option<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO job_applications
            (id, user_id, company_name, position, status, application_date,
             job_description, notes, resume_url, cover_letter_url,
             correspondence_urls, job_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (user_id, job_url) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&record.company_name)
    .bind(&record.position)
    .bind(record.status.as_str())
    .bind(record.application_date)
    .bind(record.job_description.as_deref())
    .bind(record.notes.as_deref())
    .bind(record.resume_url.as_deref())
    .bind(record.cover_letter_url.as_deref())
    .bind(record.correspondence_urls.as_slice())
    .bind(record.job_url.as_deref())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = inserted {
        return Ok(id);
    }

    // Conflict: only possible when job_url is set.
    let existing: Uuid = sqlx::query_scalar(
        "SELECT id FROM job_applications WHERE user_id = $1 AND job_url = $2",
    )
    .bind(user_id)
    .bind(record.job_url.as_deref())
    .fetch_one(&mut *conn)
    .await?;

    info!(
        "Application for {} already recorded as {existing}; not duplicating",
        record.job_url.as_deref().unwrap_or_default()
    );
    Ok(existing)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn add_records(
        &self,
        user_id: Uuid,
        records: &[NewApplication],
    ) -> Result<Vec<Uuid>, RecordStoreError> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(insert_one(&mut tx, user_id, record).await?);
        }
        tx.commit().await?;

        info!("Stored {} application records for user {user_id}", ids.len());
        Ok(ids)
    }

    async fn find_records(
        &self,
        user_id: Uuid,
        filter: &RecordFilter,
    ) -> Result<Vec<ApplicationRecord>, RecordStoreError> {
        let records = sqlx::query_as::<_, ApplicationRecord>(
            r#"
            SELECT * FROM job_applications
            WHERE user_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL
                   OR company_name ILIKE $3
                   OR position ILIKE $3
                   OR notes ILIKE $3)
            ORDER BY application_date DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.search_term().map(like_pattern))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn application_stats(&self, user_id: Uuid) -> Result<ApplicationStats, RecordStoreError> {
        let stats = sqlx::query_as::<_, ApplicationStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'interview') AS interviews,
                   COUNT(*) FILTER (WHERE status IN ('offer', 'accepted')) AS offers,
                   COUNT(*) FILTER (WHERE status IN ('applied', 'screening')) AS pending
            FROM job_applications
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn update_record(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &ApplicationUpdate,
    ) -> Result<ApplicationRecord, RecordStoreError> {
        sqlx::query_as::<_, ApplicationRecord>(
            r#"
            UPDATE job_applications
            SET company_name = COALESCE($1, company_name),
                position = COALESCE($2, position),
                status = COALESCE($3, status),
                application_date = COALESCE($4, application_date),
                job_description = COALESCE($5, job_description),
                notes = COALESCE($6, notes),
                resume_url = COALESCE($7, resume_url),
                cover_letter_url = COALESCE($8, cover_letter_url),
                last_updated = now(),
                updated_at = now()
            WHERE id = $9 AND user_id = $10
            RETURNING *
            "#,
        )
        .bind(update.company_name.as_deref())
        .bind(update.position.as_deref())
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.application_date)
        .bind(update.job_description.as_deref())
        .bind(update.notes.as_deref())
        .bind(update.resume_url.as_deref())
        .bind(update.cover_letter_url.as_deref())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RecordStoreError::NotFound(id))
    }

    async fn delete_record(&self, user_id: Uuid, id: Uuid) -> Result<(), RecordStoreError> {
        let result = sqlx::query("DELETE FROM job_applications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RecordStoreError::NotFound(id));
        }
        Ok(())
    }
}
