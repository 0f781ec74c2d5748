//! RecordStore: durable history of the user's job applications.
//!
//! The orchestrator only ever creates records; listing, filtering, stats,
//! updating and deleting are used by the manual-entry API.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::application::{
    ApplicationRecord, ApplicationStats, ApplicationUpdate, NewApplication, RecordFilter,
};

pub mod handlers;
pub mod memory;
pub mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PgRecordStore;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("Application record {0} not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction carried in `AppState` as `Arc<dyn RecordStore>`.
///
/// Inserts are idempotent per `(user_id, job_url)`: adding a record for a
/// posting URL that already has one returns the existing id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts all records in one call and returns their ids in input order.
    async fn add_records(
        &self,
        user_id: Uuid,
        records: &[NewApplication],
    ) -> Result<Vec<Uuid>, RecordStoreError>;

    async fn add_record(
        &self,
        user_id: Uuid,
        record: &NewApplication,
    ) -> Result<Uuid, RecordStoreError> {
        self.add_records(user_id, std::slice::from_ref(record))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RecordStoreError::Unavailable("insert returned no id".to_string()))
    }

    /// Records matching `filter`, newest application first.
    async fn find_records(
        &self,
        user_id: Uuid,
        filter: &RecordFilter,
    ) -> Result<Vec<ApplicationRecord>, RecordStoreError>;

    async fn list_records(&self, user_id: Uuid) -> Result<Vec<ApplicationRecord>, RecordStoreError> {
        self.find_records(user_id, &RecordFilter::default()).await
    }

    async fn application_stats(&self, user_id: Uuid) -> Result<ApplicationStats, RecordStoreError> {
        Ok(ApplicationStats::tally(&self.list_records(user_id).await?))
    }

    async fn update_record(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &ApplicationUpdate,
    ) -> Result<ApplicationRecord, RecordStoreError>;

    async fn delete_record(&self, user_id: Uuid, id: Uuid) -> Result<(), RecordStoreError>;
}
