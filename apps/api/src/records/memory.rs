use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{RecordStore, RecordStoreError};
use crate::models::application::{
    ApplicationRecord, ApplicationUpdate, NewApplication, RecordFilter,
};

/// Process-local record store. Used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<ApplicationRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<ApplicationRecord>>, RecordStoreError> {
        self.records
            .lock()
            .map_err(|_| RecordStoreError::Unavailable("record store lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn add_records(
        &self,
        user_id: Uuid,
        records: &[NewApplication],
    ) -> Result<Vec<Uuid>, RecordStoreError> {
        let mut stored = self.lock()?;
        let mut ids = Vec::with_capacity(records.len());

        for record in records {
            let existing = record.job_url.as_ref().and_then(|url| {
                stored
                    .iter()
                    .find(|r| r.user_id == user_id && r.job_url.as_ref() == Some(url))
                    .map(|r| r.id)
            });
            if let Some(id) = existing {
                ids.push(id);
                continue;
            }

            let now = Utc::now();
            let id = Uuid::new_v4();
            stored.push(ApplicationRecord {
                id,
                user_id,
                company_name: record.company_name.clone(),
                position: record.position.clone(),
                status: record.status.as_str().to_string(),
                application_date: record.application_date,
                last_updated: now,
                job_description: record.job_description.clone(),
                notes: record.notes.clone(),
                resume_url: record.resume_url.clone(),
                cover_letter_url: record.cover_letter_url.clone(),
                correspondence_urls: record.correspondence_urls.clone(),
                job_url: record.job_url.clone(),
                created_at: now,
                updated_at: now,
            });
            ids.push(id);
        }

        Ok(ids)
    }

    async fn find_records(
        &self,
        user_id: Uuid,
        filter: &RecordFilter,
    ) -> Result<Vec<ApplicationRecord>, RecordStoreError> {
        let mut records: Vec<ApplicationRecord> = self
            .lock()?
            .iter()
            .filter(|r| r.user_id == user_id && filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.application_date
                .cmp(&a.application_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(records)
    }

    async fn update_record(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &ApplicationUpdate,
    ) -> Result<ApplicationRecord, RecordStoreError> {
        let mut stored = self.lock()?;
        let record = stored
            .iter_mut()
            .find(|r| r.id == id && r.user_id == user_id)
            .ok_or(RecordStoreError::NotFound(id))?;

        if let Some(company_name) = &update.company_name {
            record.company_name = company_name.clone();
        }
        if let Some(position) = &update.position {
            record.position = position.clone();
        }
        if let Some(status) = update.status {
            record.status = status.as_str().to_string();
        }
        if let Some(application_date) = update.application_date {
            record.application_date = application_date;
        }
        if update.job_description.is_some() {
            record.job_description = update.job_description.clone();
        }
        if update.notes.is_some() {
            record.notes = update.notes.clone();
        }
        if update.resume_url.is_some() {
            record.resume_url = update.resume_url.clone();
        }
        if update.cover_letter_url.is_some() {
            record.cover_letter_url = update.cover_letter_url.clone();
        }
        let now = Utc::now();
        record.last_updated = now;
        record.updated_at = now;

        Ok(record.clone())
    }

    async fn delete_record(&self, user_id: Uuid, id: Uuid) -> Result<(), RecordStoreError> {
        let mut stored = self.lock()?;
        let before = stored.len();
        stored.retain(|r| !(r.id == id && r.user_id == user_id));
        if stored.len() == before {
            return Err(RecordStoreError::NotFound(id));
        }
        Ok(())
    }
}
