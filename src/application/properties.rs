//! The property store: persistence plus change notification.
//!
//! Reads go straight to the repository. Writes validate the draft, persist it,
//! and then await every subscribed [`ChangeListener`] before returning, so a
//! caller that gets `Ok` back knows invalidation has already run.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::events::{ChangeKind, ChangeListener, ChangeNotifier};
use crate::application::repos::{
    CreatePropertyParams, PropertiesRepo, PropertiesWriteRepo, RepoError, UpdatePropertyParams,
};
use crate::cache::CacheError;
use crate::domain::entities::PropertyRecord;
use crate::domain::error::DomainError;
use crate::domain::properties::PropertyDraft;

#[derive(Debug, Error)]
pub enum PropertyWriteError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    /// The row was written but a listener failed; cached views may stay stale
    /// until the aggregate entry expires.
    #[error("change persisted but invalidation failed: {0}")]
    Notification(#[from] CacheError),
}

pub struct PropertyStore {
    reader: Arc<dyn PropertiesRepo>,
    writer: Arc<dyn PropertiesWriteRepo>,
    notifier: ChangeNotifier,
}

impl PropertyStore {
    pub fn new(reader: Arc<dyn PropertiesRepo>, writer: Arc<dyn PropertiesWriteRepo>) -> Self {
        Self {
            reader,
            writer,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Register a listener for every subsequent write and delete.
    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) {
        self.notifier.subscribe(listener);
    }

    /// The read side, for collaborators that only ever list.
    pub fn reader(&self) -> Arc<dyn PropertiesRepo> {
        self.reader.clone()
    }

    pub async fn list_all(&self) -> Result<Vec<PropertyRecord>, RepoError> {
        self.reader.list_all().await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<PropertyRecord>, RepoError> {
        self.reader.find_by_id(id).await
    }

    pub async fn health_check(&self) -> Result<(), RepoError> {
        self.reader.health_check().await
    }

    pub async fn create(&self, draft: PropertyDraft) -> Result<PropertyRecord, PropertyWriteError> {
        let fields = draft.validate()?;
        let record = self
            .writer
            .create_property(CreatePropertyParams { fields })
            .await?;

        info!(record_id = %record.id, title = %record.title, "Property created");
        self.notifier
            .notify(ChangeKind::Written, record.clone())
            .await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        id: Uuid,
        draft: PropertyDraft,
    ) -> Result<PropertyRecord, PropertyWriteError> {
        let fields = draft.validate()?;
        let record = self
            .writer
            .update_property(UpdatePropertyParams { id, fields })
            .await?;

        info!(record_id = %record.id, title = %record.title, "Property updated");
        self.notifier
            .notify(ChangeKind::Written, record.clone())
            .await?;
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<PropertyRecord, PropertyWriteError> {
        let record = self.writer.delete_property(id).await?;

        info!(record_id = %record.id, title = %record.title, "Property deleted");
        self.notifier
            .notify(ChangeKind::Deleted, record.clone())
            .await?;
        Ok(record)
    }
}
