//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::PropertyRecord;
use crate::domain::properties::PropertyFields;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePropertyParams {
    pub fields: PropertyFields,
}

#[derive(Debug, Clone)]
pub struct UpdatePropertyParams {
    pub id: Uuid,
    pub fields: PropertyFields,
}

#[async_trait]
pub trait PropertiesRepo: Send + Sync {
    /// Every property in store order (oldest first, ties broken by id).
    async fn list_all(&self) -> Result<Vec<PropertyRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PropertyRecord>, RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PropertiesWriteRepo: Send + Sync {
    async fn create_property(
        &self,
        params: CreatePropertyParams,
    ) -> Result<PropertyRecord, RepoError>;

    async fn update_property(
        &self,
        params: UpdatePropertyParams,
    ) -> Result<PropertyRecord, RepoError>;

    /// Removes the row and returns it as it was before deletion.
    async fn delete_property(&self, id: Uuid) -> Result<PropertyRecord, RepoError>;
}
