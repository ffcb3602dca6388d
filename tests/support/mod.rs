#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use property_listings::application::repos::{
    CreatePropertyParams, PropertiesRepo, PropertiesWriteRepo, RepoError, UpdatePropertyParams,
};
use property_listings::cache::MemoryBackend;
use property_listings::domain::entities::PropertyRecord;
use time::OffsetDateTime;
use uuid::Uuid;

/// In-memory store that counts full-collection queries.
#[derive(Default)]
pub struct InMemoryRepo {
    rows: Mutex<Vec<PropertyRecord>>,
    list_calls: AtomicUsize,
}

impl InMemoryRepo {
    pub fn with_rows(rows: Vec<PropertyRecord>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            ..Default::default()
        })
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Write behind the store's back, without notifying anyone.
    pub fn insert_silently(&self, record: PropertyRecord) {
        self.rows.lock().expect("rows lock").push(record);
    }
}

#[async_trait]
impl PropertiesRepo for InMemoryRepo {
    async fn list_all(&self) -> Result<Vec<PropertyRecord>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().expect("rows lock").clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PropertyRecord>, RepoError> {
        Ok(self
            .rows
            .lock()
            .expect("rows lock")
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[async_trait]
impl PropertiesWriteRepo for InMemoryRepo {
    async fn create_property(
        &self,
        params: CreatePropertyParams,
    ) -> Result<PropertyRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = PropertyRecord {
            id: Uuid::new_v4(),
            title: params.fields.title,
            description: params.fields.description,
            price: params.fields.price,
            location: params.fields.location,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().expect("rows lock").push(record.clone());
        Ok(record)
    }

    async fn update_property(
        &self,
        params: UpdatePropertyParams,
    ) -> Result<PropertyRecord, RepoError> {
        let mut rows = self.rows.lock().expect("rows lock");
        let row = rows
            .iter_mut()
            .find(|row| row.id == params.id)
            .ok_or(RepoError::NotFound)?;
        row.title = params.fields.title;
        row.description = params.fields.description;
        row.price = params.fields.price;
        row.location = params.fields.location;
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.clone())
    }

    async fn delete_property(&self, id: Uuid) -> Result<PropertyRecord, RepoError> {
        let mut rows = self.rows.lock().expect("rows lock");
        let index = rows
            .iter()
            .position(|row| row.id == id)
            .ok_or(RepoError::NotFound)?;
        Ok(rows.remove(index))
    }
}

pub fn record(title: &str, price: &str, location: &str) -> PropertyRecord {
    let now = OffsetDateTime::now_utc();
    PropertyRecord {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: format!("{title} description"),
        price: price.to_string(),
        location: location.to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn memory_backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new(
        NonZeroUsize::new(64).expect("non-zero capacity"),
    ))
}
