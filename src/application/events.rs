//! Store change notifications.
//!
//! The property store announces every successful create, update, and delete to
//! the listeners subscribed at startup. Delivery is synchronous: `notify` awaits
//! each listener in registration order before the write call returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::cache::CacheError;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::PropertyRecord;

const SOURCE: &str = "application::events";

/// Monotonic sequence number assigned to each notification in this process.
pub type Epoch = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A record was created or updated.
    Written,
    /// A record was deleted.
    Deleted,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Written => "written",
            ChangeKind::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: ChangeKind,
    /// The record as stored after the write, or as it was before deletion.
    pub record: PropertyRecord,
    pub timestamp: OffsetDateTime,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, record: PropertyRecord, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            record,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Receives store change notifications.
#[async_trait]
pub trait ChangeListener: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_change(&self, event: &ChangeEvent) -> Result<(), CacheError>;
}

/// Explicit observer registry owned by the property store.
pub struct ChangeNotifier {
    listeners: RwLock<Vec<Arc<dyn ChangeListener>>>,
    epoch_counter: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) {
        let name = listener.name();
        let mut listeners = rw_write(&self.listeners, SOURCE, "subscribe");
        listeners.push(listener);
        debug!(listener = name, listeners = listeners.len(), "Change listener subscribed");
    }

    /// Deliver a change to every listener, stopping at the first failure.
    pub async fn notify(&self, kind: ChangeKind, record: PropertyRecord) -> Result<(), CacheError> {
        let epoch = self.epoch_counter.fetch_add(1, Ordering::SeqCst);
        let event = ChangeEvent::new(kind, record, epoch);

        debug!(
            event_id = %event.id,
            event_epoch = event.epoch,
            change = kind.as_str(),
            record_id = %event.record.id,
            "Store change dispatched"
        );

        // Clone the handles so no lock guard lives across an await point.
        let listeners = rw_read(&self.listeners, SOURCE, "notify").clone();
        for listener in listeners {
            listener.on_change(&event).await?;
        }
        Ok(())
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
