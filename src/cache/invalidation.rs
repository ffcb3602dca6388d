//! Drops the aggregate entry whenever the store changes.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tracing::{info, warn};

use super::CacheError;
use super::backend::CacheBackend;
use super::keys::AGGREGATE_KEY;
use crate::application::events::{ChangeEvent, ChangeListener};

pub(crate) const METRIC_INVALIDATION_TOTAL: &str = "properties_cache_invalidation_total";

/// Subscribed to the property store at startup. Every successful create,
/// update, or delete removes the aggregate entry before the write returns;
/// the next read repopulates it.
pub struct InvalidationListener {
    backend: Arc<dyn CacheBackend>,
}

impl InvalidationListener {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ChangeListener for InvalidationListener {
    fn name(&self) -> &'static str {
        "cache::invalidation"
    }

    async fn on_change(&self, event: &ChangeEvent) -> Result<(), CacheError> {
        if let Err(err) = self.backend.delete(AGGREGATE_KEY).await {
            warn!(
                key = AGGREGATE_KEY,
                change = event.kind.as_str(),
                event_epoch = event.epoch,
                record_id = %event.record.id,
                title = %event.record.title,
                error = %err,
                "Aggregate cache invalidation failed"
            );
            return Err(err.into());
        }

        counter!(METRIC_INVALIDATION_TOTAL, "change" => event.kind.as_str()).increment(1);
        info!(
            key = AGGREGATE_KEY,
            change = event.kind.as_str(),
            event_epoch = event.epoch,
            changed_at = %event.timestamp,
            record_id = %event.record.id,
            title = %event.record.title,
            "Aggregate cache invalidated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::num::NonZeroUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    use bytes::Bytes;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::application::events::ChangeKind;
    use crate::cache::backend::{BackendError, BackendInfo};
    use crate::cache::memory::MemoryBackend;
    use crate::domain::entities::PropertyRecord;

    fn event(kind: ChangeKind) -> ChangeEvent {
        let now = OffsetDateTime::now_utc();
        let record = PropertyRecord {
            id: Uuid::new_v4(),
            title: "Lake house".to_string(),
            description: String::new(),
            price: "1.00".to_string(),
            location: "Kisumu".to_string(),
            created_at: now,
            updated_at: now,
        };
        ChangeEvent::new(kind, record, 0)
    }

    #[tokio::test]
    async fn change_removes_aggregate_entry() {
        let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(4).expect("capacity")));
        backend
            .set(AGGREGATE_KEY, Bytes::from_static(b"[]"), Duration::from_secs(60))
            .await
            .expect("set");
        backend
            .set("unrelated", Bytes::from_static(b"1"), Duration::from_secs(60))
            .await
            .expect("set");
        let listener = InvalidationListener::new(backend.clone());

        listener
            .on_change(&event(ChangeKind::Deleted))
            .await
            .expect("invalidate");

        assert!(backend.get(AGGREGATE_KEY).await.expect("get").is_none());
        assert!(backend.get("unrelated").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn invalidating_twice_is_harmless() {
        let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(4).expect("capacity")));
        let listener = InvalidationListener::new(backend.clone());

        listener
            .on_change(&event(ChangeKind::Written))
            .await
            .expect("first");
        listener
            .on_change(&event(ChangeKind::Written))
            .await
            .expect("second");

        assert!(backend.get(AGGREGATE_KEY).await.expect("get").is_none());
    }

    struct RefusingBackend;

    #[async_trait]
    impl CacheBackend for RefusingBackend {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>, BackendError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), BackendError> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> Result<(), BackendError> {
            Err(BackendError::unavailable("read-only replica"))
        }

        async fn raw_info(&self) -> Result<BackendInfo, BackendError> {
            Ok(BackendInfo::new())
        }
    }

    #[tokio::test]
    async fn delete_failure_is_reported() {
        let listener = InvalidationListener::new(Arc::new(RefusingBackend));

        let err = listener
            .on_change(&event(ChangeKind::Written))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CacheError::Backend(BackendError::Unavailable { .. })
        ));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let logs = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_ansi(false)
                .with_writer(move || logs.clone())
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn line_containing(&self, message: &str) -> String {
            let output = String::from_utf8(self.0.lock().expect("log buffer").clone())
                .expect("utf8");
            output
                .lines()
                .find(|line| line.contains(message))
                .map(str::to_string)
                .unwrap_or_else(|| panic!("no log line containing `{message}`"))
        }
    }

    #[tokio::test]
    async fn successful_invalidation_traces_the_change_time() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(4).expect("capacity")));

        let change = event(ChangeKind::Written);
        InvalidationListener::new(backend)
            .on_change(&change)
            .await
            .expect("invalidate");

        let line = logs.line_containing("Aggregate cache invalidated");
        assert!(line.contains("changed_at"));
        assert!(line.contains(&change.timestamp.to_string()));
    }

    #[tokio::test]
    async fn delete_failure_names_the_triggering_record() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let change = event(ChangeKind::Deleted);
        let listener = InvalidationListener::new(Arc::new(RefusingBackend));
        listener.on_change(&change).await.unwrap_err();

        let line = logs.line_containing("Aggregate cache invalidation failed");
        assert!(line.contains("\"level\":\"WARN\""));
        assert!(line.contains(&change.record.id.to_string()));
        assert!(line.contains("Lake house"));
        assert!(line.contains("read-only replica"));
    }
}
