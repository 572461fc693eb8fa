use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

use edutube_core::model::{CourseId, CourseProgressRecord, LessonId, ProgressError};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Client-local key-value persistence boundary.
///
/// Both operations are whole-value: there is no partial update, so callers
/// read-modify-write. Concurrent writers are not coordinated; the last
/// writer wins.
#[async_trait]
pub trait KeyValueRepository: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Persisted shape for a course progress record.
///
/// This mirrors the domain `CourseProgressRecord` so the store can
/// serialize/deserialize without leaking storage concerns into the domain
/// layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecordData {
    pub completed_lessons: Vec<LessonId>,
    pub watch_progress: BTreeMap<LessonId, u8>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressRecordData {
    #[must_use]
    pub fn from_record(record: &CourseProgressRecord) -> Self {
        Self {
            completed_lessons: record.completed_lessons().iter().cloned().collect(),
            watch_progress: record.watch_progress().clone(),
            updated_at: record.updated_at(),
        }
    }

    /// Convert the persisted shape back into a domain record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if any stored percentage is out of range.
    pub fn into_record(self) -> Result<CourseProgressRecord, ProgressError> {
        CourseProgressRecord::from_persisted(
            self.completed_lessons.into_iter().collect(),
            self.watch_progress,
            self.updated_at,
        )
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl KeyValueRepository for InMemoryRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

const KEY_PREFIX: &str = "edutube.progress";

fn record_key(course_id: &CourseId) -> String {
    format!("{KEY_PREFIX}.{course_id}")
}

/// Stores one `CourseProgressRecord` per course as JSON under a namespaced
/// key, behind a swappable key-value backend.
#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KeyValueRepository>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueRepository>) -> Self {
        Self { kv }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()))
    }

    /// Load the record for a course, or the empty record if none is stored.
    ///
    /// Never fails: backend errors and corrupt payloads are logged and read
    /// as "no prior progress".
    pub async fn load(&self, course_id: &CourseId) -> CourseProgressRecord {
        let key = record_key(course_id);
        let raw = match self.kv.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return CourseProgressRecord::empty(),
            Err(err) => {
                warn!(course_id = %course_id, error = %err, "progress read failed; treating as empty");
                return CourseProgressRecord::empty();
            }
        };

        match serde_json::from_str::<ProgressRecordData>(&raw).map(ProgressRecordData::into_record)
        {
            Ok(Ok(record)) => record,
            Ok(Err(err)) => {
                warn!(course_id = %course_id, error = %err, "stored progress is invalid; treating as empty");
                CourseProgressRecord::empty()
            }
            Err(err) => {
                warn!(course_id = %course_id, error = %err, "stored progress is unparseable; treating as empty");
                CourseProgressRecord::empty()
            }
        }
    }

    /// Overwrite the stored record for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be serialized or written.
    pub async fn save(
        &self,
        course_id: &CourseId,
        record: &CourseProgressRecord,
    ) -> Result<(), StorageError> {
        let data = ProgressRecordData::from_record(record);
        let raw = serde_json::to_string(&data)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.kv.set(&record_key(course_id), &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edutube_core::time::fixed_now;

    fn cid() -> CourseId {
        CourseId::new("rust-101")
    }

    #[tokio::test]
    async fn load_missing_record_is_empty() {
        let store = ProgressStore::in_memory();
        let record = store.load(&cid()).await;
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = ProgressStore::in_memory();

        let mut record = CourseProgressRecord::empty();
        record
            .record_watch(&LessonId::new("l1"), 55, fixed_now())
            .unwrap();
        record.mark_complete(&LessonId::new("l2"), fixed_now());

        store.save(&cid(), &record).await.unwrap();
        let loaded = store.load(&cid()).await;

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn save_overwrites_previous_record() {
        let store = ProgressStore::in_memory();

        let mut first = CourseProgressRecord::empty();
        first.mark_complete(&LessonId::new("l1"), fixed_now());
        store.save(&cid(), &first).await.unwrap();

        let mut second = CourseProgressRecord::empty();
        second
            .record_watch(&LessonId::new("l2"), 30, fixed_now())
            .unwrap();
        store.save(&cid(), &second).await.unwrap();

        assert_eq!(store.load(&cid()).await, second);
    }

    #[tokio::test]
    async fn corrupt_payload_reads_as_empty() {
        let kv = Arc::new(InMemoryRepository::new());
        kv.set(&record_key(&cid()), "{not json").await.unwrap();

        let store = ProgressStore::new(kv);
        assert!(store.load(&cid()).await.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_payload_reads_as_empty() {
        let kv = Arc::new(InMemoryRepository::new());
        kv.set(
            &record_key(&cid()),
            r#"{"completed_lessons":[],"watch_progress":{"l1":130}}"#,
        )
        .await
        .unwrap();

        let store = ProgressStore::new(kv);
        assert!(store.load(&cid()).await.is_empty());
    }

    #[tokio::test]
    async fn records_are_namespaced_per_course() {
        let store = ProgressStore::in_memory();

        let mut record = CourseProgressRecord::empty();
        record.mark_complete(&LessonId::new("l1"), fixed_now());
        store.save(&CourseId::new("a"), &record).await.unwrap();

        assert!(store.load(&CourseId::new("b")).await.is_empty());
    }
}
