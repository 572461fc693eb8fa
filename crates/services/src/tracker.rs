use tokio::sync::watch;

use edutube_core::completion::{DerivedProgress, derive_progress};
use edutube_core::model::{Course, CourseProgressRecord, LessonId};
use edutube_core::time::Clock;
use storage::ProgressStore;

use crate::error::TrackerError;

/// Orchestrates watch-progress updates for one course.
///
/// Every update is a read-modify-write against the course's single stored
/// record, followed by a re-derivation that is published to subscribers.
#[derive(Clone)]
pub struct ProgressTracker {
    clock: Clock,
    course: Course,
    store: ProgressStore,
    derived_tx: watch::Sender<DerivedProgress>,
}

impl ProgressTracker {
    /// Build a tracker for a course, priming the published snapshot from
    /// whatever progress is already stored.
    pub async fn new(clock: Clock, course: Course, store: ProgressStore) -> Self {
        let record = store.load(course.id()).await;
        let (derived_tx, _) = watch::channel(derive_progress(&record, &course));
        Self {
            clock,
            course,
            store,
            derived_tx,
        }
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    /// Consumer boundary: receive every derived-progress snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DerivedProgress> {
        self.derived_tx.subscribe()
    }

    /// Latest published derived progress.
    #[must_use]
    pub fn derived(&self) -> DerivedProgress {
        self.derived_tx.borrow().clone()
    }

    /// Raw stored record for the course, loaded fresh.
    pub async fn record(&self) -> CourseProgressRecord {
        self.store.load(self.course.id()).await
    }

    /// Merge an observed watch percentage into the course record.
    ///
    /// Lessons outside the course are stored too (the record may lead or
    /// trail the catalog), but only course lessons count toward the derived
    /// percentage. At 90% and above the lesson auto-completes.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` if the percentage is out of range or the
    /// record cannot be persisted.
    pub async fn update_watch_progress(
        &self,
        lesson_id: &LessonId,
        percent: u8,
    ) -> Result<DerivedProgress, TrackerError> {
        let mut record = self.store.load(self.course.id()).await;
        record.record_watch(lesson_id, percent, self.clock.now())?;
        self.store.save(self.course.id(), &record).await?;
        Ok(self.publish(&record))
    }

    /// Unconditionally mark a lesson complete (watch percentage forced to
    /// 100) and persist.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` if the record cannot be persisted.
    pub async fn mark_lesson_complete(
        &self,
        lesson_id: &LessonId,
    ) -> Result<DerivedProgress, TrackerError> {
        let mut record = self.store.load(self.course.id()).await;
        record.mark_complete(lesson_id, self.clock.now());
        self.store.save(self.course.id(), &record).await?;
        Ok(self.publish(&record))
    }

    fn publish(&self, record: &CourseProgressRecord) -> DerivedProgress {
        let derived = derive_progress(record, &self.course);
        self.derived_tx.send_replace(derived.clone());
        derived
    }
}
