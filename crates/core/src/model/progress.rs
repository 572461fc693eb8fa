use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::LessonId;

/// Watch percentage at which a lesson is auto-completed.
pub const AUTO_COMPLETE_PERCENT: u8 = 90;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("watch percentage {0} is out of range (expected 0-100)")]
    InvalidPercentage(u8),
}

/// Outcome of recording a watch-progress sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchUpdate {
    /// Percentage actually stored after the monotonic clamp.
    pub stored_percent: u8,
    /// True if this sample pushed the lesson into the completed set.
    pub newly_completed: bool,
}

/// Per-course watch state: which lessons are done, and how far the learner
/// got into each one.
///
/// Created lazily on the first progress update for a course and persisted
/// whole; callers read-modify-write, last writer wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseProgressRecord {
    completed_lessons: BTreeSet<LessonId>,
    watch_progress: BTreeMap<LessonId, u8>,
    updated_at: Option<DateTime<Utc>>,
}

impl CourseProgressRecord {
    /// The record for a course nobody has watched yet.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidPercentage` if any stored percentage
    /// exceeds 100.
    pub fn from_persisted(
        completed_lessons: BTreeSet<LessonId>,
        watch_progress: BTreeMap<LessonId, u8>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ProgressError> {
        if let Some(percent) = watch_progress.values().find(|p| **p > 100) {
            return Err(ProgressError::InvalidPercentage(*percent));
        }

        Ok(Self {
            completed_lessons,
            watch_progress,
            updated_at,
        })
    }

    /// Record an observed watch percentage for a lesson.
    ///
    /// Stored progress never regresses: a sample lower than what is already
    /// recorded keeps the recorded value. At `AUTO_COMPLETE_PERCENT` or above
    /// the lesson joins the completed set, keeping the observed percentage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidPercentage` if `percent` exceeds 100.
    pub fn record_watch(
        &mut self,
        lesson_id: &LessonId,
        percent: u8,
        now: DateTime<Utc>,
    ) -> Result<WatchUpdate, ProgressError> {
        if percent > 100 {
            return Err(ProgressError::InvalidPercentage(percent));
        }

        let previous = self.watch_progress.get(lesson_id).copied().unwrap_or(0);
        let stored_percent = previous.max(percent);
        self.watch_progress
            .insert(lesson_id.clone(), stored_percent);

        let newly_completed = stored_percent >= AUTO_COMPLETE_PERCENT
            && self.completed_lessons.insert(lesson_id.clone());

        self.updated_at = Some(now);
        Ok(WatchUpdate {
            stored_percent,
            newly_completed,
        })
    }

    /// Mark a lesson as fully complete, forcing its watch percentage to 100.
    ///
    /// Calling this twice is a no-op the second time.
    pub fn mark_complete(&mut self, lesson_id: &LessonId, now: DateTime<Utc>) {
        self.completed_lessons.insert(lesson_id.clone());
        self.watch_progress.insert(lesson_id.clone(), 100);
        self.updated_at = Some(now);
    }

    // Accessors
    #[must_use]
    pub fn completed_lessons(&self) -> &BTreeSet<LessonId> {
        &self.completed_lessons
    }

    #[must_use]
    pub fn watch_progress(&self) -> &BTreeMap<LessonId, u8> {
        &self.watch_progress
    }

    /// Last observed watch percentage for a lesson, if any sample was taken.
    #[must_use]
    pub fn watch_percent(&self, lesson_id: &LessonId) -> Option<u8> {
        self.watch_progress.get(lesson_id).copied()
    }

    #[must_use]
    pub fn is_lesson_completed(&self, lesson_id: &LessonId) -> bool {
        self.completed_lessons.contains(lesson_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed_lessons.is_empty() && self.watch_progress.is_empty()
    }

    /// When this record was last mutated; `None` for a fresh record.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
