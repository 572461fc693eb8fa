//! Weighted completion scoring for a course.
//!
//! A raw average of watch percentages undercounts lessons the learner has
//! effectively finished, so each lesson earns tiered credit: near-complete
//! playback is worth almost as much as full completion, while barely-started
//! lessons are heavily discounted.

use crate::model::{Course, CourseProgressRecord, LessonId};

/// Derived percentage at or above which the whole course counts as completed.
pub const COMPLETION_PERCENT: u8 = 95;

/// Read-only, computed view of a course's completion state.
///
/// Recomputed from the record on every update; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedProgress {
    /// Overall completion percentage, 0-100.
    pub percent: u8,
    /// True once `percent` reaches `COMPLETION_PERCENT`.
    pub is_completed: bool,
    /// First lesson in course order not yet completed, if any.
    pub next_lesson_id: Option<LessonId>,
    /// How many of the course's lessons are in the completed set.
    pub completed_count: usize,
}

/// Weighted credit (0.0-1.0) one lesson contributes to overall progress.
#[must_use]
pub fn lesson_credit(record: &CourseProgressRecord, lesson_id: &LessonId) -> f64 {
    if record.is_lesson_completed(lesson_id) {
        return 1.0;
    }
    match record.watch_percent(lesson_id).unwrap_or(0) {
        p if p >= 90 => 0.95,
        p if p >= 50 => 0.75,
        p if p > 0 => f64::from(p) / 100.0 * 0.5,
        _ => 0.0,
    }
}

/// Derive overall course progress from a record and the course's lesson list.
///
/// Only lessons that belong to the course count; stale record entries for
/// lessons no longer in the course are ignored. A course with no lessons
/// derives to zero rather than dividing by zero.
#[must_use]
pub fn derive_progress(record: &CourseProgressRecord, course: &Course) -> DerivedProgress {
    let total = course.total_lessons();

    let percent = if total == 0 {
        0
    } else {
        let earned: f64 = course
            .lessons()
            .iter()
            .map(|lesson| lesson_credit(record, lesson.id()))
            .sum();
        // round half away from zero: 67.5 reads as 68
        let rounded = (100.0 * earned / total as f64).round();
        rounded.clamp(0.0, 100.0) as u8
    };

    let completed_count = course
        .lessons()
        .iter()
        .filter(|lesson| record.is_lesson_completed(lesson.id()))
        .count();

    let next_lesson_id = course
        .lessons()
        .iter()
        .find(|lesson| !record.is_lesson_completed(lesson.id()))
        .map(|lesson| lesson.id().clone());

    DerivedProgress {
        percent,
        is_completed: percent >= COMPLETION_PERCENT,
        next_lesson_id,
        completed_count,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
