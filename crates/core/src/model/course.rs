use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::{CourseId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyCourseTitle,

    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,

    #[error("duplicate lesson id in course: {0}")]
    DuplicateLesson(LessonId),
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Smallest unit of course content; one video the learner can play back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    duration_secs: u32,
}

impl Lesson {
    /// Creates a new Lesson.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyLessonTitle` if the title is empty or
    /// whitespace-only.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        duration_secs: u32,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyLessonTitle);
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            duration_secs,
        })
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A container of lessons in presentation order.
///
/// The lesson order is significant: it decides which lesson counts as "next"
/// when deriving progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    lessons: Vec<Lesson>,
}

impl Course {
    /// Creates a new Course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyCourseTitle` if the title is blank, or
    /// `CourseError::DuplicateLesson` if two lessons share an id.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        lessons: Vec<Lesson>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyCourseTitle);
        }

        let mut seen = HashSet::with_capacity(lessons.len());
        for lesson in &lessons {
            if !seen.insert(lesson.id().clone()) {
                return Err(CourseError::DuplicateLesson(lesson.id().clone()));
            }
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            lessons,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Lessons in presentation order.
    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.lessons.len()
    }

    /// Returns true if the given lesson belongs to this course.
    #[must_use]
    pub fn contains_lesson(&self, id: &LessonId) -> bool {
        self.lessons.iter().any(|lesson| lesson.id() == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
