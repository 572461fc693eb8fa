mod course;
mod ids;
mod progress;

pub use course::{Course, CourseError, Lesson};
pub use ids::{CourseId, LessonId};
pub use progress::{
    AUTO_COMPLETE_PERCENT, CourseProgressRecord, ProgressError, WatchUpdate,
};
