#![forbid(unsafe_code)]

pub mod completion;
pub mod model;
pub mod time;

pub use completion::{DerivedProgress, derive_progress, lesson_credit};
pub use time::Clock;
