use std::sync::{Arc, Mutex};
use std::time::Duration;

use edutube_core::model::{Course, CourseId, Lesson, LessonId};
use edutube_core::time::fixed_clock;
use services::{PlaybackObserver, PlaybackSource, PlaybackState, ProgressTracker};
use storage::ProgressStore;

/// Playback fake whose playhead the test moves by hand.
struct ScriptedSource {
    current: Mutex<f64>,
    duration: f64,
}

impl ScriptedSource {
    fn new(duration: f64) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(0.0),
            duration,
        })
    }

    fn seek(&self, secs: f64) {
        *self.current.lock().unwrap() = secs;
    }
}

impl PlaybackSource for ScriptedSource {
    fn current_time_secs(&self) -> f64 {
        *self.current.lock().unwrap()
    }

    fn duration_secs(&self) -> f64 {
        self.duration
    }
}

fn lid(s: &str) -> LessonId {
    LessonId::new(s)
}

fn course(lesson_ids: &[&str]) -> Course {
    let lessons = lesson_ids
        .iter()
        .map(|id| Lesson::new(lid(id), format!("Lesson {id}"), 100).unwrap())
        .collect();
    Course::new(CourseId::new("c1"), "Playback Course", lessons).unwrap()
}

async fn tracker(lesson_ids: &[&str]) -> ProgressTracker {
    ProgressTracker::new(fixed_clock(), course(lesson_ids), ProgressStore::in_memory()).await
}

/// Let the paused clock advance past the next sampling tick.
async fn tick() {
    tokio::time::sleep(Duration::from_millis(1100)).await;
}

#[tokio::test(start_paused = true)]
async fn sampling_records_watch_progress() {
    let tracker = tracker(&["l1"]).await;
    let source = ScriptedSource::new(100.0);
    let mut observer = PlaybackObserver::new(tracker.clone());

    source.seek(35.0);
    observer.attach(lid("l1"), source.clone());
    observer.handle_state(PlaybackState::Playing).await.unwrap();
    tick().await;

    assert!(observer.is_sampling());
    assert_eq!(tracker.record().await.watch_percent(&lid("l1")), Some(35));

    source.seek(55.0);
    tick().await;
    assert_eq!(tracker.record().await.watch_percent(&lid("l1")), Some(55));
}

#[tokio::test(start_paused = true)]
async fn sampling_auto_completes_near_the_end() {
    let tracker = tracker(&["l1", "l2"]).await;
    let source = ScriptedSource::new(100.0);
    let mut observer = PlaybackObserver::new(tracker.clone());
    let rx = tracker.subscribe();

    source.seek(95.0);
    observer.attach(lid("l1"), source.clone());
    observer.handle_state(PlaybackState::Playing).await.unwrap();
    tick().await;

    let record = tracker.record().await;
    assert!(record.is_lesson_completed(&lid("l1")));
    assert_eq!(record.watch_percent(&lid("l1")), Some(95));
    assert_eq!(rx.borrow().completed_count, 1);
    assert_eq!(rx.borrow().next_lesson_id, Some(lid("l2")));
}

#[tokio::test(start_paused = true)]
async fn ended_marks_lesson_complete_and_stops_sampling() {
    let tracker = tracker(&["l1"]).await;
    let source = ScriptedSource::new(100.0);
    let mut observer = PlaybackObserver::new(tracker.clone());

    observer.attach(lid("l1"), source.clone());
    observer.handle_state(PlaybackState::Playing).await.unwrap();
    tick().await;

    observer.handle_state(PlaybackState::Ended).await.unwrap();

    assert!(!observer.is_sampling());
    let derived = tracker.derived();
    assert_eq!(derived.percent, 100);
    assert!(derived.is_completed);
    assert_eq!(tracker.record().await.watch_percent(&lid("l1")), Some(100));
}

#[tokio::test(start_paused = true)]
async fn ended_after_auto_complete_does_not_force_hundred() {
    let tracker = tracker(&["l1"]).await;
    let source = ScriptedSource::new(100.0);
    let mut observer = PlaybackObserver::new(tracker.clone());

    source.seek(92.0);
    observer.attach(lid("l1"), source.clone());
    observer.handle_state(PlaybackState::Playing).await.unwrap();
    tick().await;
    observer.handle_state(PlaybackState::Ended).await.unwrap();

    // already auto-completed, so the observed percentage is preserved
    let record = tracker.record().await;
    assert!(record.is_lesson_completed(&lid("l1")));
    assert_eq!(record.watch_percent(&lid("l1")), Some(92));
}

#[tokio::test(start_paused = true)]
async fn pause_stops_the_sampler() {
    let tracker = tracker(&["l1"]).await;
    let source = ScriptedSource::new(100.0);
    let mut observer = PlaybackObserver::new(tracker.clone());

    source.seek(20.0);
    observer.attach(lid("l1"), source.clone());
    observer.handle_state(PlaybackState::Playing).await.unwrap();
    tick().await;
    assert_eq!(tracker.record().await.watch_percent(&lid("l1")), Some(20));

    observer.handle_state(PlaybackState::Paused).await.unwrap();
    assert!(!observer.is_sampling());

    // the playhead moves, but no sampler is alive to see it
    source.seek(80.0);
    tick().await;
    tick().await;
    assert_eq!(tracker.record().await.watch_percent(&lid("l1")), Some(20));
}

#[tokio::test(start_paused = true)]
async fn repeated_playing_keeps_a_single_sampler() {
    let tracker = tracker(&["l1"]).await;
    let source = ScriptedSource::new(100.0);
    let mut observer = PlaybackObserver::new(tracker.clone());

    source.seek(10.0);
    observer.attach(lid("l1"), source.clone());
    observer.handle_state(PlaybackState::Playing).await.unwrap();
    observer.handle_state(PlaybackState::Playing).await.unwrap();
    tick().await;

    assert!(observer.is_sampling());
    assert_eq!(tracker.record().await.watch_percent(&lid("l1")), Some(10));
}

#[tokio::test(start_paused = true)]
async fn attach_replaces_the_previous_session() {
    let tracker = tracker(&["l1", "l2"]).await;
    let first = ScriptedSource::new(100.0);
    let second = ScriptedSource::new(100.0);
    let mut observer = PlaybackObserver::new(tracker.clone());

    first.seek(30.0);
    observer.attach(lid("l1"), first.clone());
    observer.handle_state(PlaybackState::Playing).await.unwrap();
    tick().await;

    // switching sources tears the old sampler down
    second.seek(50.0);
    observer.attach(lid("l2"), second.clone());
    assert!(!observer.is_sampling());

    first.seek(90.0);
    observer.handle_state(PlaybackState::Playing).await.unwrap();
    tick().await;

    let record = tracker.record().await;
    assert_eq!(record.watch_percent(&lid("l1")), Some(30));
    assert_eq!(record.watch_percent(&lid("l2")), Some(50));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_observer_stops_sampling() {
    let tracker = tracker(&["l1"]).await;
    let source = ScriptedSource::new(100.0);
    let mut observer = PlaybackObserver::new(tracker.clone());

    source.seek(25.0);
    observer.attach(lid("l1"), source.clone());
    observer.handle_state(PlaybackState::Playing).await.unwrap();
    tick().await;
    assert_eq!(tracker.record().await.watch_percent(&lid("l1")), Some(25));

    drop(observer);

    source.seek(75.0);
    tick().await;
    tick().await;
    assert_eq!(tracker.record().await.watch_percent(&lid("l1")), Some(25));
}
