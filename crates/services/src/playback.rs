use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use edutube_core::model::LessonId;

use crate::error::TrackerError;
use crate::tracker::ProgressTracker;

/// How often the playhead is sampled while playback is running.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Capability set an embedded video player must expose.
///
/// Kept deliberately narrow so alternative playback backends (and test
/// fakes) can be substituted.
pub trait PlaybackSource: Send + Sync {
    /// Current playhead position in seconds.
    fn current_time_secs(&self) -> f64;

    /// Total media duration in seconds.
    fn duration_secs(&self) -> f64;
}

/// Discrete playback transitions reported by the player surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Ended,
}

/// Watch percentage for the source's current playhead: floor of the played
/// fraction, clamped to 0-100. A source with no duration reads as 0.
fn observed_percent(source: &dyn PlaybackSource) -> u8 {
    let duration = source.duration_secs();
    if duration <= 0.0 {
        return 0;
    }
    let ratio = (source.current_time_secs() / duration).clamp(0.0, 1.0);
    (ratio * 100.0).floor() as u8
}

/// Owned handle for the background sampling task.
///
/// The task never ends on its own; whoever holds the handle stops it, and
/// dropping the handle stops it too so a discarded session cannot leak ticks.
struct Sampler {
    handle: JoinHandle<()>,
}

impl Sampler {
    fn spawn(
        tracker: ProgressTracker,
        lesson_id: LessonId,
        source: Arc<dyn PlaybackSource>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SAMPLE_INTERVAL);
            loop {
                ticker.tick().await;
                let percent = observed_percent(source.as_ref());
                if let Err(err) = tracker.update_watch_progress(&lesson_id, percent).await {
                    warn!(lesson_id = %lesson_id, error = %err, "dropping watch sample");
                }
            }
        });
        Self { handle }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct LessonSession {
    lesson_id: LessonId,
    source: Arc<dyn PlaybackSource>,
    sampler: Option<Sampler>,
}

/// Bridges a playback surface to the progress tracker.
///
/// While the source reports "playing", a 1-second sampling task forwards the
/// playhead percentage to `ProgressTracker::update_watch_progress`; the
/// "ended" transition marks the lesson complete. At most one sampling task
/// exists per observer, and it is torn down on pause, detach, source change,
/// and drop.
pub struct PlaybackObserver {
    tracker: ProgressTracker,
    session: Option<LessonSession>,
}

impl PlaybackObserver {
    #[must_use]
    pub fn new(tracker: ProgressTracker) -> Self {
        Self {
            tracker,
            session: None,
        }
    }

    /// Point the observer at a lesson's playback source.
    ///
    /// Any previous session is discarded and its sampling task stopped;
    /// sampling for the new source starts on the next `Playing` transition.
    pub fn attach(&mut self, lesson_id: LessonId, source: Arc<dyn PlaybackSource>) {
        self.detach();
        self.session = Some(LessonSession {
            lesson_id,
            source,
            sampler: None,
        });
    }

    /// Drop the current session, stopping its sampling task.
    pub fn detach(&mut self) {
        self.session = None;
    }

    /// True while a sampling task is running.
    #[must_use]
    pub fn is_sampling(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.sampler.is_some())
    }

    /// React to a discrete playback transition.
    ///
    /// Without an attached session this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` if the `Ended` transition fails to persist the
    /// completed lesson.
    pub async fn handle_state(&mut self, state: PlaybackState) -> Result<(), TrackerError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        match state {
            PlaybackState::Playing => {
                if session.sampler.is_none() {
                    session.sampler = Some(Sampler::spawn(
                        self.tracker.clone(),
                        session.lesson_id.clone(),
                        Arc::clone(&session.source),
                    ));
                }
            }
            PlaybackState::Paused => {
                session.sampler = None;
            }
            PlaybackState::Ended => {
                session.sampler = None;
                let lesson_id = session.lesson_id.clone();
                let record = self.tracker.record().await;
                if !record.is_lesson_completed(&lesson_id) {
                    self.tracker.mark_lesson_complete(&lesson_id).await?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        current: f64,
        duration: f64,
    }

    impl PlaybackSource for FixedSource {
        fn current_time_secs(&self) -> f64 {
            self.current
        }

        fn duration_secs(&self) -> f64 {
            self.duration
        }
    }

    fn percent(current: f64, duration: f64) -> u8 {
        observed_percent(&FixedSource { current, duration })
    }

    #[test]
    fn observed_percent_floors() {
        assert_eq!(percent(0.0, 100.0), 0);
        assert_eq!(percent(49.9, 100.0), 49);
        assert_eq!(percent(99.9, 100.0), 99);
        assert_eq!(percent(100.0, 100.0), 100);
    }

    #[test]
    fn observed_percent_clamps_overrun() {
        assert_eq!(percent(120.0, 100.0), 100);
        assert_eq!(percent(-5.0, 100.0), 0);
    }

    #[test]
    fn observed_percent_handles_missing_duration() {
        assert_eq!(percent(30.0, 0.0), 0);
        assert_eq!(percent(30.0, -1.0), 0);
    }
}
