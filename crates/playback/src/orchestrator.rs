//! Session state machine
//!
//! Every transition and every countdown tick runs under one async mutex and
//! awaits its own audio side effects before releasing it, so two transitions
//! never interleave their channel calls. Readers get snapshots through a
//! watch channel and never wait on a transition.

use crate::error::PlaybackError;
use crate::session::{PlaybackSession, SessionPhase, SessionSettings};
use crate::settings::{InMemorySettingsStore, SettingsStore};
use crate::timer::spawn_ticker;
use bedtime_audio::{clamp_volume, AudioBackend, AudioChannel, ChannelKind, ResourceLoader};
use bedtime_core::{
    format_clock, ErrorDescriptor, ErrorKind, ErrorSink, LogErrorSink, MusicTrack, SoundEffect,
    SoundName, StoryModel, StoryPage,
};
use bedtime_resilience::RetryPolicy;
use serde_json::json;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

const SOURCE: &str = "PlaybackOrchestrator";

/// Countdown period used unless the builder overrides it
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

struct Core {
    session: PlaybackSession,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every cancel; a tick armed under an older epoch is ignored
    timer_epoch: u64,
    /// True while the ticker task itself holds the lock
    in_tick: bool,
}

struct Inner {
    core: Mutex<Core>,
    state_tx: watch::Sender<PlaybackSession>,
    music: AudioChannel,
    ambient: AudioChannel,
    effects: AudioChannel,
    loader: Arc<ResourceLoader>,
    sink: Arc<dyn ErrorSink>,
    settings: Arc<dyn SettingsStore>,
    tick_interval: Duration,
}

/// Drives a story through its pages with music, ambient layers and effects
///
/// Cloning is cheap and every clone controls the same session.
///
/// # Example
///
/// ```rust
/// use bedtime_audio::SimulatedBackend;
/// use bedtime_core::{Mood, Scene, StoryModel, StoryPage};
/// use bedtime_playback::{PlaybackOrchestrator, SessionPhase};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let orchestrator = PlaybackOrchestrator::builder(Arc::new(SimulatedBackend::new())).build();
/// let page = StoryPage::new("Goodnight, moon.", Mood::Calm, Scene::Moon, 60).unwrap();
/// orchestrator.set_story(StoryModel::new("Moon", vec![page]).unwrap()).await;
///
/// orchestrator.start().await;
/// assert_eq!(orchestrator.snapshot().phase, SessionPhase::Playing);
///
/// orchestrator.pause().await;
/// assert_eq!(orchestrator.snapshot().phase, SessionPhase::Paused);
/// # }
/// ```
#[derive(Clone)]
pub struct PlaybackOrchestrator {
    inner: Arc<Inner>,
}

/// Configures a [`PlaybackOrchestrator`]
pub struct PlaybackOrchestratorBuilder {
    backend: Arc<dyn AudioBackend>,
    sink: Arc<dyn ErrorSink>,
    settings: Arc<dyn SettingsStore>,
    retry_policy: RetryPolicy,
    tick_interval: Duration,
}

impl PlaybackOrchestratorBuilder {
    /// Where caught failures are reported; defaults to the `log` facade
    pub fn sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Where session preferences persist; defaults to memory only
    pub fn settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Length of one countdown second; shorter values speed a session up
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(MIN_TICK_INTERVAL);
        self
    }

    pub fn build(self) -> PlaybackOrchestrator {
        let stored = self.settings.load();
        let settings = SessionSettings {
            volume: clamp_volume(stored.volume),
            ..stored
        };

        let loader = Arc::new(ResourceLoader::new(
            Arc::clone(&self.backend),
            self.retry_policy,
            Arc::clone(&self.sink),
        ));
        let channel = |kind| {
            AudioChannel::new(
                kind,
                Arc::clone(&loader),
                Arc::clone(&self.backend),
                Arc::clone(&self.sink),
            )
            .with_volume(settings.volume)
        };
        let music = channel(ChannelKind::Music);
        let ambient = channel(ChannelKind::Ambient);
        let effects = channel(ChannelKind::Effects);

        let session = PlaybackSession::new(settings);
        let (state_tx, _) = watch::channel(session.clone());

        PlaybackOrchestrator {
            inner: Arc::new(Inner {
                core: Mutex::new(Core {
                    session,
                    timer: None,
                    timer_epoch: 0,
                    in_tick: false,
                }),
                state_tx,
                music,
                ambient,
                effects,
                loader,
                sink: self.sink,
                settings: self.settings,
                tick_interval: self.tick_interval,
            }),
        }
    }
}

fn ambient_names(page: &StoryPage) -> BTreeSet<SoundName> {
    page.ambient_sounds()
        .iter()
        .copied()
        .map(SoundName::from)
        .collect()
}

impl PlaybackOrchestrator {
    pub fn builder(backend: Arc<dyn AudioBackend>) -> PlaybackOrchestratorBuilder {
        PlaybackOrchestratorBuilder {
            backend,
            sink: Arc::new(LogErrorSink),
            settings: Arc::new(InMemorySettingsStore::default()),
            retry_policy: RetryPolicy::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Current session state
    pub fn snapshot(&self) -> PlaybackSession {
        self.inner.state_tx.borrow().clone()
    }

    /// Receives a new snapshot after every transition and tick
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSession> {
        self.inner.state_tx.subscribe()
    }

    pub fn music(&self) -> &AudioChannel {
        &self.inner.music
    }

    pub fn ambient(&self) -> &AudioChannel {
        &self.inner.ambient
    }

    pub fn effects(&self) -> &AudioChannel {
        &self.inner.effects
    }

    pub fn loader(&self) -> &Arc<ResourceLoader> {
        &self.inner.loader
    }

    pub fn tick_interval(&self) -> Duration {
        self.inner.tick_interval
    }

    /// Loads a story and rewinds the clocks; playback does not start
    ///
    /// Only valid while idle or after a session ended. Preferences are
    /// re-read from the settings store.
    pub async fn set_story(&self, story: impl Into<Arc<StoryModel>>) {
        let mut core = self.inner.core.lock().await;
        let phase = core.session.phase;
        if !matches!(
            phase,
            SessionPhase::Idle | SessionPhase::Completed | SessionPhase::Failed
        ) {
            self.inner.invalid_transition("set_story", phase);
            return;
        }

        let story: Arc<StoryModel> = story.into();
        let stored = self.inner.settings.load();
        let settings = SessionSettings {
            volume: clamp_volume(stored.volume),
            ..stored
        };
        self.inner.apply_volume(settings.volume).await;

        log::info!(
            "Story '{}' set: {} pages, {}",
            story.title(),
            story.page_count(),
            format_clock(story.total_duration_seconds())
        );
        core.session = PlaybackSession {
            time_remaining_seconds: story.total_duration_seconds(),
            page_time_remaining_seconds: story.page(0).map_or(0, StoryPage::duration_seconds),
            story: Some(story),
            ..PlaybackSession::new(settings)
        };
        self.inner.publish(&core);
    }

    /// Starts or resumes the session
    pub async fn start(&self) {
        let mut core = self.inner.core.lock().await;
        let phase = core.session.phase;
        if !matches!(phase, SessionPhase::Idle | SessionPhase::Paused) {
            self.inner.invalid_transition("start", phase);
            return;
        }

        core.session.phase = SessionPhase::Loading;
        self.inner.publish(&core);

        let Some(story) = core.session.story.clone() else {
            self.inner
                .fail_locked(&mut core, PlaybackError::NoStory, "start")
                .await;
            return;
        };

        let resuming = core.session.has_started;
        if core.session.include_music {
            self.inner.music.play(MusicTrack::Lullaby.into()).await;
        }
        if core.session.include_ambient_sounds {
            if let Some(page) = story.page(core.session.current_page_index) {
                self.inner.ambient.replace_all(&ambient_names(page)).await;
            }
        }
        if !resuming {
            self.inner.effects.play(SoundEffect::BedtimeStart.into()).await;
        }

        core.session.has_started = true;
        core.session.phase = SessionPhase::Playing;
        Inner::arm_timer(&self.inner, &mut core);

        log::info!(
            "{} '{}' at page {} ({} left)",
            if resuming { "Resumed" } else { "Started" },
            story.title(),
            core.session.current_page_index + 1,
            format_clock(core.session.time_remaining_seconds)
        );
        self.inner.publish(&core);
    }

    /// Stops the countdown and all continuous audio
    ///
    /// Outside `Playing` this only silences the channels and logs a warning.
    pub async fn pause(&self) {
        let mut core = self.inner.core.lock().await;
        let phase = core.session.phase;
        if phase == SessionPhase::Playing {
            self.inner.cancel_timer(&mut core);
            self.inner.silence_looped().await;
            core.session.phase = SessionPhase::Paused;
            log::info!(
                "Paused with {} left",
                format_clock(core.session.time_remaining_seconds)
            );
            self.inner.publish(&core);
        } else {
            self.inner.invalid_transition("pause", phase);
            self.inner.silence_looped().await;
        }
    }

    /// Runs one countdown step immediately
    ///
    /// The internal timer calls the same logic; this is for hosts that drive
    /// the clock themselves. Ignored unless playing.
    pub async fn tick(&self) {
        let mut core = self.inner.core.lock().await;
        if core.session.phase != SessionPhase::Playing {
            log::debug!("Tick ignored while {}", core.session.phase);
            return;
        }
        self.inner.tick_locked(&mut core).await;
        self.inner.publish(&core);
    }

    pub async fn next_page(&self) {
        let mut core = self.inner.core.lock().await;
        let phase = core.session.phase;
        if !matches!(phase, SessionPhase::Playing | SessionPhase::Paused) {
            self.inner.invalid_transition("next_page", phase);
            return;
        }
        if core.session.is_last_page() {
            log::debug!("Already on the last page");
            return;
        }

        let next = core.session.current_page_index + 1;
        self.inner.go_to_page_locked(&mut core, next).await;
        self.inner.publish(&core);
    }

    pub async fn previous_page(&self) {
        let mut core = self.inner.core.lock().await;
        let phase = core.session.phase;
        if !matches!(phase, SessionPhase::Playing | SessionPhase::Paused) {
            self.inner.invalid_transition("previous_page", phase);
            return;
        }
        let Some(previous) = core.session.current_page_index.checked_sub(1) else {
            log::debug!("Already on the first page");
            return;
        };

        self.inner.go_to_page_locked(&mut core, previous).await;
        self.inner.publish(&core);
    }

    /// Ends the story early with the closing effect
    pub async fn complete_story(&self) {
        let mut core = self.inner.core.lock().await;
        let phase = core.session.phase;
        if !matches!(phase, SessionPhase::Playing | SessionPhase::Paused) {
            self.inner.invalid_transition("complete_story", phase);
            self.inner.silence_looped().await;
            return;
        }
        self.inner.complete_locked(&mut core).await;
        self.inner.publish(&core);
    }

    /// Silences everything and returns to an idle session without a story
    ///
    /// Valid from any phase. Preferences are kept.
    pub async fn reset(&self) {
        let mut core = self.inner.core.lock().await;
        self.inner.reset_locked(&mut core).await;
        self.inner.publish(&core);
    }

    /// Resets the session and releases every loaded resource
    pub async fn shutdown(&self) {
        self.reset().await;
        let released = self.inner.loader.unload_all().await;
        log::debug!("Released {} sound resources", released);
    }

    pub async fn set_volume(&self, volume: f32) {
        let mut core = self.inner.core.lock().await;
        let volume = clamp_volume(volume);
        core.session.volume = volume;
        self.inner.apply_volume(volume).await;
        self.inner.persist(&core);
        self.inner.publish(&core);
    }

    pub async fn set_include_music(&self, enabled: bool) {
        let mut core = self.inner.core.lock().await;
        core.session.include_music = enabled;
        if core.session.phase == SessionPhase::Playing {
            if enabled {
                self.inner.music.play(MusicTrack::Lullaby.into()).await;
            } else {
                self.inner.music.stop_all().await;
            }
        }
        self.inner.persist(&core);
        self.inner.publish(&core);
    }

    pub async fn set_include_ambient_sounds(&self, enabled: bool) {
        let mut core = self.inner.core.lock().await;
        core.session.include_ambient_sounds = enabled;
        if core.session.phase == SessionPhase::Playing {
            if enabled {
                if let Some(page) = core.session.current_page() {
                    let names = ambient_names(page);
                    self.inner.ambient.replace_all(&names).await;
                }
            } else {
                self.inner.ambient.stop_all().await;
            }
        }
        self.inner.persist(&core);
        self.inner.publish(&core);
    }

    /// Turns automatic page turning on or off
    ///
    /// A page whose clock already ran out turns on the next tick.
    pub async fn set_auto_progress(&self, enabled: bool) {
        let mut core = self.inner.core.lock().await;
        core.session.auto_progress = enabled;
        self.inner.persist(&core);
        self.inner.publish(&core);
    }
}

impl fmt::Debug for PlaybackOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.inner.state_tx.borrow();
        f.debug_struct("PlaybackOrchestrator")
            .field("phase", &session.phase)
            .field("current_page_index", &session.current_page_index)
            .field("time_remaining_seconds", &session.time_remaining_seconds)
            .field("tick_interval", &self.inner.tick_interval)
            .finish()
    }
}

impl Inner {
    fn publish(&self, core: &Core) {
        self.state_tx.send_replace(core.session.clone());
    }

    fn persist(&self, core: &Core) {
        self.settings.save(&core.session.settings());
    }

    fn invalid_transition(&self, operation: &'static str, phase: SessionPhase) {
        let error = PlaybackError::InvalidTransition { operation, phase };
        self.sink.log_warning(
            &error.to_string(),
            SOURCE,
            Some(&json!({
                "kind": ErrorKind::InvalidTransition.as_str(),
                "operation": operation,
                "phase": phase.as_str(),
            })),
        );
    }

    fn arm_timer(inner: &Arc<Inner>, core: &mut Core) {
        inner.cancel_timer(core);
        let epoch = core.timer_epoch;
        let weak: Weak<Inner> = Arc::downgrade(inner);
        core.timer = Some(spawn_ticker(inner.tick_interval, move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => inner.on_tick(epoch).await,
                    None => false,
                }
            }
        }));
    }

    /// Invalidates the running timer
    ///
    /// The ticker task is aborted unless it is the caller; in that case it
    /// sees the new epoch and stops after the current tick.
    fn cancel_timer(&self, core: &mut Core) {
        core.timer_epoch = core.timer_epoch.wrapping_add(1);
        if let Some(handle) = core.timer.take() {
            if !core.in_tick {
                handle.abort();
            }
        }
    }

    async fn on_tick(&self, epoch: u64) -> bool {
        let mut core = self.core.lock().await;
        if core.timer_epoch != epoch || core.session.phase != SessionPhase::Playing {
            return false;
        }

        core.in_tick = true;
        self.tick_locked(&mut core).await;
        core.in_tick = false;
        self.publish(&core);

        core.timer_epoch == epoch && core.session.phase == SessionPhase::Playing
    }

    async fn tick_locked(&self, core: &mut Core) {
        let session = &mut core.session;
        session.time_remaining_seconds = session.time_remaining_seconds.saturating_sub(1);
        session.page_time_remaining_seconds =
            session.page_time_remaining_seconds.saturating_sub(1);

        if session.time_remaining_seconds == 0 {
            self.complete_locked(core).await;
            return;
        }

        if session.page_time_remaining_seconds == 0
            && session.auto_progress
            && !session.is_last_page()
        {
            let next = session.current_page_index + 1;
            self.go_to_page_locked(core, next).await;
        }
    }

    /// Moves the cursor and restarts the page clock
    ///
    /// Ambient layers swap only while playing; a paused session stays silent
    /// and picks up the new page's sounds on resume.
    async fn go_to_page_locked(&self, core: &mut Core, index: usize) {
        let Some(story) = core.session.story.clone() else {
            return;
        };
        let Some(page) = story.page(index) else {
            return;
        };

        core.session.current_page_index = index;
        core.session.page_time_remaining_seconds = page.duration_seconds();
        if core.session.phase == SessionPhase::Playing && core.session.include_ambient_sounds {
            self.ambient.replace_all(&ambient_names(page)).await;
        }

        log::debug!(
            "Page {}/{} ({})",
            index + 1,
            story.page_count(),
            page.scene()
        );
    }

    async fn complete_locked(&self, core: &mut Core) {
        self.cancel_timer(core);
        self.silence_looped().await;
        self.effects.play(SoundEffect::BedtimeEnd.into()).await;
        core.session.phase = SessionPhase::Completed;
        log::info!("Story completed");
    }

    async fn reset_locked(&self, core: &mut Core) {
        self.cancel_timer(core);
        self.silence_all().await;
        core.session = PlaybackSession::new(core.session.settings());
        log::debug!("Session reset");
    }

    /// Records a setup failure and leaves the session in `Failed`
    async fn fail_locked(&self, core: &mut Core, error: PlaybackError, operation: &str) {
        self.cancel_timer(core);
        self.silence_all().await;

        self.sink.log_error(
            &error,
            SOURCE,
            Some(&json!({
                "kind": ErrorKind::SetupFailure.as_str(),
                "operation": operation,
            })),
        );
        core.session.last_error = Some(ErrorDescriptor::new(
            ErrorKind::SetupFailure,
            error.to_string(),
            format!("{}.{}", SOURCE, operation),
        ));
        core.session.phase = SessionPhase::Failed;
        self.publish(core);
    }

    async fn apply_volume(&self, volume: f32) {
        tokio::join!(
            self.music.set_volume(volume),
            self.ambient.set_volume(volume),
            self.effects.set_volume(volume),
        );
    }

    async fn silence_looped(&self) {
        tokio::join!(self.music.stop_all(), self.ambient.stop_all());
    }

    async fn silence_all(&self) {
        tokio::join!(
            self.music.stop_all(),
            self.ambient.stop_all(),
            self.effects.stop_all(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedtime_audio::SimulatedBackend;
    use bedtime_core::{Mood, RecordingErrorSink, Scene};

    fn story(durations: &[u32]) -> StoryModel {
        let pages = durations
            .iter()
            .map(|d| StoryPage::new("Sleep now.", Mood::Calm, Scene::Forest, *d).unwrap())
            .collect();
        StoryModel::new("Test", pages).unwrap()
    }

    fn orchestrator() -> (PlaybackOrchestrator, Arc<RecordingErrorSink>) {
        let sink = Arc::new(RecordingErrorSink::new());
        let orchestrator = PlaybackOrchestrator::builder(Arc::new(SimulatedBackend::new()))
            .sink(sink.clone())
            .build();
        (orchestrator, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_tick_counts_down_both_clocks() {
        let (orchestrator, _) = orchestrator();
        orchestrator.set_story(story(&[3, 3])).await;
        orchestrator.set_auto_progress(false).await;
        orchestrator.start().await;

        orchestrator.tick().await;
        let session = orchestrator.snapshot();
        assert_eq!(session.time_remaining_seconds, 5);
        assert_eq!(session.page_time_remaining_seconds, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_mode_holds_the_page() {
        let (orchestrator, _) = orchestrator();
        orchestrator.set_story(story(&[2, 10])).await;
        orchestrator.set_auto_progress(false).await;
        orchestrator.start().await;

        for _ in 0..4 {
            orchestrator.tick().await;
        }
        let session = orchestrator.snapshot();
        assert_eq!(session.current_page_index, 0);
        assert_eq!(session.page_time_remaining_seconds, 0);

        orchestrator.set_auto_progress(true).await;
        orchestrator.tick().await;
        assert_eq!(orchestrator.snapshot().current_page_index, 1);
        assert_eq!(orchestrator.snapshot().page_time_remaining_seconds, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_ignored_when_not_playing() {
        let (orchestrator, _) = orchestrator();
        orchestrator.set_story(story(&[5])).await;
        orchestrator.tick().await;
        assert_eq!(orchestrator.snapshot().time_remaining_seconds, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_transition_is_reported() {
        let (orchestrator, sink) = orchestrator();
        orchestrator.next_page().await;

        let warnings = sink.entries_of_kind(ErrorKind::InvalidTransition);
        assert_eq!(warnings.len(), 1);
        assert_eq!(orchestrator.snapshot().phase, SessionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_tick_interval_is_raised() {
        let orchestrator = PlaybackOrchestrator::builder(Arc::new(SimulatedBackend::new()))
            .tick_interval(Duration::ZERO)
            .build();
        assert_eq!(orchestrator.tick_interval(), MIN_TICK_INTERVAL);
    }
}
