use crate::commands::{generate_story, requested_minutes};
use anyhow::{Context, Result};
use bedtime_audio::{AudioBackend, FileBackend, SimulatedBackend};
use bedtime_config::{Config, ConfigManager};
use bedtime_core::{format_clock, ErrorKind, RecordingErrorSink};
use bedtime_playback::{
    ConfigSettingsStore, InMemorySettingsStore, PlaybackOrchestrator, PlaybackSession,
    SessionPhase, SessionSettings, SettingsStore,
};
use bedtime_resilience::RetryPolicy;
use clap::ArgMatches;
use console::{style, Key, Term};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const VOLUME_STEP: f32 = 0.1;
const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    PlayPause,
    NextPage,
    PreviousPage,
    VolumeUp,
    VolumeDown,
    ToggleMusic,
    ToggleAmbient,
    Quit,
}

fn action_for(key: &Key) -> Option<Action> {
    match key {
        Key::Char(' ') => Some(Action::PlayPause),
        Key::Char('n') | Key::ArrowRight => Some(Action::NextPage),
        Key::Char('p') | Key::ArrowLeft => Some(Action::PreviousPage),
        Key::Char('+') | Key::Char('=') => Some(Action::VolumeUp),
        Key::Char('-') | Key::Char('_') => Some(Action::VolumeDown),
        Key::Char('m') => Some(Action::ToggleMusic),
        Key::Char('a') => Some(Action::ToggleAmbient),
        Key::Char('q') | Key::Char('\u{3}') | Key::Escape => Some(Action::Quit),
        _ => None,
    }
}

/// Run an interactive session until the story ends or the user quits
pub async fn play(manager: &ConfigManager, matches: &ArgMatches) -> Result<()> {
    if let Err(e) = manager.initialize() {
        log::warn!("Could not write a default config: {}", e);
    }
    let config = manager.load_with_env_overrides().unwrap_or_else(|e| {
        log::warn!("Using default config: {}", e);
        Config::default()
    });

    let minutes = requested_minutes(matches, config.session.default_duration_minutes);
    let story = generate_story(minutes, matches.get_one::<u64>("seed").copied())?;

    let policy = retry_policy(&config);

    let sink = Arc::new(RecordingErrorSink::new());
    let mut builder = PlaybackOrchestrator::builder(select_backend(&config, matches))
        .sink(sink.clone())
        .settings(settings_store(manager, requested_settings(&config, matches)))
        .retry_policy(policy);
    if let Some(ms) = matches.get_one::<u64>("tick-ms") {
        builder = builder.tick_interval(Duration::from_millis(*ms));
    }
    let orchestrator = builder.build();

    orchestrator.set_story(story).await;
    orchestrator.start().await;

    let result = run_player_ui(&orchestrator).await;
    orchestrator.shutdown().await;

    let missing = unavailable_sounds(&sink);
    if !missing.is_empty() {
        println!(
            "{} Unavailable sounds: {}",
            style("!").yellow().bold(),
            missing.join(", ")
        );
    }
    result
}

/// Names of sounds that failed to load or play, without repeats
fn unavailable_sounds(sink: &RecordingErrorSink) -> Vec<String> {
    let mut names: Vec<String> = [ErrorKind::ResourceLoadFailure, ErrorKind::BackendPlaybackFailure]
        .into_iter()
        .flat_map(|kind| sink.entries_of_kind(kind))
        .filter_map(|entry| {
            entry
                .metadata
                .as_ref()
                .and_then(|meta| meta.get("sound"))
                .and_then(|sound| sound.as_str())
                .map(str::to_string)
        })
        .collect();
    names.sort();
    names.dedup();
    names
}

/// `[audio]` counts the first load as an attempt, so the default of four is
/// one load plus three retries
fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy::fixed(
        config.audio.load_max_attempts as usize,
        config.audio.retry_delay(),
    )
    .with_multiplier(config.audio.load_backoff_multiplier)
}

fn select_backend(config: &Config, matches: &ArgMatches) -> Arc<dyn AudioBackend> {
    if matches.get_flag("simulate") {
        return Arc::new(SimulatedBackend::new());
    }

    let assets_dir = matches
        .get_one::<PathBuf>("assets")
        .cloned()
        .unwrap_or_else(|| config.app.assets_dir.clone());
    if assets_dir.is_dir() {
        log::info!("Loading sounds from {}", assets_dir.display());
        Arc::new(FileBackend::new(assets_dir, config.audio.asset_extension.clone()))
    } else {
        log::warn!(
            "Sound directory {} not found; using simulated audio",
            assets_dir.display()
        );
        Arc::new(SimulatedBackend::new())
    }
}

/// Config defaults with command-line flags applied on top
fn requested_settings(config: &Config, matches: &ArgMatches) -> SessionSettings {
    SessionSettings {
        include_music: config.session.include_music && !matches.get_flag("no-music"),
        include_ambient_sounds: config.session.include_ambient_sounds
            && !matches.get_flag("no-ambient"),
        volume: matches
            .get_one::<f32>("volume")
            .copied()
            .unwrap_or(config.session.volume),
        auto_progress: config.session.auto_progress && !matches.get_flag("manual"),
    }
}

/// Persist toggles unless this run overrides the saved defaults
fn settings_store(manager: &ConfigManager, requested: SessionSettings) -> Arc<dyn SettingsStore> {
    let store = ConfigSettingsStore::new(manager.clone());
    if store.load() == requested {
        Arc::new(store)
    } else {
        log::info!("Command-line overrides apply to this session only");
        Arc::new(InMemorySettingsStore::new(requested))
    }
}

fn spawn_key_reader(term: Term) -> mpsc::UnboundedReceiver<Key> {
    let (tx, rx) = mpsc::unbounded_channel();
    // A plain thread: the process may exit while it is blocked on input
    std::thread::spawn(move || {
        while let Ok(key) = term.read_key() {
            if tx.send(key).is_err() {
                break;
            }
        }
    });
    rx
}

async fn run_player_ui(orchestrator: &PlaybackOrchestrator) -> Result<()> {
    let term = Term::stdout();
    if term.hide_cursor().is_err() {
        log::debug!("Failed to hide cursor");
    }

    let mut keys = spawn_key_reader(term.clone());
    let mut keys_open = true;
    let mut updates = orchestrator.subscribe();
    let tick = orchestrator.tick_interval();

    let result = loop {
        let session = updates.borrow_and_update().clone();
        if let Err(e) = draw_player_ui(&term, &session, tick) {
            break Err(e);
        }
        if session.phase.is_terminal() {
            break Ok(());
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            key = keys.recv(), if keys_open => match key {
                Some(key) => match action_for(&key) {
                    Some(Action::Quit) => break Ok(()),
                    Some(action) => apply_action(orchestrator, &session, action).await,
                    None => {}
                },
                // No terminal input; let the story run out
                None => keys_open = false,
            },
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };

    let _ = term.show_cursor();
    result
}

async fn apply_action(orchestrator: &PlaybackOrchestrator, session: &PlaybackSession, action: Action) {
    match action {
        Action::PlayPause => {
            if session.phase == SessionPhase::Playing {
                orchestrator.pause().await;
            } else {
                orchestrator.start().await;
            }
        }
        Action::NextPage => orchestrator.next_page().await,
        Action::PreviousPage => orchestrator.previous_page().await,
        Action::VolumeUp => orchestrator.set_volume(session.volume + VOLUME_STEP).await,
        Action::VolumeDown => orchestrator.set_volume(session.volume - VOLUME_STEP).await,
        Action::ToggleMusic => orchestrator.set_include_music(!session.include_music).await,
        Action::ToggleAmbient => {
            orchestrator
                .set_include_ambient_sounds(!session.include_ambient_sounds)
                .await
        }
        Action::Quit => {}
    }
}

fn draw_player_ui(term: &Term, session: &PlaybackSession, tick: Duration) -> Result<()> {
    term.clear_screen().context("Failed to clear screen")?;
    for line in render_session(session, tick) {
        term.write_line(&line).context("Failed to draw player")?;
    }
    Ok(())
}

fn progress_bar(elapsed: u32, total: u32, width: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        (elapsed.min(total) as usize * width) / total as usize
    };
    format!("[{}{}]", "=".repeat(filled), " ".repeat(width - filled))
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// Wall-clock time the story ends if it keeps playing
fn lights_out(remaining: u32, tick: Duration) -> Option<String> {
    let left = chrono::Duration::from_std(tick.saturating_mul(remaining)).ok()?;
    Some((chrono::Local::now() + left).format("%H:%M").to_string())
}

fn render_session(session: &PlaybackSession, tick: Duration) -> Vec<String> {
    let mut lines = Vec::new();
    let Some(story) = &session.story else {
        if let Some(error) = &session.last_error {
            lines.push(format!("  {}", style(error.user_message()).red()));
        }
        return lines;
    };

    lines.push(String::new());
    lines.push(format!("  {}", style(story.title()).bold().cyan()));
    lines.push(String::new());

    let status = match session.phase {
        SessionPhase::Playing => style("Playing").green(),
        SessionPhase::Paused => style("Paused").yellow(),
        SessionPhase::Completed => style("Goodnight").magenta(),
        SessionPhase::Failed => style("Stopped").red(),
        SessionPhase::Idle | SessionPhase::Loading => style("Getting ready").dim(),
    };
    lines.push(format!(
        "  {}   page {}/{}",
        status,
        session.current_page_index + 1,
        story.page_count()
    ));

    let total = story.total_duration_seconds();
    lines.push(format!(
        "  {} {} left",
        progress_bar(session.elapsed_seconds(), total, BAR_WIDTH),
        format_clock(session.time_remaining_seconds)
    ));
    if session.phase == SessionPhase::Playing {
        if let Some(at) = lights_out(session.time_remaining_seconds, tick) {
            lines.push(format!("  Lights out around {}", at));
        }
    }
    lines.push(String::new());

    if let Some(page) = session.current_page() {
        lines.push(format!("  {}", page.text()));
        lines.push(String::new());
    }

    lines.push(format!(
        "  Music: {}  Ambient: {}  Volume: {:.0}%  Pages: {}",
        on_off(session.include_music),
        on_off(session.include_ambient_sounds),
        session.volume * 100.0,
        if session.auto_progress { "auto" } else { "manual" }
    ));
    if let Some(error) = &session.last_error {
        lines.push(format!("  {}", style(error.user_message()).red()));
    }
    lines.push(String::new());
    lines.push(format!(
        "  {}",
        style("space pause/resume  n/p page  +/- volume  m music  a ambient  q quit").dim()
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedtime_core::{Mood, Scene, StoryModel, StoryPage};

    fn session() -> PlaybackSession {
        let pages = vec![
            StoryPage::new("The owls were asleep.", Mood::Calm, Scene::Moon, 60).unwrap(),
            StoryPage::new("So was everyone else.", Mood::Calm, Scene::Moon, 60).unwrap(),
        ];
        PlaybackSession {
            story: Some(Arc::new(StoryModel::new("Owls", pages).unwrap())),
            phase: SessionPhase::Playing,
            time_remaining_seconds: 90,
            page_time_remaining_seconds: 30,
            ..PlaybackSession::default()
        }
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(action_for(&Key::Char(' ')), Some(Action::PlayPause));
        assert_eq!(action_for(&Key::Char('n')), Some(Action::NextPage));
        assert_eq!(action_for(&Key::Char('p')), Some(Action::PreviousPage));
        assert_eq!(action_for(&Key::Char('+')), Some(Action::VolumeUp));
        assert_eq!(action_for(&Key::Char('-')), Some(Action::VolumeDown));
        assert_eq!(action_for(&Key::Char('m')), Some(Action::ToggleMusic));
        assert_eq!(action_for(&Key::Char('a')), Some(Action::ToggleAmbient));
        assert_eq!(action_for(&Key::Char('q')), Some(Action::Quit));
        assert_eq!(action_for(&Key::Char('x')), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_sounds_are_summarised() {
        let backend = Arc::new(SimulatedBackend::new());
        backend.fail_always(bedtime_core::AmbientSound::Owl.into());
        let sink = Arc::new(RecordingErrorSink::new());
        let orchestrator = PlaybackOrchestrator::builder(backend)
            .sink(sink.clone())
            .build();
        orchestrator.set_story(session().story.unwrap()).await;
        orchestrator.start().await;
        orchestrator.next_page().await;
        orchestrator.shutdown().await;

        assert_eq!(unavailable_sounds(&sink), vec!["owl".to_string()]);
    }

    #[test]
    fn test_default_config_retries_three_times() {
        let policy = retry_policy(&Config::default());
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.worst_case_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 100, 10), "[          ]");
        assert_eq!(progress_bar(50, 100, 10), "[=====     ]");
        assert_eq!(progress_bar(150, 100, 10), "[==========]");
        assert_eq!(progress_bar(5, 0, 4), "[    ]");
    }

    #[test]
    fn test_render_shows_page_and_clock() {
        let lines = render_session(&session(), Duration::from_secs(1)).join("\n");
        assert!(lines.contains("Owls"));
        assert!(lines.contains("page 1/2"));
        assert!(lines.contains("1:30 left"));
        assert!(lines.contains("The owls were asleep."));
        assert!(lines.contains("Lights out around"));
    }

    #[test]
    fn test_render_without_story_shows_error() {
        let mut session = PlaybackSession::default();
        session.last_error = Some(bedtime_core::ErrorDescriptor::new(
            bedtime_core::ErrorKind::SetupFailure,
            "no story",
            "test",
        ));
        let lines = render_session(&session, Duration::from_secs(1)).join("\n");
        assert!(lines.contains("could not start"));
    }

    #[test]
    fn test_flags_override_config() {
        let matches = crate::build_cli()
            .try_get_matches_from(["bedtime", "play", "--no-ambient", "--volume", "0.2", "--manual"])
            .unwrap();
        let play = matches.subcommand_matches("play").unwrap();

        let settings = requested_settings(&Config::default(), play);
        assert!(settings.include_music);
        assert!(!settings.include_ambient_sounds);
        assert_eq!(settings.volume, 0.2);
        assert!(!settings.auto_progress);
    }

    #[tokio::test]
    async fn test_play_pause_action_toggles() {
        let orchestrator = PlaybackOrchestrator::builder(Arc::new(SimulatedBackend::new()))
            .tick_interval(Duration::from_secs(3600))
            .build();
        orchestrator
            .set_story(session().story.unwrap())
            .await;
        orchestrator.start().await;

        apply_action(&orchestrator, &orchestrator.snapshot(), Action::PlayPause).await;
        assert_eq!(orchestrator.snapshot().phase, SessionPhase::Paused);
        apply_action(&orchestrator, &orchestrator.snapshot(), Action::PlayPause).await;
        assert_eq!(orchestrator.snapshot().phase, SessionPhase::Playing);

        apply_action(&orchestrator, &orchestrator.snapshot(), Action::ToggleMusic).await;
        assert!(!orchestrator.snapshot().include_music);
        orchestrator.shutdown().await;
    }
}
