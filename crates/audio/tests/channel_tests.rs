//! Integration tests for channel playback

use bedtime_audio::{AudioChannel, BackendEvent, ChannelKind, ResourceLoader, SimulatedBackend};
use bedtime_core::{AmbientSound, ErrorKind, RecordingErrorSink, SoundName};
use bedtime_resilience::RetryPolicy;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    backend: Arc<SimulatedBackend>,
    sink: Arc<RecordingErrorSink>,
    ambient: Arc<AudioChannel>,
}

fn fixture(backend: SimulatedBackend) -> Fixture {
    let backend = Arc::new(backend);
    let sink = Arc::new(RecordingErrorSink::new());
    let loader = Arc::new(ResourceLoader::new(
        backend.clone(),
        RetryPolicy::default(),
        sink.clone(),
    ));
    let ambient = Arc::new(AudioChannel::new(
        ChannelKind::Ambient,
        loader,
        backend.clone(),
        sink.clone(),
    ));
    Fixture {
        backend,
        sink,
        ambient,
    }
}

fn names(sounds: &[AmbientSound]) -> BTreeSet<SoundName> {
    sounds.iter().copied().map(SoundName::from).collect()
}

#[tokio::test(start_paused = true)]
async fn test_stop_all_empties_active_set_despite_failures() {
    let f = fixture(SimulatedBackend::new());
    for sound in [AmbientSound::Rain, AmbientSound::Wind, AmbientSound::Owl] {
        f.ambient.play(sound.into()).await;
    }
    f.backend.fail_stop(AmbientSound::Wind.into());

    f.ambient.stop_all().await;

    assert!(f.ambient.active_names().is_empty());
    // The healthy voices were still stopped
    assert_eq!(f.backend.playing(), vec![SoundName::from(AmbientSound::Wind)]);
    assert_eq!(
        f.sink.entries_of_kind(ErrorKind::BackendPlaybackFailure).len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_replace_all_swaps_sets() {
    let f = fixture(SimulatedBackend::new());
    f.ambient
        .replace_all(&names(&[AmbientSound::Rain, AmbientSound::Wind]))
        .await;
    assert_eq!(
        f.ambient.active_names(),
        names(&[AmbientSound::Rain, AmbientSound::Wind])
            .into_iter()
            .collect::<Vec<_>>()
    );

    f.ambient
        .replace_all(&names(&[AmbientSound::Crickets, AmbientSound::Owl]))
        .await;
    assert_eq!(
        f.backend.playing(),
        names(&[AmbientSound::Crickets, AmbientSound::Owl])
            .into_iter()
            .collect::<Vec<_>>()
    );
}

#[tokio::test(start_paused = true)]
async fn test_replace_all_restarts_shared_sounds() {
    let f = fixture(SimulatedBackend::new());
    let rain = SoundName::from(AmbientSound::Rain);
    f.ambient.replace_all(&names(&[AmbientSound::Rain])).await;
    f.backend.clear_events();

    f.ambient
        .replace_all(&names(&[AmbientSound::Rain, AmbientSound::Stream]))
        .await;

    let events = f.backend.events();
    let stop_at = events
        .iter()
        .position(|e| matches!(e, BackendEvent::Stop { sound, .. } if *sound == rain))
        .expect("rain should be stopped");
    let play_at = events
        .iter()
        .position(|e| matches!(e, BackendEvent::Play { sound, .. } if *sound == rain))
        .expect("rain should be restarted");
    assert!(stop_at < play_at);
    assert!(f.ambient.is_active(rain));
    assert_eq!(f.backend.play_count(rain), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_load_cancels_play() {
    let f = fixture(SimulatedBackend::new().with_load_latency(Duration::from_secs(1)));
    let waves = SoundName::from(AmbientSound::Waves);

    let channel = f.ambient.clone();
    let play = tokio::spawn(async move { channel.play(waves).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    f.ambient.stop_all().await;
    play.await.unwrap();

    assert!(f.ambient.is_silent());
    assert!(f.backend.playing().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_new_voices_use_channel_volume() {
    let f = fixture(SimulatedBackend::new());
    let fire = SoundName::from(AmbientSound::Fireplace);

    f.ambient.set_volume(0.3).await;
    f.ambient.play(fire).await;

    assert_eq!(f.backend.voice_volume(fire), Some(0.3));
}
