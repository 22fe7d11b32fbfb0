//! Integration tests for resource loading and channel failure handling

use bedtime_audio::{AudioChannel, ChannelKind, ResourceLoader, SimulatedBackend};
use bedtime_core::{AmbientSound, ErrorKind, RecordingErrorSink, SinkLevel, SoundName};
use bedtime_resilience::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

fn setup(
    backend: SimulatedBackend,
) -> (
    Arc<SimulatedBackend>,
    Arc<ResourceLoader>,
    Arc<RecordingErrorSink>,
) {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = Arc::new(backend);
    let sink = Arc::new(RecordingErrorSink::new());
    let loader = Arc::new(ResourceLoader::new(
        backend.clone(),
        RetryPolicy::default(),
        sink.clone(),
    ));
    (backend, loader, sink)
}

#[tokio::test(start_paused = true)]
async fn test_failed_ambient_sound_is_swallowed() {
    let (backend, loader, sink) = setup(SimulatedBackend::new());
    let rain = SoundName::from(AmbientSound::Rain);
    backend.fail_always(rain);

    let ambient = AudioChannel::new(ChannelKind::Ambient, loader, backend.clone(), sink.clone());
    let start = tokio::time::Instant::now();
    ambient.play(rain).await;

    assert!(!ambient.is_active(rain));
    assert!(ambient.is_silent());
    // The first attempt plus three retries, one second apart
    assert_eq!(backend.load_attempts(rain), 4);
    assert_eq!(start.elapsed(), Duration::from_secs(3));

    let failures = sink.entries_of_kind(ErrorKind::ResourceLoadFailure);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].level, SinkLevel::Error);
    assert_eq!(failures[0].source, "ResourceLoader");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_loads_share_one_operation() {
    let (backend, loader, _sink) =
        setup(SimulatedBackend::new().with_load_latency(Duration::from_millis(500)));
    let crickets = SoundName::from(AmbientSound::Crickets);

    let (a, b, c) = tokio::join!(
        loader.load(crickets),
        loader.load(crickets),
        loader.load(crickets)
    );

    assert!(a.is_some());
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(backend.load_attempts(crickets), 1);
    assert_eq!(loader.loads_started(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_coalesced_callers_share_the_failure() {
    let (backend, loader, sink) = setup(SimulatedBackend::new());
    let owl = SoundName::from(AmbientSound::Owl);
    backend.fail_always(owl);

    let (a, b) = tokio::join!(loader.load(owl), loader.load(owl));

    assert!(a.is_none());
    assert!(b.is_none());
    assert_eq!(backend.load_attempts(owl), 4);
    assert_eq!(sink.error_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_load_can_be_retried_later() {
    let (backend, loader, _sink) = setup(SimulatedBackend::new());
    let wind = SoundName::from(AmbientSound::Wind);
    backend.fail_always(wind);

    assert!(loader.load(wind).await.is_none());
    assert!(!loader.is_cached(wind));

    backend.clear_failures();
    assert!(loader.load(wind).await.is_some());
    assert_eq!(loader.cached_names(), vec![wind]);
}

#[tokio::test(start_paused = true)]
async fn test_unload_all_releases_backend_resources() {
    let (backend, loader, _sink) = setup(SimulatedBackend::new());
    for sound in [AmbientSound::Rain, AmbientSound::Waves, AmbientSound::Birds] {
        loader.load(sound.into()).await;
    }
    assert_eq!(backend.loaded_count(), 3);

    assert_eq!(loader.unload_all().await, 3);
    assert_eq!(backend.loaded_count(), 0);
    assert!(loader.cached_names().is_empty());
}
