//! Named resource loading with retry, caching and load coalescing

use crate::backend::{AudioBackend, AudioResourceHandle};
use bedtime_core::{ErrorKind, ErrorSink, SoundName};
use bedtime_resilience::{retry, RetryPolicy};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type LoadFuture = Shared<BoxFuture<'static, Option<AudioResourceHandle>>>;

enum Slot {
    Loading(LoadFuture),
    Ready(AudioResourceHandle),
}

type Slots = Arc<Mutex<HashMap<SoundName, Slot>>>;

fn lock(slots: &Mutex<HashMap<SoundName, Slot>>) -> MutexGuard<'_, HashMap<SoundName, Slot>> {
    slots.lock().unwrap_or_else(|e| e.into_inner())
}

/// Loads sounds through an [`AudioBackend`], retrying failed loads
///
/// - Concurrent loads of the same name share one in-flight operation.
/// - Successful handles are cached until explicitly unloaded.
/// - Exhausted retries are reported once to the error sink and yield `None`;
///   the caller plays on without that sound.
pub struct ResourceLoader {
    backend: Arc<dyn AudioBackend>,
    policy: RetryPolicy,
    sink: Arc<dyn ErrorSink>,
    slots: Slots,
    loads_started: Arc<AtomicUsize>,
}

impl ResourceLoader {
    pub fn new(backend: Arc<dyn AudioBackend>, policy: RetryPolicy, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            backend,
            policy,
            sink,
            slots: Arc::new(Mutex::new(HashMap::new())),
            loads_started: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolves `sound` to a handle, loading it if necessary
    pub async fn load(&self, sound: SoundName) -> Option<AudioResourceHandle> {
        let pending = {
            let mut slots = lock(&self.slots);
            match slots.get(&sound) {
                Some(Slot::Ready(handle)) => return Some(handle.clone()),
                Some(Slot::Loading(future)) => future.clone(),
                None => {
                    let future = self.start_load(sound);
                    slots.insert(sound, Slot::Loading(future.clone()));
                    future
                }
            }
        };
        pending.await
    }

    fn start_load(&self, sound: SoundName) -> LoadFuture {
        let backend = Arc::clone(&self.backend);
        let policy = self.policy.clone();
        let sink = Arc::clone(&self.sink);
        let slots = Arc::clone(&self.slots);
        self.loads_started.fetch_add(1, Ordering::Relaxed);

        async move {
            log::debug!("Loading sound '{}'", sound);
            let result = retry(&policy, |_| {
                let backend = Arc::clone(&backend);
                async move { backend.load(sound).await }
            })
            .await;

            match result {
                Ok(handle) => {
                    lock(&slots).insert(sound, Slot::Ready(handle.clone()));
                    log::debug!("Sound '{}' loaded as resource {}", sound, handle.id());
                    Some(handle)
                }
                Err(e) => {
                    lock(&slots).remove(&sound);
                    log::warn!("Sound '{}' unavailable: {}", sound, e);
                    sink.log_error(
                        &e,
                        "ResourceLoader",
                        Some(&json!({
                            "kind": ErrorKind::ResourceLoadFailure.as_str(),
                            "sound": sound.as_str(),
                            "attempts": e.attempts(),
                        })),
                    );
                    None
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Cached handle for `sound`, without loading
    pub fn cached(&self, sound: SoundName) -> Option<AudioResourceHandle> {
        match lock(&self.slots).get(&sound) {
            Some(Slot::Ready(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn is_cached(&self, sound: SoundName) -> bool {
        self.cached(sound).is_some()
    }

    /// Names with a cached handle
    pub fn cached_names(&self) -> Vec<SoundName> {
        let mut names: Vec<SoundName> = lock(&self.slots)
            .iter()
            .filter_map(|(name, slot)| matches!(slot, Slot::Ready(_)).then_some(*name))
            .collect();
        names.sort();
        names
    }

    /// Number of distinct load operations started (coalesced callers count once)
    pub fn loads_started(&self) -> usize {
        self.loads_started.load(Ordering::Relaxed)
    }

    /// Evicts `sound` from the cache and releases it in the backend
    ///
    /// A load still in flight is left alone.
    pub async fn unload(&self, sound: SoundName) -> bool {
        let handle = {
            let mut slots = lock(&self.slots);
            if !matches!(slots.get(&sound), Some(Slot::Ready(_))) {
                return false;
            }
            match slots.remove(&sound) {
                Some(Slot::Ready(handle)) => handle,
                _ => return false,
            }
        };

        if let Err(e) = self.backend.unload(&handle).await {
            self.sink.log_error(
                &e,
                "ResourceLoader",
                Some(&json!({
                    "kind": ErrorKind::BackendPlaybackFailure.as_str(),
                    "sound": sound.as_str(),
                    "operation": "unload",
                })),
            );
        }
        true
    }

    /// Evicts every cached handle
    pub async fn unload_all(&self) -> usize {
        let names = self.cached_names();
        let mut unloaded = 0;
        for name in names {
            if self.unload(name).await {
                unloaded += 1;
            }
        }
        log::debug!("Unloaded {} cached sounds", unloaded);
        unloaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedBackend;
    use bedtime_core::{AmbientSound, RecordingErrorSink};
    use std::time::Duration;

    fn loader_with(backend: Arc<SimulatedBackend>) -> (ResourceLoader, Arc<RecordingErrorSink>) {
        let sink = Arc::new(RecordingErrorSink::new());
        let loader = ResourceLoader::new(
            backend,
            RetryPolicy::fixed(3, Duration::from_secs(1)),
            sink.clone(),
        );
        (loader, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_caches_handle() {
        let backend = Arc::new(SimulatedBackend::new());
        let (loader, _sink) = loader_with(backend.clone());
        let rain = SoundName::from(AmbientSound::Rain);

        let first = loader.load(rain).await;
        let second = loader.load(rain).await;

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(backend.load_attempts(rain), 1);
        assert!(loader.is_cached(rain));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success() {
        let backend = Arc::new(SimulatedBackend::new());
        let wind = SoundName::from(AmbientSound::Wind);
        backend.fail_loads(wind, 2);
        let (loader, sink) = loader_with(backend.clone());

        assert!(loader.load(wind).await.is_some());
        assert_eq!(backend.load_attempts(wind), 3);
        assert_eq!(sink.error_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unload_evicts() {
        let backend = Arc::new(SimulatedBackend::new());
        let (loader, _sink) = loader_with(backend.clone());
        let owl = SoundName::from(AmbientSound::Owl);

        loader.load(owl).await;
        assert!(loader.unload(owl).await);
        assert!(!loader.is_cached(owl));
        assert!(!loader.unload(owl).await);

        loader.load(owl).await;
        assert_eq!(backend.load_attempts(owl), 2);
    }
}
