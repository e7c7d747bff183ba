//! Fetch coordinator: owns the `{data, loading, error}` lifecycle of one
//! consumer's "fetch a collection" operation.
//!
//! # Design
//! Each fetch is tagged with a generation number. `refetch` bumps the
//! generation and resets the state to loading; a fetch that resolves under
//! an older generation is dropped at the state-update boundary, so the most
//! recently triggered fetch always wins. The underlying request is never
//! cancelled, only ignored.
//!
//! The state lives in a `tokio::sync::watch` channel. Both the generation
//! bump and the staleness check run inside the channel's modify closure,
//! which serializes them against each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::FetchError;
use crate::source::DataSource;

/// Observable state exposed to a consumer.
///
/// `data` and `error` are never both set; `loading` is true exactly while
/// the current fetch is outstanding.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<Vec<T>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> FetchState<T> {
    fn loading() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }

    fn settled(outcome: Result<Vec<T>, FetchError>) -> Self {
        match outcome {
            Ok(items) => Self {
                data: Some(items),
                loading: false,
                error: None,
            },
            Err(err) => Self {
                data: None,
                loading: false,
                error: Some(err.user_message().to_string()),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

struct Shared<T> {
    state: watch::Sender<FetchState<T>>,
    generation: AtomicU64,
}

impl<T> Shared<T> {
    /// Start a new generation and reset to loading.
    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = FetchState::loading();
        });
        generation
    }

    /// Apply an outcome unless a later fetch has started since.
    ///
    /// Returns whether the outcome was applied. Logging happens after the
    /// channel lock is released.
    fn settle(&self, generation: u64, endpoint: &str, outcome: Result<Vec<T>, FetchError>) -> bool {
        let failure = outcome.as_ref().err().cloned();
        let mut current = generation;
        let applied = self.state.send_if_modified(|state| {
            current = self.generation.load(Ordering::SeqCst);
            if current != generation {
                return false;
            }
            *state = FetchState::settled(outcome);
            true
        });

        if !applied {
            debug!(endpoint, generation, current, "Discarding stale fetch result");
        } else if let Some(err) = failure {
            error!(endpoint, error = %err, "Error fetching data");
        }
        applied
    }

    /// Invalidate whatever is in flight without notifying observers.
    fn retire(&self) {
        self.state.send_if_modified(|_| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            false
        });
    }
}

/// Keeps one consumer's `FetchState` current for an endpoint.
///
/// Fetches run on the ambient tokio runtime, so `mount`, `refetch` and
/// `set_endpoint` must be called from within one.
pub struct FetchCoordinator<T, S> {
    source: Arc<S>,
    endpoint: String,
    shared: Arc<Shared<T>>,
}

impl<T, S> FetchCoordinator<T, S>
where
    T: Send + Sync + 'static,
    S: DataSource<T> + 'static,
{
    /// Create the coordinator and start its first fetch.
    pub fn mount(source: Arc<S>, endpoint: impl Into<String>) -> Self {
        let (state, _) = watch::channel(FetchState::loading());
        let coordinator = Self {
            source,
            endpoint: endpoint.into(),
            shared: Arc::new(Shared {
                state,
                generation: AtomicU64::new(0),
            }),
        };
        coordinator.refetch();
        coordinator
    }

    /// Restart the fetch cycle, superseding any fetch still in flight.
    pub fn refetch(&self) -> JoinHandle<()> {
        let generation = self.shared.begin();
        debug!(endpoint = %self.endpoint, generation, "Starting fetch");

        let shared = Arc::clone(&self.shared);
        let source = Arc::clone(&self.source);
        let endpoint = self.endpoint.clone();
        tokio::spawn(async move {
            let outcome = match source.load(&endpoint).await {
                Ok(items) if items.is_empty() => Err(FetchError::EmptyResult),
                Ok(items) => Ok(items),
                Err(err) => Err(FetchError::Api(err)),
            };
            shared.settle(generation, &endpoint, outcome);
        })
    }

    /// Point the coordinator at a new endpoint, re-fetching if it changed.
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) -> Option<JoinHandle<()>> {
        let endpoint = endpoint.into();
        if endpoint == self.endpoint {
            return None;
        }
        self.endpoint = endpoint;
        Some(self.refetch())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.shared.state.subscribe()
    }
}

impl<T: Clone, S> FetchCoordinator<T, S> {
    pub fn state(&self) -> FetchState<T> {
        self.shared.state.borrow().clone()
    }
}

impl<T, S> Drop for FetchCoordinator<T, S> {
    fn drop(&mut self) {
        self.shared.retire();
    }
}
