// ── Connection manager ──
//
// Owns at most one live provider process-wide. Concurrent callers of
// `provider()` during construction share a single in-flight connect
// (one attempt per configuration epoch); a config change tears the old
// provider down before a new one is built. The singleton slot and the
// in-flight handle are the only mutable shared state in the engine,
// both behind one mutex.

use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use flowdeck_api::{BullMqProvider, ProviderKind, QueueProvider, redacted_url};

use crate::config::ConnectionConfig;
use crate::error::CoreError;

/// Connection state observable by consumers.
///
/// Transitions published through the manager's watch channel are the
/// only way external code learns connection health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

/// The provider handle shared across the process.
pub type SharedProvider = Arc<dyn QueueProvider>;

/// Builds a provider instance for a configuration. The kind dispatch
/// happens here, at construction time -- never by inspecting a live
/// object. Swappable so tests can inject a scripted backend.
pub type ProviderFactory =
    Arc<dyn Fn(&ConnectionConfig) -> SharedProvider + Send + Sync + 'static>;

fn default_factory(config: &ConnectionConfig) -> SharedProvider {
    match config.kind {
        ProviderKind::BullMq => {
            Arc::new(BullMqProvider::new(config.url.clone(), config.timeout))
        }
    }
}

type ConnectAttempt = Shared<BoxFuture<'static, Result<SharedProvider, ConnectFailure>>>;

/// Outcome of one failed shared connect attempt.
///
/// Cloneable so every waiter in the dedup window observes the identical
/// failure; converted into [`CoreError`] at the call boundary.
#[derive(Debug, Clone)]
struct ConnectFailure {
    url: String,
    kind: FailureKind,
}

#[derive(Debug, Clone)]
enum FailureKind {
    Refused { reason: String },
    Timeout { timeout_secs: u64 },
    Superseded,
}

impl From<ConnectFailure> for CoreError {
    fn from(failure: ConnectFailure) -> Self {
        match failure.kind {
            FailureKind::Refused { reason } => CoreError::ConnectionFailed {
                url: failure.url,
                reason,
            },
            FailureKind::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            FailureKind::Superseded => CoreError::ConfigChanged,
        }
    }
}

// ── Manager ──────────────────────────────────────────────────────────

struct Live {
    provider: SharedProvider,
    config: ConnectionConfig,
}

struct Inflight {
    config: ConnectionConfig,
    attempt: ConnectAttempt,
}

struct Slot {
    /// Bumped on every config change and shutdown. An attempt may only
    /// install its provider while the epoch it was started under is
    /// still current.
    epoch: u64,
    live: Option<Live>,
    inflight: Option<Inflight>,
}

struct ManagerInner {
    slot: Mutex<Slot>,
    state: watch::Sender<ConnectionState>,
    factory: ProviderFactory,
}

/// Lifecycle owner for the process's single queue-backend connection.
///
/// Cheaply cloneable via `Arc<ManagerInner>`; construct one at startup
/// and hand clones to every consumer.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::with_factory(Arc::new(default_factory))
    }

    /// Construct with a custom provider factory.
    pub fn with_factory(factory: ProviderFactory) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ManagerInner {
                slot: Mutex::new(Slot {
                    epoch: 0,
                    live: None,
                    inflight: None,
                }),
                state,
                factory,
            }),
        }
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// The live provider, if one is connected. Never triggers a connect.
    pub async fn current(&self) -> Option<SharedProvider> {
        self.inner
            .slot
            .lock()
            .await
            .live
            .as_ref()
            .map(|live| Arc::clone(&live.provider))
    }

    /// Return the singleton provider for `config`, connecting if needed.
    ///
    /// Unchanged config with a live provider: fast no-op return of the
    /// same handle. Changed config: the old provider is torn down first
    /// (disconnect errors logged and ignored), then a fresh one is
    /// built. Concurrent callers never start a second connect -- they
    /// all await the one in-flight attempt and observe its outcome.
    pub async fn provider(&self, config: &ConnectionConfig) -> Result<SharedProvider, CoreError> {
        let attempt = {
            let mut slot = self.inner.slot.lock().await;

            if let Some(live) = &slot.live {
                if live.config == *config {
                    return Ok(Arc::clone(&live.provider));
                }
            }

            // Only a differing config reaches this point.
            if let Some(old) = slot.live.take() {
                slot.epoch += 1;
                slot.inflight = None;
                info!(
                    url = %redacted_url(&old.config.url),
                    "configuration changed; tearing down live provider"
                );
                if let Err(e) = old.provider.disconnect().await {
                    warn!(error = %e, "disconnect during teardown failed");
                }
                let _ = self.inner.state.send(ConnectionState::Disconnected);
            }

            // An in-flight attempt for a stale target is abandoned: the
            // epoch bump makes its install check refuse, so its waiters
            // resolve to ConfigChanged.
            if slot
                .inflight
                .as_ref()
                .is_some_and(|inflight| inflight.config != *config)
            {
                slot.epoch += 1;
                slot.inflight = None;
            }

            match &slot.inflight {
                Some(inflight) => inflight.attempt.clone(),
                None => {
                    let attempt = self.start_attempt(config.clone(), slot.epoch);
                    slot.inflight = Some(Inflight {
                        config: config.clone(),
                        attempt: attempt.clone(),
                    });
                    let _ = self.inner.state.send(ConnectionState::Connecting);
                    attempt
                }
            }
        };

        attempt.await.map_err(CoreError::from)
    }

    /// Disconnect and clear the singleton. Safe no-op when nothing is
    /// connected or in flight.
    pub async fn shutdown(&self) {
        let mut slot = self.inner.slot.lock().await;
        let had_activity = slot.live.is_some() || slot.inflight.is_some();
        slot.epoch += 1;
        slot.inflight = None;
        if let Some(old) = slot.live.take() {
            if let Err(e) = old.provider.disconnect().await {
                warn!(error = %e, "disconnect during shutdown failed");
            }
        }
        if had_activity {
            let _ = self.inner.state.send(ConnectionState::Disconnected);
            debug!("connection manager shut down");
        }
    }

    /// Create the shared connect future for one attempt under `epoch`.
    ///
    /// The future holds only a weak reference back to the manager: the
    /// slot stores the future, so a strong reference would cycle.
    fn start_attempt(&self, config: ConnectionConfig, epoch: u64) -> ConnectAttempt {
        let inner = Arc::downgrade(&self.inner);
        async move {
            let url = redacted_url(&config.url);

            let provider = match inner.upgrade() {
                Some(strong) => (strong.factory)(&config),
                None => {
                    return Err(ConnectFailure {
                        url,
                        kind: FailureKind::Superseded,
                    });
                }
            };

            if let Err(e) = provider.connect().await {
                let kind = if e.is_timeout() {
                    FailureKind::Timeout {
                        timeout_secs: config.timeout.as_secs(),
                    }
                } else {
                    FailureKind::Refused {
                        reason: e.to_string(),
                    }
                };
                // Never cache a failure: clearing the handle makes the
                // next call retry from scratch.
                if let Some(strong) = inner.upgrade() {
                    let mut slot = strong.slot.lock().await;
                    if slot.epoch == epoch {
                        slot.inflight = None;
                        let _ = strong.state.send(ConnectionState::Error(e.to_string()));
                    }
                }
                warn!(url = %url, error = %e, "connect attempt failed");
                return Err(ConnectFailure { url, kind });
            }

            let Some(strong) = inner.upgrade() else {
                let _ = provider.disconnect().await;
                return Err(ConnectFailure {
                    url,
                    kind: FailureKind::Superseded,
                });
            };

            let mut slot = strong.slot.lock().await;
            if slot.epoch != epoch {
                // A newer configuration superseded this attempt while it
                // was connecting; the fresh provider must not leak.
                drop(slot);
                if let Err(e) = provider.disconnect().await {
                    warn!(error = %e, "disconnect of superseded provider failed");
                }
                debug!(url = %url, "connect attempt superseded");
                return Err(ConnectFailure {
                    url,
                    kind: FailureKind::Superseded,
                });
            }

            slot.live = Some(Live {
                provider: Arc::clone(&provider),
                config,
            });
            slot.inflight = None;
            let _ = strong.state.send(ConnectionState::Connected);
            info!(url = %url, "queue backend connected");
            Ok(provider)
        }
        .boxed()
        .shared()
    }
}
