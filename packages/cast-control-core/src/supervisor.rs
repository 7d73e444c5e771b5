//! Connection supervisor: discovery, publication and reconnection.
//!
//! The supervisor keeps at most one device session published at a time. It
//! runs strictly sequentially on one task: a new discovery only starts after
//! the previous bridge, publication and session have been torn down, so two
//! publications can never overlap.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;

use crate::adapter::DeviceAdapter;
use crate::bridge::ListenerBridge;
use crate::bus::BusPublisher;
use crate::device::{DeviceDiscovery, DeviceHandle, DeviceIdentity, DeviceSession};
use crate::error::{CastControlError, CastControlResult, DiscoveryError, ErrorCode};
use crate::protocol_constants::DEFAULT_RETRY_WAIT_SECS;
use crate::status::StatusCache;

/// Supervisor-level connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Lost,
}

/// When to retry discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait between discovery attempts before the first connection. `None`
    /// makes a miss fatal.
    pub initial_wait: Option<Duration>,
    /// Wait after a live session drops.
    pub retry_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_wait: None,
            retry_wait: Duration::from_secs_f64(DEFAULT_RETRY_WAIT_SECS),
        }
    }
}

impl RetryPolicy {
    /// Builds a policy from second values as given on the command line.
    /// Negative or non-finite values are treated as zero.
    pub fn from_secs(wait: Option<f64>, retry_wait: f64) -> Self {
        let secs = |s: f64| Duration::from_secs_f64(if s.is_finite() { s.max(0.0) } else { 0.0 });
        Self {
            initial_wait: wait.map(secs),
            retry_wait: secs(retry_wait),
        }
    }

    /// Wait before the next discovery after a miss, or `None` to give up.
    fn after_miss(&self, connected_once: bool) -> Option<Duration> {
        if connected_once {
            Some(self.initial_wait.unwrap_or(self.retry_wait))
        } else {
            self.initial_wait
        }
    }
}

/// How a served session ended.
enum SessionEnd {
    Lost,
    PublishFailed,
    Shutdown,
}

/// Owns the discover → publish → wait → tear down loop.
pub struct ConnectionSupervisor {
    discovery: Arc<dyn DeviceDiscovery>,
    publisher: Arc<dyn BusPublisher>,
    default_art: Option<String>,
    desktop_entry: Option<String>,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionSupervisor {
    pub fn new(discovery: Arc<dyn DeviceDiscovery>, publisher: Arc<dyn BusPublisher>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            discovery,
            publisher,
            default_art: None,
            desktop_entry: None,
            state,
        }
    }

    /// Fallback artwork URL handed to every status cache.
    pub fn with_default_art(mut self, art_url: Option<String>) -> Self {
        self.default_art = art_url;
        self
    }

    /// Desktop entry advertised by every publication.
    pub fn with_desktop_entry(mut self, entry: Option<String>) -> Self {
        self.desktop_entry = entry;
        self
    }

    /// Subscribes to state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            log::debug!("[Supervisor] {:?} -> {:?}", current, state);
            *current = state;
            true
        });
    }

    /// Runs until `cancel` fires or discovery fails with retrying disabled.
    ///
    /// Mid-session losses are never returned; they are logged and retried
    /// after `policy.retry_wait`.
    pub async fn run(
        &self,
        identity: &DeviceIdentity,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> CastControlResult<()> {
        let mut connected_once = false;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.set_state(ConnectionState::Connecting);
            let found = tokio::select! {
                _ = cancel.cancelled() => break,
                found = self.discover(identity) => found,
            };

            let session = match found {
                Ok(Some(session)) => session,
                Ok(None) | Err(_) => {
                    self.set_state(ConnectionState::Disconnected);
                    let Some(wait) = policy.after_miss(connected_once) else {
                        log::error!("[Supervisor] {} not found, giving up", identity);
                        return Err(CastControlError::DeviceNotFound(identity.to_string()));
                    };
                    log::info!(
                        "[Supervisor] {} not found, retrying in {:.1}s",
                        identity,
                        wait.as_secs_f64()
                    );
                    if !sleep_or_cancel(wait, &cancel).await {
                        break;
                    }
                    continue;
                }
            };

            match self.serve(session, &cancel).await {
                SessionEnd::Shutdown => break,
                SessionEnd::Lost => {
                    connected_once = true;
                    self.set_state(ConnectionState::Lost);
                }
                SessionEnd::PublishFailed => {
                    self.set_state(ConnectionState::Disconnected);
                }
            }

            log::info!(
                "[Supervisor] reconnecting to {} in {:.1}s",
                identity,
                policy.retry_wait.as_secs_f64()
            );
            if !sleep_or_cancel(policy.retry_wait, &cancel).await {
                break;
            }
        }

        self.set_state(ConnectionState::Disconnected);
        log::info!("[Supervisor] stopped");
        Ok(())
    }

    /// Tries each lookup of `identity` in order. Errors from one lookup do
    /// not prevent the next; the last error is returned only if nothing was
    /// found.
    async fn discover(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<Option<Arc<dyn DeviceSession>>, DiscoveryError> {
        let mut last_error = None;

        for query in identity.queries() {
            log::debug!("[Supervisor] looking up {}", query);
            match self.discovery.find_device(&query).await {
                Ok(Some(session)) => {
                    log::info!("[Supervisor] found {} via {}", session.name(), query);
                    return Ok(Some(session));
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("[Supervisor] lookup {} failed: {} ({})", query, e, e.code());
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Publishes one session and waits for it to end. Always leaves the
    /// session released and unpublished.
    async fn serve(&self, session: Arc<dyn DeviceSession>, cancel: &CancellationToken) -> SessionEnd {
        let handle = DeviceHandle::new(session);
        let cache = Arc::new(StatusCache::new(self.default_art.clone()));
        cache.seed(handle.cast_status(), handle.media_status(), Instant::now());

        let adapter = Arc::new(
            DeviceAdapter::new(handle.clone(), Arc::clone(&cache))
                .with_desktop_entry(self.desktop_entry.clone()),
        );

        let publication = match self.publisher.publish(handle.name(), adapter).await {
            Ok(publication) => publication,
            Err(e) => {
                log::warn!(
                    "[Supervisor] could not publish {}: {} ({})",
                    handle.name(),
                    e,
                    e.code()
                );
                handle.disconnect();
                return SessionEnd::PublishFailed;
            }
        };

        let lost = Arc::new(Notify::new());
        let bridge = ListenerBridge::new(
            handle.clone(),
            cache,
            publication.emitter(),
            Arc::clone(&lost),
        );
        bridge.activate();
        self.set_state(ConnectionState::Connected);
        log::info!("[Supervisor] connected to {}", handle.name());

        let end = if handle.connection_status().is_disconnected() {
            SessionEnd::Lost
        } else {
            tokio::select! {
                _ = lost.notified() => SessionEnd::Lost,
                _ = cancel.cancelled() => SessionEnd::Shutdown,
            }
        };

        if matches!(end, SessionEnd::Lost) {
            log::warn!(
                "[Supervisor] lost connection to {}: {}",
                handle.name(),
                handle.connection_status()
            );
        }

        bridge.teardown();
        publication.unpublish().await;
        handle.disconnect();
        end
    }
}

/// Sleeps for `wait`; returns `false` if cancelled first.
async fn sleep_or_cancel(wait: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(wait) => true,
        _ = cancel.cancelled() => false,
    }
}
