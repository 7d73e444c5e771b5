//! mDNS discovery of cast devices.
//!
//! Browses `_googlecast._tcp.local.` and matches resolved services against a
//! [`DeviceQuery`]. Cast devices publish their friendly name in the `fn` TXT
//! record and their UUID (undashed hex) in `id`.
//!
//! Host queries skip mDNS entirely and connect to port 8009 directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mdns_sd::{ResolvedService, ScopedIp, ServiceDaemon, ServiceEvent};
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::protocol_constants::{CAST_SERVICE_TYPE, DEFAULT_CAST_PORT, DISCOVERY_BROWSE_TIMEOUT_MS};

use super::cast_session::CastSession;
use super::traits::{DeviceDiscovery, DeviceSession};
use super::types::{CastTarget, DeviceQuery};

/// Configuration for mDNS discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// How long one browse waits for a matching device.
    pub browse_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            browse_timeout: Duration::from_millis(DISCOVERY_BROWSE_TIMEOUT_MS),
        }
    }
}

/// Locates cast devices with mDNS and opens [`CastSession`]s to them.
pub struct CastDiscovery {
    daemon: Arc<ServiceDaemon>,
    config: DiscoveryConfig,
}

impl CastDiscovery {
    /// Starts the mDNS daemon. The daemon runs its own thread and is reused
    /// by every lookup.
    pub fn new(config: DiscoveryConfig) -> DiscoveryResult<Self> {
        let daemon = ServiceDaemon::new().map_err(|e| DiscoveryError::MdnsDaemon(e.to_string()))?;
        Ok(Self {
            daemon: Arc::new(daemon),
            config,
        })
    }

    /// Browses until a service matching `query` resolves or the browse
    /// timeout passes.
    async fn browse(&self, query: &DeviceQuery) -> DiscoveryResult<Option<CastTarget>> {
        log::debug!(
            "[Discovery] browsing for {} ({}ms)",
            query,
            self.config.browse_timeout.as_millis()
        );

        let receiver = self
            .daemon
            .browse(CAST_SERVICE_TYPE)
            .map_err(|e| DiscoveryError::MdnsDaemon(e.to_string()))?;

        let mut found = None;
        let start = std::time::Instant::now();
        while start.elapsed() < self.config.browse_timeout {
            let remaining = self.config.browse_timeout.saturating_sub(start.elapsed());

            match timeout(remaining, async { receiver.recv_async().await }).await {
                Ok(Ok(ServiceEvent::ServiceResolved(info))) => {
                    log::trace!("[Discovery] resolved {}", info.fullname);
                    let Some(target) = target_from_service(&info) else {
                        continue;
                    };
                    if matches_query(query, &target) {
                        found = Some(target);
                        break;
                    }
                    log::trace!("[Discovery] skipping {} for {}", target.name, query);
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    log::debug!("[Discovery] receiver channel closed: {:?}", e);
                    break;
                }
                Err(_) => break,
            }
        }

        if let Err(e) = self.daemon.stop_browse(CAST_SERVICE_TYPE) {
            log::warn!("[Discovery] failed to stop browse: {:?}", e);
        }

        Ok(found)
    }
}

#[async_trait]
impl DeviceDiscovery for CastDiscovery {
    async fn find_device(
        &self,
        query: &DeviceQuery,
    ) -> DiscoveryResult<Option<Arc<dyn DeviceSession>>> {
        let target = match query {
            DeviceQuery::Host { host, name } => Some(CastTarget::from_host(
                host.clone(),
                name.clone().unwrap_or_else(|| host.clone()),
            )),
            _ => self.browse(query).await?,
        };

        let Some(target) = target else {
            log::debug!("[Discovery] no device for {}", query);
            return Ok(None);
        };

        log::info!(
            "[Discovery] connecting to {} ({}) at {}:{}",
            target.name,
            target.model.as_deref().unwrap_or("unknown model"),
            target.host,
            target.port
        );
        let label = format!("{} ({})", target.name, target.host);
        let session = CastSession::connect(target)
            .await
            .map_err(|source| DiscoveryError::Connect {
                target: label,
                source,
            })?;

        Ok(Some(Arc::new(session)))
    }
}

impl Drop for CastDiscovery {
    fn drop(&mut self) {
        if let Err(e) = self.daemon.shutdown() {
            log::debug!("[Discovery] mDNS daemon shutdown failed: {:?}", e);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Matching
// ─────────────────────────────────────────────────────────────────────────────

/// Builds a target from a resolved service. Only IPv4 addresses are used.
fn target_from_service(info: &ResolvedService) -> Option<CastTarget> {
    let host = info.addresses.iter().find_map(|addr| match addr {
        ScopedIp::V4(v4) => Some(v4.addr().to_string()),
        ScopedIp::V6(_) | _ => None,
    })?;

    let txt = |key: &str| {
        info.txt_properties
            .get_property_val_str(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let name = txt("fn").unwrap_or_else(|| instance_name(&info.fullname));
    let port = if info.port > 0 {
        info.port
    } else {
        DEFAULT_CAST_PORT
    };

    Some(CastTarget {
        host,
        port,
        name,
        uuid: txt("id"),
        model: txt("md"),
    })
}

/// Instance label of a full service name (`Name._googlecast._tcp.local.`).
fn instance_name(fullname: &str) -> String {
    fullname
        .strip_suffix(CAST_SERVICE_TYPE)
        .map(|n| n.trim_end_matches('.'))
        .unwrap_or(fullname)
        .to_string()
}

fn uuids_equal(a: &str, b: &str) -> bool {
    match (Uuid::parse_str(a.trim()), Uuid::parse_str(b.trim())) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

fn matches_query(query: &DeviceQuery, target: &CastTarget) -> bool {
    match query {
        DeviceQuery::First => true,
        DeviceQuery::Name(name) => target.name.to_lowercase() == name.to_lowercase(),
        DeviceQuery::Uuid(uuid) => target.uuid.as_deref().is_some_and(|id| uuids_equal(id, uuid)),
        DeviceQuery::Host { host, .. } => target.host == *host,
    }
}
