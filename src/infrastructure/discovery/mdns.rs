//! mDNS-based LAN discovery using mdns-sd.
//!
//! Each owned team is registered as one service instance of the configured
//! type (default `_lanteam._tcp.local.`) with the advert fields as TXT
//! properties. Browsing collects resolved instances until the deadline.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::domain::discovery::{DiscoveredTeam, Discovery, TeamAdvert};
use crate::domain::team::TeamId;
use crate::domain::DomainError;

struct Registered {
    advert: TeamAdvert,
    fullname: String,
}

struct MdnsInner {
    daemon: ServiceDaemon,
    service_type: String,
    host: String,
    adverts: Mutex<HashMap<TeamId, Registered>>,
    /// The daemon keeps one browse per service type; one discover at a time
    browse: tokio::sync::Mutex<()>,
}

impl MdnsInner {
    fn lock_adverts(&self) -> MutexGuard<'_, HashMap<TeamId, Registered>> {
        self.adverts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn service_info(&self, advert: &TeamAdvert) -> Result<ServiceInfo, DomainError> {
        let port = advert.port().ok_or_else(|| {
            DomainError::validation(format!(
                "Leader endpoint '{}' has no port",
                advert.leader_endpoint
            ))
        })?;

        let ip = advert
            .leader_endpoint
            .rsplit_once(':')
            .and_then(|(host, _)| host.parse::<IpAddr>().ok())
            .filter(|ip| !ip.is_unspecified() && !ip.is_loopback())
            .map(|ip| ip.to_string())
            .unwrap_or_default();

        let instance = format!("{}-{}", advert.team_id, self.host);
        let properties = advert.properties();

        let info = ServiceInfo::new(
            &self.service_type,
            &instance,
            &format!("{}.local.", self.host),
            ip.as_str(),
            port,
            &properties[..],
        )
        .map_err(|e| DomainError::internal(format!("Invalid mDNS service info: {}", e)))?;

        Ok(if ip.is_empty() {
            info.enable_addr_auto()
        } else {
            info
        })
    }

    fn register(&self, advert: &TeamAdvert) -> Result<String, DomainError> {
        let info = self.service_info(advert)?;
        let fullname = info.get_fullname().to_string();

        self.daemon
            .register(info)
            .map_err(|e| DomainError::internal(format!("mDNS register failed: {}", e)))?;

        Ok(fullname)
    }

    /// Re-announce every advert
    fn refresh(&self) {
        let adverts: Vec<TeamAdvert> = self
            .lock_adverts()
            .values()
            .map(|r| r.advert.clone())
            .collect();

        for advert in adverts {
            if let Err(e) = self.register(&advert) {
                warn!(team_id = %advert.team_id, error = %e, "mDNS refresh failed");
            }
        }
    }

    fn unregister(&self, fullname: &str) {
        if let Err(e) = self.daemon.unregister(fullname) {
            warn!(fullname = %fullname, error = %e, "mDNS unregister failed");
        }
    }
}

pub struct MdnsDiscovery {
    inner: Arc<MdnsInner>,
    refresh_interval: Duration,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for MdnsDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdnsDiscovery")
            .field("service_type", &self.inner.service_type)
            .field("host", &self.inner.host)
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

impl MdnsDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Result<Self, DomainError> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| DomainError::internal(format!("Failed to start mDNS daemon: {}", e)))?;

        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .map(|h| sanitize_host(&h))
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "lan-teams-node".to_string());

        info!(service_type = %config.service_type, host = %host, "mDNS discovery started");

        Ok(Self {
            inner: Arc::new(MdnsInner {
                daemon,
                service_type: config.service_type.clone(),
                host,
                adverts: Mutex::new(HashMap::new()),
                browse: tokio::sync::Mutex::new(()),
            }),
            refresh_interval: Duration::from_secs(config.refresh_interval_secs.max(1)),
            refresh_task: Mutex::new(None),
        })
    }

    fn ensure_refresh_task(&self) {
        let mut task = self
            .refresh_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if task.is_some() {
            return;
        }

        let inner = self.inner.clone();
        let period = self.refresh_interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                debug!("Refreshing mDNS adverts");
                inner.refresh();
            }
        }));
    }
}

#[async_trait]
impl Discovery for MdnsDiscovery {
    async fn advertise(&self, advert: TeamAdvert) -> Result<(), DomainError> {
        let fullname = self.inner.register(&advert)?;
        info!(team_id = %advert.team_id, fullname = %fullname, "Advertising team");

        self.inner
            .lock_adverts()
            .insert(advert.team_id.clone(), Registered { advert, fullname });
        self.ensure_refresh_task();

        Ok(())
    }

    async fn update_member_count(&self, team_id: &TeamId, member_count: usize) {
        let advert = {
            let mut adverts = self.inner.lock_adverts();
            match adverts.get_mut(team_id) {
                Some(registered) => {
                    registered.advert.member_count = member_count;
                    registered.advert.clone()
                }
                None => return,
            }
        };

        if let Err(e) = self.inner.register(&advert) {
            warn!(team_id = %team_id, error = %e, "Failed to re-announce team");
        }
    }

    async fn withdraw(&self, team_id: &TeamId) {
        let removed = self.inner.lock_adverts().remove(team_id);

        if let Some(registered) = removed {
            self.inner.unregister(&registered.fullname);
            info!(team_id = %team_id, "Stopped advertising team");
        }
    }

    async fn discover(&self, timeout: Duration) -> Vec<DiscoveredTeam> {
        let service_type = self.inner.service_type.clone();
        let _browsing = self.inner.browse.lock().await;

        let receiver = match self.inner.daemon.browse(&service_type) {
            Ok(receiver) => receiver,
            Err(e) => {
                warn!(error = %e, "mDNS browse failed to start");
                return Vec::new();
            }
        };

        let deadline = Instant::now() + timeout;
        let found = tokio::task::spawn_blocking(move || {
            let mut seen = HashSet::new();
            let mut found = Vec::new();

            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }

                match receiver.recv_timeout(remaining) {
                    Ok(ServiceEvent::ServiceResolved(info)) => match parse_service(&info) {
                        Some(team) if seen.insert(team.team_id.clone()) => found.push(team),
                        Some(_) => {}
                        None => {
                            debug!(fullname = %info.get_fullname(), "Skipping malformed advert")
                        }
                    },
                    Ok(_) => {}
                    Err(_) => {
                        // Browse ended early; wait out the window
                        std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                        break;
                    }
                }
            }

            found
        })
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "mDNS browse task failed");
            Vec::new()
        });

        if let Err(e) = self.inner.daemon.stop_browse(&service_type) {
            debug!(error = %e, "mDNS stop_browse failed");
        }

        info!(count = found.len(), "Discovery finished");
        found
    }

    async fn shutdown(&self) {
        if let Some(task) = self
            .refresh_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            task.abort();
        }

        let registered: Vec<String> = self
            .inner
            .lock_adverts()
            .drain()
            .map(|(_, r)| r.fullname)
            .collect();

        for fullname in registered {
            self.inner.unregister(&fullname);
        }

        if let Err(e) = self.inner.daemon.shutdown() {
            warn!(error = %e, "mDNS daemon shutdown failed");
        }
    }
}

fn parse_service(info: &ServiceInfo) -> Option<DiscoveredTeam> {
    let resolved = info
        .get_addresses()
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| info.get_addresses().iter().next())
        .map(|ip| format!("{}:{}", ip, info.get_port()));

    DiscoveredTeam::from_properties(
        |key| info.get_property_val_str(key).map(str::to_string),
        resolved,
    )
}

/// mDNS labels: keep letters, digits and hyphens
fn sanitize_host(host: &str) -> String {
    let host = host.split('.').next().unwrap_or_default();
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}
