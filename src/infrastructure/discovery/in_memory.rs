//! Process-local discovery
//!
//! Every `InMemoryDiscovery` created from the same `InMemoryLan` sees the
//! others' adverts, which stands in for a LAN segment when mDNS is disabled.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::discovery::{DiscoveredTeam, Discovery, TeamAdvert};
use crate::domain::team::TeamId;
use crate::domain::DomainError;

type Records = HashMap<(u64, TeamId), HashMap<String, String>>;

/// Shared advert table
#[derive(Debug, Clone, Default)]
pub struct InMemoryLan {
    records: Arc<RwLock<Records>>,
    next_instance: Arc<std::sync::atomic::AtomicU64>,
}

impl InMemoryLan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a raw TXT record, as a foreign or broken advertiser would
    pub fn publish_raw(&self, instance: u64, team_id: TeamId, properties: HashMap<String, String>) {
        if let Ok(mut records) = self.records.write() {
            records.insert((instance, team_id), properties);
        }
    }

    fn allocate_instance(&self) -> u64 {
        self.next_instance
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1
    }
}

#[derive(Debug)]
pub struct InMemoryDiscovery {
    lan: InMemoryLan,
    instance: u64,
}

impl InMemoryDiscovery {
    pub fn new(lan: InMemoryLan) -> Self {
        let instance = lan.allocate_instance();
        Self { lan, instance }
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Records>, DomainError> {
        self.lan
            .records
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl Discovery for InMemoryDiscovery {
    async fn advertise(&self, advert: TeamAdvert) -> Result<(), DomainError> {
        let properties = advert.properties().into_iter().collect();
        self.write()?
            .insert((self.instance, advert.team_id.clone()), properties);

        debug!(team_id = %advert.team_id, "Advertised in-process");
        Ok(())
    }

    async fn update_member_count(&self, team_id: &TeamId, member_count: usize) {
        match self.write() {
            Ok(mut records) => {
                if let Some(props) = records.get_mut(&(self.instance, team_id.clone())) {
                    props.insert("member_count".to_string(), member_count.to_string());
                }
            }
            Err(e) => warn!(error = %e, "Failed to update advert"),
        }
    }

    async fn withdraw(&self, team_id: &TeamId) {
        match self.write() {
            Ok(mut records) => {
                records.remove(&(self.instance, team_id.clone()));
            }
            Err(e) => warn!(error = %e, "Failed to withdraw advert"),
        }
    }

    async fn discover(&self, timeout: Duration) -> Vec<DiscoveredTeam> {
        tokio::time::sleep(timeout).await;

        let records: Vec<HashMap<String, String>> = match self.lan.records.read() {
            Ok(records) => {
                let mut entries: Vec<_> = records.iter().collect();
                entries.sort_by_key(|((instance, team_id), _)| (*instance, team_id.clone()));
                entries.into_iter().map(|(_, props)| props.clone()).collect()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read adverts");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        records
            .iter()
            .filter_map(|props| DiscoveredTeam::from_properties(|k| props.get(k).cloned(), None))
            .filter(|team| seen.insert(team.team_id.clone()))
            .collect()
    }

    async fn shutdown(&self) {
        match self.write() {
            Ok(mut records) => records.retain(|(instance, _), _| *instance != self.instance),
            Err(e) => warn!(error = %e, "Failed to withdraw adverts"),
        }
    }
}
