//! In-memory implementations of the engine's collaborators for tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{CycleSecrets, SecretSource, VapidKeys};
use crate::errors::{AppError, DeliveryError, Result};
use crate::models::match_state::MatchState;
use crate::models::metadata::MatchMetadata;
use crate::models::notification::NotificationPayload;
use crate::models::observation::MatchObservation;
use crate::models::subscriber::PushEndpoint;
use crate::services::feed_client::LiveFeed;
use crate::services::match_state_store::MatchStateStore;
use crate::services::metadata_lookup::MetadataLookup;
use crate::services::push_service::PushChannel;
use crate::services::subscriber_directory::SubscriberDirectory;

pub fn vapid() -> VapidKeys {
    VapidKeys {
        public_key: "test-public".into(),
        private_key: "test-private".into(),
        subject: "mailto:test@example.com".into(),
    }
}

pub fn endpoint(address: &str) -> PushEndpoint {
    PushEndpoint {
        address: address.to_string(),
        p256dh: "p256dh".into(),
        auth: "auth".into(),
    }
}

pub struct StaticSecrets(pub Option<CycleSecrets>);

impl StaticSecrets {
    pub fn configured() -> Self {
        Self(Some(CycleSecrets {
            feed_api_key: "feed-key".into(),
            vapid: vapid(),
        }))
    }
}

impl SecretSource for StaticSecrets {
    fn resolve(&self) -> Option<CycleSecrets> {
        self.0.clone()
    }
}

/// Returns the configured snapshot; `None` simulates a failed fetch.
#[derive(Default)]
pub struct FakeFeed {
    snapshot: Mutex<Option<Vec<MatchObservation>>>,
    latency: Mutex<Option<Duration>>,
    calls: Mutex<usize>,
}

impl FakeFeed {
    pub fn set(&self, observations: Vec<MatchObservation>) {
        *self.snapshot.lock().unwrap() = Some(observations);
    }

    pub fn fail(&self) {
        *self.snapshot.lock().unwrap() = None;
    }

    /// Every fetch takes at least `latency`.
    pub fn delay(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LiveFeed for FakeFeed {
    async fn fetch_live(&self, _api_key: &str) -> Result<Vec<MatchObservation>> {
        *self.calls.lock().unwrap() += 1;
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.snapshot
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::external_api("feed returned 503"))
    }
}

#[derive(Default)]
pub struct InMemoryStateStore {
    states: Mutex<HashMap<String, MatchState>>,
    saves: Mutex<usize>,
}

impl InMemoryStateStore {
    pub fn insert(&self, state: MatchState) {
        self.states.lock().unwrap().insert(state.match_id.clone(), state);
    }

    pub fn get(&self, match_id: &str) -> Option<MatchState> {
        self.states.lock().unwrap().get(match_id).cloned()
    }

    pub fn save_calls(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl MatchStateStore for InMemoryStateStore {
    async fn load(&self, match_ids: &[String]) -> Result<HashMap<String, MatchState>> {
        let states = self.states.lock().unwrap();
        Ok(match_ids
            .iter()
            .filter_map(|id| states.get(id).map(|s| (id.clone(), s.clone())))
            .collect())
    }

    async fn load_live(&self) -> Result<Vec<MatchState>> {
        Ok(self
            .states
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.status.is_live())
            .cloned()
            .collect())
    }

    async fn save_all(&self, states: &[MatchState]) -> Result<()> {
        *self.saves.lock().unwrap() += 1;
        let mut stored = self.states.lock().unwrap();
        for state in states {
            stored.insert(state.match_id.clone(), state.clone());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMetadata {
    entries: Mutex<HashMap<String, MatchMetadata>>,
    pub fail: Mutex<bool>,
}

impl FakeMetadata {
    pub fn insert(&self, match_id: &str, metadata: MatchMetadata) {
        self.entries.lock().unwrap().insert(match_id.to_string(), metadata);
    }
}

#[async_trait]
impl MetadataLookup for FakeMetadata {
    async fn lookup(&self, match_ids: &[String]) -> Result<HashMap<String, MatchMetadata>> {
        if *self.fail.lock().unwrap() {
            return Err(AppError::internal_server_error("metadata store offline"));
        }
        let entries = self.entries.lock().unwrap();
        Ok(match_ids
            .iter()
            .filter_map(|id| entries.get(id).map(|m| (id.clone(), m.clone())))
            .collect())
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    favorites: Mutex<HashMap<String, Vec<String>>>,
    endpoints: Mutex<HashMap<String, Vec<PushEndpoint>>>,
    inactive: Mutex<HashSet<String>>,
    lookups: Mutex<usize>,
    pub fail: Mutex<bool>,
}

impl FakeDirectory {
    pub fn favorite(&self, user_id: &str, match_id: &str) {
        self.favorites
            .lock()
            .unwrap()
            .entry(match_id.to_string())
            .or_default()
            .push(user_id.to_string());
    }

    pub fn register(&self, user_id: &str, address: &str) {
        self.endpoints
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(endpoint(address));
    }

    pub fn is_inactive(&self, address: &str) -> bool {
        self.inactive.lock().unwrap().contains(address)
    }

    /// Number of bulk lookup calls made against the directory.
    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl SubscriberDirectory for FakeDirectory {
    async fn subscribers_for(&self, match_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        *self.lookups.lock().unwrap() += 1;
        if *self.fail.lock().unwrap() {
            return Err(AppError::internal_server_error("malformed favorites document"));
        }
        let favorites = self.favorites.lock().unwrap();
        Ok(match_ids
            .iter()
            .filter_map(|id| favorites.get(id).map(|users| (id.clone(), users.clone())))
            .collect())
    }

    async fn endpoints_for(&self, user_ids: &[String]) -> Result<HashMap<String, Vec<PushEndpoint>>> {
        *self.lookups.lock().unwrap() += 1;
        let endpoints = self.endpoints.lock().unwrap();
        let inactive = self.inactive.lock().unwrap();
        Ok(user_ids
            .iter()
            .filter_map(|id| {
                endpoints.get(id).map(|eps| {
                    let active = eps
                        .iter()
                        .filter(|e| !inactive.contains(&e.address))
                        .cloned()
                        .collect();
                    (id.clone(), active)
                })
            })
            .collect())
    }

    async fn deactivate_endpoint(&self, address: &str) -> Result<()> {
        self.inactive.lock().unwrap().insert(address.to_string());
        Ok(())
    }
}

/// Records every delivery attempt; selected addresses fail.
#[derive(Default)]
pub struct RecordingChannel {
    deliveries: Mutex<Vec<(String, NotificationPayload)>>,
    failures: Mutex<HashMap<String, DeliveryError>>,
}

impl RecordingChannel {
    pub fn fail_with(&self, address: &str, error: DeliveryError) {
        self.failures.lock().unwrap().insert(address.to_string(), error);
    }

    pub fn total_attempts(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    pub fn attempts_for(&self, address: &str) -> usize {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == address)
            .count()
    }

    pub fn titles_for(&self, address: &str) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, p)| p.title.clone())
            .collect()
    }
}

#[async_trait]
impl PushChannel for RecordingChannel {
    async fn deliver(
        &self,
        endpoint: &PushEndpoint,
        payload: &NotificationPayload,
        _vapid: &VapidKeys,
    ) -> std::result::Result<(), DeliveryError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((endpoint.address.clone(), payload.clone()));

        match self.failures.lock().unwrap().get(&endpoint.address) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
