//! Fixed-interval polling loop tying feed, detection, persistence and
//! dispatch together. Cycles are strictly sequential.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use mongodb::bson::DateTime as BsonDateTime;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SecretSource;
use crate::errors::{AppError, Result};
use crate::models::event::DetectedEvent;
use crate::models::match_state::MatchState;
use crate::models::observation::MatchObservation;
use crate::models::subscriber::PushEndpoint;
use crate::services::feed_client::LiveFeed;
use crate::services::match_state_store::MatchStateStore;
use crate::services::metadata_lookup::MetadataLookup;
use crate::services::subscriber_directory::SubscriberDirectory;

use super::detector::{detect, detect_disappearance, Detection};
use super::dispatcher::{MatchDispatch, NotificationDispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerPhase {
    Idle,
    Fetching,
    Processing,
    Persisting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    MissingSecrets,
    FeedUnavailable,
    NothingLive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub observed: usize,
    pub disappeared: usize,
    pub events: usize,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub deactivated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Skipped { reason: SkipReason },
    Completed(CycleReport),
}

/// Snapshot exposed on the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub phase: SchedulerPhase,
    pub cycles: u64,
    pub consecutive_failures: u32,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<CycleOutcome>,
    pub last_error: Option<String>,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self {
            phase: SchedulerPhase::Idle,
            cycles: 0,
            consecutive_failures: 0,
            last_cycle_at: None,
            last_outcome: None,
            last_error: None,
        }
    }
}

pub type SchedulerStatusHandle = Arc<RwLock<SchedulerStatus>>;

/// Collaborators injected into the scheduler.
pub struct SchedulerDeps {
    pub secrets: Arc<dyn SecretSource>,
    pub feed: Arc<dyn LiveFeed>,
    pub states: Arc<dyn MatchStateStore>,
    pub metadata: Arc<dyn MetadataLookup>,
    pub directory: Arc<dyn SubscriberDirectory>,
}

pub struct PollingScheduler {
    deps: SchedulerDeps,
    dispatcher: NotificationDispatcher,
    interval: Duration,
    shutdown_grace: Duration,
    status: SchedulerStatusHandle,
}

impl PollingScheduler {
    pub fn new(deps: SchedulerDeps, dispatcher: NotificationDispatcher, interval: Duration) -> Self {
        Self {
            deps,
            dispatcher,
            interval,
            shutdown_grace: Duration::from_secs(10),
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn status_handle(&self) -> SchedulerStatusHandle {
        self.status.clone()
    }

    /// Runs until `cancel` fires. An in-flight cycle gets `shutdown_grace` to
    /// finish before it is abandoned.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Starting live match polling loop (interval: {}s)",
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Cancellation wins over an overdue tick.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let grace_expired = async {
                cancel.cancelled().await;
                tokio::time::sleep(self.shutdown_grace).await;
            };

            tokio::select! {
                _ = self.run_once() => {}
                _ = grace_expired => {
                    warn!("Abandoning in-flight cycle after shutdown grace period");
                    break;
                }
            }
        }

        self.set_phase(SchedulerPhase::Idle).await;
        info!("Live match polling loop stopped");
    }

    /// One guarded cycle: errors and panics are logged and recorded, never
    /// propagated to the loop.
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        let started = std::time::Instant::now();
        let result = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(AppError::internal_server_error("polling cycle panicked")),
        };

        match &result {
            Ok(CycleOutcome::Completed(report)) => info!(
                observed = report.observed,
                disappeared = report.disappeared,
                events = report.events,
                delivered = report.delivered,
                failed = report.failed,
                deactivated = report.deactivated,
                "Cycle completed in {:?}",
                started.elapsed()
            ),
            Ok(CycleOutcome::Skipped { reason }) => debug!(?reason, "Cycle skipped"),
            Err(e) => error!("Cycle failed: {}", e),
        }

        self.record(&result).await;
        result
    }

    /// The cycle algorithm: secrets, fetch, detect, persist, dispatch, prune.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let Some(secrets) = self.deps.secrets.resolve() else {
            return Ok(CycleOutcome::Skipped { reason: SkipReason::MissingSecrets });
        };

        self.set_phase(SchedulerPhase::Fetching).await;
        let observations = match self.deps.feed.fetch_live(&secrets.feed_api_key).await {
            Ok(observations) => dedupe(observations),
            Err(e) => {
                warn!("Live feed unavailable, skipping cycle: {}", e);
                self.set_phase(SchedulerPhase::Idle).await;
                return Ok(CycleOutcome::Skipped { reason: SkipReason::FeedUnavailable });
            }
        };

        let previously_live = self.deps.states.load_live().await?;
        if observations.is_empty() && previously_live.is_empty() {
            self.set_phase(SchedulerPhase::Idle).await;
            return Ok(CycleOutcome::Skipped { reason: SkipReason::NothingLive });
        }

        self.set_phase(SchedulerPhase::Processing).await;

        let observed_ids: Vec<String> = observations.iter().map(|o| o.match_id.clone()).collect();
        let observed: HashSet<&str> = observed_ids.iter().map(String::as_str).collect();
        let disappeared: Vec<MatchState> = previously_live
            .into_iter()
            .filter(|state| !observed.contains(state.match_id.as_str()))
            .collect();

        let mut all_ids = observed_ids.clone();
        all_ids.extend(disappeared.iter().map(|s| s.match_id.clone()));

        let previous = self.deps.states.load(&observed_ids).await?;
        let metadata = match self.deps.metadata.lookup(&all_ids).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Metadata lookup failed, using placeholders: {}", e);
                HashMap::new()
            }
        };
        let endpoints = match self.resolve_endpoints(&all_ids).await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                warn!("Subscriber lookup failed, dispatching to nobody this cycle: {}", e);
                HashMap::new()
            }
        };

        let now = BsonDateTime::now();
        let detections = observations
            .iter()
            .map(|obs| detect(previous.get(&obs.match_id), obs, now))
            .chain(disappeared.iter().filter_map(|state| detect_disappearance(state, now)));

        let mut report = CycleReport {
            observed: observations.len(),
            disappeared: disappeared.len(),
            ..CycleReport::default()
        };
        let mut next_states = Vec::with_capacity(all_ids.len());
        let mut batches = Vec::new();

        for Detection { events, next_state } in detections {
            report.events += events.len();

            if !events.is_empty() {
                let match_id = next_state.match_id.clone();
                let match_endpoints = endpoints.get(&match_id).cloned().unwrap_or_default();

                if match_endpoints.is_empty() {
                    debug!(match_id = %match_id, "No subscribers for detected events");
                } else {
                    let display = metadata.get(&match_id).cloned().unwrap_or_default();
                    let events = events
                        .into_iter()
                        .map(|kind| DetectedEvent {
                            kind,
                            match_id: match_id.clone(),
                            metadata: display.clone(),
                            home_goals: next_state.home_goals,
                            away_goals: next_state.away_goals,
                            elapsed: next_state.elapsed,
                        })
                        .collect();

                    batches.push(MatchDispatch {
                        match_id,
                        events,
                        endpoints: match_endpoints,
                    });
                }
            }

            next_states.push(next_state);
        }

        self.set_phase(SchedulerPhase::Persisting).await;
        self.deps.states.save_all(&next_states).await?;

        self.set_phase(SchedulerPhase::Processing).await;
        let dispatch = self.dispatcher.dispatch(&batches, &secrets.vapid).await;
        report.attempted = dispatch.attempted;
        report.delivered = dispatch.delivered;
        report.failed = dispatch.failed;

        self.set_phase(SchedulerPhase::Persisting).await;
        for address in &dispatch.gone {
            match self.deps.directory.deactivate_endpoint(address).await {
                Ok(()) => report.deactivated += 1,
                Err(e) => warn!("Failed to deactivate push endpoint: {}", e),
            }
        }

        self.set_phase(SchedulerPhase::Idle).await;
        Ok(CycleOutcome::Completed(report))
    }

    /// Endpoints per match, resolved with one favorites query and one
    /// subscriptions query for the whole cycle.
    async fn resolve_endpoints(&self, match_ids: &[String]) -> Result<HashMap<String, Vec<PushEndpoint>>> {
        let subscribers = self.deps.directory.subscribers_for(match_ids).await?;

        let user_ids: Vec<String> = subscribers
            .values()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let by_user = self.deps.directory.endpoints_for(&user_ids).await?;

        Ok(subscribers
            .into_iter()
            .map(|(match_id, users)| {
                let mut seen = HashSet::new();
                let endpoints = users
                    .iter()
                    .filter_map(|user| by_user.get(user))
                    .flatten()
                    .filter(|endpoint| seen.insert(endpoint.address.clone()))
                    .cloned()
                    .collect();
                (match_id, endpoints)
            })
            .collect())
    }

    async fn set_phase(&self, phase: SchedulerPhase) {
        self.status.write().await.phase = phase;
    }

    async fn record(&self, result: &Result<CycleOutcome>) {
        let mut status = self.status.write().await;
        status.phase = SchedulerPhase::Idle;
        status.cycles += 1;
        status.last_cycle_at = Some(Utc::now());
        match result {
            Ok(outcome) => {
                status.consecutive_failures = 0;
                status.last_outcome = Some(outcome.clone());
                status.last_error = None;
            }
            Err(e) => {
                status.consecutive_failures += 1;
                status.last_error = Some(e.to_string());
            }
        }
    }
}

/// Keeps the last observation per match ID, in first-seen order.
fn dedupe(observations: Vec<MatchObservation>) -> Vec<MatchObservation> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<MatchObservation> = Vec::with_capacity(observations.len());

    for obs in observations {
        match index.get(&obs.match_id) {
            Some(&i) => unique[i] = obs,
            None => {
                index.insert(obs.match_id.clone(), unique.len());
                unique.push(obs);
            }
        }
    }
    unique
}
