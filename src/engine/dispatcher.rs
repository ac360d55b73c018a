//! Rendering of detected events and best-effort fan-out to push endpoints.

use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::VapidKeys;
use crate::errors::DeliveryError;
use crate::models::event::{DetectedEvent, EventKind};
use crate::models::notification::NotificationPayload;
use crate::models::subscriber::PushEndpoint;
use crate::services::push_service::PushChannel;

/// Everything to send for one match in one cycle.
#[derive(Debug, Clone)]
pub struct MatchDispatch {
    pub match_id: String,
    /// Detection order; sent in this order to each endpoint.
    pub events: Vec<DetectedEvent>,
    pub endpoints: Vec<PushEndpoint>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Addresses the push service reported as permanently invalid.
    pub gone: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct GroupOutcome {
    attempted: usize,
    delivered: usize,
    failed: usize,
    gone: Option<String>,
}

pub struct NotificationDispatcher {
    channel: Arc<dyn PushChannel>,
    site_base_url: String,
    concurrency: usize,
}

impl NotificationDispatcher {
    pub fn new(channel: Arc<dyn PushChannel>, site_base_url: impl Into<String>, concurrency: usize) -> Self {
        Self {
            channel,
            site_base_url: site_base_url.into(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn render(&self, event: &DetectedEvent) -> NotificationPayload {
        let mut body = format!(
            "{} | {} | {}",
            event.metadata.league_name,
            event.match_label(),
            event.score()
        );

        if matches!(event.kind, EventKind::Goal | EventKind::Correction) {
            if let Some(minute) = event.minute() {
                body.push_str(&format!(" at {}'", minute));
            }
        }

        NotificationPayload {
            title: title_for(event.kind).to_string(),
            body,
            url: format!("{}/matches/{}", self.site_base_url, event.match_id),
            icon: event.metadata.icon().map(str::to_string),
            image: event.metadata.banner_image().map(str::to_string),
        }
    }

    /// Attempts every (event, endpoint) pair. Failures are isolated per
    /// endpoint and never retried; nothing here touches match state.
    pub async fn dispatch(&self, batches: &[MatchDispatch], vapid: &VapidKeys) -> DispatchReport {
        let rendered: Vec<(&MatchDispatch, Vec<NotificationPayload>)> = batches
            .iter()
            .map(|batch| (batch, batch.events.iter().map(|e| self.render(e)).collect()))
            .collect();

        let groups: Vec<(&str, &PushEndpoint, &[NotificationPayload])> = rendered
            .iter()
            .flat_map(|(batch, payloads)| {
                batch
                    .endpoints
                    .iter()
                    .map(move |endpoint| (batch.match_id.as_str(), endpoint, payloads.as_slice()))
            })
            .collect();

        let deliveries: Vec<_> = groups
            .into_iter()
            .map(|(match_id, endpoint, payloads)| self.deliver_group(match_id, endpoint, payloads, vapid))
            .collect();

        let outcomes: Vec<GroupOutcome> = stream::iter(deliveries)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = DispatchReport::default();
        for outcome in outcomes {
            report.attempted += outcome.attempted;
            report.delivered += outcome.delivered;
            report.failed += outcome.failed;
            if let Some(address) = outcome.gone {
                report.gone.insert(address);
            }
        }
        report
    }

    async fn deliver_group(
        &self,
        match_id: &str,
        endpoint: &PushEndpoint,
        payloads: &[NotificationPayload],
        vapid: &VapidKeys,
    ) -> GroupOutcome {
        let mut outcome = GroupOutcome::default();

        for payload in payloads {
            outcome.attempted += 1;
            match self.channel.deliver(endpoint, payload, vapid).await {
                Ok(()) => {
                    outcome.delivered += 1;
                    debug!(match_id, title = %payload.title, "Push delivered");
                }
                Err(DeliveryError::Gone) => {
                    outcome.failed += 1;
                    warn!(match_id, endpoint = %endpoint.address, "Push endpoint gone, deactivating");
                    outcome.gone = Some(endpoint.address.clone());
                    break;
                }
                Err(DeliveryError::Transient(reason)) => {
                    outcome.failed += 1;
                    warn!(match_id, endpoint = %endpoint.address, "Push delivery failed: {}", reason);
                }
            }
        }

        outcome
    }
}

fn title_for(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Start => "Kick-off!",
        EventKind::Halftime => "Half-time",
        EventKind::SecondHalfStart => "Second half underway",
        EventKind::End => "Full-time",
        EventKind::Goal => "GOAL!",
        EventKind::Correction => "Score corrected",
    }
}
