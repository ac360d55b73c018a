//! Diffing of consecutive match observations into discrete events.

use mongodb::bson::DateTime as BsonDateTime;

use crate::models::event::EventKind;
use crate::models::match_state::MatchState;
use crate::models::observation::MatchObservation;
use crate::models::status::MatchStatus;

/// Result of comparing one match across two cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// In emission order: start, halftime, second-half-start, end, goal, correction.
    pub events: Vec<EventKind>,
    /// Complete record to persist for this match.
    pub next_state: MatchState,
}

/// Compares the stored state of a match with its current observation.
///
/// A match seen for the first time is seeded without events. A missing status
/// or missing goal count in the observation counts as "unchanged". Once the
/// stored state is terminal the match is frozen.
pub fn detect(
    previous: Option<&MatchState>,
    current: &MatchObservation,
    now: BsonDateTime,
) -> Detection {
    let Some(prev) = previous else {
        return Detection {
            events: Vec::new(),
            next_state: MatchState::seed(current, now),
        };
    };

    if prev.is_terminal() {
        return Detection {
            events: Vec::new(),
            next_state: prev.clone(),
        };
    }

    let next_state = MatchState {
        match_id: prev.match_id.clone(),
        status: current.status.clone().unwrap_or_else(|| prev.status.clone()),
        home_goals: current.home_goals.or(prev.home_goals),
        away_goals: current.away_goals.or(prev.away_goals),
        elapsed: current.elapsed.or(prev.elapsed),
        last_updated: now,
    };

    Detection {
        events: transitions(prev, &next_state),
        next_state,
    }
}

/// A previously live match that vanished from the feed is taken to have ended.
/// Returns `None` for matches that were not live.
pub fn detect_disappearance(previous: &MatchState, now: BsonDateTime) -> Option<Detection> {
    if !previous.status.is_live() {
        return None;
    }

    Some(Detection {
        events: vec![EventKind::End],
        next_state: MatchState {
            status: MatchStatus::FullTime,
            last_updated: now,
            ..previous.clone()
        },
    })
}

fn transitions(prev: &MatchState, next: &MatchState) -> Vec<EventKind> {
    let mut events = Vec::new();
    let (from, to) = (&prev.status, &next.status);

    if !from.is_live() && to.is_live() {
        events.push(EventKind::Start);
    }
    if *from == MatchStatus::FirstHalf && *to == MatchStatus::HalfTime {
        events.push(EventKind::Halftime);
    }
    if *from == MatchStatus::HalfTime && *to == MatchStatus::SecondHalf {
        events.push(EventKind::SecondHalfStart);
    }
    if !from.is_finished() && to.is_finished() {
        events.push(EventKind::End);
    }

    let score_changed =
        (prev.home_goals, prev.away_goals) != (next.home_goals, next.away_goals);
    if score_changed {
        let (before, after) = (prev.total_goals(), next.total_goals());
        if after > before && !to.is_finished() {
            events.push(EventKind::Goal);
        }
        if after < before {
            events.push(EventKind::Correction);
        }
    }

    events
}
