use serde::{Deserialize, Serialize};

use super::status::MatchStatus;

/// One match as seen in a single live-feed snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchObservation {
    pub match_id: String,
    /// `None` when the feed omitted the status; treated as "unchanged".
    pub status: Option<MatchStatus>,
    pub elapsed: Option<i32>,
    pub home_goals: Option<i32>,
    pub away_goals: Option<i32>,
}

#[cfg(test)]
impl MatchObservation {
    pub fn new(match_id: impl Into<String>, status: &str) -> Self {
        Self {
            match_id: match_id.into(),
            status: Some(MatchStatus::from_code(status)),
            elapsed: None,
            home_goals: None,
            away_goals: None,
        }
    }

    pub fn with_score(mut self, home: i32, away: i32) -> Self {
        self.home_goals = Some(home);
        self.away_goals = Some(away);
        self
    }

    pub fn with_elapsed(mut self, minute: i32) -> Self {
        self.elapsed = Some(minute);
        self
    }
}
