use serde::{Deserialize, Serialize};
use mongodb::bson::DateTime as BsonDateTime;

use super::observation::MatchObservation;
use super::status::MatchStatus;

/// Last observed state of a match, one document per match in `match_states`.
/// Always written as a complete record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub match_id: String,
    pub status: MatchStatus,
    #[serde(default)]
    pub home_goals: Option<i32>,
    #[serde(default)]
    pub away_goals: Option<i32>,
    #[serde(default)]
    pub elapsed: Option<i32>,
    pub last_updated: BsonDateTime,
}

impl MatchState {
    /// First sighting of a match: the observation becomes the state as-is.
    pub fn seed(observation: &MatchObservation, now: BsonDateTime) -> Self {
        Self {
            match_id: observation.match_id.clone(),
            status: observation
                .status
                .clone()
                .unwrap_or_else(|| MatchStatus::Unknown(String::new())),
            home_goals: observation.home_goals,
            away_goals: observation.away_goals,
            elapsed: observation.elapsed,
            last_updated: now,
        }
    }

    pub fn total_goals(&self) -> i32 {
        self.home_goals.unwrap_or(0) + self.away_goals.unwrap_or(0)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_finished()
    }
}
