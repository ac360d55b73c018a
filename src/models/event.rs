use super::metadata::MatchMetadata;

/// Notification-worthy transition between two consecutive observations.
///
/// Variant order is the per-match emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Start,
    Halftime,
    SecondHalfStart,
    End,
    Goal,
    Correction,
}

/// An event together with the display context needed to render it.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedEvent {
    pub kind: EventKind,
    pub match_id: String,
    pub metadata: MatchMetadata,
    pub home_goals: Option<i32>,
    pub away_goals: Option<i32>,
    pub elapsed: Option<i32>,
}

impl DetectedEvent {
    pub fn match_label(&self) -> String {
        format!("{} - {}", self.metadata.home_team, self.metadata.away_team)
    }

    pub fn score(&self) -> String {
        format!(
            "{}-{}",
            self.home_goals.unwrap_or(0),
            self.away_goals.unwrap_or(0)
        )
    }

    pub fn minute(&self) -> Option<String> {
        self.elapsed.map(|m| m.to_string())
    }
}
