use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixture status as reported by the live feed.
///
/// Stored and transmitted as the feed's short code ("1H", "HT", ...).
/// Codes outside the known vocabulary are kept verbatim in `Unknown` and are
/// neither live nor finished.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchStatus {
    TimeToBeDefined,
    NotStarted,
    FirstHalf,
    HalfTime,
    SecondHalf,
    ExtraTime,
    BreakTime,
    Penalties,
    Live,
    FullTime,
    AfterExtraTime,
    AfterPenalties,
    Suspended,
    Interrupted,
    Postponed,
    Cancelled,
    Abandoned,
    Unknown(String),
}

impl MatchStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "TBD" => MatchStatus::TimeToBeDefined,
            "NS" => MatchStatus::NotStarted,
            "1H" => MatchStatus::FirstHalf,
            "HT" => MatchStatus::HalfTime,
            "2H" => MatchStatus::SecondHalf,
            "ET" => MatchStatus::ExtraTime,
            "BT" => MatchStatus::BreakTime,
            "P" => MatchStatus::Penalties,
            "LIVE" => MatchStatus::Live,
            "FT" => MatchStatus::FullTime,
            "AET" => MatchStatus::AfterExtraTime,
            "PEN" => MatchStatus::AfterPenalties,
            "SUSP" => MatchStatus::Suspended,
            "INT" => MatchStatus::Interrupted,
            "PST" => MatchStatus::Postponed,
            "CANC" => MatchStatus::Cancelled,
            "ABD" => MatchStatus::Abandoned,
            _ => MatchStatus::Unknown(code.trim().to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            MatchStatus::TimeToBeDefined => "TBD",
            MatchStatus::NotStarted => "NS",
            MatchStatus::FirstHalf => "1H",
            MatchStatus::HalfTime => "HT",
            MatchStatus::SecondHalf => "2H",
            MatchStatus::ExtraTime => "ET",
            MatchStatus::BreakTime => "BT",
            MatchStatus::Penalties => "P",
            MatchStatus::Live => "LIVE",
            MatchStatus::FullTime => "FT",
            MatchStatus::AfterExtraTime => "AET",
            MatchStatus::AfterPenalties => "PEN",
            MatchStatus::Suspended => "SUSP",
            MatchStatus::Interrupted => "INT",
            MatchStatus::Postponed => "PST",
            MatchStatus::Cancelled => "CANC",
            MatchStatus::Abandoned => "ABD",
            MatchStatus::Unknown(code) => code,
        }
    }

    /// Match in progress: 1H, 2H, ET, P, BT, LIVE, HT.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            MatchStatus::FirstHalf
                | MatchStatus::SecondHalf
                | MatchStatus::ExtraTime
                | MatchStatus::Penalties
                | MatchStatus::BreakTime
                | MatchStatus::Live
                | MatchStatus::HalfTime
        )
    }

    /// Terminal: FT, AET, PEN.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            MatchStatus::FullTime | MatchStatus::AfterExtraTime | MatchStatus::AfterPenalties
        )
    }

    /// Codes of the live-status set, for store queries.
    pub fn live_codes() -> Vec<&'static str> {
        vec!["1H", "2H", "ET", "P", "BT", "LIVE", "HT"]
    }
}

impl From<String> for MatchStatus {
    fn from(code: String) -> Self {
        MatchStatus::from_code(&code)
    }
}

impl From<MatchStatus> for String {
    fn from(status: MatchStatus) -> Self {
        status.code().to_string()
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
