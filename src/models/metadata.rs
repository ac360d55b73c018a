use serde::Deserialize;

pub const PLACEHOLDER_LEAGUE: &str = "Match";
pub const PLACEHOLDER_HOME: &str = "Home";
pub const PLACEHOLDER_AWAY: &str = "Away";

/// Read-only projection of a document in the `games` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct GameMetadataDoc {
    pub match_id: String,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub league_logo: Option<String>,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub home_logo: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default)]
    pub away_logo: Option<String>,
}

/// Display metadata for one match. Missing labels fall back to placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchMetadata {
    pub league_name: String,
    pub league_logo_url: Option<String>,
    pub home_team: String,
    pub home_logo_url: Option<String>,
    pub away_team: String,
    pub away_logo_url: Option<String>,
}

impl Default for MatchMetadata {
    fn default() -> Self {
        Self {
            league_name: PLACEHOLDER_LEAGUE.to_string(),
            league_logo_url: None,
            home_team: PLACEHOLDER_HOME.to_string(),
            home_logo_url: None,
            away_team: PLACEHOLDER_AWAY.to_string(),
            away_logo_url: None,
        }
    }
}

impl From<GameMetadataDoc> for MatchMetadata {
    fn from(doc: GameMetadataDoc) -> Self {
        let label = |v: Option<String>, fallback: &str| {
            v.filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        let url = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Self {
            league_name: label(doc.league, PLACEHOLDER_LEAGUE),
            league_logo_url: url(doc.league_logo),
            home_team: label(doc.home_team, PLACEHOLDER_HOME),
            home_logo_url: url(doc.home_logo),
            away_team: label(doc.away_team, PLACEHOLDER_AWAY),
            away_logo_url: url(doc.away_logo),
        }
    }
}

impl MatchMetadata {
    /// Banner image: home team, then away team, then league.
    pub fn banner_image(&self) -> Option<&str> {
        self.home_logo_url
            .as_deref()
            .or(self.away_logo_url.as_deref())
            .or(self.league_logo_url.as_deref())
    }

    /// Small icon: league logo, else the banner image.
    pub fn icon(&self) -> Option<&str> {
        self.league_logo_url.as_deref().or_else(|| self.banner_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> GameMetadataDoc {
        GameMetadataDoc {
            match_id: "42".into(),
            league: Some("Premier League".into()),
            league_logo: Some("https://cdn/league.png".into()),
            home_team: Some("Arsenal".into()),
            home_logo: None,
            away_team: Some("".into()),
            away_logo: Some("https://cdn/away.png".into()),
        }
    }

    #[test]
    fn blank_labels_fall_back_to_placeholders() {
        let meta = MatchMetadata::from(doc());
        assert_eq!(meta.home_team, "Arsenal");
        assert_eq!(meta.away_team, PLACEHOLDER_AWAY);
    }

    #[test]
    fn banner_prefers_home_then_away_then_league() {
        let mut meta = MatchMetadata::from(doc());
        assert_eq!(meta.banner_image(), Some("https://cdn/away.png"));

        meta.home_logo_url = Some("https://cdn/home.png".into());
        assert_eq!(meta.banner_image(), Some("https://cdn/home.png"));

        meta.home_logo_url = None;
        meta.away_logo_url = None;
        assert_eq!(meta.banner_image(), Some("https://cdn/league.png"));
        assert_eq!(meta.icon(), Some("https://cdn/league.png"));
    }

    #[test]
    fn default_has_no_images() {
        let meta = MatchMetadata::default();
        assert_eq!(meta.league_name, "Match");
        assert!(meta.icon().is_none());
    }
}
