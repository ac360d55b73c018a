// src/services/metadata_lookup.rs

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};
use std::collections::HashMap;

use crate::errors::Result;
use crate::models::metadata::{GameMetadataDoc, MatchMetadata};

pub const GAMES_COLLECTION: &str = "games";

#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Display metadata keyed by match ID. IDs without a record are absent;
    /// callers fall back to `MatchMetadata::default()`.
    async fn lookup(&self, match_ids: &[String]) -> Result<HashMap<String, MatchMetadata>>;
}

#[derive(Clone)]
pub struct MongoMetadataLookup {
    games: Collection<GameMetadataDoc>,
}

impl MongoMetadataLookup {
    pub fn new(db: &Database) -> Self {
        Self {
            games: db.collection(GAMES_COLLECTION),
        }
    }
}

#[async_trait]
impl MetadataLookup for MongoMetadataLookup {
    async fn lookup(&self, match_ids: &[String]) -> Result<HashMap<String, MatchMetadata>> {
        if match_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let cursor = self.games
            .find(doc! { "match_id": { "$in": match_ids.to_vec() } })
            .await?;
        let games: Vec<GameMetadataDoc> = cursor.try_collect().await?;

        Ok(games
            .into_iter()
            .map(|game| (game.match_id.clone(), MatchMetadata::from(game)))
            .collect())
    }
}
