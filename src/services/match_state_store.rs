// src/services/match_state_store.rs

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::doc,
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use std::collections::HashMap;

use crate::errors::Result;
use crate::models::match_state::MatchState;
use crate::models::status::MatchStatus;

pub const MATCH_STATES_COLLECTION: &str = "match_states";

/// Durable per-match memory of the last observation. This service is the only
/// writer.
#[async_trait]
pub trait MatchStateStore: Send + Sync {
    /// States for the given match IDs; unknown IDs are simply absent.
    async fn load(&self, match_ids: &[String]) -> Result<HashMap<String, MatchState>>;

    /// Every state whose status is in the live set.
    async fn load_live(&self) -> Result<Vec<MatchState>>;

    /// Writes each state as a complete record.
    async fn save_all(&self, states: &[MatchState]) -> Result<()>;
}

#[derive(Clone)]
pub struct MongoMatchStateStore {
    collection: Collection<MatchState>,
}

impl MongoMatchStateStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(MATCH_STATES_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "match_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index).await?;
        Ok(())
    }
}

#[async_trait]
impl MatchStateStore for MongoMatchStateStore {
    async fn load(&self, match_ids: &[String]) -> Result<HashMap<String, MatchState>> {
        if match_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let cursor = self.collection
            .find(doc! { "match_id": { "$in": match_ids.to_vec() } })
            .await?;
        let states: Vec<MatchState> = cursor.try_collect().await?;

        Ok(states
            .into_iter()
            .map(|state| (state.match_id.clone(), state))
            .collect())
    }

    async fn load_live(&self) -> Result<Vec<MatchState>> {
        let cursor = self.collection
            .find(doc! { "status": { "$in": MatchStatus::live_codes() } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn save_all(&self, states: &[MatchState]) -> Result<()> {
        for state in states {
            self.collection
                .replace_one(doc! { "match_id": &state.match_id }, state)
                .upsert(true)
                .await?;
        }
        tracing::debug!("Persisted {} match states", states.len());
        Ok(())
    }
}
