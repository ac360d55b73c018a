// src/services/subscriber_directory.rs

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    Collection, Database,
};
use std::collections::HashMap;

use crate::errors::Result;
use crate::models::subscriber::{Favorite, PushEndpoint, PushSubscriptionDoc};

pub const FAVORITES_COLLECTION: &str = "favorites";
pub const PUSH_SUBSCRIPTIONS_COLLECTION: &str = "push_subscriptions";

#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    /// User IDs that favorited each match.
    async fn subscribers_for(&self, match_ids: &[String]) -> Result<HashMap<String, Vec<String>>>;

    /// Active push endpoints per user.
    async fn endpoints_for(&self, user_ids: &[String]) -> Result<HashMap<String, Vec<PushEndpoint>>>;

    /// Marks every subscription with this address inactive. Idempotent.
    async fn deactivate_endpoint(&self, address: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct MongoSubscriberDirectory {
    favorites: Collection<Favorite>,
    subscriptions: Collection<PushSubscriptionDoc>,
}

impl MongoSubscriberDirectory {
    pub fn new(db: &Database) -> Self {
        Self {
            favorites: db.collection(FAVORITES_COLLECTION),
            subscriptions: db.collection(PUSH_SUBSCRIPTIONS_COLLECTION),
        }
    }
}

#[async_trait]
impl SubscriberDirectory for MongoSubscriberDirectory {
    async fn subscribers_for(&self, match_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        let mut by_match: HashMap<String, Vec<String>> = HashMap::new();
        if match_ids.is_empty() {
            return Ok(by_match);
        }

        let mut cursor = self.favorites
            .find(doc! { "match_id": { "$in": match_ids.to_vec() } })
            .await?;

        while let Some(favorite) = cursor.try_next().await? {
            let users = by_match.entry(favorite.match_id).or_default();
            if !users.contains(&favorite.user_id) {
                users.push(favorite.user_id);
            }
        }

        Ok(by_match)
    }

    async fn endpoints_for(&self, user_ids: &[String]) -> Result<HashMap<String, Vec<PushEndpoint>>> {
        let mut by_user: HashMap<String, Vec<PushEndpoint>> = HashMap::new();
        if user_ids.is_empty() {
            return Ok(by_user);
        }

        let mut cursor = self.subscriptions
            .find(doc! {
                "user_id": { "$in": user_ids.to_vec() },
                "is_active": true,
            })
            .await?;

        while let Some(subscription) = cursor.try_next().await? {
            by_user
                .entry(subscription.user_id.clone())
                .or_default()
                .push(PushEndpoint::from(subscription));
        }

        Ok(by_user)
    }

    async fn deactivate_endpoint(&self, address: &str) -> Result<()> {
        let result = self.subscriptions
            .update_many(
                doc! { "endpoint": address },
                doc! { "$set": { "is_active": false, "updated_at": BsonDateTime::now() } },
            )
            .await?;

        tracing::info!(
            "Deactivated push endpoint ({} subscription(s) matched)",
            result.matched_count
        );
        Ok(())
    }
}
