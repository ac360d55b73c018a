use serde::{Deserialize, Serialize};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

/// A user's favorited match (`favorites` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub match_id: String,
}

/// Browser push subscription (`push_subscriptions` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscriptionDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<BsonDateTime>,
}

/// Delivery address plus the keys needed to encrypt for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PushEndpoint {
    pub address: String,
    pub p256dh: String,
    pub auth: String,
}

impl From<PushSubscriptionDoc> for PushEndpoint {
    fn from(doc: PushSubscriptionDoc) -> Self {
        Self {
            address: doc.endpoint,
            p256dh: doc.p256dh,
            auth: doc.auth,
        }
    }
}
