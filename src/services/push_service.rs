// src/services/push_service.rs

use async_trait::async_trait;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder,
    WebPushClient, WebPushError, WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

use crate::config::VapidKeys;
use crate::errors::{AppError, DeliveryError, Result};
use crate::models::notification::NotificationPayload;
use crate::models::subscriber::PushEndpoint;

/// Seconds the push service may hold an undelivered message.
const MESSAGE_TTL_SECS: u32 = 60 * 60;

/// Delivery of one payload to one endpoint.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn deliver(
        &self,
        endpoint: &PushEndpoint,
        payload: &NotificationPayload,
        vapid: &VapidKeys,
    ) -> std::result::Result<(), DeliveryError>;
}

/// Web Push (RFC 8030) with VAPID signing and aes128gcm payload encryption.
pub struct WebPushChannel {
    client: IsahcWebPushClient,
}

impl WebPushChannel {
    pub fn new() -> Result<Self> {
        let client = IsahcWebPushClient::new()
            .map_err(|e| AppError::push(format!("Failed to build web push client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PushChannel for WebPushChannel {
    async fn deliver(
        &self,
        endpoint: &PushEndpoint,
        payload: &NotificationPayload,
        vapid: &VapidKeys,
    ) -> std::result::Result<(), DeliveryError> {
        let subscription = SubscriptionInfo::new(
            endpoint.address.as_str(),
            endpoint.p256dh.as_str(),
            endpoint.auth.as_str(),
        );

        let content = serde_json::to_vec(payload)
            .map_err(|e| DeliveryError::Transient(format!("payload encoding: {}", e)))?;

        let mut signature =
            VapidSignatureBuilder::from_base64(&vapid.private_key, URL_SAFE_NO_PAD, &subscription)
                .map_err(classify)?;
        signature.add_claim("sub", vapid.subject.as_str());
        let signature = signature.build().map_err(classify)?;

        let mut builder = WebPushMessageBuilder::new(&subscription);
        builder.set_payload(ContentEncoding::Aes128Gcm, &content);
        builder.set_ttl(MESSAGE_TTL_SECS);
        builder.set_vapid_signature(signature);
        let message = builder.build().map_err(classify)?;

        self.client.send(message).await.map_err(classify)
    }
}

/// 410 Gone and 404 Not Found mean the subscription no longer exists.
fn classify(err: WebPushError) -> DeliveryError {
    match err {
        WebPushError::EndpointNotValid | WebPushError::EndpointNotFound => DeliveryError::Gone,
        other => DeliveryError::Transient(other.to_string()),
    }
}
