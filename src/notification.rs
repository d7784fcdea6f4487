//! Normalized delivery status notifications.

use serde::{Deserialize, Serialize};

use crate::MetaError;

/// Delivery status of a message the business sent.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Failed,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Read => "read",
        }
    }
}

/// One status update for an outbound message.
///
/// `conversation` and `pricing` are always present; when the source omits
/// them their fields are empty strings, zero and `false`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedNotification {
    pub message_id: String,
    pub status: MessageStatus,

    /// Milliseconds since the epoch. Produced by appending `"000"` to the
    /// source's textual seconds value, so `"1734690594"` becomes
    /// `1734690594000`.
    pub timestamp: i64,

    /// The WhatsApp id of the customer the message was sent to.
    pub recipient_phone: u64,

    pub conversation: Conversation,
    pub pricing: Pricing,

    /// Why delivery failed; only present on `failed` statuses.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<MetaError>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    /// Milliseconds, scaled the same way as the notification timestamp.
    pub expiration_millis: i64,
    pub origin_type: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Pricing {
    pub billable: bool,
    pub model: String,
    pub category: String,
}
