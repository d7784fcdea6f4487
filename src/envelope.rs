//! Wire shapes of the inbound webhook.
//!
//! The validator walks the envelope as a raw [`serde_json::Value`] so it can
//! report exactly which property is wrong; once the normalizer has located the
//! one message or status it consults, that node is decoded into the typed
//! structures below.

use std::str::FromStr;

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use crate::{notification::MessageStatus, MetaError};

/// The only `object` value a WhatsApp Business webhook carries.
pub const WHATSAPP_BUSINESS_ACCOUNT: &str = "whatsapp_business_account";

/// The only change `field` this crate handles.
pub const MESSAGES_FIELD: &str = "messages";

/// Path of the change value every normalized field lives under.
pub(crate) const CHANGE_VALUE_PATH: &str = "entry[0].changes[0].value";

/// A number Meta sends either as a JSON string (`"1734690594"`) or as a JSON
/// number (`1734690594`). The textual form is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NumericText(String);

impl NumericText {
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn parse<T: FromStr>(&self) -> Option<T> {
        self.0.trim().parse().ok()
    }
}

impl<'de> Deserialize<'de> for NumericText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Self(text),
            Repr::Number(number) => Self(number.to_string()),
        })
    }
}

// `billable` is documented as a boolean but older payloads send "true"/"false".
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Bool(bool),
        Text(String),
    }

    Ok(match <Option<Repr>>::deserialize(deserializer)? {
        Some(Repr::Bool(flag)) => Some(flag),
        Some(Repr::Text(text)) => Some(text.trim().eq_ignore_ascii_case("true")),
        None => None,
    })
}

/// Sender profile metadata, index-correlated to `messages[0]`.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct UserContact {
    /// The customer's WhatsApp ID.
    #[serde(default)]
    pub wa_id: Option<String>,

    #[serde(default)]
    pub profile: Option<UserProfile>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
}

/// The type-independent part of `messages[0]`.
///
/// The payload under the key named by `type` is decoded separately, so keys
/// the declared type never reads cannot fail the message.
#[derive(Deserialize, Debug)]
pub(crate) struct InboundMessage {
    pub id: String,
    pub timestamp: NumericText,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Present when the customer quoted (replied to) an earlier message.
    #[serde(default)]
    pub context: Option<QuotedContext>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct QuotedContext {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    /// Dropped when incomplete.
    #[serde(default, deserialize_with = "best_effort")]
    pub referred_product: Option<ReferredProductPayload>,
}

fn best_effort<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(T::deserialize(raw).ok())
}

#[derive(Deserialize, Debug)]
pub(crate) struct ReferredProductPayload {
    pub catalog_id: String,
    pub product_retailer_id: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct TextPayload {
    pub body: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ButtonReplyPayload {
    pub id: String,
    pub title: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ListReplyPayload {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct FlowReplyPayload {
    pub response_json: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Image, video and sticker payloads.
#[derive(Deserialize, Debug)]
pub(crate) struct MediaPayload {
    pub id: String,
    pub mime_type: String,
    pub sha256: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct AudioPayload {
    pub id: String,
    pub mime_type: String,
    pub sha256: String,
    #[serde(default)]
    pub voice: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct DocumentPayload {
    pub id: String,
    pub mime_type: String,
    pub sha256: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ReactionPayload {
    #[serde(default)]
    pub message_id: Option<String>,
    /// Misspelled key some older payloads carry instead of `message_id`.
    #[serde(default)]
    pub messsage_id: Option<String>,
    /// Absent when the customer removed their reaction.
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct QuickReplyPayload {
    pub text: String,
    pub payload: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct OrderPayload {
    pub catalog_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub product_items: Vec<ProductItemPayload>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ProductItemPayload {
    pub product_retailer_id: String,
    pub quantity: NumericText,
    pub item_price: NumericText,
    pub currency: String,
}

/// `statuses[0]` of a change value.
#[derive(Deserialize, Debug)]
pub(crate) struct StatusEvent {
    pub id: String,

    /// For a status to be read, it must have been delivered. Meta may skip the
    /// delivered notification when a message is read immediately.
    pub status: MessageStatus,

    pub timestamp: NumericText,

    /// The customer's WhatsApp ID.
    pub recipient_id: String,

    #[serde(default)]
    pub conversation: Option<ConversationPayload>,
    #[serde(default)]
    pub pricing: Option<PricingPayload>,
    #[serde(default)]
    pub errors: Option<Vec<MetaError>>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct ConversationPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub expiration_timestamp: Option<NumericText>,
    #[serde(default)]
    pub origin: Option<OriginPayload>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct OriginPayload {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct PricingPayload {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub billable: Option<bool>,
    #[serde(default)]
    pub pricing_model: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}
