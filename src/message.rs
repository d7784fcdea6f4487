//! Normalized incoming messages.
//!
//! A [`NormalizedMessage`] is the flat form of one customer message: four
//! common fields, an optional reply [`Thread`], and a [`MessageContent`]
//! discriminated by `type`. Serialized with `serde`, it produces the shape
//! downstream consumers expect:
//!
//! ```json
//! {
//!   "recipientPhone": 918657854260,
//!   "recipientName": "Danish",
//!   "messageId": "wamid.HBgM...",
//!   "timestamp": 1734764424,
//!   "type": "text",
//!   "text": { "body": "Hello" }
//! }
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::MetaError;

/// One incoming customer message.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    /// The sender's WhatsApp id (`contacts[0].wa_id`) as an integer.
    pub recipient_phone: u64,

    /// The sender's profile name, or `""` when the profile carries none.
    pub recipient_name: String,

    pub message_id: String,

    /// Seconds since the epoch, as sent.
    pub timestamp: i64,

    /// The message this one quotes, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,

    #[serde(flatten)]
    pub content: MessageContent,
}

impl NormalizedMessage {
    /// Returns the `type` tag of the content.
    #[inline]
    pub fn kind(&self) -> &'static str {
        self.content.kind()
    }
}

/// A reference to the message a customer replied to.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub phone: String,
    /// The quoting context carries no profile, so this mirrors `phone`.
    pub name: String,
    pub replied_to_message_id: String,
    /// Set when the customer asked about a catalog product.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_product: Option<ReferredProduct>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReferredProduct {
    pub catalog_id: String,
    pub product_retailer_id: String,
}

/// The kind-specific part of a [`NormalizedMessage`].
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum MessageContent {
    Text {
        text: Text,
    },

    /// A reply button was tapped.
    SimpleButton {
        id: String,
        title: String,
    },

    /// A list row was selected.
    RadioButton {
        id: String,
        title: String,
        /// Absent when the row had no description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// A flow was completed; `flow_json` is the decoded `response_json`.
    Flow {
        flow_json: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },

    Document {
        document: Document,
    },

    Video {
        video: MediaFile,
    },

    Image {
        image: MediaFile,
    },

    Audio {
        audio: Audio,
    },

    Location {
        location: Location,
    },

    /// Shared contact cards, passed through unmodified.
    Contact {
        contacts: Vec<Value>,
    },

    /// A template quick-reply button was tapped.
    QuickReply {
        button: QuickReply,
    },

    Reaction {
        reaction: Reaction,
    },

    Sticker {
        sticker: MediaFile,
    },

    Order {
        order: Order,
    },

    /// Anything this crate does not recognise. `errors` is only populated for
    /// `unsupported` messages that explain why.
    Unknown {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        errors: Vec<MetaError>,
    },
}

impl MessageContent {
    /// Returns the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::SimpleButton { .. } => "simple_button",
            Self::RadioButton { .. } => "radio_button",
            Self::Flow { .. } => "flow",
            Self::Document { .. } => "document",
            Self::Video { .. } => "video",
            Self::Image { .. } => "image",
            Self::Audio { .. } => "audio",
            Self::Location { .. } => "location",
            Self::Contact { .. } => "contact",
            Self::QuickReply { .. } => "quick_reply",
            Self::Reaction { .. } => "reaction",
            Self::Sticker { .. } => "sticker",
            Self::Order { .. } => "order",
            Self::Unknown { .. } => "unknown",
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub body: String,
}

/// Image, video and sticker attachments.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Media id; fetch the download URL with [`Client::media_url`](crate::Client::media_url).
    pub id: String,
    pub mime_type: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Audio {
    pub id: String,
    pub mime_type: String,
    pub sha256: String,
    /// `true` for voice notes recorded in the app.
    pub voice: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub mime_type: String,
    pub sha256: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub address: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QuickReply {
    pub text: String,
    pub payload: String,
}

/// An emoji reaction. An empty `emoji` means the reaction was removed.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub message_id: String,
    pub emoji: String,
}

/// A cart sent from a catalog.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Order {
    pub catalog_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub product_items: Vec<ProductItem>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProductItem {
    pub product_retailer_id: String,
    pub quantity: u32,
    pub item_price: f64,
    pub currency: String,
}
