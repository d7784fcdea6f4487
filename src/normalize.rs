//! Message and notification normalization.
//!
//! [`normalize`] reads `entry[0].changes[0].value` of a validated envelope and
//! produces exactly one [`ParsedResult`]:
//!
//! - if `messages[0]` exists it becomes a [`NormalizedMessage`] (messages take
//!   precedence when a change carries both);
//! - otherwise if `statuses[0]` exists it becomes a [`NormalizedNotification`];
//! - otherwise normalization fails with [`NormalizationError::Empty`].
//!
//! Only the located message or status is decoded into typed wire structures;
//! the rest of the change value is never touched. A message whose declared
//! type lacks its payload key fails with the exact field path rather than
//! producing partial output.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    defaults::OrDefaultAt,
    envelope::{
        AudioPayload, ButtonReplyPayload, DocumentPayload, FlowReplyPayload, InboundMessage,
        ListReplyPayload, LocationPayload, MediaPayload, NumericText, OrderPayload,
        QuickReplyPayload, QuotedContext, ReactionPayload, StatusEvent, TextPayload, UserContact,
        CHANGE_VALUE_PATH,
    },
    error::NormalizationError,
    message::{
        Audio, Document, Location, MediaFile, MessageContent, NormalizedMessage, Order,
        ProductItem, QuickReply, Reaction, ReferredProduct, Text, Thread,
    },
    notification::{Conversation, NormalizedNotification, Pricing},
    validate::ValidEnvelope,
    ParsedResult,
};

const MESSAGE_PATH: &str = "entry[0].changes[0].value.messages[0]";
const CONTACT_PATH: &str = "entry[0].changes[0].value.contacts[0]";
const STATUS_PATH: &str = "entry[0].changes[0].value.statuses[0]";

/// The `type` tag of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageKind {
    Text,
    Interactive,
    Audio,
    Video,
    Image,
    Document,
    Sticker,
    Location,
    Reaction,
    Contacts,
    Button,
    Order,
    Unsupported,
    Other,
}

impl MessageKind {
    fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("text") => Self::Text,
            Some("interactive") => Self::Interactive,
            Some("audio") => Self::Audio,
            Some("video") => Self::Video,
            Some("image") => Self::Image,
            Some("document") => Self::Document,
            Some("sticker") => Self::Sticker,
            Some("location") => Self::Location,
            Some("reaction") => Self::Reaction,
            Some("contacts") => Self::Contacts,
            Some("button") => Self::Button,
            Some("order") => Self::Order,
            Some("unsupported") => Self::Unsupported,
            _ => Self::Other,
        }
    }
}

/// The `interactive.type` tag. Anything that is not a button or flow reply is
/// treated as a list reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InteractiveKind {
    ButtonReply,
    FlowReply,
    ListReply,
}

impl InteractiveKind {
    fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("button_reply") => Self::ButtonReply,
            Some("nfm_reply") => Self::FlowReply,
            _ => Self::ListReply,
        }
    }
}

/// Normalizes a validated envelope into a message or a notification.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use whatsapp_webhook_rs::{normalize, validate, ParsedResult};
///
/// let body = json!({
///     "object": "whatsapp_business_account",
///     "entry": [{
///         "id": "104378769380033",
///         "changes": [{
///             "field": "messages",
///             "value": {
///                 "contacts": [{ "profile": { "name": "Danish" }, "wa_id": "918657854260" }],
///                 "messages": [{
///                     "from": "918657854260",
///                     "id": "wamid.ID",
///                     "timestamp": "1733053422",
///                     "type": "text",
///                     "text": { "body": "hi" }
///                 }]
///             }
///         }]
///     }]
/// });
///
/// let valid = validate(&body, "104378769380033").unwrap();
/// let ParsedResult::Message(message) = normalize(&valid).unwrap() else {
///     panic!("expected a message");
/// };
/// assert_eq!(message.recipient_phone, 918657854260);
/// assert_eq!(message.kind(), "text");
/// ```
pub fn normalize(valid: &ValidEnvelope<'_>) -> Result<ParsedResult, NormalizationError> {
    let value = valid
        .change_value()
        .ok_or_else(|| NormalizationError::missing(CHANGE_VALUE_PATH))?;

    if let Some(message) = first(value, "messages") {
        debug!(account_id = valid.account_id(), "normalizing incoming message");
        normalize_message(message, first(value, "contacts")).map(ParsedResult::Message)
    } else if let Some(status) = first(value, "statuses") {
        debug!(account_id = valid.account_id(), "normalizing status notification");
        normalize_notification(status).map(ParsedResult::Notification)
    } else {
        Err(NormalizationError::Empty)
    }
}

fn first<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key)?.as_array()?.first()
}

fn decode<T: DeserializeOwned>(value: &Value, path: &str) -> Result<T, NormalizationError> {
    T::deserialize(value).map_err(|err| NormalizationError::malformed(path, err))
}

#[inline]
fn message_field(field: &str) -> String {
    format!("{MESSAGE_PATH}.{field}")
}

/// Decodes `parent[key]`, which must be present and non-null.
fn payload_at<T: DeserializeOwned>(
    parent: &Value,
    key: &str,
    path: String,
) -> Result<T, NormalizationError> {
    match parent.get(key) {
        None | Some(Value::Null) => Err(NormalizationError::missing(path)),
        Some(value) => decode(value, &path),
    }
}

/// Decodes the payload `messages[0]` carries under `key`.
#[inline]
fn payload<T: DeserializeOwned>(raw: &Value, key: &str) -> Result<T, NormalizationError> {
    payload_at(raw, key, message_field(key))
}

/// Parses a WhatsApp id (`"918657854260"`, optionally `"+"`-prefixed).
fn phone_number(raw: &str, path: &str) -> Result<u64, NormalizationError> {
    let digits = raw.trim();
    let digits = digits.strip_prefix('+').unwrap_or(digits);
    digits
        .parse()
        .map_err(|_| NormalizationError::invalid(path, format!("{raw:?} is not a phone number")))
}

/// Scales a seconds value to milliseconds by appending `"000"` to its text.
fn millis(raw: &NumericText, path: &str) -> Result<i64, NormalizationError> {
    format!("{}000", raw.as_str().trim())
        .parse()
        .map_err(|_| {
            NormalizationError::invalid(path, format!("{:?} is not a timestamp", raw.as_str()))
        })
}

fn normalize_message(
    raw: &Value,
    contact: Option<&Value>,
) -> Result<NormalizedMessage, NormalizationError> {
    let message: InboundMessage = decode(raw, MESSAGE_PATH)?;
    let contact: UserContact = match contact {
        Some(contact) => decode(contact, CONTACT_PATH)?,
        None => UserContact::default(),
    };

    let wa_id_path = format!("{CONTACT_PATH}.wa_id");
    let wa_id = contact
        .wa_id
        .as_deref()
        .ok_or_else(|| NormalizationError::missing(&wa_id_path))?;
    let recipient_phone = phone_number(wa_id, &wa_id_path)?;

    let recipient_name = contact
        .profile
        .and_then(|profile| profile.name)
        .or_default_at("contacts[0].profile.name");

    let timestamp = message.timestamp.parse().ok_or_else(|| {
        NormalizationError::invalid(
            message_field("timestamp"),
            format!("{:?} is not a timestamp", message.timestamp.as_str()),
        )
    })?;

    let kind = MessageKind::from_tag(message.kind.as_deref());
    let content = message_content(raw, kind)?;

    Ok(NormalizedMessage {
        recipient_phone,
        recipient_name,
        thread: message.context.as_ref().and_then(quoted_thread),
        message_id: message.id,
        timestamp,
        content,
    })
}

fn quoted_thread(context: &QuotedContext) -> Option<Thread> {
    let replied_to_message_id = context.id.clone()?;
    let phone = context.from.clone().or_default_at("messages[0].context.from");

    Some(Thread {
        name: phone.clone(),
        phone,
        replied_to_message_id,
        referred_product: context
            .referred_product
            .as_ref()
            .map(|product| ReferredProduct {
                catalog_id: product.catalog_id.clone(),
                product_retailer_id: product.product_retailer_id.clone(),
            }),
    })
}

fn message_content(raw: &Value, kind: MessageKind) -> Result<MessageContent, NormalizationError> {
    Ok(match kind {
        MessageKind::Text => {
            let text: TextPayload = payload(raw, "text")?;
            MessageContent::Text {
                text: Text { body: text.body },
            }
        }

        MessageKind::Interactive => interactive_content(raw)?,

        MessageKind::Audio => {
            let audio: AudioPayload = payload(raw, "audio")?;
            MessageContent::Audio {
                audio: Audio {
                    id: audio.id,
                    mime_type: audio.mime_type,
                    sha256: audio.sha256,
                    voice: audio.voice.or_default_at("messages[0].audio.voice"),
                },
            }
        }

        MessageKind::Video => MessageContent::Video {
            video: payload::<MediaPayload>(raw, "video")?.into(),
        },

        MessageKind::Image => MessageContent::Image {
            image: payload::<MediaPayload>(raw, "image")?.into(),
        },

        MessageKind::Sticker => MessageContent::Sticker {
            sticker: payload::<MediaPayload>(raw, "sticker")?.into(),
        },

        MessageKind::Document => {
            let document: DocumentPayload = payload(raw, "document")?;
            MessageContent::Document {
                document: Document {
                    id: document.id,
                    mime_type: document.mime_type,
                    sha256: document.sha256,
                    filename: document.filename.or_default_at("messages[0].document.filename"),
                    caption: document.caption,
                },
            }
        }

        MessageKind::Location => {
            let location: LocationPayload = payload(raw, "location")?;
            MessageContent::Location {
                location: Location {
                    latitude: location.latitude,
                    longitude: location.longitude,
                    name: location.name.or_default_at("messages[0].location.name"),
                    address: location.address.or_default_at("messages[0].location.address"),
                },
            }
        }

        MessageKind::Reaction => {
            let reaction: ReactionPayload = payload(raw, "reaction")?;
            let message_id = reaction
                .message_id
                .filter(|id| !id.is_empty())
                .or(reaction.messsage_id.filter(|id| !id.is_empty()))
                .ok_or_else(|| NormalizationError::missing(message_field("reaction.message_id")))?;
            MessageContent::Reaction {
                reaction: Reaction {
                    message_id,
                    emoji: reaction.emoji.or_default_at("messages[0].reaction.emoji"),
                },
            }
        }

        MessageKind::Contacts => MessageContent::Contact {
            contacts: payload(raw, "contacts")?,
        },

        MessageKind::Button => {
            let button: QuickReplyPayload = payload(raw, "button")?;
            MessageContent::QuickReply {
                button: QuickReply {
                    text: button.text,
                    payload: button.payload,
                },
            }
        }

        MessageKind::Order => order_content(payload(raw, "order")?)?,

        MessageKind::Unsupported => MessageContent::Unknown {
            errors: match raw.get("errors") {
                None | Some(Value::Null) => Vec::new(),
                Some(errors) => decode(errors, &message_field("errors"))?,
            },
        },

        MessageKind::Other => {
            debug!(kind = ?raw.get("type"), "unrecognised message type");
            MessageContent::Unknown { errors: Vec::new() }
        }
    })
}

fn interactive_content(raw: &Value) -> Result<MessageContent, NormalizationError> {
    let interactive = match raw.get("interactive") {
        None | Some(Value::Null) => {
            return Err(NormalizationError::missing(message_field("interactive")))
        }
        Some(interactive) => interactive,
    };
    let reply = |key: &str| message_field(&format!("interactive.{key}"));
    let tag = interactive.get("type").and_then(Value::as_str);

    Ok(match InteractiveKind::from_tag(tag) {
        InteractiveKind::ButtonReply => {
            let button: ButtonReplyPayload =
                payload_at(interactive, "button_reply", reply("button_reply"))?;
            MessageContent::SimpleButton {
                id: button.id,
                title: button.title,
            }
        }
        InteractiveKind::FlowReply => {
            let flow: FlowReplyPayload = payload_at(interactive, "nfm_reply", reply("nfm_reply"))?;
            let flow_json = serde_json::from_str(&flow.response_json)
                .map_err(|source| NormalizationError::FlowResponse { source })?;
            MessageContent::Flow {
                flow_json,
                name: flow.name,
                body: flow.body,
            }
        }
        InteractiveKind::ListReply => {
            let row: ListReplyPayload = payload_at(interactive, "list_reply", reply("list_reply"))?;
            MessageContent::RadioButton {
                id: row.id,
                title: row.title,
                description: row.description,
            }
        }
    })
}

fn order_content(order: OrderPayload) -> Result<MessageContent, NormalizationError> {
    let product_items = order
        .product_items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let path =
                |field: &str| message_field(&format!("order.product_items[{index}].{field}"));
            Ok(ProductItem {
                quantity: item.quantity.parse().ok_or_else(|| {
                    NormalizationError::invalid(path("quantity"), "not a whole number")
                })?,
                item_price: item.item_price.parse().ok_or_else(|| {
                    NormalizationError::invalid(path("item_price"), "not a number")
                })?,
                product_retailer_id: item.product_retailer_id,
                currency: item.currency,
            })
        })
        .collect::<Result<_, NormalizationError>>()?;

    Ok(MessageContent::Order {
        order: Order {
            catalog_id: order.catalog_id,
            text: order.text,
            product_items,
        },
    })
}

impl From<MediaPayload> for MediaFile {
    fn from(media: MediaPayload) -> Self {
        Self {
            id: media.id,
            mime_type: media.mime_type,
            sha256: media.sha256,
            caption: media.caption,
        }
    }
}

fn normalize_notification(status: &Value) -> Result<NormalizedNotification, NormalizationError> {
    let status: StatusEvent = decode(status, STATUS_PATH)?;

    let timestamp = millis(&status.timestamp, &format!("{STATUS_PATH}.timestamp"))?;
    let recipient_phone =
        phone_number(&status.recipient_id, &format!("{STATUS_PATH}.recipient_id"))?;

    let conversation = status
        .conversation
        .or_default_at("statuses[0].conversation");
    let expiration_millis = conversation
        .expiration_timestamp
        .as_ref()
        .map(|raw| {
            millis(
                raw,
                &format!("{STATUS_PATH}.conversation.expiration_timestamp"),
            )
        })
        .transpose()?
        .or_default_at("statuses[0].conversation.expiration_timestamp");

    let pricing = status.pricing.or_default_at("statuses[0].pricing");

    Ok(NormalizedNotification {
        message_id: status.id,
        status: status.status,
        timestamp,
        recipient_phone,
        conversation: Conversation {
            id: conversation.id.or_default_at("statuses[0].conversation.id"),
            expiration_millis,
            origin_type: conversation
                .origin
                .and_then(|origin| origin.kind)
                .or_default_at("statuses[0].conversation.origin.type"),
        },
        pricing: Pricing {
            billable: pricing.billable.or_default_at("statuses[0].pricing.billable"),
            model: pricing
                .pricing_model
                .or_default_at("statuses[0].pricing.pricing_model"),
            category: pricing.category.or_default_at("statuses[0].pricing.category"),
        },
        errors: status.errors.or_default_at("statuses[0].errors"),
    })
}
