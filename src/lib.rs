#![deny(clippy::future_not_send)]
#![deny(clippy::large_enum_variant)]

//! # whatsapp_webhook_rs
//!
//! Validation and normalization of WhatsApp Cloud API webhooks.
//!
//! The platform delivers every event as the same deeply nested envelope
//! (`object` → `entry[]` → `changes[]` → `value`). This crate checks that an
//! envelope belongs to your WhatsApp Business Account and turns it into one
//! flat, strongly typed [`ParsedResult`]: either a customer
//! [`NormalizedMessage`] or a delivery [`NormalizedNotification`].
//!
//! ## ✨ Features
//!
//! - **Validation**: [`validate`] rejects envelopes that are not WhatsApp
//!   Business webhooks or are addressed to another account, and flags Meta's
//!   test-subscription traffic.
//! - **Normalization**: [`normalize`] maps text, media, location, contacts,
//!   interactive replies (buttons, lists, flows), quick replies, reactions,
//!   orders and unsupported messages, and the four delivery statuses.
//! - **Outbound drafts**: [`Draft`] builds `/messages` request bodies and
//!   enforces the platform's field-length limits before anything is sent.
//! - **Client**: a small Graph API [`Client`] for sending drafts, marking
//!   messages as read and uploading media.
//! - **Flow endpoints**: [`flow::decrypt_flow`] opens the RSA/AES-GCM
//!   encrypted requests a WhatsApp Flow data endpoint receives.
//! - **Webhook service**: an axum router with the verification handshake,
//!   signature checking, and dispatch to your [`Handler`].
//!
//! ## 🚀 Examples
//!
//! ### Parse a webhook body
//! ```rust
//! use serde_json::json;
//! use whatsapp_webhook_rs::{parse, message::MessageContent, ParsedResult};
//!
//! # fn main() -> Result<(), whatsapp_webhook_rs::Error> {
//! let body = json!({
//!     "object": "whatsapp_business_account",
//!     "entry": [{
//!         "id": "104378769380033",
//!         "changes": [{
//!             "field": "messages",
//!             "value": {
//!                 "contacts": [{ "profile": { "name": "Danish" }, "wa_id": "918657854260" }],
//!                 "messages": [{
//!                     "from": "918657854260",
//!                     "id": "wamid.ID",
//!                     "timestamp": "1733053422",
//!                     "type": "text",
//!                     "text": { "body": "hi" }
//!                 }]
//!             }
//!         }]
//!     }]
//! });
//!
//! match parse(&body, "104378769380033")? {
//!     ParsedResult::Message(message) => {
//!         if let MessageContent::Text { text } = &message.content {
//!             println!("{} says {}", message.recipient_name, text.body);
//!         }
//!     }
//!     ParsedResult::Notification(status) => {
//!         println!("{} is now {:?}", status.message_id, status.status);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ---
//!
//! ### Serve the webhook
//! ```rust,no_run
//! use whatsapp_webhook_rs::{server::EventContext, Handler, NormalizedMessage, WebhookService};
//!
//! struct Echo;
//!
//! impl Handler for Echo {
//!     async fn handle_message(&self, _ctx: EventContext, message: NormalizedMessage) {
//!         println!("received {} from {}", message.kind(), message.recipient_phone);
//!     }
//! }
//!
//! # async fn serve() -> Result<(), Box<dyn std::error::Error>> {
//! let app = WebhookService::builder("YOUR_WABA_ID")
//!     .verify_token("very_secret")
//!     .app_secret("YOUR_APP_SECRET")
//!     .build(Echo)
//!     .router("/whatsapp_webhook");
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ---
//!
//! ### Reply to a customer
//! ```rust,no_run
//! use whatsapp_webhook_rs::{Client, Config, Draft};
//!
//! # async fn reply() -> Result<(), whatsapp_webhook_rs::Error> {
//! let client = Client::from_config(&Config::from_env()?)?;
//!
//! let buttons = Draft::buttons(
//!     "Are you in?",
//!     [("in", "🟢 IN"), ("out", "🔴 OUT")],
//! )?
//! .reply_to("wamid.HBgM...");
//!
//! let receipt = client.send("918657854260", &buttons).await?;
//! println!("sent {}", receipt.message_id);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
mod defaults;
pub mod draft;
pub(crate) mod envelope;
pub mod error;
pub mod flow;
pub mod message;
pub mod normalize;
pub mod notification;
pub mod server;
pub mod validate;

pub use client::{Client, SendReceipt};
pub use config::Config;
pub use draft::Draft;
pub use error::Error;
pub use message::{MessageContent, NormalizedMessage};
pub use normalize::normalize;
pub use notification::{MessageStatus, NormalizedNotification};
pub use server::{Handler, WebhookService};
pub use validate::{validate, ValidEnvelope, ValidationWarning};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The outcome of normalizing one webhook envelope.
///
/// Serializes with a `kind` discriminator next to the flattened fields of the
/// message or notification.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(clippy::large_enum_variant)]
pub enum ParsedResult {
    /// A message sent by a customer.
    Message(NormalizedMessage),
    /// A status update for a message the business sent.
    Notification(NormalizedNotification),
}

impl ParsedResult {
    /// The id of the message this result is about.
    pub fn message_id(&self) -> &str {
        match self {
            Self::Message(message) => &message.message_id,
            Self::Notification(notification) => &notification.message_id,
        }
    }
}

/// Validates an envelope against `account_id`, then normalizes it.
///
/// Warnings recorded during validation are emitted through `tracing`; call
/// [`validate`] and [`normalize`] separately to inspect them.
pub fn parse(envelope: &Value, account_id: &str) -> Result<ParsedResult, Error> {
    let valid = validate(envelope, account_id)?;
    Ok(normalize(&valid)?)
}

/// Represents an **error object reported by Meta**, either in a Graph API
/// response or inside a webhook payload (`messages[].errors`,
/// `statuses[].errors`).
///
/// It is distinct from the crate's own [`Error`] enum: `MetaError` describes
/// issues reported by the platform itself.
///
/// # Example (from a Graph API response)
/// ```json
/// {
///   "error": {
///     "message": "(#100) Parameter missing",
///     "type": "OAuthException",
///     "code": 100,
///     "fbtrace_id": "A4K...",
///     "error_data": {
///       "messaging_product": "whatsapp",
///       "details": "The recipient phone number is not valid."
///     }
///   }
/// }
/// ```
#[derive(thiserror::Error, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
#[non_exhaustive]
pub struct MetaError {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,
    #[serde(rename = "href", default, skip_serializing_if = "Option::is_none")]
    pub support: Option<String>,
    #[serde(
        rename = "error_data",
        default,
        skip_serializing_if = "MetaErrorMetadata::is_none"
    )]
    pub error_metadata: MetaErrorMetadata,
}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(code: {})", self.code)?;

        if let Some(title) = &self.title {
            write!(f, " - {title}")?;
        }

        if let Some(r#type) = &self.r#type {
            write!(f, " (type: {})", r#type)?;
        }

        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }

        if let Some(details) = &self.error_metadata.details {
            write!(f, "\n  Details: {details}")?;
        }

        if let Some(support) = &self.support {
            write!(f, "\n  More info: {support}")?;
        }

        if let Some(id) = &self.fbtrace_id {
            write!(f, "\n  Trace ID: {id}")?;
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
#[non_exhaustive]
pub struct MetaErrorMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl MetaErrorMetadata {
    fn is_none(&self) -> bool {
        self.details.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parsed_result_is_tagged_by_kind() {
        let body = json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "442476028955381",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "statuses": [{
                            "id": "wamid.S",
                            "status": "delivered",
                            "timestamp": "1734690594",
                            "recipient_id": "918657854260"
                        }]
                    }
                }]
            }]
        });

        let result = parse(&body, "442476028955381").unwrap();
        assert_eq!(result.message_id(), "wamid.S");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "notification");
        assert_eq!(json["status"], "delivered");
        assert_eq!(json["timestamp"], 1734690594000_i64);
        assert_eq!(json["conversation"]["originType"], "");
    }

    #[test]
    fn parse_surfaces_validation_failures() {
        let err = parse(&json!({ "object": "page", "entry": [] }), "442476028955381").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn webhook_error_details_decode() {
        let error: MetaError = serde_json::from_value(json!({
            "code": 131051,
            "title": "Message type unknown",
            "message": "Message type unknown",
            "error_data": { "details": "Message type is currently not supported." }
        }))
        .unwrap();

        assert_eq!(error.code, 131051);
        assert!(error.to_string().contains("Message type is currently not supported."));
    }
}
