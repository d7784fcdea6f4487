//! Outbound message drafts.
//!
//! A [`Draft`] is the body of a Graph API `/messages` request minus the
//! recipient. Every constructor checks the platform's limits up front (button
//! titles of at most 20 characters, at most 10 list sections, and so on), so a
//! draft that exists is one the API will accept structurally.
//!
//! ## Examples
//!
//! ---
//! ### Reply buttons
//! ```rust
//! use whatsapp_webhook_rs::draft::{Draft, ReplyButton};
//!
//! # fn main() -> Result<(), whatsapp_webhook_rs::draft::DraftError> {
//! let draft = Draft::buttons(
//!     "Are you coming tonight?",
//!     [ReplyButton::new("in", "🟢 IN"), ReplyButton::new("out", "🔴 OUT")],
//! )?
//! .footer("Reply before 6pm")?
//! .reply_to("wamid.HBgM...");
//!
//! let body = serde_json::to_value(draft.to_request("918657854260")).unwrap();
//! assert_eq!(body["type"], "interactive");
//! assert_eq!(body["interactive"]["action"]["buttons"][0]["reply"]["id"], "in");
//! # Ok(())
//! # }
//! ```
//!
//! ---
//! ### A list of options
//! ```rust
//! use whatsapp_webhook_rs::draft::{Draft, Row, Section};
//!
//! # fn main() -> Result<(), whatsapp_webhook_rs::draft::DraftError> {
//! let draft = Draft::list(
//!     "Pick a delivery speed",
//!     "Shipping",
//!     [Section::new(
//!         "Delivery",
//!         [
//!             Row::new("express", "Express").description("1-2 business days"),
//!             Row::new("standard", "Standard"),
//!         ],
//!     )],
//! )?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use serde::Serialize;
use serde_json::Value;

pub const MAX_REPLY_BUTTONS: usize = 3;
pub const BUTTON_TITLE_MAX: usize = 20;
pub const BUTTON_ID_MAX: usize = 256;
pub const MAX_LIST_SECTIONS: usize = 10;
pub const ROW_ID_MAX: usize = 200;
pub const ROW_TITLE_MAX: usize = 24;
pub const ROW_DESCRIPTION_MAX: usize = 72;

const MESSAGING_PRODUCT: &str = "whatsapp";
const FLOW_MESSAGE_VERSION: &str = "3";

/// A draft violated a platform constraint.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DraftError {
    #[error("\"{field}\" is required")]
    Required { field: &'static str },

    #[error("\"{field}\" must be at most {max} characters, got {len}")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    #[error("\"{field}\" allows at most {max} entries, got {count}")]
    TooMany {
        field: &'static str,
        max: usize,
        count: usize,
    },

    #[error("\"{field}\" is out of range")]
    OutOfRange { field: &'static str },

    #[error("birthday {0:?} is not a valid date in format YYYY-MM-DD")]
    InvalidDate(String),

    #[error("\"{field}\" is not supported on {kind} messages")]
    NotAllowed {
        field: &'static str,
        kind: &'static str,
    },
}

fn require(field: &'static str, value: &str) -> Result<(), DraftError> {
    if value.trim().is_empty() {
        return Err(DraftError::Required { field });
    }
    Ok(())
}

fn at_most(field: &'static str, value: &str, max: usize) -> Result<(), DraftError> {
    let len = value.chars().count();
    if len > max {
        return Err(DraftError::TooLong { field, max, len });
    }
    Ok(())
}

fn bounded(field: &'static str, value: &str, max: usize) -> Result<(), DraftError> {
    require(field, value)?;
    at_most(field, value, max)
}

/// An outbound message, ready to be sent to any recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    context: Option<ReplyContext>,
    content: DraftContent,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct ReplyContext {
    message_id: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
enum DraftContent {
    Text(TextBody),
    Image(MediaBody),
    Video(MediaBody),
    Audio(MediaBody),
    Document(MediaBody),
    Sticker(MediaBody),
    Location(Location),
    Reaction(ReactionBody),
    Contacts(Vec<ContactCard>),
    Interactive(Interactive),
    Template(TemplateBody),
}

impl DraftContent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::Video(_) => "video",
            Self::Audio(_) => "audio",
            Self::Document(_) => "document",
            Self::Sticker(_) => "sticker",
            Self::Location(_) => "location",
            Self::Reaction(_) => "reaction",
            Self::Contacts(_) => "contacts",
            Self::Interactive(_) => "interactive",
            Self::Template(_) => "template",
        }
    }
}

/// The JSON body of a `/messages` request.
#[derive(Serialize, Debug)]
pub struct OutboundRequest<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a ReplyContext>,
    #[serde(flatten)]
    content: &'a DraftContent,
}

/// The JSON body that marks an incoming message as read.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MarkRead<'a> {
    messaging_product: &'static str,
    status: &'static str,
    message_id: &'a str,
}

/// Builds the body that marks `message_id` as read.
pub fn mark_read(message_id: &str) -> Result<MarkRead<'_>, DraftError> {
    require("message_id", message_id)?;
    Ok(MarkRead {
        messaging_product: MESSAGING_PRODUCT,
        status: "read",
        message_id,
    })
}

impl Draft {
    fn new(content: DraftContent) -> Self {
        Self {
            context: None,
            content,
        }
    }

    /// A plain text message. Link previews are off.
    pub fn text(body: impl Into<String>) -> Result<Self, DraftError> {
        let body = body.into();
        require("body", &body)?;
        Ok(Self::new(DraftContent::Text(TextBody {
            preview_url: false,
            body,
        })))
    }

    /// Up to three reply buttons under `body`.
    pub fn buttons<I, B>(body: impl Into<String>, buttons: I) -> Result<Self, DraftError>
    where
        I: IntoIterator<Item = B>,
        B: Into<ReplyButton>,
    {
        let body = body.into();
        require("body", &body)?;

        let buttons: Vec<ReplyButton> = buttons.into_iter().map(Into::into).collect();
        if buttons.is_empty() {
            return Err(DraftError::Required { field: "buttons" });
        }
        if buttons.len() > MAX_REPLY_BUTTONS {
            return Err(DraftError::TooMany {
                field: "buttons",
                max: MAX_REPLY_BUTTONS,
                count: buttons.len(),
            });
        }
        for button in &buttons {
            bounded("button.title", &button.title, BUTTON_TITLE_MAX)?;
            bounded("button.id", &button.id, BUTTON_ID_MAX)?;
        }

        Ok(Self::interactive(
            "button",
            Some(body),
            InteractiveAction::Buttons {
                buttons: buttons
                    .into_iter()
                    .map(|reply| ReplyButtonWire {
                        kind: "reply",
                        reply,
                    })
                    .collect(),
            },
        ))
    }

    /// A list message: `label` opens the list of `sections`.
    pub fn list<I>(
        body: impl Into<String>,
        label: impl Into<String>,
        sections: I,
    ) -> Result<Self, DraftError>
    where
        I: IntoIterator<Item = Section>,
    {
        let body = body.into();
        let label = label.into();
        require("body", &body)?;
        require("button", &label)?;

        let sections: Vec<Section> = sections.into_iter().collect();
        if sections.is_empty() {
            return Err(DraftError::Required { field: "sections" });
        }
        if sections.len() > MAX_LIST_SECTIONS {
            return Err(DraftError::TooMany {
                field: "sections",
                max: MAX_LIST_SECTIONS,
                count: sections.len(),
            });
        }
        for section in &sections {
            require("section.title", &section.title)?;
            if section.rows.is_empty() {
                return Err(DraftError::Required {
                    field: "section.rows",
                });
            }
            for row in &section.rows {
                bounded("row.id", &row.id, ROW_ID_MAX)?;
                bounded("row.title", &row.title, ROW_TITLE_MAX)?;
                at_most("row.description", &row.description, ROW_DESCRIPTION_MAX)?;
            }
        }

        Ok(Self::interactive(
            "list",
            Some(body),
            InteractiveAction::List {
                button: label,
                sections,
            },
        ))
    }

    /// A button that opens `url`.
    pub fn cta_url(
        body: impl Into<String>,
        display_text: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, DraftError> {
        let (body, display_text, url) = (body.into(), display_text.into(), url.into());
        require("body", &body)?;
        require("display_text", &display_text)?;
        require("url", &url)?;

        Ok(Self::interactive(
            "cta_url",
            Some(body),
            InteractiveAction::Named {
                name: "cta_url",
                parameters: Some(ActionParameters::CtaUrl { display_text, url }),
            },
        ))
    }

    /// Asks the customer to share their location.
    pub fn location_request(body: impl Into<String>) -> Result<Self, DraftError> {
        let body = body.into();
        require("body", &body)?;

        Ok(Self::interactive(
            "location_request_message",
            Some(body),
            InteractiveAction::Named {
                name: "send_location",
                parameters: None,
            },
        ))
    }

    /// Opens a WhatsApp Flow.
    pub fn flow(flow: Flow) -> Result<Self, DraftError> {
        require("flow_id", &flow.flow_id)?;
        require("flow_cta", &flow.cta)?;
        require("body", &flow.body)?;

        let (flow_action, flow_action_payload) = match flow.screen {
            Some((screen, data)) => ("navigate", Some(FlowActionPayload { screen, data })),
            None => ("data_exchange", None),
        };

        let mut draft = Self::interactive(
            "flow",
            Some(flow.body),
            InteractiveAction::Named {
                name: "flow",
                parameters: Some(ActionParameters::Flow(FlowParameters {
                    flow_message_version: FLOW_MESSAGE_VERSION,
                    flow_token: flow.token,
                    flow_id: flow.flow_id,
                    flow_cta: flow.cta,
                    mode: flow.draft.then_some("draft"),
                    flow_action,
                    flow_action_payload,
                })),
            },
        );
        if let DraftContent::Interactive(interactive) = &mut draft.content {
            interactive.header = flow.header.map(InteractiveHeader::text);
            interactive.footer = flow.footer.map(TextObject::new);
        }
        Ok(draft)
    }

    fn interactive(kind: &'static str, body: Option<String>, action: InteractiveAction) -> Self {
        Self::new(DraftContent::Interactive(Interactive {
            kind,
            header: None,
            body: body.map(TextObject::new),
            footer: None,
            action,
        }))
    }

    /// An image, video, audio, document or sticker message.
    pub fn media(media: Media) -> Result<Self, DraftError> {
        let kind = media.kind;
        let body = media.into_body()?;

        Ok(Self::new(match kind {
            MediaKind::Image => DraftContent::Image(body),
            MediaKind::Video => DraftContent::Video(body),
            MediaKind::Audio => DraftContent::Audio(body),
            MediaKind::Document => DraftContent::Document(body),
            MediaKind::Sticker => DraftContent::Sticker(body),
        }))
    }

    pub fn location(location: Location) -> Result<Self, DraftError> {
        if !location.latitude.is_finite() || !(-90.0..=90.0).contains(&location.latitude) {
            return Err(DraftError::OutOfRange { field: "latitude" });
        }
        if !location.longitude.is_finite() || !(-180.0..=180.0).contains(&location.longitude) {
            return Err(DraftError::OutOfRange { field: "longitude" });
        }
        Ok(Self::new(DraftContent::Location(location)))
    }

    /// Reacts to `message_id` with `emoji`.
    pub fn reaction(
        message_id: impl Into<String>,
        emoji: impl Into<String>,
    ) -> Result<Self, DraftError> {
        let (message_id, emoji) = (message_id.into(), emoji.into());
        require("message_id", &message_id)?;
        require("emoji", &emoji)?;
        Ok(Self::new(DraftContent::Reaction(ReactionBody {
            message_id,
            emoji,
        })))
    }

    /// Shares one or more contact cards.
    pub fn contacts<I>(cards: I) -> Result<Self, DraftError>
    where
        I: IntoIterator<Item = ContactCard>,
    {
        let cards: Vec<ContactCard> = cards.into_iter().collect();
        if cards.is_empty() {
            return Err(DraftError::Required { field: "contacts" });
        }
        for card in &cards {
            require("name.first_name", &card.name.first_name)?;
            require("name.last_name", &card.name.last_name)?;
            if let Some(birthday) = &card.birthday {
                if !is_calendar_date(birthday) {
                    return Err(DraftError::InvalidDate(birthday.clone()));
                }
            }
        }
        Ok(Self::new(DraftContent::Contacts(cards)))
    }

    /// A pre-approved message template.
    pub fn template(template: Template) -> Result<Self, DraftError> {
        require("template.name", &template.name)?;
        require("template.language", &template.language)?;

        let mut components = Vec::new();

        if let Some(media) = template.header {
            let kind = media.kind;
            let body = media.into_body()?;
            let parameter = match kind {
                MediaKind::Image => TemplateParameter::Image { image: body },
                MediaKind::Video => TemplateParameter::Video { video: body },
                MediaKind::Document => TemplateParameter::Document { document: body },
                MediaKind::Audio | MediaKind::Sticker => {
                    return Err(DraftError::NotAllowed {
                        field: "header",
                        kind: "template",
                    })
                }
            };
            components.push(TemplateComponent::Header {
                parameters: vec![parameter],
            });
        }

        if !template.body_text.is_empty() {
            components.push(TemplateComponent::Body {
                parameters: template
                    .body_text
                    .into_iter()
                    .map(|text| TemplateParameter::Text { text })
                    .collect(),
            });
        }

        for (index, button) in template.buttons.into_iter().enumerate() {
            let (sub_type, parameter) = match button {
                TemplateButton::QuickReply(payload) => {
                    require("button.payload", &payload)?;
                    ("quick_reply", TemplateParameter::Payload { payload })
                }
                TemplateButton::Url(text) => {
                    require("button.url", &text)?;
                    ("url", TemplateParameter::Text { text })
                }
            };
            components.push(TemplateComponent::Button {
                sub_type,
                index: index.to_string(),
                parameters: vec![parameter],
            });
        }

        Ok(Self::new(DraftContent::Template(TemplateBody {
            name: template.name,
            language: TemplateLanguage {
                code: template.language,
            },
            components,
        })))
    }

    /// Sends this draft as a reply to `message_id`.
    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.context = Some(ReplyContext {
            message_id: message_id.into(),
        });
        self
    }

    /// Adds a text header to an interactive message.
    pub fn header(self, text: impl Into<String>) -> Result<Self, DraftError> {
        self.with_interactive("header", |interactive| {
            interactive.header = Some(InteractiveHeader::text(text.into()))
        })
    }

    /// Adds a footer to an interactive message.
    pub fn footer(self, text: impl Into<String>) -> Result<Self, DraftError> {
        self.with_interactive("footer", |interactive| {
            interactive.footer = Some(TextObject::new(text.into()))
        })
    }

    fn with_interactive(
        mut self,
        field: &'static str,
        apply: impl FnOnce(&mut Interactive),
    ) -> Result<Self, DraftError> {
        match &mut self.content {
            DraftContent::Interactive(interactive) => {
                apply(interactive);
                Ok(self)
            }
            other => Err(DraftError::NotAllowed {
                field,
                kind: other.kind(),
            }),
        }
    }

    /// The message `type` this draft is sent as.
    pub fn kind(&self) -> &'static str {
        self.content.kind()
    }

    /// The request body for sending this draft to `to`.
    pub fn to_request<'a>(&'a self, to: &'a str) -> OutboundRequest<'a> {
        OutboundRequest {
            messaging_product: MESSAGING_PRODUCT,
            recipient_type: "individual",
            to,
            kind: self.content.kind(),
            context: self.context.as_ref(),
            content: &self.content,
        }
    }
}

impl fmt::Display for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} draft", self.kind())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct TextBody {
    preview_url: bool,
    body: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct TextObject {
    text: String,
}

impl TextObject {
    fn new(text: String) -> Self {
        Self { text }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct InteractiveHeader {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

impl InteractiveHeader {
    fn text(text: String) -> Self {
        Self { kind: "text", text }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct Interactive {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<InteractiveHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<TextObject>,
    action: InteractiveAction,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum InteractiveAction {
    Buttons {
        buttons: Vec<ReplyButtonWire>,
    },
    List {
        button: String,
        sections: Vec<Section>,
    },
    Named {
        name: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        parameters: Option<ActionParameters>,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum ActionParameters {
    CtaUrl { display_text: String, url: String },
    Flow(FlowParameters),
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct ReplyButtonWire {
    #[serde(rename = "type")]
    kind: &'static str,
    reply: ReplyButton,
}

/// A button that sends its `id` back when tapped.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ReplyButton {
    pub id: String,
    pub title: String,
}

impl ReplyButton {
    #[inline]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

impl<I: Into<String>, T: Into<String>> From<(I, T)> for ReplyButton {
    #[inline]
    fn from((id, title): (I, T)) -> Self {
        Self::new(id, title)
    }
}

/// A titled group of rows in a list message.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Section {
    pub title: String,
    pub rows: Vec<Row>,
}

impl Section {
    #[inline]
    pub fn new<I>(title: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = Row>,
    {
        Self {
            title: title.into(),
            rows: rows.into_iter().collect(),
        }
    }
}

/// One selectable row of a list message.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Row {
    pub id: String,
    pub title: String,
    pub description: String,
}

impl Row {
    #[inline]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
        }
    }

    #[inline]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// The kinds of media a message can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Sticker => "sticker",
        }
    }

    fn accepts_caption(&self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Document)
    }
}

/// Where the platform fetches media from.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    /// A media id returned by [`Client::upload_media`](crate::Client::upload_media).
    Id(String),
    /// A public HTTPS URL.
    Link(String),
}

impl MediaSource {
    #[inline]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    #[inline]
    pub fn link(link: impl Into<String>) -> Self {
        Self::Link(link.into())
    }

    fn value(&self) -> &str {
        match self {
            Self::Id(value) | Self::Link(value) => value,
        }
    }
}

/// A media attachment for [`Draft::media`] or a template header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    kind: MediaKind,
    source: MediaSource,
    caption: Option<String>,
    filename: Option<String>,
}

impl Media {
    #[inline]
    pub fn new(kind: MediaKind, source: MediaSource) -> Self {
        Self {
            kind,
            source,
            caption: None,
            filename: None,
        }
    }

    pub fn image(source: MediaSource) -> Self {
        Self::new(MediaKind::Image, source)
    }

    pub fn video(source: MediaSource) -> Self {
        Self::new(MediaKind::Video, source)
    }

    pub fn audio(source: MediaSource) -> Self {
        Self::new(MediaKind::Audio, source)
    }

    pub fn document(source: MediaSource) -> Self {
        Self::new(MediaKind::Document, source)
    }

    pub fn sticker(source: MediaSource) -> Self {
        Self::new(MediaKind::Sticker, source)
    }

    /// Only images, videos and documents accept a caption.
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Only documents accept a filename.
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    fn into_body(self) -> Result<MediaBody, DraftError> {
        let field = match self.source {
            MediaSource::Id(_) => "id",
            MediaSource::Link(_) => "link",
        };
        require(field, self.source.value())?;

        let kind = self.kind.as_str();
        if self.caption.is_some() && !self.kind.accepts_caption() {
            return Err(DraftError::NotAllowed {
                field: "caption",
                kind,
            });
        }
        if self.filename.is_some() && self.kind != MediaKind::Document {
            return Err(DraftError::NotAllowed {
                field: "filename",
                kind,
            });
        }

        Ok(MediaBody {
            source: self.source,
            caption: self.caption,
            filename: self.filename,
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct MediaBody {
    #[serde(flatten)]
    source: MediaSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
}

/// A pinned location.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            name: None,
            address: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct ReactionBody {
    message_id: String,
    emoji: String,
}

/// A contact card. First and last name are required.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContactCard {
    pub name: ContactName,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<ContactPhone>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<ContactEmail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<ContactUrl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<ContactOrg>,
    /// `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContactName {
    pub formatted_name: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContactPhone {
    pub phone: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wa_id: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContactEmail {
    pub email: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContactUrl {
    pub url: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct ContactOrg {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ContactCard {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        let (first_name, last_name) = (first_name.into(), last_name.into());
        Self {
            name: ContactName {
                formatted_name: format!("{first_name} {last_name}").trim().to_owned(),
                first_name,
                last_name,
            },
            phones: Vec::new(),
            emails: Vec::new(),
            urls: Vec::new(),
            org: None,
            birthday: None,
        }
    }

    /// Adds a phone number; `kind` is a label such as `"CELL"` or `"WORK"`.
    pub fn phone(mut self, phone: impl Into<String>, kind: Option<&str>) -> Self {
        self.phones.push(ContactPhone {
            phone: phone.into(),
            kind: kind.map(str::to_owned),
            wa_id: None,
        });
        self
    }

    pub fn email(mut self, email: impl Into<String>, kind: Option<&str>) -> Self {
        self.emails.push(ContactEmail {
            email: email.into(),
            kind: kind.map(str::to_owned),
        });
        self
    }

    pub fn url(mut self, url: impl Into<String>, kind: Option<&str>) -> Self {
        self.urls.push(ContactUrl {
            url: url.into(),
            kind: kind.map(str::to_owned),
        });
        self
    }

    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.org.get_or_insert_with(ContactOrg::default).company = Some(company.into());
        self
    }

    pub fn birthday(mut self, birthday: impl Into<String>) -> Self {
        self.birthday = Some(birthday.into());
        self
    }
}

fn is_calendar_date(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return false;
    };
    if year.len() != 4 || month.len() != 2 || day.len() != 2 {
        return false;
    }
    let (Ok(year), Ok(month), Ok(day)) = (
        year.parse::<u32>(),
        month.parse::<u32>(),
        day.parse::<u32>(),
    ) else {
        return false;
    };

    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let days_in_month = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        2 => 28,
        _ => return false,
    };
    (1..=days_in_month).contains(&day)
}

/// A message template reference with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    language: String,
    header: Option<Media>,
    body_text: Vec<String>,
    buttons: Vec<TemplateButton>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateButton {
    QuickReply(String),
    Url(String),
}

impl Template {
    /// `language` is a locale code such as `en_US`.
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            header: None,
            body_text: Vec::new(),
            buttons: Vec::new(),
        }
    }

    /// Fills the body's `{{n}}` placeholders in order.
    pub fn body_text<I, T>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.body_text = parameters.into_iter().map(Into::into).collect();
        self
    }

    /// An image, video or document header.
    pub fn header_media(mut self, media: Media) -> Self {
        self.header = Some(media);
        self
    }

    /// The payload returned when the next quick-reply button is tapped.
    pub fn quick_reply(mut self, payload: impl Into<String>) -> Self {
        self.buttons.push(TemplateButton::QuickReply(payload.into()));
        self
    }

    /// The dynamic suffix of the next URL button.
    pub fn url_button(mut self, suffix: impl Into<String>) -> Self {
        self.buttons.push(TemplateButton::Url(suffix.into()));
        self
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct TemplateBody {
    name: String,
    language: TemplateLanguage,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<TemplateComponent>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct TemplateLanguage {
    code: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TemplateComponent {
    Header {
        parameters: Vec<TemplateParameter>,
    },
    Body {
        parameters: Vec<TemplateParameter>,
    },
    Button {
        sub_type: &'static str,
        index: String,
        parameters: Vec<TemplateParameter>,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TemplateParameter {
    Text { text: String },
    Payload { payload: String },
    Image { image: MediaBody },
    Video { video: MediaBody },
    Document { document: MediaBody },
}

/// A WhatsApp Flow invitation.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    flow_id: String,
    cta: String,
    body: String,
    token: Option<String>,
    header: Option<String>,
    footer: Option<String>,
    screen: Option<(String, Value)>,
    draft: bool,
}

impl Flow {
    /// `cta` is the label of the button that opens the flow.
    pub fn new(flow_id: impl Into<String>, cta: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            cta: cta.into(),
            body: body.into(),
            token: None,
            header: None,
            footer: None,
            screen: None,
            draft: false,
        }
    }

    /// An opaque token echoed back in the flow's completion message.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Opens the flow at `screen` with `data`. Without it the flow starts with
    /// a data exchange against your endpoint.
    pub fn screen(mut self, screen: impl Into<String>, data: Value) -> Self {
        self.screen = Some((screen.into(), data));
        self
    }

    /// Sends an unpublished flow.
    pub fn draft_mode(mut self) -> Self {
        self.draft = true;
        self
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct FlowParameters {
    flow_message_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    flow_token: Option<String>,
    flow_id: String,
    flow_cta: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<&'static str>,
    flow_action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    flow_action_payload: Option<FlowActionPayload>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct FlowActionPayload {
    screen: String,
    data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(draft: &Draft) -> Value {
        serde_json::to_value(draft.to_request("918657854260")).unwrap()
    }

    #[test]
    fn text_request_shape() {
        let draft = Draft::text("hello").unwrap().reply_to("wamid.PREV");
        assert_eq!(
            body(&draft),
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "918657854260",
                "type": "text",
                "context": { "message_id": "wamid.PREV" },
                "text": { "preview_url": false, "body": "hello" }
            })
        );

        assert_eq!(
            Draft::text("  ").unwrap_err(),
            DraftError::Required { field: "body" }
        );
    }

    #[test]
    fn button_limits() {
        let err = Draft::buttons("pick", [("id", "a title that is far too long")]).unwrap_err();
        assert!(matches!(
            err,
            DraftError::TooLong {
                field: "button.title",
                max: 20,
                ..
            }
        ));

        let long_id = "x".repeat(257);
        let err = Draft::buttons("pick", [(long_id.as_str(), "ok")]).unwrap_err();
        assert!(matches!(err, DraftError::TooLong { field: "button.id", .. }));

        let err = Draft::buttons("pick", [("a", "A"), ("b", "B"), ("c", "C"), ("d", "D")])
            .unwrap_err();
        assert!(matches!(err, DraftError::TooMany { max: 3, count: 4, .. }));

        let err = Draft::buttons("pick", Vec::<ReplyButton>::new()).unwrap_err();
        assert_eq!(err, DraftError::Required { field: "buttons" });
    }

    #[test]
    fn titles_are_measured_in_characters() {
        // 20 characters, more than 20 bytes.
        let title = "🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢";
        assert!(Draft::buttons("pick", [("in", title)]).is_ok());
    }

    #[test]
    fn list_request_shape_and_limits() {
        let draft = Draft::list(
            "Pick one",
            "Options",
            [Section::new("Speed", [Row::new("fast", "Fast")])],
        )
        .unwrap()
        .header("Shipping")
        .unwrap();

        let body = body(&draft);
        assert_eq!(body["interactive"]["type"], "list");
        assert_eq!(body["interactive"]["header"]["text"], "Shipping");
        assert_eq!(body["interactive"]["action"]["button"], "Options");
        assert_eq!(
            body["interactive"]["action"]["sections"][0]["rows"][0],
            json!({ "id": "fast", "title": "Fast", "description": "" })
        );

        let sections = (0..11).map(|i| Section::new(format!("s{i}"), [Row::new("r", "R")]));
        assert!(matches!(
            Draft::list("b", "l", sections).unwrap_err(),
            DraftError::TooMany { field: "sections", .. }
        ));

        let err = Draft::list(
            "b",
            "l",
            [Section::new("s", [Row::new("r", "R").description("d".repeat(73))])],
        )
        .unwrap_err();
        assert!(matches!(err, DraftError::TooLong { max: 72, .. }));

        let err = Draft::list("b", "l", [Section::new("", [Row::new("r", "R")])]).unwrap_err();
        assert_eq!(err, DraftError::Required { field: "section.title" });
    }

    #[test]
    fn footer_only_on_interactive() {
        let err = Draft::text("hi").unwrap().footer("bye").unwrap_err();
        assert_eq!(
            err,
            DraftError::NotAllowed {
                field: "footer",
                kind: "text"
            }
        );
    }

    #[test]
    fn media_by_id_or_link() {
        let draft = Draft::media(
            Media::document(MediaSource::id("1234"))
                .caption("invoice")
                .filename("invoice.pdf"),
        )
        .unwrap();
        assert_eq!(
            body(&draft)["document"],
            json!({ "id": "1234", "caption": "invoice", "filename": "invoice.pdf" })
        );

        let draft = Draft::media(Media::image(MediaSource::link("https://example.com/a.png"))).unwrap();
        assert_eq!(body(&draft)["image"], json!({ "link": "https://example.com/a.png" }));

        let err = Draft::media(Media::audio(MediaSource::id("1")).caption("no")).unwrap_err();
        assert!(matches!(err, DraftError::NotAllowed { field: "caption", .. }));
    }

    #[test]
    fn reaction_requires_emoji() {
        assert_eq!(
            Draft::reaction("wamid.X", "").unwrap_err(),
            DraftError::Required { field: "emoji" }
        );
        let draft = Draft::reaction("wamid.X", "👍").unwrap();
        assert_eq!(body(&draft)["reaction"]["emoji"], "👍");
    }

    #[test]
    fn contacts_validation() {
        let err = Draft::contacts([ContactCard::new("Ada", "")]).unwrap_err();
        assert_eq!(err, DraftError::Required { field: "name.last_name" });

        let err =
            Draft::contacts([ContactCard::new("Ada", "Lovelace").birthday("1815-13-10")]).unwrap_err();
        assert_eq!(err, DraftError::InvalidDate("1815-13-10".into()));

        let draft = Draft::contacts([ContactCard::new("Ada", "Lovelace")
            .birthday("1815-12-10")
            .phone("+441234", Some("CELL"))])
        .unwrap();
        let body = body(&draft);
        assert_eq!(body["type"], "contacts");
        assert_eq!(body["contacts"][0]["name"]["formatted_name"], "Ada Lovelace");
        assert_eq!(body["contacts"][0]["phones"][0]["type"], "CELL");
        assert!(body["contacts"][0].get("emails").is_none());
    }

    #[test]
    fn calendar_dates() {
        assert!(is_calendar_date("2024-02-29"));
        assert!(!is_calendar_date("2023-02-29"));
        assert!(!is_calendar_date("2023-2-01"));
        assert!(!is_calendar_date("yesterday"));
    }

    #[test]
    fn template_components() {
        let draft = Draft::template(
            Template::new("order_update", "en_US")
                .header_media(Media::image(MediaSource::id("55")))
                .body_text(["Ada", "#42"])
                .quick_reply("TRACK"),
        )
        .unwrap();

        let body = body(&draft);
        assert_eq!(body["template"]["language"]["code"], "en_US");
        assert_eq!(
            body["template"]["components"],
            json!([
                { "type": "header", "parameters": [{ "type": "image", "image": { "id": "55" } }] },
                { "type": "body", "parameters": [
                    { "type": "text", "text": "Ada" },
                    { "type": "text", "text": "#42" }
                ] },
                { "type": "button", "sub_type": "quick_reply", "index": "0",
                  "parameters": [{ "type": "payload", "payload": "TRACK" }] }
            ])
        );

        assert_eq!(
            Draft::template(Template::new("name", "")).unwrap_err(),
            DraftError::Required {
                field: "template.language"
            }
        );
    }

    #[test]
    fn flow_actions() {
        let draft = Draft::flow(Flow::new("1234", "Book now", "Pick a slot").token("tok")).unwrap();
        let request = body(&draft);
        let parameters = &request["interactive"]["action"]["parameters"];
        assert_eq!(parameters["flow_message_version"], "3");
        assert_eq!(parameters["flow_action"], "data_exchange");
        assert!(parameters.get("flow_action_payload").is_none());
        assert!(parameters.get("mode").is_none());

        let draft = Draft::flow(
            Flow::new("1234", "Book now", "Pick a slot")
                .screen("SLOTS", json!({ "day": "mon" }))
                .draft_mode(),
        )
        .unwrap();
        let request = body(&draft);
        let parameters = &request["interactive"]["action"]["parameters"];
        assert_eq!(parameters["flow_action"], "navigate");
        assert_eq!(parameters["mode"], "draft");
        assert_eq!(parameters["flow_action_payload"]["screen"], "SLOTS");
    }

    #[test]
    fn cta_and_location_request() {
        let draft = Draft::cta_url("See menu", "Open", "https://example.com").unwrap();
        assert_eq!(
            body(&draft)["interactive"]["action"],
            json!({ "name": "cta_url", "parameters": { "display_text": "Open", "url": "https://example.com" } })
        );

        let draft = Draft::location_request("Where are you?").unwrap();
        let body = body(&draft);
        assert_eq!(body["interactive"]["type"], "location_request_message");
        assert_eq!(body["interactive"]["action"], json!({ "name": "send_location" }));
    }

    #[test]
    fn location_range() {
        assert!(Draft::location(Location::new(91.0, 0.0)).is_err());
        let draft = Draft::location(Location::new(37.44, -122.16).name("Philz Coffee")).unwrap();
        assert_eq!(body(&draft)["location"]["name"], "Philz Coffee");
    }

    #[test]
    fn mark_read_body() {
        assert_eq!(
            serde_json::to_value(mark_read("wamid.X").unwrap()).unwrap(),
            json!({ "messaging_product": "whatsapp", "status": "read", "message_id": "wamid.X" })
        );
    }
}
