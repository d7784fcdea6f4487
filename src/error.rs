//! Error Handling
//!
//! This module defines the crate's error types. The two inbound failure modes
//! are kept apart so callers can tell them from one another:
//!
//! - [`ValidationError`]: the envelope is not a WhatsApp Business webhook, or it
//!   is addressed to another business account. Drop the event, but still answer
//!   the platform with a 2xx so it does not retry.
//! - [`NormalizationError`]: the envelope passed validation but the message or
//!   status inside it is missing a field its declared type requires. This
//!   usually means a new or unexpected wire shape. Log and drop; do not retry.
//!
//! Outbound failures (building a [`Draft`](crate::draft::Draft), talking to the
//! Graph API) are reported through the top-level [`Error`].

use std::error::Error as StdError;

use reqwest::StatusCode;

use crate::{
    config::ConfigError, draft::DraftError, flow::FlowError, validate::ValidationWarning, MetaError,
};

/// The **top-level error enum** for the crate.
///
/// It aggregates every category of failure the crate can produce so that
/// `?` works across validation, normalization and API calls alike.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The inbound envelope was rejected by the validator.
    #[error("Webhook validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The inbound envelope was valid but its message or status could not be normalized.
    #[error("Webhook normalization failed: {0}")]
    Normalization(#[from] NormalizationError),

    /// An outbound draft violated a platform constraint (length limits, required fields).
    #[error("Invalid outbound message: {0}")]
    Draft(#[from] DraftError),

    /// Configuration was incomplete.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// An encrypted flow endpoint payload could not be decrypted or answered.
    #[error("Flow payload error: {0}")]
    Flow(#[from] FlowError),

    /// Represents an error occurring during network operations (e.g., HTTP requests,
    /// connection issues, DNS resolution failures, or TLS errors).
    #[error("A network error occurred: {0}")]
    Network(#[from] BoxError),

    /// Represents an error reported by the Graph API, or a response body the
    /// crate could not make sense of.
    #[error("An API service error occurred: {0}")]
    Service(#[from] ServiceError),

    /// Represents an **I/O error**, such as reading a file for upload.
    #[error("An I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    /// Represents an **internal logic error**, typically a request that could not
    /// be built from the given input.
    #[error("An internal library error occurred: {0}")]
    Internal(BoxError),
}

impl Error {
    pub(crate) fn network(err: BoxError) -> Self {
        Self::Network(err)
    }

    pub(crate) fn internal(err: BoxError) -> Self {
        Self::Internal(err)
    }
}

/// An inbound envelope was rejected.
///
/// Carries the failed check and any warnings recorded before the failure
/// (for example a sandbox account id of `"0"`).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{kind}")]
#[non_exhaustive]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, warnings: Vec<ValidationWarning>) -> Self {
        Self { kind, warnings }
    }

    /// Returns the check that failed.
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }

    /// Returns the warnings recorded before validation failed.
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }
}

/// The validation check that rejected an envelope.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationErrorKind {
    /// The request body was `null`.
    #[error("\"requestBody\" is required")]
    MissingEnvelope,

    /// No expected business account id was configured.
    #[error(
        "The expected WhatsApp Business Account id is required. \
         This is the business id configured for your WABA."
    )]
    MissingAccountId,

    /// `entry` is absent or not an array.
    #[error("requestBody is not a valid WhatsApp message. Hint: check the \"entry\" property")]
    InvalidEntry,

    /// `object` is absent or is not `whatsapp_business_account`.
    #[error(
        "requestBody is not a valid WhatsApp message. Hint: check the \"object\" property \
         (found {found:?}, expected \"whatsapp_business_account\")"
    )]
    InvalidObject { found: Option<String> },

    /// `entry[0].id` is absent or differs from the configured account id.
    #[error(
        "WABA id {found:?} is not valid. Hint: the message is not intended for this \
         WhatsApp Business Account."
    )]
    AccountMismatch { found: Option<String> },

    /// `entry[0].changes` is empty, not an array, or its first field is not `messages`.
    #[error("requestBody is not a valid WhatsApp message. Hint: check the \"changes\" property")]
    InvalidChanges,
}

/// A validated envelope could not be turned into a [`ParsedResult`](crate::ParsedResult).
///
/// Every variant names the offending field path, e.g.
/// `entry[0].changes[0].value.messages[0].text`.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum NormalizationError {
    /// The change value carried neither `messages` nor `statuses`.
    #[error(
        "Unable to parse incoming message or notification. \
         Ensure your WABA payload is in the correct format."
    )]
    Empty,

    /// A field required by the declared message type is absent.
    #[error("Missing required field '{path}'")]
    MissingField { path: String },

    /// A field is present but its value is unusable.
    #[error("Invalid value at '{path}': {reason}")]
    InvalidField { path: String, reason: String },

    /// A sub-structure does not match the expected shape.
    #[error("Malformed payload at '{path}': {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A flow reply's `response_json` is not valid JSON.
    #[error("Flow reply 'response_json' is not valid JSON: {source}")]
    FlowResponse {
        #[source]
        source: serde_json::Error,
    },
}

impl NormalizationError {
    pub(crate) fn missing(path: impl Into<String>) -> Self {
        Self::MissingField { path: path.into() }
    }

    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }

    /// Returns the field path this error refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::MissingField { path }
            | Self::InvalidField { path, .. }
            | Self::Malformed { path, .. } => Some(path),
            Self::Empty | Self::FlowResponse { .. } => None,
        }
    }
}

/// Represents **service-level errors** encountered during API interactions.
/// This struct provides context such as the HTTP status code, the affected endpoint,
/// and a more specific error kind.
#[derive(thiserror::Error, Debug)]
#[error("Service error at endpoint '{endpoint}': {kind} (HTTP status {status})")]
#[non_exhaustive]
pub struct ServiceError {
    pub(crate) status: StatusCode,
    pub(crate) kind: ServiceErrorKind,
    pub(crate) endpoint: String,
}

impl ServiceError {
    /// Returns the HTTP status code associated with this service error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the API endpoint where this service error occurred.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the specific kind of service error.
    pub fn kind(&self) -> &ServiceErrorKind {
        &self.kind
    }

    pub(crate) fn api(error: MetaError) -> ServiceErrorKind {
        ServiceErrorKind::Api(ApiError {
            error: Box::new(error),
        })
    }

    pub(crate) fn parse(source: BoxError, body: String) -> ServiceErrorKind {
        ServiceErrorKind::Parse(ParseError {
            source: Some(source),
            body,
        })
    }
}

/// A sub-category of [`ServiceError`].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ServiceErrorKind {
    /// Meta's API reported an error, either with a non-2xx status or with an
    /// `error` object in an otherwise successful response.
    #[error("The API returned an error: {0}")]
    Api(#[from] ApiError),

    /// The response body could not be deserialized.
    #[error("Failed to parse the API response: {0}")]
    Parse(#[from] ParseError),
}

impl ServiceErrorKind {
    pub(crate) fn service(self, endpoint: impl Into<String>, status: StatusCode) -> ServiceError {
        ServiceError {
            status,
            kind: self,
            endpoint: endpoint.into(),
        }
    }
}

/// An error reported by Meta in an API response body.
#[derive(thiserror::Error, Debug)]
#[error("Meta API error: {error}")]
#[non_exhaustive]
pub struct ApiError {
    pub error: Box<MetaError>,
}

/// Represents an error that occurred while deserializing a response body.
///
/// # Fields
/// - `source`: the underlying cause (usually a `serde_json::Error`).
/// - `body`: the raw body that could not be parsed, useful for debugging.
#[derive(thiserror::Error, Debug)]
#[error("Failed to parse the response body. Raw body content was: '{}'.", body)]
#[non_exhaustive]
pub struct ParseError {
    #[source]
    pub(crate) source: Option<BoxError>,
    pub body: String,
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_builder() || value.is_redirect() {
            // Builder and redirect errors point to a malformed request, not the network.
            Self::internal(value.into())
        } else {
            Self::network(value.into())
        }
    }
}

/// A boxed, thread-safe trait-object error.
pub type BoxError = Box<dyn StdError + Send + Sync>;
