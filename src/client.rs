//! Graph API client.
//!
//! A thin transport for the handful of calls a webhook consumer makes back to
//! the platform: sending a [`Draft`], marking a message as read, uploading
//! media and resolving a media id to a download URL. Every call is a single
//! request; there is no retry or queueing.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use whatsapp_webhook_rs::{client::Client, Draft};
//!
//! # async fn run() -> Result<(), whatsapp_webhook_rs::Error> {
//! let client = Client::builder()
//!     .timeout(Duration::from_secs(15))
//!     .api_version("v19.0")
//!     .phone_number_id("402214169651966")
//!     .build("YOUR_ACCESS_TOKEN")?;
//!
//! let receipt = client
//!     .send("918657854260", &Draft::text("Hello from Rust!")?)
//!     .await?;
//! println!("sent {}", receipt.message_id);
//! # Ok(()) }
//! ```

use std::{path::Path, sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT},
    multipart::{Form, Part},
    Client as HttpClient, ClientBuilder as HttpClientBuilder, Response,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    config::{Config, ConfigError, DEFAULT_API_BASE, DEFAULT_API_VERSION},
    draft::{self, Draft, DraftError},
    error::{Error, ServiceError, ServiceErrorKind},
    MetaError,
};

const USER_AGENT_VALUE: &str = concat!("whatsapp-webhook-rs/", env!("CARGO_PKG_VERSION"), " (Rust)");
const OCTET_STREAM: &str = "application/octet-stream";

/// A Graph API client bound to one business phone number.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<InnerClient>,
}

#[derive(Debug)]
struct InnerClient {
    http: HttpClient,
    /// `{api_base}/{api_version}`
    base_url: String,
    phone_number_id: String,
}

/// What the platform returned for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct SendReceipt {
    /// The `wamid` of the new message.
    pub message_id: String,
    pub contacts: Vec<ReceiptContact>,
}

/// The recipient as the platform resolved it.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ReceiptContact {
    /// The number exactly as it was sent.
    pub input: String,
    pub wa_id: String,
}

/// Download details of an uploaded or received media object.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct MediaInfo {
    pub id: String,
    /// Valid for a few minutes and only with the same access token.
    pub url: String,
    pub mime_type: String,
    pub sha256: String,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl Client {
    /// Creates a client with default settings.
    pub fn new(
        access_token: &str,
        phone_number_id: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::builder()
            .phone_number_id(phone_number_id)
            .build(access_token)
    }

    /// Creates a client from a [`Config`].
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::builder()
            .api_base(config.api_base.as_str())
            .api_version(config.api_version.as_str())
            .phone_number_id(config.phone_number_id.as_str())
            .build(&config.access_token)
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The phone number id messages are sent from.
    pub fn phone_number_id(&self) -> &str {
        &self.inner.phone_number_id
    }

    fn messages_endpoint(&self) -> String {
        format!("{}/{}/messages", self.inner.base_url, self.inner.phone_number_id)
    }

    /// Sends `draft` to the WhatsApp user `to`.
    pub async fn send(&self, to: &str, draft: &Draft) -> Result<SendReceipt, Error> {
        if to.trim().is_empty() {
            return Err(DraftError::Required { field: "to" }.into());
        }

        #[derive(Deserialize)]
        struct SentMessage {
            id: String,
        }

        #[derive(Deserialize)]
        struct SendResponse {
            #[serde(default)]
            contacts: Vec<ReceiptContact>,
            #[serde(default)]
            messages: Vec<SentMessage>,
        }

        let endpoint = self.messages_endpoint();
        debug!(kind = draft.kind(), %endpoint, "sending message");

        let response = self
            .inner
            .http
            .post(&endpoint)
            .json(&draft.to_request(to))
            .send()
            .await?;

        let (status, sent): (_, SendResponse) = Self::handle_response(response, &endpoint).await?;
        let message_id = sent
            .messages
            .into_iter()
            .next()
            .map(|message| message.id)
            .ok_or_else(|| {
                ServiceError::parse("response carried no message id".into(), String::new())
                    .service(endpoint, status)
            })?;

        Ok(SendReceipt {
            message_id,
            contacts: sent.contacts,
        })
    }

    /// Marks an incoming message as read, which also marks every earlier
    /// message in the conversation as read.
    pub async fn mark_as_read(&self, message_id: &str) -> Result<(), Error> {
        #[derive(Deserialize)]
        struct SuccessStatus {
            success: bool,
        }

        let body = draft::mark_read(message_id)?;
        let endpoint = self.messages_endpoint();

        let response = self.inner.http.post(&endpoint).json(&body).send().await?;
        let (status, outcome): (_, SuccessStatus) =
            Self::handle_response(response, &endpoint).await?;

        if !outcome.success {
            return Err(ServiceError::parse(
                "operation failed".into(),
                r#"{"success":false}"#.to_owned(),
            )
            .service(endpoint, status)
            .into());
        }
        Ok(())
    }

    /// Uploads media and returns its id for use with
    /// [`MediaSource::id`](crate::draft::MediaSource::id).
    ///
    /// The MIME type is detected from the content when `mime_type` is `None`.
    pub async fn upload_media(
        &self,
        bytes: Vec<u8>,
        filename: impl Into<String>,
        mime_type: Option<&str>,
    ) -> Result<String, Error> {
        #[derive(Deserialize)]
        struct Uploaded {
            id: String,
        }

        let mime_type = mime_type
            .or_else(|| infer::get(&bytes).map(|kind| kind.mime_type()))
            .unwrap_or(OCTET_STREAM)
            .to_owned();

        let part = Part::bytes(bytes)
            .file_name(filename.into())
            .mime_str(&mime_type)?;
        let form = Form::new()
            .text("messaging_product", "whatsapp")
            .part("file", part);

        let endpoint = format!("{}/{}/media", self.inner.base_url, self.inner.phone_number_id);
        debug!(%mime_type, %endpoint, "uploading media");

        let response = self.inner.http.post(&endpoint).multipart(form).send().await?;
        let (_, uploaded): (_, Uploaded) = Self::handle_response(response, &endpoint).await?;
        Ok(uploaded.id)
    }

    /// Reads a file and uploads it. See [`Client::upload_media`].
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<String, Error> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_owned());
        self.upload_media(bytes, filename, None).await
    }

    /// Resolves a media id (from an incoming message or an upload) to its
    /// download details.
    pub async fn media_url(&self, media_id: &str) -> Result<MediaInfo, Error> {
        if media_id.trim().is_empty() {
            return Err(DraftError::Required { field: "media_id" }.into());
        }

        let endpoint = format!("{}/{media_id}", self.inner.base_url);
        let response = self.inner.http.get(&endpoint).send().await?;
        let (_, info) = Self::handle_response(response, &endpoint).await?;
        Ok(info)
    }

    /// Maps a response to `T`, or to a [`ServiceError`] naming `endpoint`.
    ///
    /// A 2xx body that carries an `error` object is treated as an API error.
    async fn handle_response<T: DeserializeOwned>(
        response: Response,
        endpoint: &str,
    ) -> Result<(reqwest::StatusCode, T), Error> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(Self::handle_not_ok(&body).service(endpoint, status).into());
        }

        let value: Value = serde_json::from_slice(&body).map_err(|err| {
            ServiceError::parse(err.into(), String::from_utf8_lossy(&body).into_owned())
                .service(endpoint, status)
        })?;

        if value.get("error").is_some() {
            return Err(Self::handle_not_ok(&body).service(endpoint, status).into());
        }

        match serde_json::from_value(value) {
            Ok(parsed) => Ok((status, parsed)),
            Err(err) => Err(ServiceError::parse(
                err.into(),
                String::from_utf8_lossy(&body).into_owned(),
            )
            .service(endpoint, status)
            .into()),
        }
    }

    fn handle_not_ok(body: &[u8]) -> ServiceErrorKind {
        #[derive(Deserialize, Debug)]
        struct ErrorBody {
            error: MetaError,
        }

        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(structured) => ServiceError::api(structured.error),
            Err(err) => ServiceError::parse(err.into(), String::from_utf8_lossy(body).into_owned()),
        }
    }
}

/// A builder for configuring and creating a [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    http: HttpClientBuilder,
    api_base: String,
    api_version: String,
    phone_number_id: Option<String>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            http: HttpClientBuilder::new(),
            api_base: DEFAULT_API_BASE.to_owned(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            phone_number_id: None,
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout for every request.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.http = self.http.timeout(duration);
        self
    }

    /// Sets the Graph API version, e.g. `"v22.0"`. A missing `v` prefix is added.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.api_version = if version.starts_with('v') {
            version
        } else {
            format!("v{version}")
        };
        self
    }

    /// Overrides `https://graph.facebook.com`, e.g. to point at a mock server.
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn phone_number_id(mut self, phone_number_id: impl Into<String>) -> Self {
        self.phone_number_id = Some(phone_number_id.into());
        self
    }

    /// Builds the client, authenticating every request with `access_token`.
    pub fn build(self, access_token: &str) -> Result<Client, Error> {
        if access_token.trim().is_empty() {
            return Err(ConfigError::Missing("access_token").into());
        }
        let phone_number_id = self
            .phone_number_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::Missing("phone_number_id"))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|err| Error::internal(err.into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(AUTHORIZATION, auth);

        let http = self.http.default_headers(headers).build()?;
        Ok(Client {
            inner: Arc::new(InnerClient {
                http,
                base_url: format!("{}/{}", self.api_base, self.api_version),
                phone_number_id,
            }),
        })
    }
}
