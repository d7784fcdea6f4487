//! Webhook service
//!
//! An axum [`Router`] that terminates the WhatsApp webhook subscription:
//!
//! - `GET` answers the verification handshake by echoing `hub.challenge` when
//!   `hub.mode` is `subscribe` and `hub.verify_token` matches.
//! - `POST` checks `X-Hub-Signature-256` when an app secret is configured,
//!   runs [`parse`](crate::parse) against the configured account id and hands
//!   the result to your [`Handler`] on a spawned task.
//!
//! Envelopes that fail validation or normalization are still acknowledged with
//! `200 OK`. The platform retries anything else, and a payload that failed
//! once will fail again.
//!
//! # Example
//! ```rust,no_run
//! use whatsapp_webhook_rs::{
//!     server::{EventContext, Handler, WebhookService},
//!     NormalizedNotification,
//! };
//!
//! struct Receipts;
//!
//! impl Handler for Receipts {
//!     async fn handle_notification(&self, _ctx: EventContext, status: NormalizedNotification) {
//!         println!("{} -> {}", status.message_id, status.status.as_str());
//!     }
//! }
//!
//! # async fn run() {
//! let router = WebhookService::builder("442476028955381")
//!     .verify_token("very_secret")
//!     .build(Receipts)
//!     .router("/webhook");
//! # }
//! ```

use std::{
    borrow::Cow,
    collections::HashMap,
    future::{ready, Future, Ready},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::{
    config::Config, parse, Error, NormalizedMessage, NormalizedNotification, ParsedResult,
};

pub(crate) const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const SUBSCRIBE_MODE: &str = "subscribe";

type Reply = Ready<(StatusCode, Cow<'static, str>)>;

/// Metadata about a received webhook.
#[derive(Debug, Clone)]
pub struct EventContext {
    account_id: Arc<str>,
    received_at: i64,
}

impl EventContext {
    fn now(account_id: Arc<str>) -> Self {
        let received_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default();

        Self {
            account_id,
            received_at,
        }
    }

    /// The business account the service validates against.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// When the request reached the service, in unix milliseconds.
    pub fn received_at(&self) -> i64 {
        self.received_at
    }
}

/// Receives what the webhook service parsed.
///
/// Every method has a no-op default, so implement only the ones you need.
/// [`handle`](Handler::handle) is the entry point and routes to
/// [`handle_message`](Handler::handle_message) or
/// [`handle_notification`](Handler::handle_notification).
///
/// Plain async closures taking `(EventContext, ParsedResult)` are handlers
/// too.
pub trait Handler: Send + Sync {
    #[inline]
    fn handle(&self, ctx: EventContext, result: ParsedResult) -> impl Future<Output = ()> + Send {
        async {
            match result {
                ParsedResult::Message(message) => self.handle_message(ctx, message).await,
                ParsedResult::Notification(notification) => {
                    self.handle_notification(ctx, notification).await
                }
            }
        }
    }

    /// A customer sent a message.
    fn handle_message(
        &self,
        _ctx: EventContext,
        _message: NormalizedMessage,
    ) -> impl Future<Output = ()> + Send + '_ {
        async {}
    }

    /// A previously sent message changed status.
    fn handle_notification(
        &self,
        _ctx: EventContext,
        _notification: NormalizedNotification,
    ) -> impl Future<Output = ()> + Send + '_ {
        async {}
    }

    /// The envelope was acknowledged but could not be parsed.
    ///
    /// Receives [`Error::Validation`] or [`Error::Normalization`]. The service
    /// has already logged it.
    fn handle_error(&self, _ctx: EventContext, _error: Error) -> impl Future<Output = ()> + Send + '_ {
        async {}
    }
}

impl<F, Fut> Handler for F
where
    F: Fn(EventContext, ParsedResult) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    #[inline]
    fn handle(&self, ctx: EventContext, result: ParsedResult) -> impl Future<Output = ()> + Send {
        self(ctx, result)
    }
}

/// Configures a [`WebhookService`].
#[derive(Debug, Clone)]
pub struct WebhookServiceBuilder {
    account_id: String,
    verify_token: Option<String>,
    app_secret: Option<String>,
}

impl WebhookServiceBuilder {
    /// Token the platform must present during the verification handshake.
    ///
    /// Without one every handshake is refused.
    pub fn verify_token(mut self, verify_token: impl Into<String>) -> Self {
        self.verify_token = Some(verify_token.into());
        self
    }

    /// Require `X-Hub-Signature-256` on every delivery, keyed by the app secret.
    pub fn app_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.app_secret = Some(app_secret.into());
        self
    }

    pub fn build<H: Handler + 'static>(self, handler: H) -> WebhookService<H> {
        WebhookService {
            inner: Arc::new(InnerService {
                account_id: self.account_id.into(),
                verify_token: self.verify_token,
                app_secret: self.app_secret,
                handler,
            }),
        }
    }
}

/// The webhook endpoint. Mount it with [`router`](WebhookService::router).
pub struct WebhookService<H> {
    inner: Arc<InnerService<H>>,
}

impl<H> Clone for WebhookService<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct InnerService<H> {
    account_id: Arc<str>,
    verify_token: Option<String>,
    app_secret: Option<String>,
    handler: H,
}

impl WebhookService<()> {
    /// Starts a service that accepts envelopes addressed to `account_id`.
    pub fn builder(account_id: impl Into<String>) -> WebhookServiceBuilder {
        WebhookServiceBuilder {
            account_id: account_id.into(),
            verify_token: None,
            app_secret: None,
        }
    }

    /// Starts a service from the account id, verify token and app secret in `config`.
    pub fn from_config(config: &Config) -> WebhookServiceBuilder {
        WebhookServiceBuilder {
            account_id: config.account_id.clone(),
            verify_token: config.verify_token.clone(),
            app_secret: config.app_secret.clone(),
        }
    }
}

impl<H: Handler + 'static> WebhookService<H> {
    /// Routes `GET` and `POST` on `path` to the service.
    pub fn router(self, path: &str) -> Router {
        Router::new()
            .route(path, get(handle_verification::<H>).post(handle_webhook::<H>))
            .with_state(self.inner)
    }
}

fn handle_verification<H>(
    State(state): State<Arc<InnerService<H>>>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply
where
    H: Handler + 'static,
{
    let mode = query.get("hub.mode").map(String::as_str);
    let token = query.get("hub.verify_token").map(String::as_str);

    match (&state.verify_token, mode, token) {
        (Some(expected), Some(SUBSCRIBE_MODE), Some(token)) if expected == token => {
            debug!("webhook verification accepted");
            let challenge = query.get("hub.challenge").cloned().unwrap_or_default();
            ready((StatusCode::OK, challenge.into()))
        }
        _ => {
            warn!(?mode, "webhook verification rejected");
            ready((StatusCode::FORBIDDEN, "Invalid verification token".into()))
        }
    }
}

fn handle_webhook<H>(
    State(state): State<Arc<InnerService<H>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Reply
where
    H: Handler + 'static,
{
    if let Some(secret) = &state.app_secret {
        if let Err(err) = verify_signature(secret, &headers, &body) {
            warn!(%err, "webhook signature verification failed");
            return ready((
                StatusCode::UNAUTHORIZED,
                "Signature verification failed".into(),
            ));
        }
    }

    let envelope: Value = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(%err, "webhook body is not JSON");
            return ready((
                StatusCode::BAD_REQUEST,
                "Invalid JSON payload. Please ensure the body is valid JSON.".into(),
            ));
        }
    };

    let ctx = EventContext::now(state.account_id.clone());

    match parse(&envelope, &state.account_id) {
        Ok(result) => {
            debug!(message_id = result.message_id(), "dispatching webhook event");
            tokio::spawn(async move { state.handler.handle(ctx, result).await });
        }
        Err(err) => {
            match &err {
                Error::Normalization(inner) => {
                    warn!(path = inner.path(), %err, "dropping webhook event")
                }
                _ => warn!(%err, "dropping webhook event"),
            }
            tokio::spawn(async move { state.handler.handle_error(ctx, err).await });
        }
    }

    ready((StatusCode::OK, "".into()))
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub(crate) enum SignatureError {
    #[error("missing X-Hub-Signature-256 header")]
    Missing,
    #[error("X-Hub-Signature-256 header is not visible ASCII")]
    Unreadable,
    #[error("app secret cannot key HMAC-SHA256")]
    InvalidSecret,
    #[error("signature does not match the payload")]
    Mismatch,
}

/// Checks `X-Hub-Signature-256: sha256=<hex>` against the raw body.
pub(crate) fn verify_signature(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), SignatureError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .ok_or(SignatureError::Missing)?
        .to_str()
        .map_err(|_| SignatureError::Unreadable)?;

    let expected = format!("sha256={}", sign(secret, body)?);

    if subtle::ConstantTimeEq::ct_eq(signature.as_bytes(), expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn sign(secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
