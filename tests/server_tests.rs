mod common;

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tower::ServiceExt;
use whatsapp_webhook_rs::{
    server::{EventContext, Handler, WebhookService},
    Error, NormalizedMessage, NormalizedNotification, ParsedResult,
};

const PATH: &str = "/whatsapp_webhook";

#[derive(Debug)]
enum Seen {
    Message(NormalizedMessage),
    Notification(NormalizedNotification),
    Error(Error),
}

struct Recorder {
    tx: UnboundedSender<Seen>,
}

impl Handler for Recorder {
    async fn handle_message(&self, ctx: EventContext, message: NormalizedMessage) {
        assert_eq!(ctx.account_id(), WABA_ID);
        let _ = self.tx.send(Seen::Message(message));
    }

    async fn handle_notification(&self, _ctx: EventContext, notification: NormalizedNotification) {
        let _ = self.tx.send(Seen::Notification(notification));
    }

    async fn handle_error(&self, _ctx: EventContext, error: Error) {
        let _ = self.tx.send(Seen::Error(error));
    }
}

fn app(app_secret: Option<&str>) -> (Router, UnboundedReceiver<Seen>) {
    let (tx, rx) = unbounded_channel();
    let mut builder = WebhookService::builder(WABA_ID).verify_token(VERIFY_TOKEN);
    if let Some(secret) = app_secret {
        builder = builder.app_secret(secret);
    }
    (builder.build(Recorder { tx }).router(PATH), rx)
}

fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(APP_SECRET.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn post(body: impl Into<Body>, signature: Option<&str>) -> Request<Body> {
    let mut request = Request::post(PATH).header("content-type", "application/json");
    if let Some(signature) = signature {
        request = request.header("x-hub-signature-256", signature);
    }
    request.body(body.into()).unwrap()
}

async fn next(rx: &mut UnboundedReceiver<Seen>) -> Seen {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("handler was not called")
        .expect("channel closed")
}

async fn text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn verification_echoes_challenge() {
    let (app, _rx) = app(None);

    let uri = format!(
        "{PATH}?hub.mode=subscribe&hub.challenge=1158201444&hub.verify_token={VERIFY_TOKEN}"
    );
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text(response).await, "1158201444");
}

#[tokio::test]
async fn verification_rejects_wrong_token_or_mode() {
    for query in [
        "hub.mode=subscribe&hub.challenge=1&hub.verify_token=guess",
        "hub.mode=unsubscribe&hub.challenge=1&hub.verify_token=very_secret",
        "hub.challenge=1",
    ] {
        let (app, _rx) = app(None);
        let response = app
            .oneshot(
                Request::get(format!("{PATH}?{query}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{query}");
    }
}

#[tokio::test]
async fn message_is_dispatched_to_handler() {
    let (app, mut rx) = app(None);
    let body = serde_json::to_vec(&text_message()).unwrap();

    let response = app.oneshot(post(body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    match next(&mut rx).await {
        Seen::Message(message) => {
            assert_eq!(message.recipient_name, "Danish");
            assert_eq!(message.kind(), "text");
        }
        other => panic!("expected a message, got {other:?}"),
    }
}

#[tokio::test]
async fn signed_notification_is_accepted() {
    let (app, mut rx) = app(Some(APP_SECRET));
    let body = serde_json::to_vec(&sent_notification()).unwrap();
    let signature = sign(&body);

    let response = app.oneshot(post(body, Some(&signature))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    match next(&mut rx).await {
        Seen::Notification(notification) => {
            assert_eq!(notification.timestamp, 1734690594000)
        }
        other => panic!("expected a notification, got {other:?}"),
    }
}

#[tokio::test]
async fn bad_or_missing_signature_is_unauthorized() {
    let body = serde_json::to_vec(&text_message()).unwrap();
    let forged = sign(b"{}");

    for signature in [Some(forged.as_str()), None] {
        let (app, mut rx) = app(Some(APP_SECRET));
        let response = app.oneshot(post(body.clone(), signature)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(rx.try_recv().is_err());
    }
}

#[tokio::test]
async fn invalid_json_is_bad_request() {
    let (app, mut rx) = app(None);

    let response = app.oneshot(post("{not json", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn foreign_account_is_acknowledged_and_reported() {
    let (app, mut rx) = app(None);
    let body = serde_json::to_vec(&envelope_for(
        "104378769380033",
        serde_json::json!({ "statuses": [] }),
    ))
    .unwrap();

    let response = app.oneshot(post(body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    match next(&mut rx).await {
        Seen::Error(Error::Validation(_)) => {}
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn unnormalizable_message_is_acknowledged_and_reported() {
    let (app, mut rx) = app(None);
    let body = serde_json::to_vec(&message_envelope(serde_json::json!({
        "from": CUSTOMER,
        "id": "wamid.X",
        "timestamp": "1733053422",
        "type": "text"
    })))
    .unwrap();

    let response = app.oneshot(post(body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    match next(&mut rx).await {
        Seen::Error(Error::Normalization(err)) => {
            assert_eq!(err.path(), Some("entry[0].changes[0].value.messages[0].text"))
        }
        other => panic!("expected a normalization error, got {other:?}"),
    }
}

#[tokio::test]
async fn closures_are_handlers() {
    let (tx, mut rx) = unbounded_channel();
    let handler = move |_ctx: EventContext, result: ParsedResult| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(result.message_id().to_owned());
        }
    };

    let app = WebhookService::builder(WABA_ID)
        .build(handler)
        .router(PATH);
    let body = serde_json::to_vec(&sent_notification()).unwrap();

    let response = app.oneshot(post(body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let id = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(id, "wamid.HBgMOTE4NjU3ODU0MjYwFQIAERgSOEE0RUU2RkE3RDI3ODEwQzk4AA==");
}
