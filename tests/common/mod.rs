use serde_json::{json, Value};

// --- CONSTANTS ---
#[allow(dead_code)]
pub const WABA_ID: &str = "442476028955381";
#[allow(dead_code)]
pub const PHONE_ID: &str = "402214169651966";
#[allow(dead_code)]
pub const ACCESS_TOKEN: &str = "EAAD...";
#[allow(dead_code)]
pub const APP_SECRET: &str = "a1b2c3d4e5f6";
#[allow(dead_code)]
pub const VERIFY_TOKEN: &str = "very_secret";
#[allow(dead_code)]
pub const CUSTOMER: &str = "918657854260";

// --- ENVELOPES ---

/// Wraps a change `value` in the webhook envelope addressed to `waba_id`.
#[allow(dead_code)]
pub fn envelope_for(waba_id: &str, value: Value) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": waba_id,
            "changes": [{ "value": value, "field": "messages" }]
        }]
    })
}

/// Wraps one inbound message from [`CUSTOMER`] ("Danish").
#[allow(dead_code)]
pub fn message_envelope(message: Value) -> Value {
    envelope_for(
        WABA_ID,
        json!({
            "messaging_product": "whatsapp",
            "metadata": {
                "display_phone_number": "919140624820",
                "phone_number_id": PHONE_ID
            },
            "contacts": [{ "profile": { "name": "Danish" }, "wa_id": CUSTOMER }],
            "messages": [message]
        }),
    )
}

#[allow(dead_code)]
pub fn text_message() -> Value {
    message_envelope(json!({
        "from": CUSTOMER,
        "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAEhggQ0I2NDhGMjE1QTZFQjVGQzUzNjcxNkVFOTkyNTlEMEQA",
        "timestamp": "1733053422",
        "text": { "body": "Hii" },
        "type": "text"
    }))
}

#[allow(dead_code)]
pub fn flow_message() -> Value {
    message_envelope(json!({
        "context": {
            "from": "919140624820",
            "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAERgSQTQyNEE1QkJDODQ2REY4QUVDAA=="
        },
        "from": CUSTOMER,
        "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAEhggQjVGRkQ2NUM2RTcwRDM4MkJDRTVCRDI5NDRENkE4OTAA",
        "timestamp": "1734764424",
        "type": "interactive",
        "interactive": {
            "type": "nfm_reply",
            "nfm_reply": {
                "response_json": "{\"nutrientDeficiency\":\"Test \",\"farmerNumber\":\"918657854260\",\"flow_token\":\"AgriSavant\"}",
                "body": "Sent",
                "name": "flow"
            }
        }
    }))
}

#[allow(dead_code)]
pub fn location_message() -> Value {
    message_envelope(json!({
        "from": CUSTOMER,
        "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAEhggNDQ4QUIxNDVEREIyRjM2QzJFRDY3NjE0QkU4MjJDQkEA",
        "timestamp": "1733047041",
        "location": {
            "address": "Malvani, Malad West, Mumbai, Maharashtra 400095, India",
            "latitude": 19.185657757158,
            "longitude": 72.816428951919,
            "name": "Fazil chawl"
        },
        "type": "location"
    }))
}

#[allow(dead_code)]
pub fn document_message() -> Value {
    message_envelope(json!({
        "from": CUSTOMER,
        "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAEhggNDNERUE4QTlDRjBCQjYzN0M4OENDRUFGRTVGRURENTQA",
        "timestamp": "1733046524",
        "type": "document",
        "document": {
            "filename": "DOC-20241121-WA0010_copy.pdf",
            "mime_type": "application/pdf",
            "sha256": "4CyDX3T/YFMn7X7bZ0EytStM4AHy4U516l3w1fDwi8I=",
            "id": "9239774362708417"
        }
    }))
}

#[allow(dead_code)]
pub fn sent_notification() -> Value {
    envelope_for(
        WABA_ID,
        json!({
            "messaging_product": "whatsapp",
            "metadata": {
                "display_phone_number": "919140624820",
                "phone_number_id": PHONE_ID
            },
            "statuses": [{
                "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAERgSOEE0RUU2RkE3RDI3ODEwQzk4AA==",
                "status": "sent",
                "timestamp": "1734690594",
                "recipient_id": CUSTOMER,
                "conversation": {
                    "id": "8ead10d4db34b59989d33ee5d56cec5d",
                    "expiration_timestamp": "1734775980",
                    "origin": { "type": "service" }
                },
                "pricing": {
                    "billable": true,
                    "pricing_model": "CBP",
                    "category": "service"
                }
            }]
        }),
    )
}

#[allow(dead_code)]
pub fn audio_message() -> Value {
    message_envelope(json!({
        "from": CUSTOMER,
        "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAEhggMkUxNUM4NTI2MDczREVFRDdEMkM0QjJDMDZCMTI0NUEA",
        "timestamp": "1733046745",
        "type": "audio",
        "audio": {
            "mime_type": "audio/ogg; codecs=opus",
            "sha256": "944XE+1RcWf//Q2xWXHisEMR8W2gd2yebu1prvtqdkI=",
            "id": "948537820496015",
            "voice": true
        }
    }))
}

#[allow(dead_code)]
pub fn video_message() -> Value {
    message_envelope(json!({
        "from": CUSTOMER,
        "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAEhggNjZEQTJDQTExQzVDQzQ3Q0ExQjIwOTExQTkwMTk5QTgA",
        "timestamp": "1733046676",
        "type": "video",
        "video": {
            "mime_type": "video/mp4",
            "sha256": "zbmxTyxx3VXKqg3TsE9ZZ2WlzUhNjC16MNtco1ANIJU=",
            "id": "1636974626885800"
        }
    }))
}

#[allow(dead_code)]
pub fn image_message() -> Value {
    message_envelope(json!({
        "from": CUSTOMER,
        "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAEhggRkFGMDc4MjE4Q0RCQkE5NjNDNTg3MTZFRTQzQzIwNDcA",
        "timestamp": "1733046622",
        "type": "image",
        "image": {
            "mime_type": "image/jpeg",
            "sha256": "ZYgWD4N1OIRGoKZqOfXhCsS6j/tLpUGca3VJfxQ+xmQ=",
            "id": "601857195736198"
        }
    }))
}

#[allow(dead_code)]
pub fn sticker_message() -> Value {
    message_envelope(json!({
        "from": CUSTOMER,
        "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAEhggQzM0QkY2RTMwNzE4NjlFRjYwRTYA",
        "timestamp": "1733047210",
        "type": "sticker",
        "sticker": {
            "mime_type": "image/webp",
            "sha256": "Xq0dS0X1k7Jm3r5zyqQ2pEwV8o1g6eYj2b0JqkqF1aA=",
            "id": "1209344913501470",
            "animated": false
        }
    }))
}

#[allow(dead_code)]
pub fn contact_message() -> Value {
    message_envelope(json!({
        "from": CUSTOMER,
        "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAEhggQkExRDQ2M0Q5MDU2QjUzNzk2ODI2RDg4MkNEMTNGRjMA",
        "timestamp": "1733057921",
        "type": "contacts",
        "contacts": [{
            "name": {
                "first_name": "8239988992",
                "formatted_name": "8239988992"
            }
        }]
    }))
}

#[allow(dead_code)]
pub fn list_reply_message() -> Value {
    message_envelope(json!({
        "context": {
            "from": "919082406664",
            "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAERgSMzVFMkFEQjU0OUI0MjFEMzUzAA=="
        },
        "from": CUSTOMER,
        "id": "wamid.HBgMOTE4NjU3ODU0MjYwFQIAEhgWM0VCMDhDQTFEOTkwOUQ4NDY5QzNCQQA=",
        "timestamp": "1733057541",
        "type": "interactive",
        "interactive": {
            "type": "list_reply",
            "list_reply": { "id": "in", "title": "🟢 IN" }
        }
    }))
}
