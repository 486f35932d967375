// FCM v1 message bodies.

use serde_json::json;

use pushgate_core::push::PushMessage;

const ANDROID_ICON: &str = "ic_notification";
const ANDROID_COLOR: &str = "#2563eb";

/// Request body for `messages:send` addressed to one device token.
pub fn build_message(token: &str, message: &PushMessage) -> serde_json::Value {
    json!({
        "message": {
            "token": token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
            "android": {
                "priority": "high",
                "notification": {
                    "icon": ANDROID_ICON,
                    "color": ANDROID_COLOR,
                    "channel_id": message.channel,
                },
            },
            "apns": {
                "payload": {
                    "aps": {
                        "alert": {
                            "title": message.title,
                            "body": message.body,
                        },
                        "badge": 1,
                        "sound": "default",
                    },
                },
            },
        }
    })
}

/// Best error label from an FCM error body: the `FcmError` detail code
/// (e.g. `UNREGISTERED`), else the RPC status, else the HTTP status.
pub fn error_code(status: u16, body: &serde_json::Value) -> String {
    let error = &body["error"];
    error["details"]
        .as_array()
        .into_iter()
        .flatten()
        .find_map(|d| d["errorCode"].as_str())
        .or_else(|| error["status"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP_{status}"))
}

/// Field path FCM names in a `BadRequest` violation for the device token.
const TOKEN_FIELD: &str = "message.token";

/// Whether an FCM error blames the device token rather than the message.
/// Only these failures make a token eligible for removal.
pub fn is_token_rejection(status: u16, body: &serde_json::Value) -> bool {
    if status == 404 {
        return true;
    }
    let details = body["error"]["details"].as_array().map(Vec::as_slice).unwrap_or_default();
    let names_token = details
        .iter()
        .filter_map(|d| d["fieldViolations"].as_array())
        .flatten()
        .any(|v| v["field"].as_str() == Some(TOKEN_FIELD));

    match error_code(status, body).as_str() {
        "UNREGISTERED" | "SENDER_ID_MISMATCH" => true,
        "INVALID_ARGUMENT" => names_token,
        _ => false,
    }
}
