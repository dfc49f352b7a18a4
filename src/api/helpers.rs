//! Response builders for the API handler.

use serde_json::{Value, json};

/// Display name Mattermost shows on command responses.
pub const RESPONSE_USERNAME: &str = "wrangler";

/// Returns a 200 OK response with an ephemeral message for the invoking user.
#[must_use]
pub fn ok_ephemeral(text: &str) -> Value {
    json!({
        "statusCode": 200,
        "headers": { "Content-Type": "application/json" },
        "body": json!({
            "response_type": "ephemeral",
            "text": text,
            "username": RESPONSE_USERNAME,
        })
        .to_string()
    })
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json!({
        "statusCode": status_code,
        "headers": { "Content-Type": "application/json" },
        "body": json!({ "error": message }).to_string()
    })
}
