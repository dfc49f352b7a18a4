use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::models::InvocationContext;
use crate::errors::WranglerError;

/// Fields Mattermost posts to a slash command endpoint.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SlashCommandRequest {
    pub token: String,
    pub team_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
    /// Set when the command was typed in a thread reply box.
    pub root_id: Option<String>,
    pub parent_id: Option<String>,
}

impl SlashCommandRequest {
    #[must_use]
    pub fn invocation(&self) -> InvocationContext {
        InvocationContext {
            user_id: self.user_id.clone(),
            channel_id: self.channel_id.clone(),
            team_id: self.team_id.clone(),
            root_id: self.root_id.clone(),
            parent_id: self.parent_id.clone(),
        }
    }
}

/// Decodes one `application/x-www-form-urlencoded` component.
///
/// # Examples
///
/// ```
/// use wrangler::api::parsing::decode_url_component;
///
/// assert_eq!(decode_url_component("hello%20world").unwrap(), "hello world");
/// assert_eq!(decode_url_component("a+b%2Bc").unwrap(), "a b+c");
/// ```
///
/// # Errors
///
/// Returns an error if the decoded bytes are not valid UTF-8.
pub fn decode_url_component(input: &str) -> Result<String, String> {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.to_string())
        .map_err(|e| format!("Failed to decode URL component: {}", e))
}

/// Parses the form body of a slash command request.
///
/// # Errors
///
/// Returns `Parse` if a key or value cannot be decoded or the request does not
/// name the invoking user and channel.
pub fn parse_form_data(form_data: &str) -> Result<SlashCommandRequest, WranglerError> {
    let mut map: HashMap<String, String> = HashMap::new();

    for pair in form_data.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_url_component(raw_key)
            .map_err(|e| WranglerError::Parse(format!("Failed to decode key: {}", e)))?;
        let value = decode_url_component(raw_value)
            .map_err(|e| WranglerError::Parse(format!("Failed to decode value: {}", e)))?;
        map.insert(key, value);
    }

    let mut take = |name: &str| map.remove(name).unwrap_or_default();
    let request = SlashCommandRequest {
        token: take("token"),
        team_id: take("team_id"),
        channel_id: take("channel_id"),
        user_id: take("user_id"),
        user_name: take("user_name"),
        command: take("command"),
        text: take("text"),
        response_url: take("response_url"),
        trigger_id: take("trigger_id"),
        root_id: Some(take("root_id")).filter(|v| !v.is_empty()),
        parent_id: Some(take("parent_id")).filter(|v| !v.is_empty()),
    };

    if request.user_id.is_empty() || request.channel_id.is_empty() {
        return Err(WranglerError::Parse(
            "request is missing user_id or channel_id".to_string(),
        ));
    }

    Ok(request)
}

/// Case-insensitive header lookup on an API Gateway event.
pub fn get_header_value<'a>(headers: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    if let Some(v) = headers.get(name).and_then(|s| s.as_str()) {
        return Some(v);
    }
    headers.as_object().and_then(|map| {
        map.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                v.as_str()
            } else {
                None
            }
        })
    })
}
