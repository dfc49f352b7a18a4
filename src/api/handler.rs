//! API Lambda handler for the `/wrangler` slash command.
//!
//! This module handles:
//! - Request validation (body, verification token)
//! - Form parsing into an invocation context
//! - Running the command and wrapping its text in an ephemeral response

use std::sync::{Arc, LazyLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use super::token::{TokenCheck, verify_command_token};
use super::{helpers, parsing};
use crate::commands::{CommandEnv, handle_command_text};
use crate::core::config::{AppConfig, RelocationPolicy};
use crate::core::policy_store::PolicyStore;
use crate::mattermost::MattermostClient;
use crate::platform::ChatPlatform;

pub use self::function_handler as handler;

/// Survives across invocations of a warm Lambda container.
static POLICY_STORE: LazyLock<PolicyStore> = LazyLock::new(PolicyStore::default);

/// Lambda handler for the API entrypoint.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete. Malformed or
/// unauthenticated requests are answered with a 4xx payload instead.
#[tracing::instrument(level = "info", skip(event))]
pub async fn function_handler(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;

    let policy = POLICY_STORE.refresh(&config).await.map_err(|e| {
        error!("Policy error: {}", e);
        Error::from(e.to_string())
    })?;

    let client = MattermostClient::new(
        &config.site_url,
        config.bot_token.clone(),
        config.bot_user_id.clone(),
    );

    Ok(process_request(&config, &event.payload, &client, policy).await)
}

/// Validates and runs one slash command request against `platform`.
pub async fn process_request(
    config: &AppConfig,
    payload: &Value,
    platform: &dyn ChatPlatform,
    policy: Arc<RelocationPolicy>,
) -> Value {
    let body = match extract_body(payload) {
        Ok(b) => b,
        Err(response) => return response,
    };

    let request = match parsing::parse_form_data(&body) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to parse slash command: {}", e);
            return helpers::err_response(400, &format!("Parse Error: {e}"));
        }
    };

    let authorization = payload
        .get("headers")
        .and_then(|h| parsing::get_header_value(h, "Authorization"));
    match verify_command_token(&request.token, authorization, &config.command_token) {
        TokenCheck::Valid => {}
        TokenCheck::Missing => {
            return helpers::err_response(400, "Missing command token");
        }
        check @ TokenCheck::Mismatch => {
            return helpers::err_response(check.status_code(), "Invalid command token");
        }
    }

    info!(
        correlation_id = %Uuid::new_v4(),
        user_id = %request.user_id,
        channel_id = %request.channel_id,
        command = %request.command,
        "Received slash command"
    );

    let env = CommandEnv {
        platform,
        settings: config.service_settings(),
        policy,
        allowed_email_domain: config.allowed_email_domain.clone(),
    };
    let text = handle_command_text(&env, &request.invocation(), &request.text).await;

    helpers::ok_ephemeral(&text)
}

/// Returns the request body, decoding it when the gateway flagged it as base64.
fn extract_body(payload: &Value) -> Result<String, Value> {
    let Some(body) = payload.get("body") else {
        error!("Request missing body");
        return Err(helpers::err_response(400, "Missing body"));
    };

    let Some(body_str) = body.as_str() else {
        error!("Request body is not a string");
        return Err(helpers::err_response(400, "Invalid body format"));
    };

    let is_base64 = payload
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !is_base64 {
        return Ok(body_str.to_string());
    }

    BASE64
        .decode(body_str)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| {
            error!("Request body is not valid base64 UTF-8");
            helpers::err_response(400, "Invalid body encoding")
        })
}
