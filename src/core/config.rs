use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Public base URL of the Mattermost server, used for API calls and permalinks.
    pub site_url: String,
    pub bot_token: String,
    /// User id of the service identity that authors relocated posts.
    pub bot_user_id: String,
    /// Verification token Mattermost attaches to slash command requests.
    pub command_token: String,
    /// Comma-separated e-mail suffixes allowed to run commands; empty allows everyone.
    pub allowed_email_domain: String,
    /// SSM parameter holding a JSON `RelocationPolicy`, if policy is managed there.
    pub policy_parameter_name: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            site_url: parse_site_url(
                &env::var("MATTERMOST_SITE_URL")
                    .map_err(|e| format!("MATTERMOST_SITE_URL: {}", e))?,
            )?,
            bot_token: env::var("MATTERMOST_BOT_TOKEN")
                .map_err(|e| format!("MATTERMOST_BOT_TOKEN: {}", e))?,
            bot_user_id: env::var("MATTERMOST_BOT_USER_ID")
                .map_err(|e| format!("MATTERMOST_BOT_USER_ID: {}", e))?,
            command_token: env::var("MATTERMOST_COMMAND_TOKEN")
                .map_err(|e| format!("MATTERMOST_COMMAND_TOKEN: {}", e))?,
            allowed_email_domain: env::var("ALLOWED_EMAIL_DOMAIN").unwrap_or_default(),
            policy_parameter_name: env::var("POLICY_PARAMETER_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        })
    }

    /// The subset of configuration the relocation engine needs.
    #[must_use]
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            site_url: self.site_url.clone(),
            bot_user_id: self.bot_user_id.clone(),
        }
    }
}

/// Validates the server address and drops any trailing slash so permalinks
/// can be built by plain concatenation.
fn parse_site_url(raw: &str) -> Result<String, String> {
    let url = url::Url::parse(raw.trim()).map_err(|e| format!("MATTERMOST_SITE_URL: {}", e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "MATTERMOST_SITE_URL: unsupported scheme '{}'",
            url.scheme()
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Display and identity settings consumed when relocating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub site_url: String,
    pub bot_user_id: String,
}

/// What to do with destination posts already created when the copy phase fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupOnFailure {
    /// Leave the partial copy in the destination for a human to inspect.
    #[default]
    LeavePartial,
    /// Delete the partially created destination root (and with it its replies).
    DeletePartial,
}

impl FromStr for CleanupOnFailure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "leave-partial" | "leave" | "none" => Ok(CleanupOnFailure::LeavePartial),
            "delete-partial" | "delete" => Ok(CleanupOnFailure::DeletePartial),
            other => Err(format!("unknown cleanup-on-failure value '{other}'")),
        }
    }
}

/// Rules gating whether a relocation may happen. Read once per invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocationPolicy {
    pub move_from_private_channel: bool,
    pub move_from_direct_message_channel: bool,
    pub move_from_group_message_channel: bool,
    pub move_to_another_team: bool,
    /// Largest thread (in posts) that may be relocated; 0 means no limit.
    pub max_thread_size: usize,
    pub cleanup_on_failure: CleanupOnFailure,
}

impl RelocationPolicy {
    /// A policy that allows every relocation.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            move_from_private_channel: true,
            move_from_direct_message_channel: true,
            move_from_group_message_channel: true,
            move_to_another_team: true,
            max_thread_size: 0,
            cleanup_on_failure: CleanupOnFailure::LeavePartial,
        }
    }

    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            move_from_private_channel: env_flag("MOVE_THREAD_FROM_PRIVATE_CHANNEL_ENABLE")?,
            move_from_direct_message_channel: env_flag(
                "MOVE_THREAD_FROM_DIRECT_MESSAGE_CHANNEL_ENABLE",
            )?,
            move_from_group_message_channel: env_flag(
                "MOVE_THREAD_FROM_GROUP_MESSAGE_CHANNEL_ENABLE",
            )?,
            move_to_another_team: env_flag("MOVE_THREAD_TO_ANOTHER_TEAM_ENABLE")?,
            max_thread_size: match env::var("MOVE_THREAD_MAX_COUNT") {
                Ok(raw) if !raw.trim().is_empty() => parse_max_count(&raw)?,
                _ => 0,
            },
            cleanup_on_failure: env::var("CLEANUP_ON_FAILURE")
                .unwrap_or_default()
                .parse()
                .map_err(|e| format!("CLEANUP_ON_FAILURE: {}", e))?,
        })
    }

    #[must_use]
    pub fn has_size_limit(&self) -> bool {
        self.max_thread_size > 0
    }
}

/// Parses the maximum thread size setting. Negative numbers are rejected.
pub fn parse_max_count(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| format!("MOVE_THREAD_MAX_COUNT '{}': {}", raw.trim(), e))
}

fn env_flag(name: &str) -> Result<bool, String> {
    match env::var(name) {
        Ok(raw) => parse_flag(&raw).ok_or_else(|| format!("{name}: expected a boolean, got '{raw}'")),
        Err(_) => Ok(false),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
