/// Wrangler - a Mattermost slash command that moves and copies threads between channels.
///
/// This crate implements a single API Lambda that receives `/wrangler`
/// commands, validates them against the relocation policy and rebuilds threads
/// through the Mattermost REST API.
///
/// # Architecture
///
/// The system uses:
/// - AWS Lambda for serverless execution
/// - SSM Parameter Store for the optional relocation policy document
/// - reqwest against the Mattermost REST API (v4)
/// - Tokio for async runtime
///
/// A relocation runs in two phases. The copy phase recreates the thread in the
/// destination under the service identity; the commit phase (moves only)
/// deletes the original, which is the only step that cannot be undone.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use wrangler::commands::{CommandEnv, handle_command_text};
/// use wrangler::core::config::RelocationPolicy;
/// use wrangler::core::models::InvocationContext;
/// use wrangler::mattermost::MattermostClient;
///
/// #[tokio::main]
/// async fn main() {
///     wrangler::setup_logging();
///
///     let client = MattermostClient::new(
///         "https://chat.example.com",
///         "dummy_token".to_string(),
///         "bot_user_id".to_string(),
///     );
///     let env = CommandEnv {
///         platform: &client,
///         settings: wrangler::core::config::ServiceSettings {
///             site_url: "https://chat.example.com".to_string(),
///             bot_user_id: "bot_user_id".to_string(),
///         },
///         policy: Arc::new(RelocationPolicy::permissive()),
///         allowed_email_domain: String::new(),
///     };
///     let invocation = InvocationContext {
///         user_id: "u1".into(),
///         channel_id: "c1".into(),
///         team_id: "t1".into(),
///         ..Default::default()
///     };
///
///     let reply = handle_command_text(&env, &invocation, "move thread p1 c2").await;
///     println!("{reply}");
/// }
/// ```
pub mod api;
pub mod commands;
pub mod core;
pub mod errors;
pub mod mattermost;
pub mod platform;
pub mod policy;
pub mod relocation;
pub mod summary;
pub mod thread;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// Output goes to `CloudWatch` Logs; the level is taken from `RUST_LOG`
/// (default `info`). Calling it again after a subscriber is installed is a
/// no-op.
///
/// # Example
///
/// ```
/// wrangler::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
