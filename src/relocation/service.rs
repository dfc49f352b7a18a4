use tracing::{error, info};

use super::executor::RelocationExecutor;
use crate::core::config::{RelocationPolicy, ServiceSettings};
use crate::core::models::{InvocationContext, RelocationMode};
use crate::errors::{CommandError, WranglerError};
use crate::platform::ChatPlatform;
use crate::policy::validate;
use crate::summary::render_summary;
use crate::thread::build_thread;

/// A move or copy request as issued by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocateRequest {
    pub mode: RelocationMode,
    /// Any post of the thread to relocate.
    pub message_id: String,
    pub destination_channel_id: String,
    /// Include an excerpt of the root post in the confirmation.
    pub show_root_message: bool,
    pub invocation: InvocationContext,
}

/// Moves or copies a thread and returns the confirmation text.
///
/// # Errors
///
/// Returns `UserFacing` for unknown posts, missing channel membership and
/// policy denials, and `Internal` for platform failures. Internal failures
/// are logged with the invoking user, the requested post and the
/// destination. No post is written before every check has passed.
pub async fn relocate<P>(
    platform: &P,
    settings: &ServiceSettings,
    policy: &RelocationPolicy,
    request: &RelocateRequest,
) -> Result<String, CommandError>
where
    P: ChatPlatform + ?Sized,
{
    relocate_thread(platform, settings, policy, request)
        .await
        .inspect_err(|e| {
            if let CommandError::Internal(cause) = e {
                error!(
                    user_id = %request.invocation.user_id,
                    mode = request.mode.as_str(),
                    original_post_id = %request.message_id,
                    destination_channel_id = %request.destination_channel_id,
                    error = %cause,
                    "Thread relocation failed"
                );
            }
        })
}

async fn relocate_thread<P>(
    platform: &P,
    settings: &ServiceSettings,
    policy: &RelocationPolicy,
    request: &RelocateRequest,
) -> Result<String, CommandError>
where
    P: ChatPlatform + ?Sized,
{
    let invocation = &request.invocation;

    let thread = match build_thread(platform, &request.message_id).await {
        Ok(thread) => thread,
        Err(WranglerError::NotFound(_)) => {
            return Err(CommandError::user(format!(
                "Error: unable to get post with ID {}; ensure this is correct",
                request.message_id
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let source = platform
        .get_channel(&invocation.channel_id)
        .await?
        .ok_or_else(|| {
            WranglerError::NotFound(format!("unable to get channel with ID {}", invocation.channel_id))
        })?;

    if !platform
        .get_channel_member(&request.destination_channel_id, &invocation.user_id)
        .await?
    {
        return Err(CommandError::user(format!(
            "Error: channel with ID {} doesn't exist or you are not a member",
            request.destination_channel_id
        )));
    }

    let destination = platform
        .get_channel(&request.destination_channel_id)
        .await?
        .ok_or_else(|| {
            WranglerError::NotFound(format!(
                "unable to get channel with ID {}",
                request.destination_channel_id
            ))
        })?;

    validate(&thread, &source, &destination, invocation, policy).into_result()?;

    let team = platform
        .get_team(&destination.team_id)
        .await?
        .ok_or_else(|| {
            WranglerError::NotFound(format!("unable to get team with ID {}", destination.team_id))
        })?;

    info!(
        user_id = %invocation.user_id,
        mode = request.mode.as_str(),
        original_post_id = %thread.root().id,
        original_channel_id = %source.id,
        "Wrangler is relocating a thread"
    );

    let executor = RelocationExecutor::new(platform, settings, policy.cleanup_on_failure);
    let result = executor
        .execute(&thread, &destination, &team, request.mode, &invocation.user_id)
        .await?;

    info!(
        user_id = %invocation.user_id,
        mode = request.mode.as_str(),
        new_post_id = %result.new_root_id,
        new_channel_id = %result.destination_channel_id,
        messages = result.message_count,
        reaction_failures = result.reaction_failures,
        dropped_attachments = result.dropped_attachments,
        "Wrangler thread relocation complete"
    );

    let excerpt = request
        .show_root_message
        .then_some(thread.root().message.as_str());

    Ok(render_summary(
        &result,
        &settings.site_url,
        &team,
        &destination,
        excerpt,
    ))
}
