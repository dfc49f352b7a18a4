//! Moving a single stray post into an existing thread of the same channel.

use tracing::{info, warn};

use super::executor::RelocationExecutor;
use crate::core::config::{CleanupOnFailure, ServiceSettings};
use crate::core::models::InvocationContext;
use crate::errors::{CommandError, WranglerError};
use crate::platform::ChatPlatform;
use crate::policy::RUN_FROM_THREAD_CHANNEL;
use crate::summary::make_post_link;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachRequest {
    pub message_id: String,
    pub root_id: String,
    pub invocation: InvocationContext,
}

#[must_use]
pub fn attach_notice(new_post_link: &str) -> String {
    format!("Someone wrangled a message you posted into a thread for you: {new_post_link}")
}

/// Re-posts a message as a reply of `root_id` and deletes the original.
///
/// # Errors
///
/// Returns `UserFacing` when either post is unknown or the pair cannot be
/// joined, and `Internal` for platform failures.
pub async fn attach_message<P>(
    platform: &P,
    settings: &ServiceSettings,
    request: &AttachRequest,
) -> Result<String, CommandError>
where
    P: ChatPlatform + ?Sized,
{
    let invocation = &request.invocation;

    let Some(to_attach) = platform.get_message(&request.message_id).await? else {
        return Err(CommandError::user(format!(
            "Error: unable to get message with ID {}; ensure this is correct",
            request.message_id
        )));
    };
    let Some(root) = platform.get_message(&request.root_id).await? else {
        return Err(CommandError::user(format!(
            "Error: unable to get message with ID {}; ensure this is correct",
            request.root_id
        )));
    };

    if to_attach.id == root.id {
        return Err(CommandError::user(
            "Error: a message cannot be attached to itself",
        ));
    }
    if to_attach.is_reply() {
        return Err(CommandError::user(format!(
            "Error: the message to be attached is already part of a thread (root {})",
            to_attach.root_id
        )));
    }
    if root.is_reply() {
        return Err(CommandError::user(format!(
            "Error: message {} is not a root message",
            root.id
        )));
    }
    if to_attach.channel_id != root.channel_id {
        return Err(CommandError::user(
            "Error: unable to attach message to a thread in another channel",
        ));
    }
    if invocation.channel_id != to_attach.channel_id {
        return Err(CommandError::user(RUN_FROM_THREAD_CHANNEL));
    }

    let own_thread = platform
        .get_thread(&to_attach.id)
        .await?
        .unwrap_or_default();
    if own_thread.len() > 1 {
        return Err(CommandError::user(
            "Error: the message to be attached is the root of a thread; use move thread instead",
        ));
    }

    let team_id = platform
        .get_channel(&root.channel_id)
        .await?
        .ok_or_else(|| WranglerError::NotFound(format!("channel {}", root.channel_id)))?
        .team_id;
    let team = platform
        .get_team(&team_id)
        .await?
        .ok_or_else(|| WranglerError::NotFound(format!("team {team_id}")))?;

    let executor = RelocationExecutor::new(platform, settings, CleanupOnFailure::LeavePartial);
    let (reply, dropped_attachments) = executor
        .copy_message(&to_attach, &root.channel_id, &root.id)
        .await;
    let attached = platform
        .create_message(reply)
        .await
        .map_err(|e| WranglerError::Upstream(format!("unable to create attached post: {e}")))?;

    match platform.get_reactions(&to_attach.id).await {
        Ok(reactions) => {
            executor
                .apply_reactions(&to_attach.id, &attached.id, reactions)
                .await;
        }
        Err(e) => warn!(post_id = %to_attach.id, error = %e, "Unable to fetch reactions"),
    }

    platform
        .delete_message(&to_attach.id)
        .await
        .map_err(|e| WranglerError::Upstream(format!("unable to delete post: {e}")))?;

    info!(
        user_id = %invocation.user_id,
        original_post_id = %to_attach.id,
        new_post_id = %attached.id,
        root_id = %root.id,
        dropped_attachments,
        "Wrangler attached a message to a thread"
    );

    let link = make_post_link(&settings.site_url, &team.name, &attached.id);
    if to_attach.user_id != invocation.user_id
        && let Err(e) = platform
            .send_direct_message(&to_attach.user_id, &attach_notice(&link))
            .await
    {
        warn!(user_id = %to_attach.user_id, error = %e, "Unable to send attach DM to user");
    }

    Ok(format!("Message successfully attached to thread: {link}"))
}
