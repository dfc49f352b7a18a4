//! `list channels` and `list messages`: ids users need for the other commands.

use super::{ListChannelsArgs, ListMessagesArgs};
use crate::errors::CommandError;
use crate::platform::ChatPlatform;
use crate::summary::{clean_and_trim_message, code_block};

pub const NO_RESULTS: &str = "No results found";
pub const SYSTEM_MESSAGE_LINE: &str = "[     system message     ] - <skipped>";

/// # Errors
///
/// Returns `Internal` if the teams or channels of the user cannot be fetched.
pub async fn list_channels(
    platform: &dyn ChatPlatform,
    user_id: &str,
    args: &ListChannelsArgs,
) -> Result<String, CommandError> {
    let teams = platform.teams_for_user(user_id).await?;

    let mut msg = String::new();
    for team in teams {
        if !args.team_filter.is_empty() && !team.name.contains(&args.team_filter) {
            continue;
        }

        let channels = platform.channels_for_team_for_user(&team.id, user_id).await?;
        let lines: Vec<String> = channels
            .iter()
            .filter(|c| !c.channel_type.is_group_or_direct())
            .filter(|c| args.channel_filter.is_empty() || c.name.contains(&args.channel_filter))
            .map(|c| format!("{} - {}", c.id, c.name))
            .collect();
        if lines.is_empty() {
            continue;
        }

        msg.push_str(&code_block(&format!("{}\n{}", team.name, lines.join("\n"))));
        msg.push('\n');
    }

    if msg.is_empty() {
        msg = NO_RESULTS.to_string();
    }

    Ok(msg)
}

/// # Errors
///
/// Returns `Internal` if the channel's posts cannot be fetched.
pub async fn list_messages(
    platform: &dyn ChatPlatform,
    channel_id: &str,
    args: &ListMessagesArgs,
) -> Result<String, CommandError> {
    let posts = platform.recent_messages(channel_id, args.count).await?;

    let mut msg = format!("The last {} messages in this channel:\n", args.count);
    for post in posts.iter().take(args.count) {
        if post.is_system {
            msg.push_str(SYSTEM_MESSAGE_LINE);
        } else {
            msg.push_str(&format!(
                "{} - {}",
                post.id,
                clean_and_trim_message(&post.message, args.trim_length)
            ));
        }
        msg.push('\n');
    }

    Ok(code_block(msg.trim_end_matches('\n')))
}
