//! Decides whether a relocation is allowed before anything is written.
//!
//! Checks run in a fixed order and the first failing rule produces the
//! reason shown to the user. Everything here works on data that has already
//! been fetched.

use tracing::debug;

use crate::core::config::RelocationPolicy;
use crate::core::models::{Channel, ChannelType, InvocationContext};
use crate::errors::WranglerError;
use crate::thread::Thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// # Errors
    ///
    /// Returns `PolicyDenied` with the reason when the request is denied.
    pub fn into_result(self) -> Result<(), WranglerError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(WranglerError::PolicyDenied(reason)),
        }
    }
}

pub const RUN_FROM_THREAD_CHANNEL: &str =
    "Error: this command must be run from the channel containing the post";

pub const RUN_OUTSIDE_THREAD: &str = "Error: this command cannot be run from inside the thread; please run directly in the channel containing the thread";

pub const CROSS_TEAM_DISABLED: &str =
    "Wrangler is currently configured to not allow moving messages to different teams";

/// Evaluates a relocation request.
///
/// `source` is the channel the command was run in; the thread must live there.
#[must_use]
pub fn validate(
    thread: &Thread,
    source: &Channel,
    destination: &Channel,
    invocation: &InvocationContext,
    policy: &RelocationPolicy,
) -> Decision {
    let decision = check_source_type(source, policy)
        .or_else(|| check_cross_team(source, destination, policy))
        .or_else(|| check_location(thread, source, invocation))
        .or_else(|| check_size(thread, policy))
        .map_or(Decision::Allow, Decision::Deny);

    if let Decision::Deny(reason) = &decision {
        debug!(
            root_id = %thread.root().id,
            source_channel_id = %source.id,
            destination_channel_id = %destination.id,
            reason = %reason,
            "Relocation denied by policy"
        );
    }

    decision
}

fn check_source_type(source: &Channel, policy: &RelocationPolicy) -> Option<String> {
    let (allowed, category) = match source.channel_type {
        ChannelType::Open => return None,
        ChannelType::Private => (policy.move_from_private_channel, "private channels"),
        ChannelType::Direct => (
            policy.move_from_direct_message_channel,
            "direct message channels",
        ),
        ChannelType::Group => (
            policy.move_from_group_message_channel,
            "group message channels",
        ),
    };

    (!allowed).then(|| {
        format!("Wrangler is currently configured to not allow moving posts from {category}")
    })
}

fn check_cross_team(
    source: &Channel,
    destination: &Channel,
    policy: &RelocationPolicy,
) -> Option<String> {
    (source.team_id != destination.team_id && !policy.move_to_another_team)
        .then(|| CROSS_TEAM_DISABLED.to_string())
}

fn check_location(
    thread: &Thread,
    source: &Channel,
    invocation: &InvocationContext,
) -> Option<String> {
    if thread.channel_id() != source.id {
        return Some(RUN_FROM_THREAD_CHANNEL.to_string());
    }
    if invocation.is_inside_thread(&thread.root().id) {
        return Some(RUN_OUTSIDE_THREAD.to_string());
    }
    None
}

fn check_size(thread: &Thread, policy: &RelocationPolicy) -> Option<String> {
    (policy.has_size_limit() && thread.count() > policy.max_thread_size).then(|| {
        format!(
            "Error: the thread is {} posts long, but this command is configured to only move threads of up to {} posts",
            thread.count(),
            policy.max_thread_size
        )
    })
}
