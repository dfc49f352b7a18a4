//! Copy-then-delete relocation of a thread.
//!
//! The work is split in two named phases:
//!
//! - [`CopyPhase`](RelocationExecutor::copy_phase): recreate the root and every
//!   reply in the destination, in order, one awaited call at a time, with
//!   duplicated attachments, then replay reactions. Nothing in the source is touched, so a failure here
//!   leaves the original thread intact.
//! - [`CommitPhase`](RelocationExecutor::commit_phase) (move only): post the
//!   relocation note, delete the original root, notify its author. Deleting
//!   the original root is the point of no return; anything failing after it
//!   is logged and reported as a warning only.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::pin::pin;
use tracing::{error, info, warn};

use crate::core::config::{CleanupOnFailure, ServiceSettings};
use crate::core::models::{
    Channel, Message, NewMessage, Reaction, RelocationMode, RelocationResult, Team,
};
use crate::errors::WranglerError;
use crate::platform::ChatPlatform;
use crate::summary::make_post_link;
use crate::thread::Thread;

/// Note appended to a thread after it has been moved.
pub const MOVED_NOTICE: &str = "This thread was moved from another channel";

#[must_use]
pub fn author_notice(new_post_link: &str) -> String {
    format!("Someone wrangled a thread you started to a new channel for you: {new_post_link}")
}

/// Ids of the posts created in the destination, in thread order.
#[derive(Debug, Clone)]
pub struct CopiedThread {
    pub new_root_id: String,
    pub new_ids: Vec<String>,
    /// Attachments that could not be duplicated and were left off their copy.
    pub dropped_attachments: usize,
}

pub struct RelocationExecutor<'a, P: ChatPlatform + ?Sized> {
    platform: &'a P,
    settings: &'a ServiceSettings,
    cleanup: CleanupOnFailure,
}

impl<'a, P: ChatPlatform + ?Sized> RelocationExecutor<'a, P> {
    #[must_use]
    pub fn new(platform: &'a P, settings: &'a ServiceSettings, cleanup: CleanupOnFailure) -> Self {
        Self {
            platform,
            settings,
            cleanup,
        }
    }

    /// Relocates `thread` into `destination`.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` when a post cannot be created (nothing was deleted),
    /// or, in move mode, when the relocation note cannot be posted or the
    /// original cannot be deleted.
    pub async fn execute(
        &self,
        thread: &Thread,
        destination: &Channel,
        destination_team: &Team,
        mode: RelocationMode,
        invoker_id: &str,
    ) -> Result<RelocationResult, WranglerError> {
        let copied = self.copy_phase(thread, destination).await?;
        let reaction_failures = self.replay_reactions(thread, &copied).await;

        let author_notified = match mode {
            RelocationMode::Copy => None,
            RelocationMode::Move => {
                self.commit_phase(thread, &copied, destination, destination_team, invoker_id)
                    .await?
            }
        };

        Ok(RelocationResult {
            mode,
            new_root_id: copied.new_root_id,
            destination_channel_id: destination.id.clone(),
            destination_team_id: destination.team_id.clone(),
            message_count: thread.count(),
            reaction_failures,
            dropped_attachments: copied.dropped_attachments,
            author_notified,
        })
    }

    /// Recreates every post of `thread` in `destination`, strictly in order.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` on the first post that cannot be created.
    pub async fn copy_phase(
        &self,
        thread: &Thread,
        destination: &Channel,
    ) -> Result<CopiedThread, WranglerError> {
        let (root_copy, mut dropped_attachments) =
            self.copy_message(thread.root(), &destination.id, "").await;
        let new_root = self
            .platform
            .create_message(root_copy)
            .await
            .map_err(|e| {
                WranglerError::Upstream(format!(
                    "unable to create new root post in channel {}: {e}",
                    destination.id
                ))
            })?;

        let mut copied = CopiedThread {
            new_root_id: new_root.id.clone(),
            new_ids: Vec::with_capacity(thread.count()),
            dropped_attachments: 0,
        };
        copied.new_ids.push(new_root.id);

        for reply in thread.replies() {
            let (reply_copy, dropped) = self
                .copy_message(reply, &destination.id, &copied.new_root_id)
                .await;
            dropped_attachments += dropped;
            let created = self.platform.create_message(reply_copy).await;
            match created {
                Ok(post) => copied.new_ids.push(post.id),
                Err(e) => {
                    self.compensate(&copied).await;
                    return Err(WranglerError::Upstream(format!(
                        "unable to copy reply {} ({} of {} posts copied): {e}",
                        reply.id,
                        copied.new_ids.len(),
                        thread.count()
                    )));
                }
            }
        }

        copied.dropped_attachments = dropped_attachments;
        Ok(copied)
    }

    /// Re-applies the reactions of every original post onto its copy.
    /// Returns how many fetches or adds failed; none of them is fatal.
    pub async fn replay_reactions(&self, thread: &Thread, copied: &CopiedThread) -> usize {
        let pairs = thread
            .reactions(self.platform)
            .zip(stream::iter(copied.new_ids.iter()));
        let mut pairs = pin!(pairs);

        let mut failures = 0;
        while let Some(((original, fetched), new_id)) = pairs.next().await {
            match fetched {
                Ok(reactions) => {
                    failures += self.apply_reactions(&original.id, new_id, reactions).await;
                }
                Err(e) => {
                    warn!(
                        post_id = %original.id,
                        error = %e,
                        "Unable to fetch reactions; skipping replay for this post"
                    );
                    failures += 1;
                }
            }
        }

        failures
    }

    /// Adds the emoji of `reactions` (taken from `original_id`) onto `new_id`.
    ///
    /// Reactions are placed by the service identity, so each emoji is added
    /// once however many users had used it.
    pub async fn apply_reactions(
        &self,
        original_id: &str,
        new_id: &str,
        reactions: Vec<Reaction>,
    ) -> usize {
        let mut seen = HashSet::new();
        let mut failures = 0;
        for reaction in reactions {
            if !seen.insert(reaction.emoji_name.clone()) {
                continue;
            }
            let replayed = Reaction {
                post_id: new_id.to_string(),
                user_id: self.settings.bot_user_id.clone(),
                emoji_name: reaction.emoji_name,
            };
            if let Err(e) = self.platform.add_reaction(&replayed).await {
                warn!(
                    original_post_id = %original_id,
                    new_post_id = %new_id,
                    emoji = %replayed.emoji_name,
                    error = %e,
                    "Unable to replay reaction"
                );
                failures += 1;
            }
        }
        failures
    }

    /// Posts the relocation note, deletes the original, notifies its author.
    ///
    /// Returns whether the author was notified, `None` if no notification was
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` if the note cannot be posted (the original is left
    /// untouched) or if the original cannot be deleted.
    pub async fn commit_phase(
        &self,
        thread: &Thread,
        copied: &CopiedThread,
        destination: &Channel,
        destination_team: &Team,
        invoker_id: &str,
    ) -> Result<Option<bool>, WranglerError> {
        let note = NewMessage {
            channel_id: destination.id.clone(),
            root_id: copied.new_root_id.clone(),
            user_id: self.settings.bot_user_id.clone(),
            message: MOVED_NOTICE.to_string(),
            file_ids: Vec::new(),
        };
        if let Err(e) = self.platform.create_message(note).await {
            self.compensate(copied).await;
            return Err(WranglerError::Upstream(format!(
                "unable to create new bot post: {e}"
            )));
        }

        // Deleting the root tombstones its replies as well.
        self.platform
            .delete_message(&thread.root().id)
            .await
            .map_err(|e| {
                WranglerError::Upstream(format!(
                    "thread was copied to post {} but the original root {} could not be deleted: {e}",
                    copied.new_root_id,
                    thread.root().id
                ))
            })?;

        info!(
            original_post_id = %thread.root().id,
            new_post_id = %copied.new_root_id,
            "Original thread deleted"
        );

        let author_id = &thread.root().user_id;
        if author_id == invoker_id {
            return Ok(None);
        }

        let link = make_post_link(
            &self.settings.site_url,
            &destination_team.name,
            &copied.new_root_id,
        );
        match self
            .platform
            .send_direct_message(author_id, &author_notice(&link))
            .await
        {
            Ok(()) => Ok(Some(true)),
            Err(e) => {
                let failure = WranglerError::PartialReplayFailure(format!(
                    "unable to notify author {author_id}: {e}"
                ));
                error!(user_id = %author_id, error = %failure, "Unable to send move-thread DM to user");
                Ok(Some(false))
            }
        }
    }

    /// Builds the copy of `original` for `channel_id`, duplicating its
    /// attachments there. Returns the post and how many attachments were
    /// dropped because they could not be duplicated.
    pub async fn copy_message(
        &self,
        original: &Message,
        channel_id: &str,
        root_id: &str,
    ) -> (NewMessage, usize) {
        let mut file_ids = Vec::with_capacity(original.file_ids.len());
        let mut dropped = 0;
        for file_id in &original.file_ids {
            match self.platform.copy_file(file_id, channel_id).await {
                Ok(new_id) => file_ids.push(new_id),
                Err(e) => {
                    warn!(
                        post_id = %original.id,
                        file_id = %file_id,
                        error = %e,
                        "Unable to copy attachment; posting without it"
                    );
                    dropped += 1;
                }
            }
        }

        let copy = NewMessage {
            channel_id: channel_id.to_string(),
            root_id: root_id.to_string(),
            user_id: self.settings.bot_user_id.clone(),
            message: original.message.clone(),
            file_ids,
        };
        (copy, dropped)
    }

    async fn compensate(&self, copied: &CopiedThread) {
        match self.cleanup {
            CleanupOnFailure::LeavePartial => {
                warn!(
                    new_post_id = %copied.new_root_id,
                    copied_posts = copied.new_ids.len(),
                    "Relocation aborted; partial copy left in destination"
                );
            }
            CleanupOnFailure::DeletePartial => {
                match self.platform.delete_message(&copied.new_root_id).await {
                    Ok(()) => info!(
                        new_post_id = %copied.new_root_id,
                        "Relocation aborted; partial copy deleted"
                    ),
                    Err(e) => error!(
                        new_post_id = %copied.new_root_id,
                        error = %e,
                        "Relocation aborted; unable to delete partial copy"
                    ),
                }
            }
        }
    }
}
