//! The host platform as seen by the relocation engine.
//!
//! Every call the engine makes goes through [`ChatPlatform`], so tests can
//! substitute an in-memory implementation for the Mattermost adapter.

use async_trait::async_trait;

use crate::core::models::{Channel, Message, NewMessage, Reaction, Team, User};
use crate::errors::WranglerError;

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// All posts of the thread containing `message_id`, or `None` if the id
    /// does not resolve.
    async fn get_thread(&self, message_id: &str) -> Result<Option<Vec<Message>>, WranglerError>;

    async fn get_message(&self, message_id: &str) -> Result<Option<Message>, WranglerError>;

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, WranglerError>;

    async fn get_team(&self, team_id: &str) -> Result<Option<Team>, WranglerError>;

    /// Whether `user_id` is a member of `channel_id`.
    async fn get_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<bool, WranglerError>;

    async fn get_reactions(&self, message_id: &str) -> Result<Vec<Reaction>, WranglerError>;

    async fn create_message(&self, message: NewMessage) -> Result<Message, WranglerError>;

    /// Deletes a post. Deleting a thread root also removes its replies.
    async fn delete_message(&self, message_id: &str) -> Result<(), WranglerError>;

    /// Adds `reaction.emoji_name` to `reaction.post_id` as the service
    /// identity.
    async fn add_reaction(&self, reaction: &Reaction) -> Result<(), WranglerError>;

    /// Duplicates an uploaded file into `channel_id` and returns the id of
    /// the copy, ready to be attached to a new post.
    async fn copy_file(&self, file_id: &str, channel_id: &str) -> Result<String, WranglerError>;

    /// Sends `text` to `user_id` in a direct channel with the service identity.
    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), WranglerError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, WranglerError>;

    async fn teams_for_user(&self, user_id: &str) -> Result<Vec<Team>, WranglerError>;

    async fn channels_for_team_for_user(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Vec<Channel>, WranglerError>;

    /// The newest `count` posts of a channel, newest first.
    async fn recent_messages(
        &self,
        channel_id: &str,
        count: usize,
    ) -> Result<Vec<Message>, WranglerError>;
}
