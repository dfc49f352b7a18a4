//! Ordered, immutable view of a thread built from a flat set of posts.

use futures::stream::{self, Stream, StreamExt};
use std::cmp::Ordering;

use crate::core::models::{Message, Reaction};
use crate::errors::WranglerError;
use crate::platform::ChatPlatform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    root: Message,
    replies: Vec<Message>,
}

impl Thread {
    /// Builds a thread from the posts returned for `message_id`.
    ///
    /// `message_id` may name the root or any reply; the thread key is derived
    /// from it. Replies are ordered by creation time, then by the platform's
    /// sequence number (posts lacking one last), then by id.
    ///
    /// # Errors
    ///
    /// Returns `MalformedThread` when neither the requested post nor its root
    /// is part of `messages`, or when a reply belongs to a different root.
    pub fn from_messages(message_id: &str, messages: Vec<Message>) -> Result<Self, WranglerError> {
        let key = messages
            .iter()
            .find(|m| m.id == message_id)
            .map(|m| m.thread_key().to_string())
            .ok_or_else(|| {
                WranglerError::MalformedThread(format!(
                    "post {message_id} is missing from its own thread"
                ))
            })?;

        let mut root = None;
        let mut replies = Vec::with_capacity(messages.len().saturating_sub(1));
        for message in messages {
            if message.id == key {
                root = Some(message);
            } else if message.root_id == key {
                replies.push(message);
            } else {
                return Err(WranglerError::MalformedThread(format!(
                    "post {} does not belong to thread {key}",
                    message.id
                )));
            }
        }

        let root = root.ok_or_else(|| {
            WranglerError::MalformedThread(format!("root post {key} was not returned"))
        })?;
        if root.is_reply() {
            return Err(WranglerError::MalformedThread(format!(
                "root post {key} is itself a reply"
            )));
        }

        replies.sort_by(compare_replies);

        Ok(Self { root, replies })
    }

    #[must_use]
    pub fn root(&self) -> &Message {
        &self.root
    }

    #[must_use]
    pub fn replies(&self) -> &[Message] {
        &self.replies
    }

    /// Number of posts in the thread, root included.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.replies.len()
    }

    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.root.channel_id
    }

    /// Root first, then replies in order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        std::iter::once(&self.root).chain(self.replies.iter())
    }

    /// Pairs every post with its reactions, fetching them one post at a time
    /// as the stream is polled. The stream is consumed once; polling it again
    /// means fetching again.
    pub fn reactions<'a, P>(
        &'a self,
        platform: &'a P,
    ) -> impl Stream<Item = (&'a Message, Result<Vec<Reaction>, WranglerError>)> + 'a
    where
        P: ChatPlatform + ?Sized,
    {
        stream::iter(self.messages()).then(move |message| async move {
            let reactions = platform.get_reactions(&message.id).await;
            (message, reactions)
        })
    }
}

fn compare_replies(a: &Message, b: &Message) -> Ordering {
    a.create_at
        .cmp(&b.create_at)
        .then_with(|| match (a.sequence, b.sequence) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

/// Fetches the thread containing `message_id` and orders it.
///
/// # Errors
///
/// Returns `NotFound` when the id does not resolve, `MalformedThread` when the
/// fetched posts do not form a flat thread, or the platform's error.
pub async fn build_thread<P>(platform: &P, message_id: &str) -> Result<Thread, WranglerError>
where
    P: ChatPlatform + ?Sized,
{
    let messages = platform
        .get_thread(message_id)
        .await?
        .ok_or_else(|| WranglerError::NotFound(format!("post {message_id}")))?;

    Thread::from_messages(message_id, messages)
}
