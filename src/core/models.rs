use serde::{Deserialize, Serialize};

/// A single post as fetched from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub user_id: String,
    pub channel_id: String,
    /// Id of the thread root; empty for a root (or unthreaded) message.
    #[serde(default)]
    pub root_id: String,
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub message: String,
    /// Creation time in milliseconds since the epoch.
    pub create_at: i64,
    /// Platform-provided ordering hint, when there is one.
    #[serde(default)]
    pub sequence: Option<u64>,
    #[serde(default)]
    pub is_system: bool,
}

impl Message {
    #[must_use]
    pub fn is_reply(&self) -> bool {
        !self.root_id.is_empty()
    }

    /// The id of the thread this message belongs to.
    #[must_use]
    pub fn thread_key(&self) -> &str {
        if self.is_reply() {
            &self.root_id
        } else {
            &self.id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reaction {
    pub post_id: String,
    pub user_id: String,
    pub emoji_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelType {
    Open,
    Private,
    Direct,
    Group,
}

impl ChannelType {
    /// Maps the single-letter channel type used on the wire.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "O" => Some(ChannelType::Open),
            "P" => Some(ChannelType::Private),
            "D" => Some(ChannelType::Direct),
            "G" => Some(ChannelType::Group),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_group_or_direct(self) -> bool {
        matches!(self, ChannelType::Direct | ChannelType::Group)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub team_id: String,
    pub channel_type: ChannelType,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// A post to be created on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMessage {
    pub channel_id: String,
    pub root_id: String,
    pub user_id: String,
    pub message: String,
    pub file_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelocationMode {
    Move,
    Copy,
}

impl RelocationMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RelocationMode::Move => "move",
            RelocationMode::Copy => "copy",
        }
    }
}

/// Where and by whom a command was invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub user_id: String,
    pub channel_id: String,
    pub team_id: String,
    /// Set when the command was typed as a reply inside a thread.
    pub root_id: Option<String>,
    pub parent_id: Option<String>,
}

impl InvocationContext {
    /// Whether the command was typed inside the thread rooted at `root_id`.
    #[must_use]
    pub fn is_inside_thread(&self, root_id: &str) -> bool {
        self.root_id.as_deref() == Some(root_id) || self.parent_id.as_deref() == Some(root_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationResult {
    pub mode: RelocationMode,
    pub new_root_id: String,
    pub destination_channel_id: String,
    pub destination_team_id: String,
    pub message_count: usize,
    pub reaction_failures: usize,
    pub dropped_attachments: usize,
    /// `None` when no notification was attempted.
    pub author_notified: Option<bool>,
}
