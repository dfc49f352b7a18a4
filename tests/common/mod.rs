//! In-memory `ChatPlatform` shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use wrangler::core::config::ServiceSettings;
use wrangler::core::models::{
    Channel, ChannelType, InvocationContext, Message, NewMessage, Reaction, Team, User,
};
use wrangler::errors::WranglerError;
use wrangler::platform::ChatPlatform;

/// Collects formatted log lines written while a test runs.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Installs a plain-text subscriber writing into this buffer for the
    /// current thread until the guard is dropped.
    pub fn capture(&self) -> tracing::subscriber::DefaultGuard {
        let buffer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || buffer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub const SITE_URL: &str = "https://chat.example.com";
pub const BOT_USER_ID: &str = "bot";
pub const INVOKER: &str = "u-invoker";
pub const AUTHOR: &str = "u-author";

#[derive(Default)]
struct State {
    posts: Vec<Message>,
    deleted: HashSet<String>,
    channels: HashMap<String, Channel>,
    teams: Vec<Team>,
    members: HashSet<(String, String)>,
    users: HashMap<String, User>,
    reactions: HashMap<String, Vec<Reaction>>,

    calls: Vec<String>,
    created: Vec<NewMessage>,
    deletes: Vec<String>,
    dms: Vec<(String, String)>,
    added_reactions: Vec<Reaction>,
    copied_files: Vec<(String, String)>,

    create_calls: usize,
    fail_create_on: Option<usize>,
    fail_reactions_for: HashSet<String>,
    fail_add_reaction: bool,
    fail_dm: bool,
    fail_delete: bool,
    fail_team: bool,
    fail_copy_file: HashSet<String>,
}

#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

pub fn post(id: &str, user_id: &str, channel_id: &str, root_id: &str, create_at: i64) -> Message {
    Message {
        id: id.to_string(),
        user_id: user_id.to_string(),
        channel_id: channel_id.to_string(),
        root_id: root_id.to_string(),
        file_ids: Vec::new(),
        message: format!("text of {id}"),
        create_at,
        sequence: None,
        is_system: false,
    }
}

pub fn channel(id: &str, team_id: &str, channel_type: ChannelType) -> Channel {
    Channel {
        id: id.to_string(),
        team_id: team_id.to_string(),
        channel_type,
        name: id.to_string(),
        display_name: format!("Channel {id}"),
    }
}

pub fn reaction(post_id: &str, user_id: &str, emoji: &str) -> Reaction {
    Reaction {
        post_id: post_id.to_string(),
        user_id: user_id.to_string(),
        emoji_name: emoji.to_string(),
    }
}

pub fn settings() -> ServiceSettings {
    ServiceSettings {
        site_url: SITE_URL.to_string(),
        bot_user_id: BOT_USER_ID.to_string(),
    }
}

pub fn invocation(channel_id: &str) -> InvocationContext {
    InvocationContext {
        user_id: INVOKER.to_string(),
        channel_id: channel_id.to_string(),
        team_id: "t1".to_string(),
        root_id: None,
        parent_id: None,
    }
}

/// Two teams; `c-src`, `c-dst` and `c-priv` in `t1`, `c-far` in `t2`. The
/// invoker belongs to every channel. Thread `root` in `c-src` has replies
/// `r1` and `r2`, the root written by [`AUTHOR`].
pub fn standard_platform() -> FakePlatform {
    let platform = FakePlatform::default();
    platform.add_team("t1", "eng", "Engineering");
    platform.add_team("t2", "ops", "Operations");
    platform.add_channel(channel("c-src", "t1", ChannelType::Open));
    platform.add_channel(channel("c-dst", "t1", ChannelType::Open));
    platform.add_channel(channel("c-priv", "t1", ChannelType::Private));
    platform.add_channel(channel("c-far", "t2", ChannelType::Open));
    for c in ["c-src", "c-dst", "c-priv", "c-far"] {
        platform.add_member(c, INVOKER);
    }
    platform.add_user(INVOKER, "invoker@example.com");
    platform.add_user(AUTHOR, "author@example.com");

    platform.add_post(post("root", AUTHOR, "c-src", "", 100));
    platform.add_post(post("r2", "u-two", "c-src", "root", 300));
    platform.add_post(post("r1", "u-one", "c-src", "root", 200));
    platform
}

impl FakePlatform {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_team(&self, id: &str, name: &str, display_name: &str) {
        self.state().teams.push(Team {
            id: id.to_string(),
            name: name.to_string(),
            display_name: display_name.to_string(),
        });
    }

    pub fn add_channel(&self, channel: Channel) {
        self.state().channels.insert(channel.id.clone(), channel);
    }

    pub fn add_member(&self, channel_id: &str, user_id: &str) {
        self.state()
            .members
            .insert((channel_id.to_string(), user_id.to_string()));
    }

    pub fn add_user(&self, id: &str, email: &str) {
        self.state().users.insert(
            id.to_string(),
            User {
                id: id.to_string(),
                username: id.trim_start_matches("u-").to_string(),
                email: email.to_string(),
            },
        );
    }

    pub fn add_post(&self, message: Message) {
        self.state().posts.push(message);
    }

    pub fn add_reaction(&self, reaction: Reaction) {
        self.state()
            .reactions
            .entry(reaction.post_id.clone())
            .or_default()
            .push(reaction);
    }

    /// Makes the `n`-th call to `create_message` (1-based) fail.
    pub fn fail_create_on(&self, n: usize) {
        self.state().fail_create_on = Some(n);
    }

    pub fn fail_reactions_for(&self, post_id: &str) {
        self.state().fail_reactions_for.insert(post_id.to_string());
    }

    pub fn fail_add_reaction(&self) {
        self.state().fail_add_reaction = true;
    }

    pub fn fail_dm(&self) {
        self.state().fail_dm = true;
    }

    pub fn fail_delete(&self) {
        self.state().fail_delete = true;
    }

    pub fn fail_team(&self) {
        self.state().fail_team = true;
    }

    pub fn fail_copy_file(&self, file_id: &str) {
        self.state().fail_copy_file.insert(file_id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn created(&self) -> Vec<NewMessage> {
        self.state().created.clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.state().deletes.clone()
    }

    pub fn dms(&self) -> Vec<(String, String)> {
        self.state().dms.clone()
    }

    pub fn added_reactions(&self) -> Vec<Reaction> {
        self.state().added_reactions.clone()
    }

    /// `(file_id, channel_id)` of every duplicated attachment.
    pub fn copied_files(&self) -> Vec<(String, String)> {
        self.state().copied_files.clone()
    }

    /// Number of calls that changed platform state.
    pub fn write_count(&self) -> usize {
        let state = self.state();
        state.created.len()
            + state.deletes.len()
            + state.dms.len()
            + state.added_reactions.len()
            + state.copied_files.len()
    }

    pub fn is_deleted(&self, post_id: &str) -> bool {
        self.state().deleted.contains(post_id)
    }

    /// Live posts of `channel_id`, oldest first.
    pub fn posts_in(&self, channel_id: &str) -> Vec<Message> {
        let state = self.state();
        let mut posts: Vec<Message> = state
            .posts
            .iter()
            .filter(|p| p.channel_id == channel_id && !state.deleted.contains(&p.id))
            .cloned()
            .collect();
        posts.sort_by_key(|p| p.create_at);
        posts
    }

    fn record(&self, call: &str) {
        self.state().calls.push(call.to_string());
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn get_thread(&self, message_id: &str) -> Result<Option<Vec<Message>>, WranglerError> {
        self.record("get_thread");
        let state = self.state();
        let live = |m: &&Message| !state.deleted.contains(&m.id);

        let Some(start) = state.posts.iter().filter(live).find(|m| m.id == message_id) else {
            return Ok(None);
        };
        let key = start.thread_key().to_string();
        Ok(Some(
            state
                .posts
                .iter()
                .filter(live)
                .filter(|m| m.id == key || m.root_id == key)
                .cloned()
                .collect(),
        ))
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<Message>, WranglerError> {
        self.record("get_message");
        let state = self.state();
        Ok(state
            .posts
            .iter()
            .find(|m| m.id == message_id && !state.deleted.contains(&m.id))
            .cloned())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, WranglerError> {
        self.record("get_channel");
        Ok(self.state().channels.get(channel_id).cloned())
    }

    async fn get_team(&self, team_id: &str) -> Result<Option<Team>, WranglerError> {
        self.record("get_team");
        let state = self.state();
        if state.fail_team {
            return Err(WranglerError::Upstream(format!("team {team_id} unavailable")));
        }
        Ok(state.teams.iter().find(|t| t.id == team_id).cloned())
    }

    async fn get_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<bool, WranglerError> {
        self.record("get_channel_member");
        Ok(self
            .state()
            .members
            .contains(&(channel_id.to_string(), user_id.to_string())))
    }

    async fn get_reactions(&self, message_id: &str) -> Result<Vec<Reaction>, WranglerError> {
        self.record("get_reactions");
        let state = self.state();
        if state.fail_reactions_for.contains(message_id) {
            return Err(WranglerError::Upstream(format!(
                "reactions for {message_id} unavailable"
            )));
        }
        Ok(state.reactions.get(message_id).cloned().unwrap_or_default())
    }

    async fn create_message(&self, message: NewMessage) -> Result<Message, WranglerError> {
        self.record("create_message");
        let mut state = self.state();
        state.create_calls += 1;
        if state.fail_create_on == Some(state.create_calls) {
            return Err(WranglerError::Upstream("create refused".to_string()));
        }

        let created = Message {
            id: format!("new-{}", state.create_calls),
            user_id: message.user_id.clone(),
            channel_id: message.channel_id.clone(),
            root_id: message.root_id.clone(),
            file_ids: message.file_ids.clone(),
            message: message.message.clone(),
            create_at: 10_000 + state.create_calls as i64,
            sequence: None,
            is_system: false,
        };
        state.posts.push(created.clone());
        state.created.push(message);
        Ok(created)
    }

    async fn delete_message(&self, message_id: &str) -> Result<(), WranglerError> {
        self.record("delete_message");
        let mut state = self.state();
        if state.fail_delete {
            return Err(WranglerError::Upstream("delete refused".to_string()));
        }
        state.deletes.push(message_id.to_string());

        let cascade: Vec<String> = state
            .posts
            .iter()
            .filter(|p| p.id == message_id || p.root_id == message_id)
            .map(|p| p.id.clone())
            .collect();
        state.deleted.extend(cascade);
        Ok(())
    }

    async fn add_reaction(&self, reaction: &Reaction) -> Result<(), WranglerError> {
        self.record("add_reaction");
        let mut state = self.state();
        if state.fail_add_reaction {
            return Err(WranglerError::Upstream("reaction refused".to_string()));
        }
        state.added_reactions.push(reaction.clone());
        Ok(())
    }

    async fn copy_file(&self, file_id: &str, channel_id: &str) -> Result<String, WranglerError> {
        self.record("copy_file");
        let mut state = self.state();
        if state.fail_copy_file.contains(file_id) {
            return Err(WranglerError::Upstream(format!("file {file_id} unavailable")));
        }
        state
            .copied_files
            .push((file_id.to_string(), channel_id.to_string()));
        Ok(format!("copy-of-{file_id}"))
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), WranglerError> {
        self.record("send_direct_message");
        let mut state = self.state();
        if state.fail_dm {
            return Err(WranglerError::Upstream("dm refused".to_string()));
        }
        state.dms.push((user_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, WranglerError> {
        self.record("get_user");
        Ok(self.state().users.get(user_id).cloned())
    }

    async fn teams_for_user(&self, user_id: &str) -> Result<Vec<Team>, WranglerError> {
        self.record("teams_for_user");
        let state = self.state();
        Ok(state
            .teams
            .iter()
            .filter(|t| {
                state.channels.values().any(|c| {
                    c.team_id == t.id && state.members.contains(&(c.id.clone(), user_id.to_string()))
                })
            })
            .cloned()
            .collect())
    }

    async fn channels_for_team_for_user(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Vec<Channel>, WranglerError> {
        self.record("channels_for_team_for_user");
        let state = self.state();
        let mut channels: Vec<Channel> = state
            .channels
            .values()
            .filter(|c| {
                c.team_id == team_id && state.members.contains(&(c.id.clone(), user_id.to_string()))
            })
            .cloned()
            .collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(channels)
    }

    async fn recent_messages(
        &self,
        channel_id: &str,
        count: usize,
    ) -> Result<Vec<Message>, WranglerError> {
        self.record("recent_messages");
        let mut posts = self.posts_in(channel_id);
        posts.reverse();
        posts.truncate(count);
        Ok(posts)
    }
}
