//! Mattermost REST (API v4) client
//!
//! Implements [`ChatPlatform`] with retry logic and error handling. Reads,
//! deletes and reaction adds are retried on transient failures; post creation
//! and file uploads are never retried so a slow response cannot produce a
//! duplicate.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_retry::RetryIf;
use tracing::debug;

use crate::core::models::{Channel, ChannelType, Message, NewMessage, Reaction, Team, User};
use crate::errors::WranglerError;
use crate::platform::ChatPlatform;

static HTTP_CLIENT: std::sync::LazyLock<Client> = std::sync::LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

#[derive(Debug, Deserialize)]
struct PostDto {
    id: String,
    user_id: String,
    channel_id: String,
    #[serde(default)]
    root_id: String,
    #[serde(default)]
    message: String,
    create_at: i64,
    #[serde(default, rename = "type")]
    post_type: String,
    #[serde(default)]
    file_ids: Option<Vec<String>>,
}

impl From<PostDto> for Message {
    fn from(dto: PostDto) -> Self {
        Message {
            is_system: dto.post_type.starts_with("system_"),
            id: dto.id,
            user_id: dto.user_id,
            channel_id: dto.channel_id,
            root_id: dto.root_id,
            file_ids: dto.file_ids.unwrap_or_default(),
            message: dto.message,
            create_at: dto.create_at,
            sequence: None,
        }
    }
}

/// `order` lists post ids; `posts` holds them keyed by id.
#[derive(Debug, Deserialize)]
struct PostListDto {
    #[serde(default)]
    order: Vec<String>,
    #[serde(default)]
    posts: HashMap<String, PostDto>,
}

impl PostListDto {
    /// Posts in the order the server listed them (newest first). Each is
    /// tagged with its chronological rank as sequence number.
    fn into_messages(mut self) -> Vec<Message> {
        let listed = self.order.len();
        let mut out = Vec::with_capacity(self.posts.len());
        for (position, id) in self.order.iter().enumerate() {
            if let Some(dto) = self.posts.remove(id) {
                let mut message = Message::from(dto);
                message.sequence = Some((listed - 1 - position) as u64);
                out.push(message);
            }
        }
        // Posts missing from `order` still belong to the set.
        out.extend(self.posts.into_values().map(Message::from));
        out
    }
}

#[derive(Debug, Deserialize)]
struct ChannelDto {
    id: String,
    team_id: String,
    #[serde(rename = "type")]
    channel_type: String,
    name: String,
    #[serde(default)]
    display_name: String,
}

impl TryFrom<ChannelDto> for Channel {
    type Error = WranglerError;

    fn try_from(dto: ChannelDto) -> Result<Self, Self::Error> {
        let channel_type = ChannelType::from_code(&dto.channel_type).ok_or_else(|| {
            WranglerError::Parse(format!(
                "channel {} has unknown type '{}'",
                dto.id, dto.channel_type
            ))
        })?;
        Ok(Channel {
            id: dto.id,
            team_id: dto.team_id,
            channel_type,
            name: dto.name,
            display_name: dto.display_name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TeamDto {
    id: String,
    name: String,
    #[serde(default)]
    display_name: String,
}

impl From<TeamDto> for Team {
    fn from(dto: TeamDto) -> Self {
        Team {
            id: dto.id,
            name: dto.name,
            display_name: dto.display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: String,
    username: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct ReactionDto {
    user_id: String,
    post_id: String,
    emoji_name: String,
}

#[derive(Debug, Deserialize)]
struct FileInfoDto {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileUploadDto {
    #[serde(default)]
    file_infos: Vec<FileInfoDto>,
}

/// Error body returned by the server on failures.
#[derive(Debug, Deserialize)]
struct AppErrorDto {
    #[serde(default)]
    message: String,
}

/// Mattermost API client with retry logic and error handling
pub struct MattermostClient {
    base_url: String,
    token: String,
    bot_user_id: String,
}

impl MattermostClient {
    #[must_use]
    pub fn new(site_url: &str, token: String, bot_user_id: String) -> Self {
        Self {
            base_url: format!("{}/api/v4", site_url.trim_end_matches('/')),
            token,
            bot_user_id,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        HTTP_CLIENT
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, WranglerError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, WranglerError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(5);

        RetryIf::start(strategy, operation, is_transient).await
    }

    /// GET returning `None` for missing or inaccessible resources.
    async fn get_optional<T>(&self, path: &str) -> Result<Option<T>, WranglerError>
    where
        T: DeserializeOwned + Send,
    {
        self.with_retry(move || async move {
            let resp = self
                .request(Method::GET, path)
                .send()
                .await
                .map_err(|e| WranglerError::Http(format!("GET {path}: {e}")))?;

            if matches!(resp.status(), StatusCode::NOT_FOUND | StatusCode::FORBIDDEN) {
                debug!(path = %path, status = %resp.status(), "Resource not available");
                return Ok(None);
            }

            let resp = check_status("GET", path, resp).await?;
            let body = resp
                .json::<T>()
                .await
                .map_err(|e| WranglerError::Parse(format!("GET {path} JSON parse error: {e}")))?;
            Ok(Some(body))
        })
        .await
    }

    async fn get_required<T>(&self, path: &str) -> Result<T, WranglerError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_optional(path)
            .await?
            .ok_or_else(|| WranglerError::NotFound(path.to_string()))
    }

    async fn post_json<T>(&self, path: &str, body: &Value) -> Result<T, WranglerError>
    where
        T: DeserializeOwned,
    {
        let resp = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|e| WranglerError::Http(format!("POST {path}: {e}")))?;

        check_status("POST", path, resp)
            .await?
            .json::<T>()
            .await
            .map_err(|e| WranglerError::Parse(format!("POST {path} JSON parse error: {e}")))
    }

    /// Reactions always go on as the token owner; the server refuses a
    /// `user_id` other than its own.
    fn reaction_body(&self, reaction: &Reaction) -> Value {
        json!({
            "user_id": self.bot_user_id,
            "post_id": reaction.post_id,
            "emoji_name": reaction.emoji_name,
        })
    }

    async fn direct_channel_id(&self, user_id: &str) -> Result<String, WranglerError> {
        let channel: ChannelDto = self
            .post_json("/channels/direct", &json!([self.bot_user_id, user_id]))
            .await?;
        Ok(channel.id)
    }
}

fn is_transient(error: &WranglerError) -> bool {
    matches!(error, WranglerError::Http(_))
}

/// Maps an unsuccessful response to an error. Server errors and rate limits
/// are reported as `Http` so they are retried.
async fn check_status(method: &str, path: &str, resp: Response) -> Result<Response, WranglerError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let detail = resp
        .json::<AppErrorDto>()
        .await
        .map(|e| e.message)
        .unwrap_or_default();
    let message = format!("{method} {path} HTTP {status}: {detail}");

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(WranglerError::Http(message))
    } else {
        Err(WranglerError::Upstream(message))
    }
}

#[async_trait]
impl ChatPlatform for MattermostClient {
    async fn get_thread(&self, message_id: &str) -> Result<Option<Vec<Message>>, WranglerError> {
        let list: Option<PostListDto> = self
            .get_optional(&format!("/posts/{message_id}/thread"))
            .await?;
        Ok(list.map(PostListDto::into_messages))
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<Message>, WranglerError> {
        let post: Option<PostDto> = self.get_optional(&format!("/posts/{message_id}")).await?;
        Ok(post.map(Message::from))
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, WranglerError> {
        let channel: Option<ChannelDto> =
            self.get_optional(&format!("/channels/{channel_id}")).await?;
        channel.map(Channel::try_from).transpose()
    }

    async fn get_team(&self, team_id: &str) -> Result<Option<Team>, WranglerError> {
        let team: Option<TeamDto> = self.get_optional(&format!("/teams/{team_id}")).await?;
        Ok(team.map(Team::from))
    }

    async fn get_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<bool, WranglerError> {
        let member: Option<Value> = self
            .get_optional(&format!("/channels/{channel_id}/members/{user_id}"))
            .await?;
        Ok(member.is_some())
    }

    async fn get_reactions(&self, message_id: &str) -> Result<Vec<Reaction>, WranglerError> {
        // The server answers `null` for posts without reactions.
        let reactions: Option<Vec<ReactionDto>> = self
            .get_required(&format!("/posts/{message_id}/reactions"))
            .await?;
        Ok(reactions
            .unwrap_or_default()
            .into_iter()
            .map(|r| Reaction {
                post_id: r.post_id,
                user_id: r.user_id,
                emoji_name: r.emoji_name,
            })
            .collect())
    }

    async fn create_message(&self, message: NewMessage) -> Result<Message, WranglerError> {
        // The author is whoever owns the token, i.e. the service identity.
        let body = json!({
            "channel_id": message.channel_id,
            "root_id": message.root_id,
            "message": message.message,
            "file_ids": message.file_ids,
        });
        let post: PostDto = self.post_json("/posts", &body).await?;
        Ok(Message::from(post))
    }

    async fn delete_message(&self, message_id: &str) -> Result<(), WranglerError> {
        let path = format!("/posts/{message_id}");
        let path = path.as_str();
        self.with_retry(move || async move {
            let resp = self
                .request(Method::DELETE, path)
                .send()
                .await
                .map_err(|e| WranglerError::Http(format!("DELETE {path}: {e}")))?;
            check_status("DELETE", path, resp).await?;
            Ok(())
        })
        .await
    }

    async fn add_reaction(&self, reaction: &Reaction) -> Result<(), WranglerError> {
        let body = self.reaction_body(reaction);
        let body = &body;
        // Adding the same reaction twice is a no-op, so retrying is safe.
        self.with_retry(move || async move {
            let _: Value = self.post_json("/reactions", body).await?;
            Ok(())
        })
        .await
    }

    async fn copy_file(&self, file_id: &str, channel_id: &str) -> Result<String, WranglerError> {
        let info: FileInfoDto = self.get_required(&format!("/files/{file_id}/info")).await?;

        let path = format!("/files/{file_id}");
        let path = path.as_str();
        let content = self
            .with_retry(move || async move {
                let resp = self.request(Method::GET, path).send().await?;
                let resp = check_status("GET", path, resp).await?;
                Ok::<_, WranglerError>(resp.bytes().await?)
            })
            .await?;

        // Uploads are not retried, like post creation.
        let form = Form::new()
            .text("channel_id", channel_id.to_string())
            .part("files", Part::bytes(content.to_vec()).file_name(info.name));
        let resp = self
            .request(Method::POST, "/files")
            .multipart(form)
            .send()
            .await?;
        let uploaded: FileUploadDto = check_status("POST", "/files", resp).await?.json().await?;

        uploaded
            .file_infos
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| {
                WranglerError::Upstream(format!("upload of a copy of file {file_id} returned no file"))
            })
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), WranglerError> {
        let channel_id = self.direct_channel_id(user_id).await?;
        self.create_message(NewMessage {
            channel_id,
            root_id: String::new(),
            user_id: self.bot_user_id.clone(),
            message: text.to_string(),
            file_ids: Vec::new(),
        })
        .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, WranglerError> {
        let user: Option<UserDto> = self.get_optional(&format!("/users/{user_id}")).await?;
        Ok(user.map(|u| User {
            id: u.id,
            username: u.username,
            email: u.email,
        }))
    }

    async fn teams_for_user(&self, user_id: &str) -> Result<Vec<Team>, WranglerError> {
        let teams: Vec<TeamDto> = self.get_required(&format!("/users/{user_id}/teams")).await?;
        Ok(teams.into_iter().map(Team::from).collect())
    }

    async fn channels_for_team_for_user(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Vec<Channel>, WranglerError> {
        let channels: Vec<ChannelDto> = self
            .get_required(&format!("/users/{user_id}/teams/{team_id}/channels"))
            .await?;
        channels.into_iter().map(Channel::try_from).collect()
    }

    async fn recent_messages(
        &self,
        channel_id: &str,
        count: usize,
    ) -> Result<Vec<Message>, WranglerError> {
        let list: PostListDto = self
            .get_required(&format!(
                "/channels/{channel_id}/posts?page=0&per_page={count}"
            ))
            .await?;
        let mut messages = list.into_messages();
        messages.truncate(count);
        Ok(messages)
    }
}
