//! The `/wrangler` command surface.
//!
//! Text is parsed once into a [`Command`]; every variant carries its own
//! argument struct. [`run_command`] looks its [`CommandKind`] up in a static
//! route table, one handler per kind.

pub mod help;
pub mod listing;
pub mod parser;

use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{error, warn};

use crate::core::config::{RelocationPolicy, ServiceSettings};
use crate::core::models::{InvocationContext, RelocationMode};
use crate::errors::{CommandError, GENERIC_FAILURE_MESSAGE, WranglerError};
use crate::platform::ChatPlatform;
use crate::relocation::attach::{AttachRequest, attach_message};
use crate::relocation::{RelocateRequest, relocate};

pub use parser::{ParseError, TRIGGER, parse_command};

pub const PERMISSION_DENIED: &str =
    "Permission denied. Please talk to your system administrator to get access.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocateArgs {
    pub message_id: String,
    pub channel_id: String,
    pub show_root_message: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachArgs {
    pub message_id: String,
    pub root_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListChannelsArgs {
    pub team_filter: String,
    pub channel_filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMessagesArgs {
    pub count: usize,
    pub trim_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(RelocateArgs),
    Copy(RelocateArgs),
    Attach(AttachArgs),
    ListChannels(ListChannelsArgs),
    ListMessages(ListMessagesArgs),
    Info,
    Help,
}

/// Everything a command needs besides its arguments.
pub struct CommandEnv<'a> {
    pub platform: &'a dyn ChatPlatform,
    pub settings: ServiceSettings,
    /// Snapshot taken at the start of the request.
    pub policy: Arc<RelocationPolicy>,
    pub allowed_email_domain: String,
}

/// Which handler a [`Command`] is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Move,
    Copy,
    Attach,
    ListChannels,
    ListMessages,
    Info,
    Help,
}

impl CommandKind {
    pub const ALL: [CommandKind; 7] = [
        CommandKind::Move,
        CommandKind::Copy,
        CommandKind::Attach,
        CommandKind::ListChannels,
        CommandKind::ListMessages,
        CommandKind::Info,
        CommandKind::Help,
    ];
}

impl Command {
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Move(_) => CommandKind::Move,
            Command::Copy(_) => CommandKind::Copy,
            Command::Attach(_) => CommandKind::Attach,
            Command::ListChannels(_) => CommandKind::ListChannels,
            Command::ListMessages(_) => CommandKind::ListMessages,
            Command::Info => CommandKind::Info,
            Command::Help => CommandKind::Help,
        }
    }
}

type Handler = for<'a> fn(
    &'a CommandEnv<'a>,
    &'a InvocationContext,
    Command,
) -> BoxFuture<'a, Result<String, CommandError>>;

struct Route {
    kind: CommandKind,
    run: Handler,
}

static ROUTES: &[Route] = &[
    Route {
        kind: CommandKind::Move,
        run: run_move,
    },
    Route {
        kind: CommandKind::Copy,
        run: run_copy,
    },
    Route {
        kind: CommandKind::Attach,
        run: run_attach,
    },
    Route {
        kind: CommandKind::ListChannels,
        run: run_list_channels,
    },
    Route {
        kind: CommandKind::ListMessages,
        run: run_list_messages,
    },
    Route {
        kind: CommandKind::Info,
        run: run_info,
    },
    Route {
        kind: CommandKind::Help,
        run: run_help,
    },
];

fn route_for(kind: CommandKind) -> Option<&'static Route> {
    ROUTES.iter().find(|route| route.kind == kind)
}

/// Runs one parsed command through its route.
///
/// # Errors
///
/// Propagates the handler's user-facing or internal error.
pub async fn run_command(
    env: &CommandEnv<'_>,
    invocation: &InvocationContext,
    command: Command,
) -> Result<String, CommandError> {
    let kind = command.kind();
    let route = route_for(kind)
        .ok_or_else(|| WranglerError::Config(format!("no handler registered for {kind:?}")))?;
    (route.run)(env, invocation, command).await
}

fn misrouted(kind: CommandKind) -> CommandError {
    CommandError::Internal(WranglerError::Config(format!(
        "command routed to the {kind:?} handler by mistake"
    )))
}

fn run_move<'a>(
    env: &'a CommandEnv<'a>,
    invocation: &'a InvocationContext,
    command: Command,
) -> BoxFuture<'a, Result<String, CommandError>> {
    Box::pin(async move {
        let Command::Move(args) = command else {
            return Err(misrouted(CommandKind::Move));
        };
        run_relocate(env, invocation, RelocationMode::Move, args).await
    })
}

fn run_copy<'a>(
    env: &'a CommandEnv<'a>,
    invocation: &'a InvocationContext,
    command: Command,
) -> BoxFuture<'a, Result<String, CommandError>> {
    Box::pin(async move {
        let Command::Copy(args) = command else {
            return Err(misrouted(CommandKind::Copy));
        };
        run_relocate(env, invocation, RelocationMode::Copy, args).await
    })
}

fn run_attach<'a>(
    env: &'a CommandEnv<'a>,
    invocation: &'a InvocationContext,
    command: Command,
) -> BoxFuture<'a, Result<String, CommandError>> {
    Box::pin(async move {
        let Command::Attach(args) = command else {
            return Err(misrouted(CommandKind::Attach));
        };
        let request = AttachRequest {
            message_id: args.message_id,
            root_id: args.root_id,
            invocation: invocation.clone(),
        };
        attach_message(env.platform, &env.settings, &request).await
    })
}

fn run_list_channels<'a>(
    env: &'a CommandEnv<'a>,
    invocation: &'a InvocationContext,
    command: Command,
) -> BoxFuture<'a, Result<String, CommandError>> {
    Box::pin(async move {
        let Command::ListChannels(args) = command else {
            return Err(misrouted(CommandKind::ListChannels));
        };
        listing::list_channels(env.platform, &invocation.user_id, &args).await
    })
}

fn run_list_messages<'a>(
    env: &'a CommandEnv<'a>,
    invocation: &'a InvocationContext,
    command: Command,
) -> BoxFuture<'a, Result<String, CommandError>> {
    Box::pin(async move {
        let Command::ListMessages(args) = command else {
            return Err(misrouted(CommandKind::ListMessages));
        };
        listing::list_messages(env.platform, &invocation.channel_id, &args).await
    })
}

fn run_info<'a>(
    _env: &'a CommandEnv<'a>,
    _invocation: &'a InvocationContext,
    _command: Command,
) -> BoxFuture<'a, Result<String, CommandError>> {
    Box::pin(async { Ok(help::info_text()) })
}

fn run_help<'a>(
    _env: &'a CommandEnv<'a>,
    _invocation: &'a InvocationContext,
    _command: Command,
) -> BoxFuture<'a, Result<String, CommandError>> {
    Box::pin(async { Ok(help::help_text()) })
}

async fn run_relocate(
    env: &CommandEnv<'_>,
    invocation: &InvocationContext,
    mode: RelocationMode,
    args: RelocateArgs,
) -> Result<String, CommandError> {
    let request = RelocateRequest {
        mode,
        message_id: args.message_id,
        destination_channel_id: args.channel_id,
        show_root_message: args.show_root_message,
        invocation: invocation.clone(),
    };
    relocate(env.platform, &env.settings, &env.policy, &request).await
}

/// Authorizes, parses and runs `text`, returning what the user should see.
pub async fn handle_command_text(
    env: &CommandEnv<'_>,
    invocation: &InvocationContext,
    text: &str,
) -> String {
    if !authorized_user(env.platform, &env.allowed_email_domain, &invocation.user_id).await {
        return PERMISSION_DENIED.to_string();
    }

    let command = match parse_command(text) {
        Ok(command) => command,
        Err(ParseError::Usage(message)) => return message,
        Err(ParseError::InvalidArgument(detail)) => return user_error_text(&detail),
    };

    present(run_command(env, invocation, command).await)
}

/// Bad flag input, shown with a pointer to the help text.
#[must_use]
pub fn user_error_text(detail: &str) -> String {
    format!("__Error: {detail}__\n\nRun `/{TRIGGER} help` for usage instructions.")
}

/// Converts a command outcome into display text, logging internal faults.
#[must_use]
pub fn present(result: Result<String, CommandError>) -> String {
    match result {
        Ok(text) | Err(CommandError::UserFacing(text)) => text,
        Err(CommandError::Internal(e)) => {
            error!(error = %e, "Command failed");
            GENERIC_FAILURE_MESSAGE.to_string()
        }
    }
}

/// Whether `user_id` may use the command.
///
/// `allowed` is a comma-separated list of e-mail suffixes (a full address
/// also works). An empty list allows everyone; a user that cannot be looked
/// up is refused.
pub async fn authorized_user(platform: &dyn ChatPlatform, allowed: &str, user_id: &str) -> bool {
    let suffixes: Vec<&str> = allowed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if suffixes.is_empty() {
        return true;
    }

    match platform.get_user(user_id).await {
        Ok(Some(user)) => suffixes.iter().any(|s| user.email.ends_with(s)),
        Ok(None) => false,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Unable to look up user for authorization");
            false
        }
    }
}
