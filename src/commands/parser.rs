//! Turns `/wrangler …` text into a typed [`Command`].
//!
//! Subcommands are resolved through [`COMMAND_DEFS`]; each entry owns the
//! function that builds its argument struct, so adding a command means adding
//! one row.

use std::collections::HashMap;
use thiserror::Error;

use super::{
    AttachArgs, Command, ListChannelsArgs, ListMessagesArgs, RelocateArgs,
};

pub const TRIGGER: &str = "wrangler";

pub const FLAG_SHOW_ROOT_MESSAGE: &str = "show-root-message-in-summary";
pub const FLAG_TEAM_FILTER: &str = "team-filter";
pub const FLAG_CHANNEL_FILTER: &str = "channel-filter";
pub const FLAG_COUNT: &str = "count";
pub const FLAG_TRIM_LENGTH: &str = "trim-length";

pub const MIN_LIST_MESSAGES_COUNT: usize = 1;
pub const MAX_LIST_MESSAGES_COUNT: usize = 100;
pub const DEFAULT_LIST_MESSAGES_COUNT: usize = 20;
pub const MIN_LIST_MESSAGES_TRIM_LENGTH: usize = 10;
pub const MAX_LIST_MESSAGES_TRIM_LENGTH: usize = 500;
pub const DEFAULT_LIST_MESSAGES_TRIM_LENGTH: usize = 50;

type ParseFn = fn(&ParsedArgs) -> Result<Command, ParseError>;

/// Why a command text was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text names no command, or the positional arguments do not fit
    /// its usage. Shown to the user as is.
    #[error("{0}")]
    Usage(String),

    /// A flag is unknown, lacks its value or holds a bad one.
    #[error("{0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, Copy)]
pub struct CommandDef {
    pub group: &'static str,
    pub name: Option<&'static str>,
    pub usage: &'static str,
    pub description: &'static str,
    bool_flags: &'static [&'static str],
    value_flags: &'static [&'static str],
    parse: ParseFn,
}

pub const COMMAND_DEFS: &[CommandDef] = &[
    CommandDef {
        group: "move",
        name: Some("thread"),
        usage: "/wrangler move thread [MESSAGE_ID] [CHANNEL_ID]",
        description: "Move a given message, along with the thread it belongs to, to a given channel",
        bool_flags: &[FLAG_SHOW_ROOT_MESSAGE],
        value_flags: &[],
        parse: parse_move,
    },
    CommandDef {
        group: "copy",
        name: Some("thread"),
        usage: "/wrangler copy thread [MESSAGE_ID] [CHANNEL_ID]",
        description: "Copy a given message, along with the thread it belongs to, to a given channel",
        bool_flags: &[FLAG_SHOW_ROOT_MESSAGE],
        value_flags: &[],
        parse: parse_copy,
    },
    CommandDef {
        group: "attach",
        name: Some("message"),
        usage: "/wrangler attach message [MESSAGE_ID_TO_ATTACH] [ROOT_MESSAGE_ID]",
        description: "Attach a given message to a thread in the same channel",
        bool_flags: &[],
        value_flags: &[],
        parse: parse_attach,
    },
    CommandDef {
        group: "list",
        name: Some("channels"),
        usage: "/wrangler list channels [flags]",
        description: "List the IDs of all channels you have joined",
        bool_flags: &[],
        value_flags: &[FLAG_TEAM_FILTER, FLAG_CHANNEL_FILTER],
        parse: parse_list_channels,
    },
    CommandDef {
        group: "list",
        name: Some("messages"),
        usage: "/wrangler list messages [flags]",
        description: "List the IDs of recent messages in this channel",
        bool_flags: &[],
        value_flags: &[FLAG_COUNT, FLAG_TRIM_LENGTH],
        parse: parse_list_messages,
    },
    CommandDef {
        group: "info",
        name: None,
        usage: "/wrangler info",
        description: "Shows plugin information",
        bool_flags: &[],
        value_flags: &[],
        parse: |_| Ok(Command::Info),
    },
    CommandDef {
        group: "help",
        name: None,
        usage: "/wrangler help",
        description: "Shows detailed help information",
        bool_flags: &[],
        value_flags: &[],
        parse: |_| Ok(Command::Help),
    },
];

/// Positional arguments and flags following a subcommand.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub flags: HashMap<String, String>,
}

impl ParsedArgs {
    fn flag_enabled(&self, name: &str) -> bool {
        self.flags
            .get(name)
            .is_some_and(|v| matches!(v.as_str(), "" | "true" | "on" | "1" | "yes"))
    }

    fn flag_value(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }
}

/// Parses the text of a slash command.
///
/// The leading trigger (`/wrangler` or `wrangler`) is optional. Empty text
/// yields [`Command::Help`].
///
/// # Errors
///
/// Returns [`ParseError::Usage`] when the text does not name a known command
/// or the positional arguments are wrong, and [`ParseError::InvalidArgument`]
/// for flag problems.
pub fn parse_command(text: &str) -> Result<Command, ParseError> {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    if words
        .first()
        .is_some_and(|w| w.trim_start_matches('/') == TRIGGER)
    {
        words.remove(0);
    }

    let Some(group) = words.first().copied() else {
        return Ok(Command::Help);
    };
    let group = group.trim_start_matches('/');

    let in_group: Vec<&CommandDef> = COMMAND_DEFS.iter().filter(|d| d.group == group).collect();
    if in_group.is_empty() {
        return Err(ParseError::Usage(format!(
            "/{group} is not a valid command. Please see /{TRIGGER} help"
        )));
    }

    let (def, rest) = match in_group.iter().find(|d| d.name.is_none()) {
        Some(def) => (*def, &words[1..]),
        None => {
            let sub = words.get(1).copied();
            match in_group.iter().find(|d| d.name == sub) {
                Some(def) => (*def, &words[2..]),
                None => {
                    let names: Vec<&str> = in_group.iter().filter_map(|d| d.name).collect();
                    return Err(ParseError::Usage(format!(
                        "/{TRIGGER} {group} requires an additional command. Try adding {}. Please see /{TRIGGER} help for more info",
                        names.join(" or ")
                    )));
                }
            }
        }
    };

    let args = split_args(def, rest)?;
    (def.parse)(&args)
}

fn split_args(def: &CommandDef, words: &[&str]) -> Result<ParsedArgs, ParseError> {
    let mut args = ParsedArgs::default();
    let mut iter = words.iter();

    while let Some(word) = iter.next() {
        let Some(flag) = word.strip_prefix("--") else {
            args.positional.push((*word).to_string());
            continue;
        };

        let (name, inline_value) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (flag, None),
        };

        if def.bool_flags.contains(&name) {
            args.flags
                .insert(name.to_string(), inline_value.unwrap_or_default());
        } else if def.value_flags.contains(&name) {
            let value = match inline_value {
                Some(v) => v,
                None => iter
                    .next()
                    .map(|v| (*v).to_string())
                    .ok_or_else(|| {
                        ParseError::InvalidArgument(format!("flag needs an argument: --{name}"))
                    })?,
            };
            args.flags.insert(name.to_string(), value);
        } else {
            return Err(ParseError::InvalidArgument(format!(
                "unknown flag: --{name}\n\nUsage: {}",
                def.usage
            )));
        }
    }

    Ok(args)
}

fn two_positional(args: &ParsedArgs, usage: &str) -> Result<(String, String), ParseError> {
    match args.positional.as_slice() {
        [first, second] => Ok((first.clone(), second.clone())),
        _ => Err(ParseError::Usage(format!(
            "Error: expected exactly two arguments\n\nUsage: {usage}"
        ))),
    }
}

fn parse_relocate(args: &ParsedArgs, usage: &str) -> Result<RelocateArgs, ParseError> {
    let (message_id, channel_id) = two_positional(args, usage)?;
    Ok(RelocateArgs {
        message_id,
        channel_id,
        show_root_message: args.flag_enabled(FLAG_SHOW_ROOT_MESSAGE),
    })
}

fn parse_move(args: &ParsedArgs) -> Result<Command, ParseError> {
    parse_relocate(args, COMMAND_DEFS[0].usage).map(Command::Move)
}

fn parse_copy(args: &ParsedArgs) -> Result<Command, ParseError> {
    parse_relocate(args, COMMAND_DEFS[1].usage).map(Command::Copy)
}

fn parse_attach(args: &ParsedArgs) -> Result<Command, ParseError> {
    let (message_id, root_id) = two_positional(args, COMMAND_DEFS[2].usage)?;
    Ok(Command::Attach(AttachArgs {
        message_id,
        root_id,
    }))
}

fn parse_list_channels(args: &ParsedArgs) -> Result<Command, ParseError> {
    Ok(Command::ListChannels(ListChannelsArgs {
        team_filter: args.flag_value(FLAG_TEAM_FILTER).unwrap_or_default().to_string(),
        channel_filter: args
            .flag_value(FLAG_CHANNEL_FILTER)
            .unwrap_or_default()
            .to_string(),
    }))
}

fn parse_list_messages(args: &ParsedArgs) -> Result<Command, ParseError> {
    let count = bounded(
        FLAG_COUNT,
        args.flag_value(FLAG_COUNT),
        DEFAULT_LIST_MESSAGES_COUNT,
        MIN_LIST_MESSAGES_COUNT,
        MAX_LIST_MESSAGES_COUNT,
    )?;
    let trim_length = bounded(
        FLAG_TRIM_LENGTH,
        args.flag_value(FLAG_TRIM_LENGTH),
        DEFAULT_LIST_MESSAGES_TRIM_LENGTH,
        MIN_LIST_MESSAGES_TRIM_LENGTH,
        MAX_LIST_MESSAGES_TRIM_LENGTH,
    )?;
    Ok(Command::ListMessages(ListMessagesArgs { count, trim_length }))
}

fn bounded(
    name: &str,
    raw: Option<&str>,
    default: usize,
    min: usize,
    max: usize,
) -> Result<usize, ParseError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: i64 = raw
        .parse()
        .map_err(|_| ParseError::InvalidArgument(format!("{name} ({raw}) must be a number")))?;
    if value < min as i64 || value > max as i64 {
        return Err(ParseError::InvalidArgument(format!(
            "{name} ({value}) must be between {min} and {max}"
        )));
    }
    Ok(value as usize)
}
