use super::parser::{
    COMMAND_DEFS, DEFAULT_LIST_MESSAGES_COUNT, DEFAULT_LIST_MESSAGES_TRIM_LENGTH,
    FLAG_CHANNEL_FILTER, FLAG_COUNT, FLAG_SHOW_ROOT_MESSAGE, FLAG_TEAM_FILTER, FLAG_TRIM_LENGTH,
    MAX_LIST_MESSAGES_COUNT, MAX_LIST_MESSAGES_TRIM_LENGTH, MIN_LIST_MESSAGES_COUNT,
    MIN_LIST_MESSAGES_TRIM_LENGTH,
};
use crate::summary::code_block;

/// Set at build time by the release pipeline.
const BUILD_HASH: Option<&str> = option_env!("WRANGLER_BUILD_HASH");
const BUILD_DATE: Option<&str> = option_env!("WRANGLER_BUILD_DATE");

#[must_use]
pub fn info_text() -> String {
    let mut text = format!("Wrangler version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(hash) = BUILD_HASH {
        text.push_str(&format!(", commit {hash}"));
    }
    if let Some(date) = BUILD_DATE {
        text.push_str(&format!(", built {date}"));
    }
    text.push_str("\n\n");
    text
}

fn flags_for(usage: &str) -> Vec<String> {
    if usage.contains("move thread") || usage.contains("copy thread") {
        vec![format!(
            "--{FLAG_SHOW_ROOT_MESSAGE}   Show the root message in the post-move summary"
        )]
    } else if usage.contains("list channels") {
        vec![
            format!(
                "--{FLAG_TEAM_FILTER} string      A filter value that team names must contain to be shown on the list"
            ),
            format!(
                "--{FLAG_CHANNEL_FILTER} string   A filter value that channel names must contain to be shown on the list"
            ),
        ]
    } else if usage.contains("list messages") {
        vec![
            format!(
                "--{FLAG_COUNT} int         Number of messages to return. Must be between {MIN_LIST_MESSAGES_COUNT} and {MAX_LIST_MESSAGES_COUNT} (default {DEFAULT_LIST_MESSAGES_COUNT})"
            ),
            format!(
                "--{FLAG_TRIM_LENGTH} int   The max character count of messages listed before they are trimmed. Must be between {MIN_LIST_MESSAGES_TRIM_LENGTH} and {MAX_LIST_MESSAGES_TRIM_LENGTH} (default {DEFAULT_LIST_MESSAGES_TRIM_LENGTH})"
            ),
        ]
    } else {
        Vec::new()
    }
}

#[must_use]
pub fn help_text() -> String {
    let mut text = String::from("Wrangler - Slash Command Help\n");
    for def in COMMAND_DEFS {
        text.push('\n');
        text.push_str(def.usage);
        text.push_str("\n  ");
        text.push_str(def.description);
        text.push('\n');
        let flags = flags_for(def.usage);
        if !flags.is_empty() {
            text.push_str("    Flags:\n");
            for flag in flags {
                text.push_str("      ");
                text.push_str(&flag);
                text.push('\n');
            }
        }
    }
    code_block(text.trim_end())
}
