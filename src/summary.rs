//! Confirmation text shown after a relocation, plus the small text helpers
//! shared by the listing commands.

use crate::core::models::{Channel, RelocationMode, RelocationResult, Team};

/// Longest root excerpt included in a summary.
pub const ROOT_EXCERPT_LENGTH: usize = 500;

/// Builds a permalink to a post.
///
/// # Examples
///
/// ```
/// use wrangler::summary::make_post_link;
///
/// let link = make_post_link("https://chat.example.com/", "eng", "abc123");
/// assert_eq!(link, "https://chat.example.com/eng/pl/abc123");
/// ```
#[must_use]
pub fn make_post_link(site_url: &str, team_name: &str, post_id: &str) -> String {
    format!("{}/{}/pl/{}", site_url.trim_end_matches('/'), team_name, post_id)
}

/// Renders the confirmation block for a finished relocation.
///
/// `root_excerpt` carries the original root body when the caller asked for it.
#[must_use]
pub fn render_summary(
    result: &RelocationResult,
    site_url: &str,
    team: &Team,
    channel: &Channel,
    root_excerpt: Option<&str>,
) -> String {
    let link = make_post_link(site_url, &team.name, &result.new_root_id);

    let mut msg = match result.mode {
        RelocationMode::Move => format!("A thread has been moved: {link}\n"),
        RelocationMode::Copy => format!("Thread copy complete: {link}\n"),
    };
    msg.push_str(&format!(
        "\n| Team | Channel | Messages |\n| -- | -- | -- |\n| {} | {} | {} |\n\n",
        team.display_name, channel.display_name, result.message_count
    ));

    if let Some(text) = root_excerpt {
        msg.push_str(&format!(
            "Original Thread Root Message:\n{}\n",
            code_block(&clean_and_trim_message(text, ROOT_EXCERPT_LENGTH))
        ));
    }

    msg
}

/// Collapses a message onto one line and cuts it to `max_chars` characters,
/// marking the cut with `...`.
///
/// # Examples
///
/// ```
/// use wrangler::summary::clean_and_trim_message;
///
/// assert_eq!(clean_and_trim_message("hello\nworld", 50), "hello world");
/// assert_eq!(clean_and_trim_message("abcdefghijkl", 10), "abcdefghij...");
/// ```
#[must_use]
pub fn clean_and_trim_message(message: &str, max_chars: usize) -> String {
    let cleaned = message.split_whitespace().collect::<Vec<_>>().join(" ");
    // Fences inside the excerpt would close the surrounding block early.
    let cleaned = cleaned.replace("```", "'''");

    match cleaned.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &cleaned[..cut]),
        None => cleaned,
    }
}

/// Wraps text in a fenced code block.
#[must_use]
pub fn code_block(text: &str) -> String {
    format!("```\n{text}\n```")
}
