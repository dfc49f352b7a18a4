use thiserror::Error;

#[derive(Debug, Error)]
pub enum WranglerError {
    #[error("Relocation denied: {0}")]
    PolicyDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed thread: {0}")]
    MalformedThread(String),

    #[error("Failed to access Mattermost API: {0}")]
    Upstream(String),

    #[error("Replay step failed after relocation committed: {0}")]
    PartialReplayFailure(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse request: {0}")]
    Parse(String),

    #[error("Failed to send HTTP request: {0}")]
    Http(String),

    #[error("Failed to interact with AWS services: {0}")]
    Aws(String),
}

impl From<reqwest::Error> for WranglerError {
    fn from(error: reqwest::Error) -> Self {
        WranglerError::Http(error.to_string())
    }
}

impl From<serde_json::Error> for WranglerError {
    fn from(error: serde_json::Error) -> Self {
        WranglerError::Parse(error.to_string())
    }
}

/// Outcome of a failed command, split by who gets to see the details.
///
/// `UserFacing` text is shown verbatim to the invoking user. `Internal`
/// errors are logged in full and replaced by [`GENERIC_FAILURE_MESSAGE`].
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    UserFacing(String),

    #[error(transparent)]
    Internal(WranglerError),
}

/// A policy denial carries the reason for the user; every other error is
/// internal.
impl From<WranglerError> for CommandError {
    fn from(error: WranglerError) -> Self {
        match error {
            WranglerError::PolicyDenied(reason) => CommandError::UserFacing(reason),
            other => CommandError::Internal(other),
        }
    }
}

impl CommandError {
    pub fn user(text: impl Into<String>) -> Self {
        CommandError::UserFacing(text.into())
    }
}

/// Text shown to the user when an internal fault is hidden from them.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An unknown error occurred. Please talk to your administrator for help.";
