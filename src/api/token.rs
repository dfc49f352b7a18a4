//! Slash command token verification.
//!
//! Mattermost sends the command's verification token both as the `token` form
//! field and as an `Authorization: Token …` header.

use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
    Valid,
    Missing,
    Mismatch,
}

impl TokenCheck {
    /// HTTP status for a rejected request.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            TokenCheck::Valid => 200,
            TokenCheck::Missing => 400,
            TokenCheck::Mismatch => 401,
        }
    }
}

/// Extracts the token from an `Authorization` header value.
#[must_use]
pub fn token_from_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("token")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

/// Compares the presented token with the configured one. The form field wins
/// over the header when both are present.
#[must_use]
pub fn verify_command_token(
    form_token: &str,
    authorization: Option<&str>,
    expected: &str,
) -> TokenCheck {
    let presented = Some(form_token.trim())
        .filter(|t| !t.is_empty())
        .or_else(|| authorization.and_then(token_from_authorization));

    let Some(presented) = presented else {
        error!("Slash command request carries no token");
        return TokenCheck::Missing;
    };

    if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        TokenCheck::Valid
    } else {
        error!("Slash command token verification failed");
        TokenCheck::Mismatch
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
