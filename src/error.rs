// Error taxonomy for the upload protocol.
//
// Every failure the library can produce is one variant of `UploadError`.
// The GraphQL reply is classified into these variants right after the
// call (see `graphql::classify`), so callers only ever match on a tag.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    /// No token stored (or an empty one). The user has to log in again.
    #[error("Please login, run: tape login or tape config")]
    MissingCredentials,

    /// The server rejected the token (`extensions.code == "UNAUTHENTICATED"`).
    #[error("Authentication error. Try again after running -> tape login")]
    Unauthenticated,

    /// Any other GraphQL error list; messages are kept in server order.
    #[error("{}", .messages.join(", "))]
    Api { messages: Vec<String> },

    /// A non-2xx HTTP reply that carried no GraphQL errors.
    #[error("request failed with status {status}: {body}")]
    Transport { status: StatusCode, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

impl UploadError {
    /// HTTP status attached to the failure, when the server sent one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UploadError::Transport { status, .. } => Some(*status),
            UploadError::Http(err) => err.status(),
            _ => None,
        }
    }

    /// True for the two failures that are fixed by logging in again.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            UploadError::MissingCredentials | UploadError::Unauthenticated
        )
    }
}

pub type Result<T> = std::result::Result<T, UploadError>;
