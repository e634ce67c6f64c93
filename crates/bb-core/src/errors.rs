use std::path::PathBuf;

/// Core error type.
///
/// Adapter crates map their specific errors into this type. The three
/// user-facing variants (`Validation`, `Remote`, `Store`) carry text that is
/// shown to the user as-is; everything else is internal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("external error: {0}")]
    External(String),

    /// The account service rejected the identifier/secret pair.
    #[error("{0}")]
    Validation(String),

    /// Balance retrieval from the account service failed.
    #[error("{0}")]
    Remote(String),

    /// Credential store read or write failed.
    #[error("{0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;

const GENERIC_FAILURE: &str = "Something went wrong, please try again later.";

/// Text that is allowed to reach the chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserFacing(String);

impl UserFacing {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error {
    pub fn user_facing(&self) -> UserFacing {
        match self {
            Error::Validation(msg) | Error::Remote(msg) | Error::Store(msg) => {
                UserFacing(msg.clone())
            }
            _ => UserFacing(GENERIC_FAILURE.to_string()),
        }
    }
}
