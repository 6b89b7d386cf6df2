//! Error types for tg-sessions

use std::path::PathBuf;

/// Result type alias for tg-sessions operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while creating or using sessions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error while reading or writing session artifacts
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Both or neither of the file/string output modes was selected
    #[error("specify exactly one session type: a session file or a string session")]
    AmbiguousSessionMode,

    /// A numbered menu prompt received something it does not understand
    #[error("invalid choice: {input:?}")]
    InvalidChoice { input: String },

    /// The named file is not a valid session database
    #[error("not a valid session file: {} (make sure the file matches the chosen format)", path.display())]
    InvalidSessionFile { path: PathBuf },

    /// A string session could not be decoded
    #[error("invalid session string: {message}")]
    InvalidSessionString { message: String },

    /// The session holds no authorization for its home datacenter
    #[error("session is not authorized: log in first to obtain an auth key")]
    MissingAuthKey,

    /// Connected, but the stored session is not signed in anymore
    #[error("authorization failed: invalid session file or the session has expired")]
    Unauthorized,

    /// The account already has a 2FA password; changing it requires the
    /// current one (remote reports PASSWORD_HASH_INVALID)
    #[error("2FA is already enabled: provide the current 2FA password to change it")]
    TwoFaAlreadyEnabled,

    /// Error raised while writing a session database
    #[error("session database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Interactive prompt failed (no TTY, interrupted, ...)
    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// Any other error reported by the Telegram client library
    #[error("telegram error: {message}")]
    Telegram { message: String },
}

impl Error {
    /// Create an invalid session file error for the given path
    pub fn invalid_session_file(path: impl Into<PathBuf>) -> Self {
        Self::InvalidSessionFile { path: path.into() }
    }

    /// Create an invalid session string error with a message
    pub fn invalid_session_string(msg: impl Into<String>) -> Self {
        Self::InvalidSessionString {
            message: msg.into(),
        }
    }

    /// Create an invalid menu choice error
    pub fn invalid_choice(input: impl Into<String>) -> Self {
        Self::InvalidChoice {
            input: input.into(),
        }
    }

    /// Wrap a client library error, keeping only its message text
    pub fn telegram(err: impl std::fmt::Display) -> Self {
        Self::Telegram {
            message: err.to_string(),
        }
    }
}
