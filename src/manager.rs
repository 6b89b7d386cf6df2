//! Session creation flows
//!
//! Drives one login handshake and materializes the result as either a
//! session file or a string session, in the Telethon or Pyrogram format.
//! The output mode is validated before any network interaction happens,
//! and the string-from-existing-file path never connects at all.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::api::{run_scoped, AuthData, TelegramApi};
use crate::prompt::ResolvedCredentials;
use crate::{pyrogram, telethon, Error, Result};

/// Which client library the produced artifact targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFormat {
    Telethon,
    Pyrogram,
}

impl SessionFormat {
    /// Encode authorization material as this format's string session
    pub fn encode_string(self, auth: &AuthData) -> String {
        match self {
            Self::Telethon => telethon::encode_string(auth),
            Self::Pyrogram => pyrogram::encode_string(auth),
        }
    }

    /// Write a session file in this format
    pub fn write_file(self, path: &Path, auth: &AuthData) -> Result<()> {
        match self {
            Self::Telethon => telethon::write_session_file(path, auth),
            Self::Pyrogram => pyrogram::write_session_file(path, auth),
        }
    }

    /// Read authorization material from a session file in this format
    pub fn read_file(self, path: &Path) -> Result<AuthData> {
        match self {
            Self::Telethon => telethon::read_session_file(path),
            Self::Pyrogram => pyrogram::read_session_file(path),
        }
    }
}

impl std::fmt::Display for SessionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Telethon => "Telethon",
            Self::Pyrogram => "Pyrogram",
        })
    }
}

/// The artifact kind the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    File,
    String,
}

/// Validate the mutually exclusive file/string selection.
///
/// Selecting both or neither is an input error; nothing else may happen
/// first, in particular no network interaction.
pub fn select_output_mode(session_file: bool, session_string: bool) -> Result<OutputMode> {
    match (session_file, session_string) {
        (true, false) => Ok(OutputMode::File),
        (false, true) => Ok(OutputMode::String),
        _ => Err(Error::AmbiguousSessionMode),
    }
}

/// Where the string session's material comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringSource {
    /// Log in now and export the fresh authorization
    FreshLogin,
    /// Derive the string from an existing session file, offline
    ExistingFile(PathBuf),
}

impl StringSource {
    /// Parse the numbered menu choice ("1" = fresh login, "2" = existing
    /// file, prompting for its name).
    pub fn from_choice(
        choice: &str,
        file_name: impl FnOnce() -> Result<String>,
    ) -> Result<Self> {
        match choice.trim() {
            "1" => Ok(Self::FreshLogin),
            "2" => Ok(Self::ExistingFile(PathBuf::from(file_name()?))),
            other => Err(Error::invalid_choice(other)),
        }
    }
}

/// What a successful creation produced
#[derive(Debug)]
pub struct SessionOutcome {
    /// The string session, in string mode
    pub session_string: Option<String>,
    /// The written file, in file mode
    pub file: Option<PathBuf>,
    /// Whether the string also landed on the clipboard
    pub copied_to_clipboard: bool,
}

/// Create a session artifact.
///
/// `connect` is only invoked after input validation passes and only for
/// paths that actually need the network. `read_code` supplies the OTP the
/// operator received during a fresh login.
pub async fn create_session<A, C, Fut, P>(
    format: SessionFormat,
    session_file: bool,
    session_string: bool,
    creds: ResolvedCredentials,
    source: StringSource,
    connect: C,
    read_code: P,
) -> Result<SessionOutcome>
where
    A: TelegramApi,
    C: FnOnce() -> Fut,
    Fut: Future<Output = Result<A>>,
    P: FnOnce() -> Result<String> + Send + 'static,
{
    let mode = select_output_mode(session_file, session_string)?;

    // Deriving from an existing file is an offline operation
    if mode == OutputMode::String {
        if let StringSource::ExistingFile(path) = &source {
            let auth = format.read_file(path)?;
            return Ok(string_outcome(format, &auth));
        }
    }

    let api = connect().await?;
    run_scoped(api, move |api| {
        Box::pin(async move {
            sign_in(api, &creds, read_code).await?;
            let auth = api.export_auth().await?;

            match mode {
                OutputMode::File => {
                    let path = PathBuf::from(format!("{}.session", creds.phone));
                    format.write_file(&path, &auth)?;
                    Ok(SessionOutcome {
                        session_string: None,
                        file: Some(path),
                        copied_to_clipboard: false,
                    })
                }
                OutputMode::String => Ok(string_outcome(format, &auth)),
            }
        })
    })
    .await
}

/// Perform the login handshake unless the session is already signed in.
async fn sign_in<A: TelegramApi>(
    api: &mut A,
    creds: &ResolvedCredentials,
    read_code: impl FnOnce() -> Result<String>,
) -> Result<()> {
    if api.is_authorized().await? {
        tracing::debug!("session already authorized, skipping login");
        return Ok(());
    }

    api.request_login_code(&creds.phone).await?;
    let code = read_code()?;
    api.sign_in(code.trim(), creds.password.as_deref()).await
}

fn string_outcome(format: SessionFormat, auth: &AuthData) -> SessionOutcome {
    let string = format.encode_string(auth);
    let copied = copy_to_clipboard(&string);
    SessionOutcome {
        session_string: Some(string),
        file: None,
        copied_to_clipboard: copied,
    }
}

/// Place text on the system clipboard. Best effort: copying is a
/// convenience, never a correctness requirement.
pub fn copy_to_clipboard(text: &str) -> bool {
    arboard::Clipboard::new()
        .and_then(|mut clipboard| clipboard.set_text(text.to_string()))
        .is_ok()
}
