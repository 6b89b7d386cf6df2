//! OTP-listening login flow
//!
//! Connects with an existing session and waits for Telegram's official
//! notification account to deliver a login code, reporting the first
//! 5-digit run found in a message text. At most one code is reported per
//! invocation; the wait has no timeout and only ends on a match or when
//! the connection is torn down externally.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::{run_scoped, TelegramApi};
use crate::{Error, Result, NOTIFICATION_SERVICE_ID};

/// A standalone 5-digit run, the shape of Telegram login codes
static OTP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{5})\b").expect("pattern is valid"));

/// Extract the first 5-digit login code from a message text.
///
/// Longer digit runs are not codes and are ignored.
pub fn extract_otp(text: &str) -> Option<&str> {
    OTP_PATTERN.find(text).map(|found| found.as_str())
}

/// Wait for the next notification carrying a login code.
///
/// Messages without a 5-digit run are ignored and the wait continues.
/// Returns `None` when the connection closes before a code arrives.
pub async fn listen_for_login_code<A: TelegramApi>(api: &mut A) -> Result<Option<String>> {
    while let Some(message) = api.next_message_from(NOTIFICATION_SERVICE_ID).await? {
        if let Some(code) = extract_otp(&message.text) {
            tracing::info!("login code received");
            return Ok(Some(code.to_string()));
        }
        tracing::debug!("service notification without a login code, still listening");
    }

    tracing::debug!("connection closed before a login code arrived");
    Ok(None)
}

/// The login operation: verify the session is signed in, then report the
/// next incoming login code. The connection is released on every exit
/// path. `on_listening` runs once the wait actually starts.
pub async fn login<A, F>(api: A, on_listening: F) -> Result<Option<String>>
where
    A: TelegramApi,
    F: FnOnce() + Send + 'static,
{
    run_scoped(api, move |api| {
        Box::pin(async move {
            if !api.is_authorized().await? {
                return Err(Error::Unauthorized);
            }

            on_listening();
            listen_for_login_code(api).await
        })
    })
    .await
}
