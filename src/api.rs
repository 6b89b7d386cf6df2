//! The capability interface every flow is written against
//!
//! All network interaction goes through [`TelegramApi`], so the session,
//! login and account flows can be exercised with a stub client in tests.
//! The production implementation lives in [`crate::grammers`].

use std::net::SocketAddrV4;

use async_trait::async_trait;

use crate::{Error, Result, AUTH_KEY_SIZE};

/// Telegram datacenter addresses (production)
const DC_ADDRESSES: [(i32, &str, u16); 5] = [
    (1, "149.154.175.53", 443),
    (2, "149.154.167.51", 443),
    (3, "149.154.175.100", 443),
    (4, "149.154.167.91", 443),
    (5, "91.108.56.130", 443),
];

/// Resolve the production address of a datacenter.
///
/// Unknown IDs fall back to DC 2, which handles redirects.
pub fn dc_address(dc_id: i32) -> SocketAddrV4 {
    let (ip, port) = DC_ADDRESSES
        .iter()
        .find(|(id, _, _)| *id == dc_id)
        .map(|(_, ip, port)| (*ip, *port))
        .unwrap_or(("149.154.167.51", 443));

    // The table only holds valid IPv4 literals
    SocketAddrV4::new(ip.parse().expect("datacenter table holds valid addresses"), port)
}

/// MTProto authorization key
#[derive(Clone, PartialEq, Eq)]
pub struct AuthKey {
    data: [u8; AUTH_KEY_SIZE],
}

impl AuthKey {
    /// Create an AuthKey from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != AUTH_KEY_SIZE {
            return Err(Error::invalid_session_string(format!(
                "auth key must be {} bytes, got {}",
                AUTH_KEY_SIZE,
                bytes.len()
            )));
        }

        let mut data = [0u8; AUTH_KEY_SIZE];
        data.copy_from_slice(bytes);
        Ok(Self { data })
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; AUTH_KEY_SIZE] {
        &self.data
    }
}

impl From<[u8; AUTH_KEY_SIZE]> for AuthKey {
    fn from(data: [u8; AUTH_KEY_SIZE]) -> Self {
        Self { data }
    }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose key material in debug output
        f.debug_struct("AuthKey")
            .field("len", &self.data.len())
            .finish()
    }
}

/// Authorization material exchanged between session formats
///
/// This is everything the Telethon and Pyrogram codecs need to write a
/// working session artifact. Fields a format does not store are zero.
#[derive(Debug, Clone)]
pub struct AuthData {
    /// Home datacenter ID (1-5)
    pub dc_id: i32,
    /// API ID the session was created with (Pyrogram stores it, Telethon doesn't)
    pub api_id: i32,
    /// User ID of the signed-in account (0 if unknown)
    pub user_id: i64,
    /// Whether the account is a bot
    pub is_bot: bool,
    /// Server address stored in the source artifact, when it carries one
    pub addr: Option<SocketAddrV4>,
    /// The 256-byte authorization key
    pub auth_key: AuthKey,
}

impl AuthData {
    /// Address of the home datacenter: the stored one when the source
    /// artifact carries it, the production table otherwise
    pub fn dc_addr(&self) -> SocketAddrV4 {
        self.addr.unwrap_or_else(|| dc_address(self.dc_id))
    }
}

/// A message received from another account
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Plain text of the message
    pub text: String,
}

/// Profile fields of the signed-in account
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub name: Option<String>,
    pub username: Option<String>,
    pub user_id: i64,
    pub phone: Option<String>,
}

/// One authorized device/session of the account
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub device_model: String,
    pub platform: String,
    pub system_version: String,
    pub app_name: String,
    pub app_version: String,
    pub ip: String,
    pub country: String,
    pub current: bool,
    pub official_app: bool,
}

/// A channel-style dialog entity visible to the account
#[derive(Debug, Clone)]
pub struct DialogInfo {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
    /// Unix timestamp of the entity's creation date
    pub created_at: i64,
    /// Megagroup/channel-style flag, as reported by Telegram
    pub megagroup: bool,
    /// Whether this account created the entity
    pub creator: bool,
}

/// Everything the flows consume from a Telegram client library
///
/// One live connection per value; the connection is owned for the value's
/// whole lifetime and released by [`disconnect`](TelegramApi::disconnect).
#[async_trait]
pub trait TelegramApi: Send {
    /// Whether the underlying session is signed in
    async fn is_authorized(&mut self) -> Result<bool>;

    /// Ask Telegram to send a login code to the given phone number
    async fn request_login_code(&mut self, phone: &str) -> Result<()>;

    /// Complete the login with the received code, supplying the 2FA
    /// password if the account requires one
    async fn sign_in(&mut self, code: &str, password: Option<&str>) -> Result<()>;

    /// Export the authorization material of the live session
    async fn export_auth(&mut self) -> Result<AuthData>;

    /// Wait for the next inbound message from the given sender.
    ///
    /// Returns `None` when the connection is torn down before a message
    /// arrives. There is deliberately no timeout: slow-arriving messages
    /// must still be delivered.
    async fn next_message_from(&mut self, sender_id: i64) -> Result<Option<InboundMessage>>;

    /// Set a new two-step-verification password.
    ///
    /// Fails with [`Error::TwoFaAlreadyEnabled`] when the account already
    /// has one and no current password was supplied.
    async fn set_two_step_password(&mut self, new_password: &str) -> Result<()>;

    /// Profile fields of the signed-in account
    async fn account_info(&mut self) -> Result<AccountInfo>;

    /// All authorized devices/sessions of the account
    async fn list_authorizations(&mut self) -> Result<Vec<DeviceInfo>>;

    /// All channel-style dialogs, with creator/megagroup/username facts
    async fn list_channel_dialogs(&mut self) -> Result<Vec<DialogInfo>>;

    /// Release the connection. Called on every exit path by [`run_scoped`].
    async fn disconnect(&mut self);
}

/// Future returned by the operation passed to [`run_scoped`]
pub type ScopedFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<T>> + Send + 'a>>;

/// Run one operation against a connection, releasing it on every exit path.
///
/// The disconnect is unconditional: manual close calls must not be
/// scattered through the flows' branches.
pub async fn run_scoped<A, T, F>(mut api: A, op: F) -> Result<T>
where
    A: TelegramApi,
    F: for<'a> FnOnce(&'a mut A) -> ScopedFuture<'a, T>,
{
    let out = op(&mut api).await;
    api.disconnect().await;
    out
}

#[cfg(test)]
pub(crate) mod testing {
    //! A scripted stub client shared by the flow tests

    use std::collections::VecDeque;

    use super::*;

    /// Stub [`TelegramApi`] driven by pre-scripted data
    #[derive(Default)]
    pub struct StubApi {
        pub authorized: bool,
        pub auth: Option<AuthData>,
        /// Messages handed out by `next_message_from`, oldest first.
        /// `(sender_id, text)`; messages from other senders are skipped.
        pub inbox: VecDeque<(i64, String)>,
        /// Error to raise from `set_two_step_password`, if any
        pub two_step_error: Option<fn() -> Error>,
        pub info: Option<AccountInfo>,
        pub devices: Vec<DeviceInfo>,
        pub dialogs: Vec<DialogInfo>,

        // Call log
        pub login_codes_requested: Vec<String>,
        pub sign_ins: Vec<(String, Option<String>)>,
        pub messages_consumed: usize,
        pub disconnected: bool,
        /// Mirror of `disconnected` observable after the stub is consumed
        pub disconnect_signal: Option<std::sync::Arc<std::sync::atomic::AtomicBool>>,
    }

    impl StubApi {
        pub fn authorized_with(auth: AuthData) -> Self {
            Self {
                authorized: true,
                auth: Some(auth),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl TelegramApi for StubApi {
        async fn is_authorized(&mut self) -> Result<bool> {
            Ok(self.authorized)
        }

        async fn request_login_code(&mut self, phone: &str) -> Result<()> {
            self.login_codes_requested.push(phone.to_string());
            Ok(())
        }

        async fn sign_in(&mut self, code: &str, password: Option<&str>) -> Result<()> {
            self.sign_ins
                .push((code.to_string(), password.map(str::to_string)));
            self.authorized = true;
            Ok(())
        }

        async fn export_auth(&mut self) -> Result<AuthData> {
            self.auth.clone().ok_or(Error::MissingAuthKey)
        }

        async fn next_message_from(&mut self, sender_id: i64) -> Result<Option<InboundMessage>> {
            while let Some((from, text)) = self.inbox.pop_front() {
                self.messages_consumed += 1;
                if from == sender_id {
                    return Ok(Some(InboundMessage { text }));
                }
            }
            Ok(None)
        }

        async fn set_two_step_password(&mut self, _new_password: &str) -> Result<()> {
            match self.two_step_error {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }

        async fn account_info(&mut self) -> Result<AccountInfo> {
            self.info.clone().ok_or(Error::Unauthorized)
        }

        async fn list_authorizations(&mut self) -> Result<Vec<DeviceInfo>> {
            Ok(self.devices.clone())
        }

        async fn list_channel_dialogs(&mut self) -> Result<Vec<DialogInfo>> {
            Ok(self.dialogs.clone())
        }

        async fn disconnect(&mut self) {
            self.disconnected = true;
            if let Some(signal) = &self.disconnect_signal {
                signal.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }
    }

    /// AuthData with a recognizable key, for codec and flow tests
    pub fn sample_auth() -> AuthData {
        AuthData {
            dc_id: 2,
            api_id: 1,
            user_id: 100200300,
            is_bot: false,
            addr: None,
            auth_key: AuthKey::from([0xAB; AUTH_KEY_SIZE]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dc_address_known() {
        let addr = dc_address(4);
        assert_eq!(addr.ip().to_string(), "149.154.167.91");
        assert_eq!(addr.port(), 443);
    }

    #[test]
    fn test_dc_address_unknown_falls_back() {
        assert_eq!(dc_address(9).ip().to_string(), "149.154.167.51");
    }

    #[test]
    fn test_auth_key_from_bytes() {
        let bytes = [0xAB; AUTH_KEY_SIZE];
        let key = AuthKey::from_bytes(&bytes).unwrap();
        assert_eq!(key.as_bytes(), &bytes);
    }

    #[test]
    fn test_auth_key_wrong_size() {
        let bytes = [0u8; 100];
        assert!(AuthKey::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_auth_key_debug_redacts_material() {
        let key = AuthKey::from([0xCD; AUTH_KEY_SIZE]);
        let debug = format!("{:?}", key);
        assert!(!debug.contains("cd"));
        assert!(!debug.contains("CD"));
    }

    #[tokio::test]
    async fn test_run_scoped_disconnects_on_error() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use testing::StubApi;

        let flag = Arc::new(AtomicBool::new(false));
        let mut api = StubApi::default();
        api.disconnect_signal = Some(flag.clone());

        let result: Result<()> =
            run_scoped(api, |_api| Box::pin(async { Err(Error::Unauthorized) })).await;

        assert!(matches!(result, Err(Error::Unauthorized)));
        assert!(flag.load(Ordering::SeqCst));
    }
}
