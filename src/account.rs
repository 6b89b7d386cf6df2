//! Account operations on an authenticated session
//!
//! Two-step-verification password changes and the read-only account
//! report (profile, authorized devices, created groups/channels).

use std::str::FromStr;

use crate::api::{run_scoped, AccountInfo, DeviceInfo, DialogInfo, TelegramApi};
use crate::{Error, Result};

/// Set a new two-step-verification password.
///
/// The connection is released on success and on failure. An account that
/// already has 2FA enabled yields [`Error::TwoFaAlreadyEnabled`].
pub async fn set_two_step_password<A: TelegramApi>(api: A, new_password: String) -> Result<()> {
    run_scoped(api, move |api| {
        Box::pin(async move { api.set_two_step_password(&new_password).await })
    })
    .await
}

/// The four mutually exclusive dialog buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    PublicGroup,
    PrivateGroup,
    PublicChannel,
    PrivateChannel,
}

impl DialogKind {
    /// Classify a dialog entity by its two independent boolean facts.
    pub fn classify(megagroup: bool, has_username: bool) -> Self {
        match (megagroup, has_username) {
            (false, false) => Self::PrivateGroup,
            (false, true) => Self::PublicGroup,
            (true, false) => Self::PrivateChannel,
            (true, true) => Self::PublicChannel,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PublicGroup => "public group",
            Self::PrivateGroup => "private group",
            Self::PublicChannel => "public channel",
            Self::PrivateChannel => "private channel",
        }
    }
}

impl From<&DialogInfo> for DialogKind {
    fn from(dialog: &DialogInfo) -> Self {
        Self::classify(dialog.megagroup, dialog.username.is_some())
    }
}

/// Bucket counts over a set of dialogs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DialogTally {
    pub public_groups: usize,
    pub private_groups: usize,
    pub public_channels: usize,
    pub private_channels: usize,
}

impl DialogTally {
    pub fn count<'a>(dialogs: impl IntoIterator<Item = &'a DialogInfo>) -> Self {
        let mut tally = Self::default();
        for dialog in dialogs {
            match DialogKind::from(dialog) {
                DialogKind::PublicGroup => tally.public_groups += 1,
                DialogKind::PrivateGroup => tally.private_groups += 1,
                DialogKind::PublicChannel => tally.public_channels += 1,
                DialogKind::PrivateChannel => tally.private_channels += 1,
            }
        }
        tally
    }
}

/// What the operator asked the account report to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoChoice {
    Devices,
    Dialogs,
    Exit,
}

impl FromStr for InfoChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(Self::Devices),
            "2" => Ok(Self::Dialogs),
            "3" => Ok(Self::Exit),
            other => Err(Error::invalid_choice(other)),
        }
    }
}

/// Detail section of the account report
#[derive(Debug)]
pub enum InfoDetail {
    Devices(Vec<DeviceInfo>),
    /// Channels/groups the account created, with their bucket counts
    Dialogs {
        created: Vec<DialogInfo>,
        tally: DialogTally,
    },
    None,
}

/// The full account report
#[derive(Debug)]
pub struct UserInfoReport {
    pub info: AccountInfo,
    pub detail: InfoDetail,
}

/// Fetch the profile, let `choose` pick a detail section, and fetch it.
///
/// `choose` receives the profile so the caller can display it before
/// asking for the menu choice. The connection is released on every exit
/// path.
pub async fn userinfo<A, C>(api: A, choose: C) -> Result<UserInfoReport>
where
    A: TelegramApi,
    C: FnOnce(&AccountInfo) -> Result<InfoChoice> + Send + 'static,
{
    run_scoped(api, move |api| {
        Box::pin(async move {
            let info = api.account_info().await?;
            let detail = match choose(&info)? {
                InfoChoice::Devices => InfoDetail::Devices(api.list_authorizations().await?),
                InfoChoice::Dialogs => {
                    let created: Vec<DialogInfo> = api
                        .list_channel_dialogs()
                        .await?
                        .into_iter()
                        .filter(|dialog| dialog.creator)
                        .collect();
                    let tally = DialogTally::count(&created);
                    InfoDetail::Dialogs { created, tally }
                }
                InfoChoice::Exit => InfoDetail::None,
            };

            Ok(UserInfoReport { info, detail })
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::api::testing::StubApi;

    fn dialog(megagroup: bool, username: Option<&str>, creator: bool) -> DialogInfo {
        DialogInfo {
            id: 1,
            title: "t".to_string(),
            username: username.map(str::to_string),
            created_at: 1_700_000_000,
            megagroup,
            creator,
        }
    }

    #[test]
    fn test_classification_covers_all_four_buckets() {
        assert_eq!(DialogKind::classify(false, false), DialogKind::PrivateGroup);
        assert_eq!(DialogKind::classify(false, true), DialogKind::PublicGroup);
        assert_eq!(DialogKind::classify(true, false), DialogKind::PrivateChannel);
        assert_eq!(DialogKind::classify(true, true), DialogKind::PublicChannel);
    }

    #[test]
    fn test_tally_counts_synthetic_dialogs() {
        let dialogs = vec![
            dialog(false, None, true),
            dialog(false, None, true),
            dialog(false, Some("pub_gr"), true),
            dialog(true, None, true),
            dialog(true, Some("pub_ch"), true),
            dialog(true, Some("pub_ch2"), true),
            dialog(true, Some("pub_ch3"), true),
        ];

        let tally = DialogTally::count(&dialogs);
        assert_eq!(
            tally,
            DialogTally {
                public_groups: 1,
                private_groups: 2,
                public_channels: 3,
                private_channels: 1,
            }
        );
    }

    #[test]
    fn test_info_choice_parsing() {
        assert_eq!("1".parse::<InfoChoice>().unwrap(), InfoChoice::Devices);
        assert_eq!(" 2 ".parse::<InfoChoice>().unwrap(), InfoChoice::Dialogs);
        assert_eq!("3".parse::<InfoChoice>().unwrap(), InfoChoice::Exit);
        assert!(matches!(
            "4".parse::<InfoChoice>(),
            Err(Error::InvalidChoice { .. })
        ));
        assert!(matches!(
            "devices".parse::<InfoChoice>(),
            Err(Error::InvalidChoice { .. })
        ));
    }

    #[tokio::test]
    async fn test_already_enabled_reported_and_disconnects() {
        let disconnected = Arc::new(AtomicBool::new(false));
        let mut api = StubApi {
            authorized: true,
            two_step_error: Some(|| Error::TwoFaAlreadyEnabled),
            ..StubApi::default()
        };
        api.disconnect_signal = Some(disconnected.clone());

        let result = set_two_step_password(api, "new-password".to_string()).await;
        assert!(matches!(result, Err(Error::TwoFaAlreadyEnabled)));
        assert!(disconnected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_set_password_success() {
        let api = StubApi {
            authorized: true,
            ..StubApi::default()
        };
        assert!(set_two_step_password(api, "new-password".to_string())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_userinfo_dialogs_filters_non_created() {
        let api = StubApi {
            authorized: true,
            info: Some(AccountInfo {
                name: Some("Alice".to_string()),
                username: Some("alice".to_string()),
                user_id: 7,
                phone: Some("10000000000".to_string()),
            }),
            dialogs: vec![
                dialog(true, Some("mine"), true),
                dialog(false, None, true),
                dialog(true, Some("not_mine"), false),
            ],
            ..StubApi::default()
        };

        let report = userinfo(api, |_| Ok(InfoChoice::Dialogs)).await.unwrap();
        match report.detail {
            InfoDetail::Dialogs { created, tally } => {
                assert_eq!(created.len(), 2);
                assert_eq!(tally.public_channels, 1);
                assert_eq!(tally.private_groups, 1);
                assert_eq!(tally.public_groups, 0);
            }
            other => panic!("expected dialogs detail, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_userinfo_devices() {
        let api = StubApi {
            authorized: true,
            info: Some(AccountInfo {
                name: None,
                username: None,
                user_id: 7,
                phone: None,
            }),
            devices: vec![DeviceInfo {
                device_model: "PC".to_string(),
                platform: "Linux".to_string(),
                system_version: "6.1".to_string(),
                app_name: "Telegram Desktop".to_string(),
                app_version: "4.8".to_string(),
                ip: "127.0.0.1".to_string(),
                country: "DE".to_string(),
                current: true,
                official_app: true,
            }],
            ..StubApi::default()
        };

        let report = userinfo(api, |_| Ok(InfoChoice::Devices)).await.unwrap();
        match report.detail {
            InfoDetail::Devices(devices) => assert_eq!(devices.len(), 1),
            other => panic!("expected devices detail, got {other:?}"),
        }
    }
}
