//! # tg-sessions
//!
//! A small toolkit for creating and managing Telegram client sessions.
//!
//! ## Features
//!
//! - Log in with phone + OTP (and optional 2FA password) via grammers
//! - Produce Telethon- or Pyrogram-compatible session files and string
//!   sessions from one login
//! - Derive a string session from an existing session file, offline
//! - Listen for the next login code sent by Telegram's notification account
//! - Set a two-step-verification password
//! - Report account info, connected devices and created groups/channels
//!
//! ## Example
//!
//! ```rust,no_run
//! use tg_sessions::telethon;
//!
//! fn main() -> Result<(), tg_sessions::Error> {
//!     // Turn an existing Telethon session file into a string session
//!     let auth = telethon::read_session_file("alice.session")?;
//!     println!("{}", telethon::encode_string(&auth));
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod api;
pub mod crypto;
mod error;
pub mod grammers;
pub mod login;
pub mod manager;
pub mod prompt;
pub mod pyrogram;
pub mod telethon;

pub use error::{Error, Result};

/// Auth key size in bytes (256 bytes = 2048 bits)
pub const AUTH_KEY_SIZE: usize = 256;

/// User ID of Telegram's official notification account, the sender of
/// login codes and service messages.
pub const NOTIFICATION_SERVICE_ID: i64 = 777000;
