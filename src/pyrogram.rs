//! Pyrogram session format
//!
//! - **String sessions**: urlsafe base64 (padding stripped) of
//!   `dc_id (u8) | api_id (u32 BE) | test_mode (u8) | auth_key (256) |
//!   user_id (u64 BE) | is_bot (u8)`. Two legacy layouts without the
//!   API ID are still accepted on decode.
//! - **Session files**: a SQLite database with a single `sessions` row
//!   (schema version 3).

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rusqlite::{Connection, OpenFlags};

use crate::api::{AuthData, AuthKey};
use crate::{Error, Result, AUTH_KEY_SIZE};

/// Schema version written to the `version` table
const FILE_VERSION: u32 = 3;

/// Current string layout: dc(1) + api_id(4) + test(1) + key(256) + user(8) + bot(1)
const CURRENT_LEN: usize = 1 + 4 + 1 + AUTH_KEY_SIZE + 8 + 1;

/// Legacy layout with a 64-bit user ID but no API ID
const LEGACY_64_LEN: usize = 1 + 1 + AUTH_KEY_SIZE + 8 + 1;

/// Legacy layout with a 32-bit user ID and no API ID
const LEGACY_32_LEN: usize = 1 + 1 + AUTH_KEY_SIZE + 4 + 1;

/// Encode authorization material as a Pyrogram string session.
pub fn encode_string(auth: &AuthData) -> String {
    let mut data = Vec::with_capacity(CURRENT_LEN);
    data.push(auth.dc_id as u8);
    data.extend_from_slice(&(auth.api_id as u32).to_be_bytes());
    data.push(0); // test_mode
    data.extend_from_slice(auth.auth_key.as_bytes());
    data.extend_from_slice(&(auth.user_id as u64).to_be_bytes());
    data.push(auth.is_bot as u8);

    URL_SAFE_NO_PAD.encode(data)
}

/// Decode a Pyrogram string session (current or legacy layout).
pub fn decode_string(string: &str) -> Result<AuthData> {
    let data = URL_SAFE_NO_PAD
        .decode(string.trim_end_matches('='))
        .map_err(|e| Error::invalid_session_string(format!("bad base64: {e}")))?;

    let (dc_id, api_id, key_range, user_id, is_bot) = match data.len() {
        CURRENT_LEN => {
            let api_id = u32::from_be_bytes([data[1], data[2], data[3], data[4]]) as i32;
            let user = u64::from_be_bytes(data[262..270].try_into().expect("length checked"));
            (data[0] as i32, api_id, 6..262, user as i64, data[270] != 0)
        }
        LEGACY_64_LEN => {
            let user = u64::from_be_bytes(data[258..266].try_into().expect("length checked"));
            (data[0] as i32, 0, 2..258, user as i64, data[266] != 0)
        }
        LEGACY_32_LEN => {
            let user = u32::from_be_bytes(data[258..262].try_into().expect("length checked"));
            (data[0] as i32, 0, 2..258, user as i64, data[262] != 0)
        }
        other => {
            return Err(Error::invalid_session_string(format!(
                "unexpected payload length: {other}"
            )))
        }
    };

    Ok(AuthData {
        dc_id,
        api_id,
        user_id,
        is_bot,
        addr: None,
        auth_key: AuthKey::from_bytes(&data[key_range])?,
    })
}

/// Write a Pyrogram session file (version-3 schema).
pub fn write_session_file<P: AsRef<Path>>(path: P, auth: &AuthData) -> Result<()> {
    let conn = Connection::open(path.as_ref())?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS version (number INTEGER PRIMARY KEY);
         CREATE TABLE IF NOT EXISTS sessions (
             dc_id INTEGER PRIMARY KEY,
             api_id INTEGER,
             test_mode INTEGER,
             auth_key BLOB,
             date INTEGER NOT NULL,
             user_id INTEGER,
             is_bot INTEGER
         );
         CREATE TABLE IF NOT EXISTS peers (
             id INTEGER PRIMARY KEY,
             access_hash INTEGER,
             type INTEGER NOT NULL,
             username TEXT,
             phone_number TEXT,
             last_update_on INTEGER NOT NULL
                 DEFAULT (CAST(STRFTIME('%s', 'now') AS INTEGER))
         );
         CREATE INDEX IF NOT EXISTS idx_peers_username ON peers (username);
         CREATE INDEX IF NOT EXISTS idx_peers_phone_number ON peers (phone_number);",
    )?;

    conn.execute("DELETE FROM version", [])?;
    conn.execute("INSERT INTO version VALUES (?1)", [FILE_VERSION])?;

    conn.execute(
        "INSERT OR REPLACE INTO sessions (dc_id, api_id, test_mode, auth_key, date, user_id, is_bot)
         VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            auth.dc_id,
            auth.api_id,
            auth.auth_key.as_bytes().as_slice(),
            chrono::Utc::now().timestamp(),
            auth.user_id,
            auth.is_bot,
        ],
    )?;

    tracing::info!(path = %path.as_ref().display(), dc_id = auth.dc_id, "wrote Pyrogram session file");
    Ok(())
}

/// Read authorization material from a Pyrogram session file.
///
/// Any storage-layer failure is reported as one "invalid session file"
/// error rather than the raw SQLite error.
pub fn read_session_file<P: AsRef<Path>>(path: P) -> Result<AuthData> {
    let path = path.as_ref();
    let invalid = || Error::invalid_session_file(path);

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|_| invalid())?;

    let (dc_id, api_id, key_bytes, user_id, is_bot): (i32, i32, Vec<u8>, i64, bool) = conn
        .query_row(
            "SELECT dc_id, api_id, auth_key, user_id, is_bot FROM sessions LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            },
        )
        .map_err(|_| invalid())?;

    Ok(AuthData {
        dc_id,
        api_id,
        user_id,
        is_bot,
        addr: None,
        auth_key: AuthKey::from_bytes(&key_bytes).map_err(|_| invalid())?,
    })
}
