//! Telethon session format
//!
//! Implements both artifact kinds Telethon understands:
//!
//! - **String sessions**: a `'1'` version prefix followed by the urlsafe
//!   base64 of `dc_id (u8) | ip (4 or 16 bytes) | port (u16 BE) | auth_key (256)`.
//! - **Session files**: a SQLite database whose `sessions` table holds one
//!   row per datacenter (`CURRENT_VERSION = 7` schema).

use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::Path;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rusqlite::{Connection, OpenFlags};

use crate::api::{AuthData, AuthKey};
use crate::{Error, Result, AUTH_KEY_SIZE};

/// Version prefix of current Telethon string sessions
const STRING_VERSION: char = '1';

/// Schema version written to the `version` table
const FILE_VERSION: u32 = 7;

/// Decoded string layout without the address: dc_id(1) + port(2) + key(256)
const FIXED_PART: usize = 1 + 2 + AUTH_KEY_SIZE;

/// Encode authorization material as a Telethon string session.
pub fn encode_string(auth: &AuthData) -> String {
    let addr = auth.dc_addr();
    let ip = addr.ip().octets();

    let mut data = Vec::with_capacity(1 + ip.len() + 2 + AUTH_KEY_SIZE);
    data.push(auth.dc_id as u8);
    data.extend_from_slice(&ip);
    data.extend_from_slice(&addr.port().to_be_bytes());
    data.extend_from_slice(auth.auth_key.as_bytes());

    format!("{}{}", STRING_VERSION, URL_SAFE.encode(data))
}

/// Decode a Telethon string session.
///
/// Telethon never stores the API ID or user ID in the string, so those
/// fields come back as zero.
pub fn decode_string(string: &str) -> Result<AuthData> {
    let rest = string
        .strip_prefix(STRING_VERSION)
        .ok_or_else(|| Error::invalid_session_string("unsupported version prefix"))?;

    let data = URL_SAFE
        .decode(rest)
        .map_err(|e| Error::invalid_session_string(format!("bad base64: {e}")))?;

    if data.len() <= FIXED_PART {
        return Err(Error::invalid_session_string("string too short"));
    }

    // Whatever is not the fixed part is the IP (4 bytes for IPv4, 16 for IPv6)
    let ip_len = data.len() - FIXED_PART;
    if ip_len != 4 && ip_len != 16 {
        return Err(Error::invalid_session_string(format!(
            "unexpected address length: {ip_len}"
        )));
    }

    let dc_id = data[0] as i32;
    let port = u16::from_be_bytes([data[1 + ip_len], data[2 + ip_len]]);
    let auth_key = AuthKey::from_bytes(&data[3 + ip_len..])?;

    // IPv6 session strings exist but Telegram's production DCs are reached
    // over IPv4 here; fall back to the DC table for those.
    let addr = if ip_len == 4 {
        let ip = Ipv4Addr::new(data[1], data[2], data[3], data[4]);
        Some(SocketAddrV4::new(ip, port))
    } else {
        None
    };

    Ok(AuthData {
        dc_id,
        api_id: 0,
        user_id: 0,
        is_bot: false,
        addr,
        auth_key,
    })
}

/// Write a Telethon session file.
///
/// Creates the full version-7 schema so the file is directly usable by
/// Telethon, then stores the single datacenter row.
pub fn write_session_file<P: AsRef<Path>>(path: P, auth: &AuthData) -> Result<()> {
    let conn = Connection::open(path.as_ref())?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS version (version INTEGER PRIMARY KEY);
         CREATE TABLE IF NOT EXISTS sessions (
             dc_id INTEGER PRIMARY KEY,
             server_address TEXT,
             port INTEGER,
             auth_key BLOB,
             takeout_id INTEGER
         );
         CREATE TABLE IF NOT EXISTS entities (
             id INTEGER PRIMARY KEY,
             hash INTEGER NOT NULL,
             username TEXT,
             phone INTEGER,
             name TEXT,
             date INTEGER
         );
         CREATE TABLE IF NOT EXISTS sent_files (
             md5_digest BLOB,
             file_size INTEGER,
             type INTEGER,
             id INTEGER,
             hash INTEGER,
             PRIMARY KEY (md5_digest, file_size, type)
         );
         CREATE TABLE IF NOT EXISTS update_state (
             id INTEGER PRIMARY KEY,
             pts INTEGER,
             qts INTEGER,
             date INTEGER,
             seq INTEGER
         );",
    )?;

    conn.execute("DELETE FROM version", [])?;
    conn.execute("INSERT INTO version VALUES (?1)", [FILE_VERSION])?;

    let addr = auth.dc_addr();
    conn.execute(
        "INSERT OR REPLACE INTO sessions (dc_id, server_address, port, auth_key, takeout_id)
         VALUES (?1, ?2, ?3, ?4, NULL)",
        rusqlite::params![
            auth.dc_id,
            addr.ip().to_string(),
            addr.port(),
            auth.auth_key.as_bytes().as_slice(),
        ],
    )?;

    tracing::info!(path = %path.as_ref().display(), dc_id = auth.dc_id, "wrote Telethon session file");
    Ok(())
}

/// Read authorization material from a Telethon session file.
///
/// Any storage-layer failure (missing file, not a SQLite database, missing
/// tables or rows) is reported as one "invalid session file" error.
pub fn read_session_file<P: AsRef<Path>>(path: P) -> Result<AuthData> {
    let path = path.as_ref();
    let invalid = || Error::invalid_session_file(path);

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|_| invalid())?;

    let (dc_id, server_address, port, key_bytes): (i32, String, u16, Vec<u8>) = conn
        .query_row(
            "SELECT dc_id, server_address, port, auth_key FROM sessions LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .map_err(|_| invalid())?;

    let auth_key = AuthKey::from_bytes(&key_bytes).map_err(|_| invalid())?;
    let addr = server_address
        .parse::<Ipv4Addr>()
        .ok()
        .map(|ip| SocketAddrV4::new(ip, port));

    Ok(AuthData {
        dc_id,
        api_id: 0,
        user_id: 0,
        is_bot: false,
        addr,
        auth_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::sample_auth;

    #[test]
    fn test_string_round_trip() {
        let auth = sample_auth();
        let string = encode_string(&auth);

        assert!(string.starts_with('1'));

        let decoded = decode_string(&string).unwrap();
        assert_eq!(decoded.dc_id, auth.dc_id);
        assert_eq!(decoded.auth_key, auth.auth_key);
        assert_eq!(decoded.dc_addr(), auth.dc_addr());
    }

    #[test]
    fn test_decode_rejects_wrong_prefix() {
        let auth = sample_auth();
        let string = encode_string(&auth).replacen('1', "2", 1);
        assert!(matches!(
            decode_string(&string),
            Err(Error::InvalidSessionString { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_string("1not-base64!!").is_err());
        assert!(decode_string("1AAAA").is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.session");

        let auth = sample_auth();
        write_session_file(&path, &auth).unwrap();

        let read = read_session_file(&path).unwrap();
        assert_eq!(read.dc_id, auth.dc_id);
        assert_eq!(read.auth_key, auth.auth_key);
        assert_eq!(read.dc_addr(), auth.dc_addr());
    }

    #[test]
    fn test_read_rejects_non_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.session");
        std::fs::write(&path, b"definitely not a sqlite database").unwrap();

        assert!(matches!(
            read_session_file(&path),
            Err(Error::InvalidSessionFile { .. })
        ));
    }

    #[test]
    fn test_read_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.session");

        assert!(matches!(
            read_session_file(&path),
            Err(Error::InvalidSessionFile { .. })
        ));
    }
}
