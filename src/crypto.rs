//! Cryptographic operations for two-step verification
//!
//! Implements the password-hash side of Telegram's SRP algorithm
//! (`SHA256 + PBKDF2-HMAC-SHA512 (100000 iterations) + ModPow`), which is
//! needed to install a new 2FA password:
//!
//! - `SH(data, salt) = SHA256(salt | data | salt)`
//! - `PH1(password, salt1, salt2) = SH(SH(password, salt1), salt2)`
//! - `PH2(password, salt1, salt2) = SH(PBKDF2-HMAC-SHA512(PH1, salt1, 100000), salt2)`
//! - `v = g ^ PH2 mod p`, sent to the server as the new password hash

use num_bigint::BigUint;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};

/// PBKDF2 iteration count mandated by the algorithm
const SRP_PBKDF2_ITERATIONS: u32 = 100_000;

/// Number of random bytes appended to the server-provided salt1
pub const SALT_EXTENSION_SIZE: usize = 32;

/// Extend the server-provided `salt1` with random bytes.
///
/// The extended salt must be echoed back inside the new algorithm
/// parameters so the server can verify future logins.
pub fn extend_salt(salt1: &[u8]) -> Vec<u8> {
    let mut extended = Vec::with_capacity(salt1.len() + SALT_EXTENSION_SIZE);
    extended.extend_from_slice(salt1);

    let mut random = [0u8; SALT_EXTENSION_SIZE];
    rand::thread_rng().fill_bytes(&mut random);
    extended.extend_from_slice(&random);

    extended
}

/// `SH(data, salt) = SHA256(salt | data | salt)`
fn salted_hash(data: &[u8], salt: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(data);
    hasher.update(salt);
    hasher.finalize().into()
}

/// Compute `PH2(password, salt1, salt2)`, the secret exponent `x`.
pub fn compute_password_hash(password: &str, salt1: &[u8], salt2: &[u8]) -> [u8; 32] {
    // PH1 = SH(SH(password, salt1), salt2)
    let ph1 = salted_hash(&salted_hash(password.as_bytes(), salt1), salt2);

    // PBKDF2-HMAC-SHA512(PH1, salt1, 100000)
    let mut derived = [0u8; 64];
    pbkdf2::pbkdf2_hmac::<Sha512>(&ph1, salt1, SRP_PBKDF2_ITERATIONS, &mut derived);

    // PH2 = SH(derived, salt2)
    salted_hash(&derived, salt2)
}

/// Compute the password verifier `v = g ^ x mod p`.
///
/// The result is serialized big-endian and left-padded with zeros to the
/// length of `p`, which is how the server expects `new_password_hash`.
pub fn compute_verifier(g: i32, p: &[u8], x: &[u8]) -> Vec<u8> {
    let g = BigUint::from(g as u32);
    let p_num = BigUint::from_bytes_be(p);
    let x = BigUint::from_bytes_be(x);

    let v = g.modpow(&x, &p_num);
    let mut bytes = v.to_bytes_be();

    // Left-pad to the modulus size
    if bytes.len() < p.len() {
        let mut padded = vec![0u8; p.len() - bytes.len()];
        padded.append(&mut bytes);
        padded
    } else {
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_deterministic() {
        let salt1 = [0x01; 40];
        let salt2 = [0x02; 16];

        let a = compute_password_hash("hunter2", &salt1, &salt2);
        let b = compute_password_hash("hunter2", &salt1, &salt2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_password_hash_depends_on_password_and_salts() {
        let salt1 = [0x01; 40];
        let salt2 = [0x02; 16];

        let base = compute_password_hash("hunter2", &salt1, &salt2);
        assert_ne!(base, compute_password_hash("hunter3", &salt1, &salt2));
        assert_ne!(base, compute_password_hash("hunter2", &salt2, &salt1));
    }

    #[test]
    fn test_extend_salt_keeps_prefix() {
        let salt1 = [0xAA; 8];
        let extended = extend_salt(&salt1);

        assert_eq!(extended.len(), 8 + SALT_EXTENSION_SIZE);
        assert_eq!(&extended[..8], &salt1);
    }

    #[test]
    fn test_verifier_small_numbers() {
        // 7^3 mod 11 = 343 mod 11 = 2
        let v = compute_verifier(7, &[11], &[3]);
        assert_eq!(v, vec![2]);
    }

    #[test]
    fn test_verifier_padded_to_modulus_size() {
        // 2^2 mod 0x0100000001 = 4, padded to 5 bytes
        let p = [0x01, 0x00, 0x00, 0x00, 0x01];
        let v = compute_verifier(2, &p, &[2]);
        assert_eq!(v, vec![0, 0, 0, 0, 4]);
    }
}
