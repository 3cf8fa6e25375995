use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Salt length in bytes (hex encoded to twice as many characters)
const SALT_LENGTH: usize = 8;

/// Salt and hash pair as stored on the user row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub salt: String,
    pub hash: String,
}

/// Random hex-encoded salt
#[must_use]
pub fn generate_salt() -> String {
    hex::encode(rand::random::<[u8; SALT_LENGTH]>())
}

/// Hex-encoded HMAC-SHA512 of the password, keyed by the salt
#[must_use]
pub fn hash_password(password: &str, salt: &str) -> String {
    let Ok(mut mac) = HmacSha512::new_from_slice(salt.as_bytes()) else {
        unreachable!("HMAC accepts keys of any length")
    };
    mac.update(password.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Hash with a freshly generated salt
#[must_use]
pub fn salt_and_hash(password: &str) -> PasswordDigest {
    let salt = generate_salt();
    let hash = hash_password(password, &salt);
    PasswordDigest { salt, hash }
}

/// Constant-time check of a password against a stored salt and hash
#[must_use]
pub fn verify_password(password: &str, salt: &str, hash: &str) -> bool {
    let computed = hash_password(password, salt);
    computed.as_bytes().ct_eq(hash.as_bytes()).into()
}
