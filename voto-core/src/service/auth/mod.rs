pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtService};
pub use password::{generate_salt, hash_password, salt_and_hash, verify_password, PasswordDigest};
