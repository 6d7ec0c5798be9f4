mod password;
pub use password::{MIN_PASSWORD_LEN, hash_password, verify_password};
mod jwt;
pub use jwt::{SESSION_TTL_HOURS, UserClaims, generate_token, process_token};
mod error;
pub use error::{CryptError, CryptResult};
