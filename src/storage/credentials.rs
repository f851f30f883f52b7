use std::num::NonZeroU32;

use rand::RngCore;
use ring::pbkdf2;

use super::error::StorageError;

pub const PBKDF2_ITERATIONS: u32 = 10_000;
const SALT_LEN: usize = 32;
const HASH_LEN: usize = 32;

/// Stored form of a developer password: PBKDF2-HMAC-SHA256 output, salt and
/// iteration count, the first two as hex strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
    pub iterations: u32,
}

impl PasswordHash {
    /// Hashes `password` under a fresh random salt.
    pub fn generate(password: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut hash = [0u8; HASH_LEN];
        derive(PBKDF2_ITERATIONS_NZ, &salt, password, &mut hash);

        PasswordHash {
            hash: hex::encode(hash),
            salt: hex::encode(salt),
            iterations: PBKDF2_ITERATIONS,
        }
    }

    /// Re-derives with the stored salt, iteration count and hash length.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool, StorageError> {
        let malformed = |cause: String| StorageError::Credentials {
            username: username.to_string(),
            cause,
        };

        let salt = hex::decode(&self.salt).map_err(|e| malformed(format!("salt: {e}")))?;
        let stored = hex::decode(&self.hash).map_err(|e| malformed(format!("hash: {e}")))?;
        let iterations = NonZeroU32::new(self.iterations)
            .ok_or_else(|| malformed("iteration count is zero".into()))?;
        if stored.is_empty() {
            return Err(malformed("hash is empty".into()));
        }

        let mut derived = vec![0u8; stored.len()];
        derive(iterations, &salt, password, &mut derived);
        Ok(hex::encode(derived) == hex::encode(stored))
    }
}

const PBKDF2_ITERATIONS_NZ: NonZeroU32 = match NonZeroU32::new(PBKDF2_ITERATIONS) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

fn derive(iterations: NonZeroU32, salt: &[u8], password: &str, out: &mut [u8]) {
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        password.as_bytes(),
        out,
    );
}
